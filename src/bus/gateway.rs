//! Trait abstraction for the message bus to enable testing

use async_trait::async_trait;
use tracing::trace;

use super::message::{ControlMessage, MessagePattern};
use crate::error::Result;

/// Callback for inbound messages, given the pattern's captured tokens.
pub type InboundHandler = Box<dyn FnMut(&[&str]) + Send>;

/// Publish/subscribe access to the ground-control bus.
///
/// Handlers run inside [`BusGateway::dispatch_next`], on whichever task
/// awaits it, and never concurrently with each other.
#[async_trait]
pub trait BusGateway: Send {
    /// Sends a control message. Fire-and-forget: delivery failures are
    /// logged by the implementation and never reported back.
    fn publish(&mut self, message: &ControlMessage);

    /// Registers `handler` for inbound messages matching `pattern`.
    fn subscribe(&mut self, pattern: MessagePattern, handler: InboundHandler);

    /// Waits for the next inbound message and runs every matching handler.
    ///
    /// Returns the number of handlers invoked.
    async fn dispatch_next(&mut self) -> Result<usize>;
}

/// Registered patterns and their handlers.
#[derive(Default)]
pub struct Subscriptions {
    entries: Vec<(MessagePattern, InboundHandler)>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, pattern: MessagePattern, handler: InboundHandler) {
        self.entries.push((pattern, handler));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs every handler whose pattern matches `line`, in registration order.
    pub fn dispatch(&mut self, line: &str) -> usize {
        let mut invoked = 0;
        for (pattern, handler) in &mut self.entries {
            if let Some(captures) = pattern.captures(line) {
                trace!("Inbound '{}' matched '{}'", line, pattern);
                handler(&captures);
                invoked += 1;
            }
        }
        invoked
    }
}

impl std::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(pattern, _)| pattern.to_string()))
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::mocks::RecordingBus;
    use super::*;
    use crate::controller::mapper::NormalizedPosition;
    use std::sync::{Arc, Mutex};

    fn collecting_handler(sink: &Arc<Mutex<Vec<Vec<String>>>>) -> InboundHandler {
        let sink = Arc::clone(sink);
        Box::new(move |captures| {
            sink.lock()
                .unwrap()
                .push(captures.iter().map(|c| c.to_string()).collect());
        })
    }

    #[test]
    fn test_dispatch_invokes_matching_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut subs = Subscriptions::new();
        subs.subscribe(MessagePattern::dl_setting().unwrap(), collecting_handler(&seen));

        assert_eq!(subs.dispatch("gcs DL_SETTING 1 2 3.0"), 1);
        assert_eq!(subs.dispatch("dl JOYSTICK_RAW 1 0 0 0"), 0);
        assert_eq!(*seen.lock().unwrap(), vec![vec!["gcs", "1", "2", "3.0"]]);
    }

    #[test]
    fn test_dispatch_runs_every_match_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut subs = Subscriptions::new();
        for tag in ["first", "second"] {
            let order = Arc::clone(&order);
            subs.subscribe(
                MessagePattern::dl_setting().unwrap(),
                Box::new(move |_| order.lock().unwrap().push(tag)),
            );
        }

        assert_eq!(subs.dispatch("gcs DL_SETTING 1 2 3.0"), 2);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(subs.len(), 2);
    }

    #[test]
    fn test_empty_subscriptions() {
        let mut subs = Subscriptions::new();
        assert!(subs.is_empty());
        assert_eq!(subs.dispatch("gcs DL_SETTING 1 2 3.0"), 0);
    }

    #[tokio::test]
    async fn test_recording_bus_dispatches_inbound() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = RecordingBus::new();
        bus.subscribe(MessagePattern::dl_setting().unwrap(), collecting_handler(&seen));
        bus.push_inbound("gcs DL_SETTING 1 2 nope");

        assert_eq!(bus.dispatch_next().await.unwrap(), 1);
        assert_eq!(seen.lock().unwrap()[0][3], "nope");
    }

    #[test]
    fn test_recording_bus_records_publish() {
        let mut bus = RecordingBus::new();
        let msg = ControlMessage::new(7, NormalizedPosition::new([1, 2, 3]));
        bus.publish(&msg);
        assert_eq!(bus.get_published(), vec![msg]);
    }
}
