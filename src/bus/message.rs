//! # Bus Messages
//!
//! Text messages exchanged with the ground-control bus. Fields are separated
//! by single spaces.
//!
//! ## Outbound
//!
//! `dl JOYSTICK_RAW <aircraft_id> <aileron> <elevator> <throttle>`
//!
//! ## Inbound
//!
//! `<sender> DL_SETTING <aircraft_id> <index> <value>`, matched by the regular
//! expression `(\S*) DL_SETTING (\S*) (\S*) (\S*)`.

use std::fmt;
use std::num::IntErrorKind;

use regex::Regex;

use crate::controller::mapper::NormalizedPosition;
use crate::error::Result;

/// Prefix of every outbound control message.
pub const JOYSTICK_RAW_TOPIC: &str = "dl JOYSTICK_RAW";

/// Binding for inbound setting commands.
pub const DL_SETTING_PATTERN: &str = r"(\S*) DL_SETTING (\S*) (\S*) (\S*)";

/// Joystick position addressed to one vehicle.
///
/// # Examples
///
/// ```
/// use stick_bridge::bus::message::ControlMessage;
/// use stick_bridge::controller::mapper::NormalizedPosition;
///
/// let msg = ControlMessage::new(1, NormalizedPosition::new([-127, 0, 127]));
/// assert_eq!(msg.to_string(), "dl JOYSTICK_RAW 1 -127 0 127");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlMessage {
    pub aircraft_id: u32,
    pub position: NormalizedPosition,
}

impl ControlMessage {
    #[must_use]
    pub const fn new(aircraft_id: u32, position: NormalizedPosition) -> Self {
        Self { aircraft_id, position }
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", JOYSTICK_RAW_TOPIC, self.aircraft_id, self.position)
    }
}

/// Regular-expression binding for inbound bus messages.
///
/// Matching is unanchored: the first match anywhere in the message wins and
/// every capture group becomes one field, empty when the group did not take
/// part in the match.
#[derive(Debug, Clone)]
pub struct MessagePattern {
    regex: Regex,
}

impl MessagePattern {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StickBridgeError::Pattern`] if `pattern` is not
    /// a valid regular expression.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// [`DL_SETTING_PATTERN`]
    pub fn dl_setting() -> Result<Self> {
        Self::new(DL_SETTING_PATTERN)
    }

    /// Captured fields of `line`, or `None` if it does not match.
    ///
    /// # Examples
    ///
    /// ```
    /// use stick_bridge::bus::message::MessagePattern;
    ///
    /// let pattern = MessagePattern::dl_setting()?;
    /// let captures = pattern.captures("gcs DL_SETTING 1 4 0.5").unwrap();
    /// assert_eq!(captures, vec!["gcs", "1", "4", "0.5"]);
    /// assert!(pattern.captures("dl JOYSTICK_RAW 1 0 0 0").is_none());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[must_use]
    pub fn captures<'a>(&self, line: &'a str) -> Option<Vec<&'a str>> {
        let caps = self.regex.captures(line)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|group| group.map_or("", |m| m.as_str()))
                .collect(),
        )
    }
}

impl fmt::Display for MessagePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.regex.as_str())
    }
}

/// A `DL_SETTING` command read off the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingCommand {
    pub sender: String,
    pub aircraft_id: i32,
    pub index: i32,
    pub value: f64,
}

impl SettingCommand {
    /// Builds a command from the four `DL_SETTING` captures.
    ///
    /// Never fails. Numeric fields are read from their leading numeric part
    /// (`"12abc"` is `12`, `"3.5"` as an integer is `3`, `"0.5x"` is `0.5`);
    /// a field without one, or a missing field, is `0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stick_bridge::bus::message::SettingCommand;
    ///
    /// let cmd = SettingCommand::from_captures(&["gcs", "1", "x", "0.25oops"]);
    /// assert_eq!(cmd.sender, "gcs");
    /// assert_eq!(cmd.aircraft_id, 1);
    /// assert_eq!(cmd.index, 0);
    /// assert_eq!(cmd.value, 0.25);
    /// ```
    #[must_use]
    pub fn from_captures(captures: &[&str]) -> Self {
        let field = |i: usize| captures.get(i).copied().unwrap_or_default();
        Self {
            sender: field(0).to_string(),
            aircraft_id: leading_int(field(1)),
            index: leading_int(field(2)),
            value: leading_float(field(3)),
        }
    }
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

fn sign_len(bytes: &[u8]) -> usize {
    usize::from(matches!(bytes.first(), Some(b'+' | b'-')))
}

/// Length of the leading `[+-]?[0-9]+`, 0 if there is none.
fn int_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let sign = sign_len(bytes);
    match count_digits(&bytes[sign..]) {
        0 => 0,
        digits => sign + digits,
    }
}

/// Length of the leading decimal float (sign, digits, fraction, exponent),
/// 0 if there is none.
fn float_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut end = sign_len(bytes);

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        end += 1 + frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return 0;
    }

    // Only a complete exponent counts
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let exp_start = end + 1 + sign_len(&bytes[end + 1..]);
        let exp_digits = count_digits(&bytes[exp_start..]);
        if exp_digits > 0 {
            end = exp_start + exp_digits;
        }
    }
    end
}

/// Integer value of the leading numeric part of `s`, saturating on overflow.
fn leading_int(s: &str) -> i32 {
    match s[..int_prefix_len(s)].parse::<i32>() {
        Ok(value) => value,
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => i32::MAX,
            IntErrorKind::NegOverflow => i32::MIN,
            _ => 0,
        },
    }
}

/// Float value of the leading numeric part of `s`.
fn leading_float(s: &str) -> f64 {
    if let Ok(value) = s.parse() {
        return value;
    }
    s[..float_prefix_len(s)].parse().unwrap_or_default()
}
