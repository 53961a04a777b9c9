//! # Capability Bitsets
//!
//! Fixed-size bit sets mirroring the kernel's `EVIOCGBIT` capability bitmaps.
//!
//! Bit `code` lives in word `code / 64` at position `code % 64`.
//!
//! ```
//! use stick_bridge::controller::capabilities::CapabilitySet;
//!
//! let axes: CapabilitySet = [0u16, 1, 2, 5].into_iter().collect();
//! assert!(axes.supports(5));
//! assert!(!axes.supports(3));
//! ```

/// Highest event code any capability bitmap can hold (`KEY_MAX`).
pub const CODE_MAX: u16 = 0x2ff;

const WORD_BITS: usize = 64;
const WORDS: usize = (CODE_MAX as usize + 1).div_ceil(WORD_BITS);

/// Set of event codes a device supports for one event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySet {
    words: [u64; WORDS],
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilitySet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Marks `code` as supported. Codes above [`CODE_MAX`] are ignored.
    pub fn insert(&mut self, code: u16) {
        if code <= CODE_MAX {
            let code = usize::from(code);
            self.words[code / WORD_BITS] |= 1 << (code % WORD_BITS);
        }
    }

    /// Returns true if the device reports `code`.
    #[must_use]
    pub fn supports(&self, code: u16) -> bool {
        if code > CODE_MAX {
            return false;
        }
        let code = usize::from(code);
        (self.words[code / WORD_BITS] >> (code % WORD_BITS)) & 1 != 0
    }

    /// Number of supported codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Iterates supported codes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        (0..=CODE_MAX).filter(|&code| self.supports(code))
    }
}

impl FromIterator<u16> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        let mut set = Self::new();
        for code in iter {
            set.insert(code);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set() {
        let set = CapabilitySet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert!(!set.supports(0));
    }

    #[test]
    fn test_insert_and_supports() {
        let mut set = CapabilitySet::new();
        set.insert(2);
        set.insert(64);
        set.insert(CODE_MAX);

        assert!(set.supports(2));
        assert!(set.supports(64));
        assert!(set.supports(CODE_MAX));
        assert!(!set.supports(3));
        assert!(!set.supports(63));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_out_of_range_codes_ignored() {
        let mut set = CapabilitySet::new();
        set.insert(CODE_MAX + 1);
        assert!(set.is_empty());
        assert!(!set.supports(u16::MAX));
    }

    #[test]
    fn test_insert_crosses_word_boundary() {
        let set: CapabilitySet = [63u16, 64].into_iter().collect();
        assert_eq!(set.words[0], 1 << 63);
        assert_eq!(set.words[1], 1);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![63, 64]);
    }

    #[test]
    fn test_from_iterator() {
        let set: CapabilitySet = vec![5u16, 0, 5].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 5]);
    }
}
