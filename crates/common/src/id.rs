//! ID generation utilities.

use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generator for the short uppercase-alphanumeric identifiers used on the
/// wire.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a 4-character endpoint identifier.
    ///
    /// The id space is small (~1.7M values) and the mint may return
    /// duplicates; callers retry on collision.
    #[must_use]
    pub fn endpoint_id(&self) -> String {
        self.alphanumeric(4)
    }

    /// Generate a 6-character identifier for groups and notifications.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.alphanumeric(6)
    }

    fn alphanumeric(&self, len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }
}
