//! ID generation utilities.

use rand::Rng;
use ulid::Ulid;
use uuid::Uuid;

/// Alphabet for jar invite codes. Excludes 0/O and 1/I to keep codes
/// readable when shared out loud.
const REFERENCE_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a jar invite code.
const REFERENCE_CODE_LEN: usize = 8;

/// ID generator for entities.
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

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs are:
    /// - Lexicographically sortable
    /// - Monotonically increasing within the same millisecond
    /// - Shorter than UUIDs when represented as strings
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate a cryptographically random access token.
    #[must_use]
    pub fn generate_token(&self) -> String {
        // Use UUID v4 for tokens (no time component for security)
        Uuid::new_v4().simple().to_string()
    }

    /// Generate a jar invite code.
    #[must_use]
    pub fn generate_reference_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..REFERENCE_CODE_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..REFERENCE_CODE_ALPHABET.len());
                REFERENCE_CODE_ALPHABET[idx] as char
            })
            .collect()
    }
}
