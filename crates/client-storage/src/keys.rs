//! Storage key constants.

/// Storage keys used by the client
pub struct StorageKeys;

impl StorageKeys {
    /// Raw bearer token of the current session
    pub const TOKEN: &'static str = "token";
}
