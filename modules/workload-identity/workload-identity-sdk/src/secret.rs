//! Caller credential type.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// API key a platform user presents with every request.
///
/// The coordinator never inspects the key. It forwards it once per request
/// to the authorization service and drops it afterwards, at which point the
/// buffer is wiped. Formatting prints `[REDACTED]`, which keeps the key out
/// of `#[instrument]` spans and error messages that capture request
/// arguments.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw key, for the outbound authorization request only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// An empty key is rejected before any remote call is made.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<&str> for ApiKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
