//! Bearer-token provider port.
//!
//! Adapters ask the provider for a token on every request so that refresh
//! logic living outside the core is picked up without rebuilding clients.

/// Supplies the current bearer token, if any.
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// A provider that always returns the same token.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// A provider that never authenticates.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self(None)
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}
