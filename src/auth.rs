use std::collections::HashSet;

use async_trait::async_trait;

pub const MAX_ADMIN_TOKEN_LEN: usize = 512;
pub const MIN_ADMIN_TOKEN_LEN: usize = 16;

/// Opaque credential presented by a caller claiming the admin role.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminIdentity(String);

impl AdminIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AdminIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminIdentity(..)")
    }
}

#[async_trait]
pub trait AdminAuthorizer: Send + Sync {
    async fn is_admin(&self, identity: &AdminIdentity) -> bool;
}

/// Accepts the bearer tokens listed in configuration.
pub struct StaticTokenAuthorizer {
    tokens: HashSet<String>,
}

impl StaticTokenAuthorizer {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: HashSet<String> = tokens
            .into_iter()
            .map(Into::into)
            .filter(|token: &String| !token.trim().is_empty())
            .collect();
        Self { tokens }
    }
}

#[async_trait]
impl AdminAuthorizer for StaticTokenAuthorizer {
    async fn is_admin(&self, identity: &AdminIdentity) -> bool {
        let token = identity.token();
        if token.is_empty() || token.len() > MAX_ADMIN_TOKEN_LEN {
            return false;
        }
        self.tokens.contains(token)
    }
}
