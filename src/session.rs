// explicit rider/manager session, passed by reference to whoever calls the api

use crate::models::TokenPair;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    access: String,
    refresh: Option<String>,
    refreshed: bool,
}

impl Session {
    pub fn new(access: impl Into<String>, refresh: Option<String>) -> Self {
        Self {
            access: access.into(),
            refresh,
            refreshed: false,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh.as_deref()
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh.is_some()
    }

    /// Swap in an access token obtained from a refresh.
    pub fn replace_access(&mut self, access: String) {
        self.access = access;
        self.refreshed = true;
    }

    // true once replace_access has run, so callers can hand the new token back
    pub fn was_refreshed(&self) -> bool {
        self.refreshed
    }
}

impl From<TokenPair> for Session {
    fn from(tokens: TokenPair) -> Self {
        Self::new(tokens.access, Some(tokens.refresh))
    }
}
