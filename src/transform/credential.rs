// src/transform/credential.rs

//! Credential providers.
//!
//! Workers ask for the credential right before each attempt, so a key that is
//! set (or fixed) while a task is backing off is picked up by its next retry.

use std::sync::{Arc, RwLock};

pub trait CredentialProvider: Send + Sync {
    /// The current credential, or `None` if none is configured.
    fn credential(&self) -> Option<String>;
}

/// Reads the credential from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl CredentialProvider for EnvCredential {
    fn credential(&self) -> Option<String> {
        std::env::var(&self.var).ok().and_then(non_blank)
    }
}

/// A credential held in memory. Clones share the same value.
#[derive(Debug, Clone, Default)]
pub struct StaticCredential {
    value: Arc<RwLock<Option<String>>>,
}

impl StaticCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Arc::new(RwLock::new(Some(value.into()))),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set(&self, value: Option<String>) {
        let mut guard = match self.value.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = value;
    }
}

impl CredentialProvider for StaticCredential {
    fn credential(&self) -> Option<String> {
        let guard = match self.value.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone().and_then(non_blank)
    }
}

fn non_blank(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_static_credential_counts_as_missing() {
        let cred = StaticCredential::new("   ");
        assert_eq!(cred.credential(), None);
    }

    #[test]
    fn static_credential_can_be_set_later() {
        let cred = StaticCredential::empty();
        let shared = cred.clone();
        assert_eq!(cred.credential(), None);
        shared.set(Some("key-123".into()));
        assert_eq!(cred.credential().as_deref(), Some("key-123"));
    }

    #[test]
    fn unset_env_var_is_missing() {
        let cred = EnvCredential::new("IMGBATCH_TEST_SURELY_UNSET_VAR");
        assert_eq!(cred.credential(), None);
    }
}
