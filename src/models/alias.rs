//! Write-once alias → instrument id mapping (§3, I5).

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AliasError {
    #[error("alias '{0}' already registered")]
    AlreadyExists(String),
    #[error("alias '{0}' does not resolve to any instrument")]
    Unknown(String),
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AliasTable {
    aliases: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `alias -> instrument_id`. Errors if `alias` was already bound
    /// to anything (write-once, I5).
    pub fn register(&mut self, alias: impl Into<String>, instrument_id: impl Into<String>) -> Result<(), AliasError> {
        let alias = alias.into();
        if self.aliases.contains_key(&alias) {
            return Err(AliasError::AlreadyExists(alias));
        }
        self.aliases.insert(alias, instrument_id.into());
        Ok(())
    }

    pub fn resolve(&self, alias: &str) -> Result<&str, AliasError> {
        self.aliases
            .get(alias)
            .map(|s| s.as_str())
            .ok_or_else(|| AliasError::Unknown(alias.to_string()))
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }

    /// Re-point an existing alias at a new instrument id. Used only by
    /// rollover (§4.4), which reissues a fresh payable in place of one that
    /// just settled and keeps the scenario's alias referring to "the current
    /// instance of this obligation" rather than the now-extinguished one.
    /// This is the one place aliasing is not write-once (I5 governs
    /// first-time registration, not this succession).
    pub fn rebind(&mut self, alias: impl Into<String>, instrument_id: impl Into<String>) {
        self.aliases.insert(alias.into(), instrument_id.into());
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.aliases.clone()
    }

    pub fn restore(&mut self, snapshot: BTreeMap<String, String>) {
        self.aliases = snapshot;
    }
}
