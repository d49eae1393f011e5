use std::collections::HashMap;
use std::sync::Arc;

use crate::foundation::error::{ReelError, ReelResult};

/// Raw font bytes registered under CSS family names.
///
/// Family lookups are ASCII case-insensitive, matching CSS.
#[derive(Clone, Debug, Default)]
pub struct FontStore {
    families: HashMap<String, Arc<Vec<u8>>>,
}

impl FontStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register font bytes for `family`, replacing any previous entry.
    pub fn register(&mut self, family: &str, bytes: Vec<u8>) -> ReelResult<()> {
        if bytes.is_empty() {
            return Err(ReelError::asset(format!("font '{family}' has no bytes")));
        }
        self.families
            .insert(family.trim().to_ascii_lowercase(), Arc::new(bytes));
        Ok(())
    }

    /// Font bytes for `family`, if registered.
    pub fn get(&self, family: &str) -> Option<Arc<Vec<u8>>> {
        self.families
            .get(&family.trim().to_ascii_lowercase())
            .cloned()
    }

    /// Number of registered families.
    pub fn len(&self) -> usize {
        self.families.len()
    }

    /// `true` when no family is registered.
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fonts.rs"]
mod tests;
