//! Linked player identities.
//!
//! An identity ties an external account id (e.g. a chat platform user) to
//! an upstream name#tag pair. Identities are created on link, may carry a
//! mutable display alias, and are never deleted automatically.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A tracked player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// External account this identity is linked to.
    pub linked_external_id: String,

    /// Upstream account name.
    pub name: String,

    /// Upstream discriminator tag.
    pub tag: String,

    /// Optional display alias, settable after linking.
    pub display_alias: Option<String>,
}

impl Identity {
    pub fn new(
        linked_external_id: impl Into<String>,
        name: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            linked_external_id: linked_external_id.into(),
            name: name.into(),
            tag: tag.into(),
            display_alias: None,
        }
    }

    /// Canonical `Name#Tag` key.
    pub fn riot_id(&self) -> String {
        format!("{}#{}", self.name, self.tag)
    }

    /// Label used in ranked views: the alias when set, else the riot id.
    pub fn label(&self) -> String {
        self.display_alias
            .clone()
            .unwrap_or_else(|| self.riot_id())
    }
}

/// Split a `Name#Tag` string into its parts.
///
/// The name may itself contain `#`; the split is on the last occurrence.
pub fn parse_riot_id(input: &str) -> Option<(String, String)> {
    let (name, tag) = input.rsplit_once('#')?;
    if name.is_empty() || tag.is_empty() {
        return None;
    }
    Some((name.to_string(), tag.to_string()))
}

/// The persisted identity map, keyed by canonical riot id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityRegistry {
    identities: BTreeMap<String, Identity>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link (or re-link) an identity. Replaces any existing link for the
    /// same riot id, preserving a previously set alias.
    pub fn link(&mut self, external_id: &str, name: &str, tag: &str) -> &Identity {
        let mut identity = Identity::new(external_id, name, tag);
        let key = identity.riot_id();
        if let Some(existing) = self.identities.get(&key) {
            identity.display_alias = existing.display_alias.clone();
        }
        self.identities.insert(key.clone(), identity);
        &self.identities[&key]
    }

    /// Set the display alias for a linked identity.
    pub fn set_alias(&mut self, riot_id: &str, alias: &str) -> bool {
        match self.identities.get_mut(riot_id) {
            Some(identity) => {
                identity.display_alias = Some(alias.to_string());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, riot_id: &str) -> Option<&Identity> {
        self.identities.get(riot_id)
    }

    /// Resolve free-form input: an exact riot id, an alias, or an external
    /// account id.
    pub fn resolve(&self, input: &str) -> Option<&Identity> {
        if let Some(identity) = self.identities.get(input) {
            return Some(identity);
        }
        self.identities.values().find(|i| {
            i.display_alias.as_deref() == Some(input) || i.linked_external_id == input
        })
    }

    /// Identities in deterministic key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Identity)> {
        self.identities.iter()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
