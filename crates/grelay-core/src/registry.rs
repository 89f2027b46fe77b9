//! Alias → destination registry, built once from `GROUP_MAP`.

use tracing::{error, info, warn};

use crate::domain::DestinationId;

const ENTRY_SEPARATOR: char = ',';
const FIELD_SEPARATOR: char = ':';

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Destination {
    pub alias: String,
    pub id: DestinationId,
}

/// Immutable-after-boot mapping from alias to destination.
///
/// Aliases keep the order in which they first appear. A repeated alias
/// replaces the earlier destination in place (last write wins).
#[derive(Clone, Debug, Default)]
pub struct AliasRegistry {
    entries: Vec<Destination>,
}

impl AliasRegistry {
    /// Parse `alias:id` pairs separated by commas. Malformed pairs are skipped
    /// with a warning; this never fails.
    pub fn build(map: &str) -> Self {
        let mut registry = Self::default();

        if map.trim().is_empty() {
            warn!("GROUP_MAP is empty");
            return registry;
        }

        for pair in map.split(ENTRY_SEPARATOR) {
            let Some((alias, id)) = split_pair(pair) else {
                warn!(pair = %pair.trim(), "skipping malformed GROUP_MAP entry");
                continue;
            };
            info!(alias = %alias, destination = %id, "loaded alias");
            registry.insert(Destination {
                alias: alias.to_string(),
                id: DestinationId(id.to_string()),
            });
        }

        if registry.is_empty() {
            error!("GROUP_MAP produced no aliases; check its format (alias:id,alias:id)");
        }

        registry
    }

    fn insert(&mut self, dest: Destination) {
        if let Some(existing) = self.entries.iter_mut().find(|d| d.alias == dest.alias) {
            warn!(alias = %dest.alias, "duplicate alias in GROUP_MAP; later entry wins");
            existing.id = dest.id;
            return;
        }
        self.entries.push(dest);
    }

    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, alias: &str) -> Option<&Destination> {
        self.entries.iter().find(|d| d.alias == alias)
    }

    pub fn list_aliases(&self) -> Vec<&str> {
        self.entries.iter().map(|d| d.alias.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Exactly two fields, both trimmed. Empty fields count as malformed.
fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let mut fields = pair.split(FIELD_SEPARATOR);
    let alias = fields.next()?.trim();
    let id = fields.next()?.trim();
    if fields.next().is_some() || alias.is_empty() || id.is_empty() {
        return None;
    }
    Some((alias, id))
}
