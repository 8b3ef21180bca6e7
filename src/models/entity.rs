//! Entity identifiers and ranked stats entries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a content item (post, page, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

/// Entity type tag as reported by the stats provider (`post`, `page`, ...).
///
/// Always stored lowercased so that comparisons against a normalized
/// allow-set are exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct EntityType(String);

impl EntityType {
    pub fn new(tag: &str) -> Self {
        Self(tag.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EntityType {
    fn from(tag: String) -> Self {
        Self::new(&tag)
    }
}

impl From<&str> for EntityType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<EntityType> for String {
    fn from(tag: EntityType) -> Self {
        tag.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of a provider's top-entities report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub views: u64,
}

impl RankedEntry {
    pub fn new(id: u64, entity_type: &str, views: u64) -> Self {
        Self {
            id: EntityId(id),
            entity_type: EntityType::new(entity_type),
            views,
        }
    }
}

/// Entity IDs ordered by descending view count, in provider order.
pub type TrendingSet = Vec<EntityId>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_is_lowercased() {
        assert_eq!(EntityType::new(" Post ").as_str(), "post");
        assert_eq!(EntityType::from("PAGE"), EntityType::new("page"));
    }

    #[test]
    fn test_ranked_entry_deserializes_type_field() {
        let entry: RankedEntry =
            serde_json::from_str(r#"{"id": 42, "type": "Post", "views": 7}"#).unwrap();
        assert_eq!(entry, RankedEntry::new(42, "post", 7));
    }

    #[test]
    fn test_entity_id_parses_trimmed() {
        assert_eq!(" 42 ".parse::<EntityId>().unwrap(), EntityId(42));
        assert!("x".parse::<EntityId>().is_err());
    }
}
