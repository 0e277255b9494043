//! Private data collection configuration
//!
//! Parses the `--collections-config` JSON array into typed static collection
//! configs, including the custom collection types (transient, off-ledger, DCAS).

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::policy::SignaturePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionType {
    ColUnknown,
    ColPrivate,
    ColTransient,
    ColOffledger,
    ColDcas,
}

impl CollectionType {
    /// Maps a type name to its variant; unrecognized names map to `ColUnknown`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "COL_PRIVATE" => Self::ColPrivate,
            "COL_TRANSIENT" => Self::ColTransient,
            "COL_OFFLEDGER" => Self::ColOffledger,
            "COL_DCAS" => Self::ColDcas,
            "COL_UNKNOWN" | "" => Self::ColUnknown,
            other => {
                warn!("unrecognized collection type [{}], using COL_UNKNOWN", other);
                Self::ColUnknown
            }
        }
    }
}

/// Collection entry as supplied on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionConfigJson {
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    collection_type: String,
    #[serde(default)]
    policy: String,
    #[serde(default)]
    required_peer_count: i32,
    #[serde(default)]
    max_peer_count: i32,
    #[serde(default)]
    block_to_live: u64,
    #[serde(default)]
    time_to_live: String,
    #[serde(default)]
    member_only_read: bool,
    #[serde(default)]
    member_only_write: bool,
}

/// A static collection config ready to be sent with a lifecycle request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticCollectionConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub collection_type: CollectionType,
    pub member_orgs_policy: SignaturePolicy,
    pub required_peer_count: i32,
    pub maximum_peer_count: i32,
    pub block_to_live: u64,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub time_to_live: String,
    pub member_only_read: bool,
    pub member_only_write: bool,
}

/// Parses the collections config JSON. An empty string yields no collections.
pub fn parse_collections_config(raw: &str) -> DomainResult<Vec<StaticCollectionConfig>> {
    if raw.is_empty() {
        return Ok(vec![]);
    }

    let entries: Vec<CollectionConfigJson> = serde_json::from_str(raw)
        .map_err(|e| DomainError::InvalidCollectionsConfig(e.to_string()))?;

    entries
        .into_iter()
        .map(|entry| {
            Ok(StaticCollectionConfig {
                member_orgs_policy: SignaturePolicy::parse(&entry.policy)?,
                collection_type: CollectionType::from_name(&entry.collection_type),
                name: entry.name,
                required_peer_count: entry.required_peer_count,
                maximum_peer_count: entry.max_peer_count,
                block_to_live: entry.block_to_live,
                time_to_live: entry.time_to_live,
                member_only_read: entry.member_only_read,
                member_only_write: entry.member_only_write,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collections() {
        let raw = r#"[{"name":"coll1","type":"COL_DCAS","policy":"OR('Org1MSP.member','Org2MSP.member')","maxPeerCount":2,"requiredPeerCount":1,"timeToLive":"10m"},{"name":"coll2","type":"COL_OFFLEDGER","policy":"OR('IMPLICIT-ORG.member')"}]"#;
        let colls = parse_collections_config(raw).unwrap();
        assert_eq!(colls.len(), 2);
        assert_eq!(colls[0].collection_type, CollectionType::ColDcas);
        assert_eq!(colls[0].maximum_peer_count, 2);
        assert_eq!(colls[0].required_peer_count, 1);
        assert_eq!(colls[0].time_to_live, "10m");
        assert_eq!(colls[0].member_orgs_policy.identities.len(), 2);
        assert_eq!(colls[1].collection_type, CollectionType::ColOffledger);
        assert_eq!(colls[1].member_orgs_policy.identities[0].msp_id, "IMPLICIT-ORG");
    }

    #[test]
    fn test_empty_config_yields_no_collections() {
        assert!(parse_collections_config("").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json() {
        let err = parse_collections_config("[{").unwrap_err();
        assert!(err.to_string().starts_with("invalid collections config"));
    }

    #[test]
    fn test_invalid_collection_policy() {
        let err = parse_collections_config(r#"[{"name":"c","type":"COL_PRIVATE","policy":"BAD"}]"#)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidPolicy { .. }));
    }

    #[test]
    fn test_unknown_type_maps_to_unknown() {
        assert_eq!(CollectionType::from_name("COL_FOO"), CollectionType::ColUnknown);
        assert_eq!(
            serde_json::to_value(CollectionType::ColOffledger).unwrap(),
            "COL_OFFLEDGER"
        );
    }
}
