//! Chaincode lifecycle requests

use serde::{Deserialize, Serialize};

use crate::domain::collections::StaticCollectionConfig;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::policy::SignaturePolicy;

/// Legacy (pre-2.0) instantiate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantiateCcRequest {
    pub name: String,
    pub version: String,
    pub policy: SignaturePolicy,
    pub collection_config: Vec<StaticCollectionConfig>,
}

/// Lifecycle approve-for-my-org request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveCcRequest {
    pub name: String,
    pub version: String,
    pub package_id: String,
    pub sequence: i64,
    pub signature_policy: SignaturePolicy,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub channel_config_policy: String,
    pub collection_config: Vec<StaticCollectionConfig>,
    pub init_required: bool,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub endorsement_plugin: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub validation_plugin: String,
}

/// Lifecycle commit request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitCcRequest {
    pub name: String,
    pub version: String,
    pub sequence: i64,
    pub signature_policy: SignaturePolicy,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub channel_config_policy: String,
    pub collection_config: Vec<StaticCollectionConfig>,
    pub init_required: bool,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub endorsement_plugin: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub validation_plugin: String,
}

/// Parses a chaincode endorsement policy; empty means accept-all.
pub fn chaincode_policy(policy: &str) -> DomainResult<SignaturePolicy> {
    if policy.is_empty() {
        return Ok(SignaturePolicy::accept_all());
    }
    SignaturePolicy::parse(policy)
        .map_err(|_| DomainError::validation("error parsing chaincode policy"))
}

/// Parses and checks a lifecycle sequence number.
pub fn parse_sequence(sequence: &str) -> DomainResult<i64> {
    if sequence.is_empty() {
        return Err(DomainError::validation("sequence not specified"));
    }
    let value = sequence
        .parse::<i64>()
        .map_err(|e| DomainError::validation(format!("invalid sequence: {e}")))?;
    if value <= 0 {
        return Err(DomainError::validation("sequence must be greater than 0"));
    }
    Ok(value)
}
