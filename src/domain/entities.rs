//! Domain entities: ledger configuration and file index documents
//!
//! JSON field names follow the wire format used by the ledger config chaincode
//! and the Sidetree file index endpoints, so these types serialize directly.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the ledger configuration system chaincode.
pub const CONFIG_SCC: &str = "configscc";

/// Prefix marking a config value as a reference to a file.
pub const FILE_REF_PREFIX: &str = "file://";

/// Configuration for one MSP: peer-specific apps and peer-less apps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "MspID", default)]
    pub msp_id: String,
    #[serde(rename = "Peers", default, skip_serializing_if = "Vec::is_empty")]
    pub peers: Vec<Peer>,
    #[serde(rename = "Apps", default, skip_serializing_if = "Vec::is_empty")]
    pub apps: Vec<App>,
}

/// Application configurations for a given peer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    #[serde(rename = "PeerID", default)]
    pub peer_id: String,
    #[serde(rename = "Apps", default)]
    pub apps: Vec<App>,
}

/// Configuration for an application and/or its sub-components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    #[serde(rename = "AppName", default)]
    pub app_name: String,
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "Format", default)]
    pub format: String,
    #[serde(rename = "Config", default)]
    pub config: String,
    #[serde(rename = "Tags", default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(rename = "Components", default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
}

/// Configuration for an application component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "Format", default)]
    pub format: String,
    #[serde(rename = "Config", default)]
    pub config: String,
    #[serde(rename = "Tags", default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Search criteria for configuration queries and deletes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(rename = "MspID", default, skip_serializing_if = "String::is_empty")]
    pub msp_id: String,
    #[serde(rename = "PeerID", default, skip_serializing_if = "String::is_empty")]
    pub peer_id: String,
    #[serde(rename = "AppName", default, skip_serializing_if = "String::is_empty")]
    pub app_name: String,
    #[serde(rename = "AppVersion", default, skip_serializing_if = "String::is_empty")]
    pub app_version: String,
    #[serde(rename = "ComponentName", default, skip_serializing_if = "String::is_empty")]
    pub component_name: String,
    #[serde(
        rename = "ComponentVersion",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub component_version: String,
}

/// Unique key of a stored application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    #[serde(rename = "MspID", default)]
    pub msp_id: String,
    #[serde(rename = "PeerID", default, skip_serializing_if = "String::is_empty")]
    pub peer_id: String,
    #[serde(rename = "AppName", default)]
    pub app_name: String,
    #[serde(rename = "AppVersion", default)]
    pub app_version: String,
    #[serde(rename = "ComponentName", default, skip_serializing_if = "String::is_empty")]
    pub component_name: String,
    #[serde(
        rename = "ComponentVersion",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub component_version: String,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(MSP:{}),(Peer:{}),(AppName:{}),(AppVersion:{}),(Comp:{}),(CompVersion:{})",
            self.msp_id,
            self.peer_id,
            self.app_name,
            self.app_version,
            self.component_name,
            self.component_version
        )
    }
}

/// Stored configuration data for a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    #[serde(rename = "TxID", default)]
    pub tx_id: String,
    #[serde(rename = "Format", default)]
    pub format: String,
    #[serde(rename = "Config", default)]
    pub config: String,
    #[serde(rename = "Tags", default)]
    pub tags: Vec<String>,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(TxID:{}),(Config:{}),(Format:{}),(Tags:{:?})",
            self.tx_id, self.config, self.format, self.tags
        )
    }
}

/// A query result entry: key and value flattened into one JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    #[serde(flatten)]
    pub key: Key,
    #[serde(flatten)]
    pub value: Value,
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]=[{}]", self.key, self.value)
    }
}

// ============================================================
// File handler / file index
// ============================================================

/// App name under which peers store file handler configuration.
pub const FILE_HANDLER_APP_NAME: &str = "file-handler";
pub const FILE_HANDLER_APP_VERSION: &str = "1";
pub const FILE_HANDLER_COMPONENT_VERSION: &str = "1";

/// Token names authorizing reads/writes on a file handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "ReadTokens", default)]
    pub read_tokens: Vec<String>,
    #[serde(rename = "WriteTokens", default)]
    pub write_tokens: Vec<String>,
}

/// Per-peer configuration of a file handler endpoint.
///
/// Unrecognized fields are carried in `extra` so that a read-modify-write
/// cycle does not drop them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandlerConfig {
    #[serde(rename = "Authorization", default)]
    pub authorization: AuthConfig,
    #[serde(rename = "BasePath", default)]
    pub base_path: String,
    #[serde(rename = "ChaincodeName", default)]
    pub chaincode_name: String,
    #[serde(rename = "Collection", default)]
    pub collection: String,
    #[serde(rename = "IndexNamespace", default)]
    pub index_namespace: String,
    #[serde(rename = "IndexDocID", default)]
    pub index_doc_id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Sidetree document holding a file index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIndexDoc {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "didUniqueSuffix", default)]
    pub unique_suffix: String,
    #[serde(rename = "fileIndex", default)]
    pub file_index: FileIndex,
}

/// Mapping of file name to content ID under a base path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIndex {
    #[serde(rename = "basePath", default)]
    pub base_path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mappings: BTreeMap<String, String>,
}

impl FileIndexDoc {
    /// A fresh index for `base_path` with the single entry `"." -> base_path`.
    pub fn new_for_path(base_path: &str) -> Self {
        let mut mappings = BTreeMap::new();
        mappings.insert(".".to_string(), base_path.to_string());
        Self {
            file_index: FileIndex {
                base_path: base_path.to_string(),
                mappings,
            },
            ..Default::default()
        }
    }
}

/// DID resolution envelope; some endpoints wrap the document in it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DidResolution {
    #[serde(rename = "didDocument", default)]
    pub did_document: Option<serde_json::Value>,
}

/// One uploaded (or to-be-uploaded) file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    #[serde(rename = "Name", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "ID", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "ContentType", skip_serializing_if = "String::is_empty")]
    pub content_type: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// One RFC 6902 operation on a file index mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonPatchOp {
    pub op: String,
    pub path: String,
    pub value: String,
}
