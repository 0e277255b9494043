//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod chaincode;
pub mod collections;
pub mod entities;
pub mod error;
pub mod policy;

pub use chaincode::{ApproveCcRequest, CommitCcRequest, InstantiateCcRequest};
pub use collections::{parse_collections_config, CollectionType, StaticCollectionConfig};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use policy::{MspRole, PolicyRule, Principal, SignaturePolicy};
