//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, Terminal, HttpClient,
//! ClientFactory) but are themselves concrete structs, not traits.

mod chaincode;
mod file_index;
mod ledger_config;

pub use chaincode::{
    ApproveOptions, ChaincodeService, CommitOptions, InstantiateOptions, LifecycleOptions,
    MSG_CC_APPROVED, MSG_CC_COMMITTED, MSG_CC_INSTANTIATED,
};
pub use file_index::{CreateIndexOptions, FileIndexService, UploadOptions, UploadTarget};
pub use ledger_config::{
    FileIndexUpdateOptions, LedgerConfigService, UpdateOptions, MSG_CONFIG_DELETED,
    MSG_CONFIG_UPDATED, MSG_FILE_INDEX_UPDATED, MSG_NO_CONFIG,
};
