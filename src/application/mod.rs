//! Application layer: services and use cases
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod confirm;
pub mod criteria;
pub mod error;
pub mod error_ext;
pub mod preprocess;
pub mod services;
pub mod sidetree;

pub use confirm::{MSG_ABORTED, MSG_CONTINUE_OR_ABORT};
pub use criteria::CriteriaArgs;
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
