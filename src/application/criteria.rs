//! Lookup criteria for ledger configuration queries and deletes

use crate::application::error_ext::JsonResultExt;
use crate::application::ApplicationResult;
use crate::domain::{Criteria, DomainError, DomainResult};

/// Criteria given either as raw JSON or as individual fields.
///
/// Empty strings mean "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriteriaArgs {
    pub criteria: String,
    pub msp_id: String,
    pub peer_id: String,
    pub app_name: String,
    pub app_version: String,
    pub component_name: String,
    pub component_version: String,
}

impl CriteriaArgs {
    fn has_fields(&self) -> bool {
        [
            &self.msp_id,
            &self.peer_id,
            &self.app_name,
            &self.app_version,
            &self.component_name,
            &self.component_version,
        ]
        .iter()
        .any(|f| !f.is_empty())
    }

    /// Check that exactly one of the two modes is used.
    pub fn validate(&self) -> DomainResult<()> {
        if !self.criteria.is_empty() {
            if self.has_fields() {
                return Err(DomainError::validation(
                    "other options cannot be used along with --criteria",
                ));
            }
            serde_json::from_str::<Criteria>(&self.criteria)
                .map_err(|e| DomainError::InvalidCriteria(e.to_string()))?;
        } else if self.msp_id.is_empty() {
            return Err(DomainError::validation(
                "either --criteria or (at least) --mspid must be specified",
            ));
        }
        Ok(())
    }

    /// Bytes sent as the chaincode argument. Raw criteria pass through unchanged.
    pub fn to_bytes(&self) -> ApplicationResult<Vec<u8>> {
        if !self.criteria.is_empty() {
            return Ok(self.criteria.as_bytes().to_vec());
        }
        let criteria = Criteria {
            msp_id: self.msp_id.clone(),
            peer_id: self.peer_id.clone(),
            app_name: self.app_name.clone(),
            app_version: self.app_version.clone(),
            component_name: self.component_name.clone(),
            component_version: self.component_version.clone(),
        };
        serde_json::to_vec(&criteria).json_context("encode criteria")
    }
}
