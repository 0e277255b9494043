//! Chaincode lifecycle service
//!
//! Instantiate (legacy lifecycle), approve and commit chaincode with custom
//! collection types and the signature policy DSL.

use std::sync::Arc;

use tracing::debug;

use crate::application::confirm::print_line;
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::chaincode::{chaincode_policy, parse_sequence};
use crate::domain::{
    parse_collections_config, ApproveCcRequest, CommitCcRequest, DomainError, DomainResult,
    InstantiateCcRequest,
};
use crate::infrastructure::traits::{ClientFactory, Terminal};

pub const MSG_CC_INSTANTIATED: &str = "Successfully instantiated chaincode";
pub const MSG_CC_APPROVED: &str = "Successfully approved chaincode";
pub const MSG_CC_COMMITTED: &str = "Successfully committed chaincode";

fn require(value: &str, message: &str) -> DomainResult<()> {
    if value.is_empty() {
        return Err(DomainError::validation(message));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstantiateOptions {
    pub name: String,
    pub version: String,
    pub policy: String,
    pub collections_config: String,
}

impl InstantiateOptions {
    pub fn validate(&self) -> DomainResult<()> {
        require(&self.name, "chaincode name not specified")?;
        require(&self.version, "chaincode version not specified")
    }
}

/// Options shared by approve and commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleOptions {
    pub name: String,
    pub version: String,
    pub sequence: String,
    pub policy: String,
    pub channel_config_policy: String,
    pub collections_config: String,
    pub init_required: bool,
    pub endorsement_plugin: String,
    pub validation_plugin: String,
}

impl LifecycleOptions {
    fn validate_name_and_version(&self) -> DomainResult<()> {
        require(&self.name, "chaincode name not specified")?;
        require(&self.version, "chaincode version not specified")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApproveOptions {
    pub package_id: String,
    pub lifecycle: LifecycleOptions,
}

impl ApproveOptions {
    pub fn validate(&self) -> DomainResult<()> {
        self.lifecycle.validate_name_and_version()?;
        require(&self.package_id, "package ID not specified")?;
        parse_sequence(&self.lifecycle.sequence).map(|_| ())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOptions {
    /// Target peers; the context peers when empty
    pub peers: Vec<String>,
    pub lifecycle: LifecycleOptions,
}

impl CommitOptions {
    pub fn validate(&self) -> DomainResult<()> {
        self.lifecycle.validate_name_and_version()?;
        parse_sequence(&self.lifecycle.sequence).map(|_| ())
    }
}

/// Service for the `extensions` commands.
pub struct ChaincodeService {
    settings: Arc<Settings>,
    factory: Arc<dyn ClientFactory>,
    term: Arc<dyn Terminal>,
}

impl ChaincodeService {
    pub fn new(
        settings: Arc<Settings>,
        factory: Arc<dyn ClientFactory>,
        term: Arc<dyn Terminal>,
    ) -> Self {
        Self {
            settings,
            factory,
            term,
        }
    }

    pub fn instantiate(&self, opts: &InstantiateOptions) -> ApplicationResult<()> {
        opts.validate()?;
        let context = self.settings.current_context()?;

        let request = InstantiateCcRequest {
            name: opts.name.clone(),
            version: opts.version.clone(),
            policy: chaincode_policy(&opts.policy)?,
            collection_config: parse_collections_config(&opts.collections_config)?,
        };
        debug!(
            "instantiating chaincode {}:{} on channel {}",
            request.name, request.version, context.channel
        );

        self.factory
            .resource_management()?
            .instantiate_cc(&context.channel, &request, &context.peers)?;
        print_line(self.term.as_ref(), MSG_CC_INSTANTIATED)
    }

    pub fn approve(&self, opts: &ApproveOptions) -> ApplicationResult<()> {
        opts.validate()?;
        let context = self.settings.current_context()?;
        let lc = &opts.lifecycle;

        let request = ApproveCcRequest {
            name: lc.name.clone(),
            version: lc.version.clone(),
            package_id: opts.package_id.clone(),
            sequence: parse_sequence(&lc.sequence)?,
            signature_policy: chaincode_policy(&lc.policy)?,
            channel_config_policy: lc.channel_config_policy.clone(),
            collection_config: parse_collections_config(&lc.collections_config)?,
            init_required: lc.init_required,
            endorsement_plugin: lc.endorsement_plugin.clone(),
            validation_plugin: lc.validation_plugin.clone(),
        };
        debug!(
            "approving chaincode {}:{} sequence {}",
            request.name, request.version, request.sequence
        );

        self.factory
            .resource_management()?
            .approve_cc(&context.channel, &request, &context.peers)?;
        print_line(self.term.as_ref(), MSG_CC_APPROVED)
    }

    pub fn commit(&self, opts: &CommitOptions) -> ApplicationResult<()> {
        opts.validate()?;
        let context = self.settings.current_context()?;
        let lc = &opts.lifecycle;

        let request = CommitCcRequest {
            name: lc.name.clone(),
            version: lc.version.clone(),
            sequence: parse_sequence(&lc.sequence)?,
            signature_policy: chaincode_policy(&lc.policy)?,
            channel_config_policy: lc.channel_config_policy.clone(),
            collection_config: parse_collections_config(&lc.collections_config)?,
            init_required: lc.init_required,
            endorsement_plugin: lc.endorsement_plugin.clone(),
            validation_plugin: lc.validation_plugin.clone(),
        };

        let targets = if opts.peers.is_empty() {
            &context.peers
        } else {
            &opts.peers
        };
        debug!(
            "committing chaincode {}:{} to {} peer(s)",
            request.name,
            request.version,
            targets.len()
        );

        self.factory
            .resource_management()?
            .commit_cc(&context.channel, &request, targets)?;
        print_line(self.term.as_ref(), MSG_CC_COMMITTED)
    }
}
