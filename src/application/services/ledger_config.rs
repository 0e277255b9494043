//! Ledger configuration service
//!
//! Query, update and delete configuration stored by the ledger config system
//! chaincode, and point file handlers at a new file index document.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::application::confirm::{confirm, format_json, print_line};
use crate::application::criteria::CriteriaArgs;
use crate::application::error_ext::JsonResultExt;
use crate::application::preprocess::ConfigPreProcessor;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{
    App, Component, Config, Criteria, DomainError, DomainResult, FileHandlerConfig, KeyValue,
    Peer, CONFIG_SCC, FILE_HANDLER_APP_NAME, FILE_HANDLER_APP_VERSION,
    FILE_HANDLER_COMPONENT_VERSION,
};
use crate::infrastructure::traits::{ChannelRequest, ClientFactory, FileSystem, Terminal};

pub const MSG_CONFIG_UPDATED: &str = "Configuration successfully updated!";
pub const MSG_CONFIG_DELETED: &str = "Configuration successfully deleted!";
pub const MSG_NO_CONFIG: &str = "No configuration matches the given criteria";
pub const MSG_FILE_INDEX_UPDATED: &str = "File index successfully updated!";

/// Arguments of `ledgerconfig update`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Inline JSON config
    pub config: String,
    /// Path of a JSON config file
    pub config_file: String,
    pub no_prompt: bool,
}

impl UpdateOptions {
    pub fn validate(&self, fs: &dyn FileSystem) -> DomainResult<()> {
        if self.config.is_empty() == self.config_file.is_empty() {
            return Err(DomainError::validation(
                "one of --config or --configfile must be specified",
            ));
        }
        if !self.config.is_empty() {
            serde_json::from_str::<Config>(&self.config)
                .map_err(|e| DomainError::InvalidConfig(e.to_string()))?;
            return Ok(());
        }
        if !fs.exists(Path::new(&self.config_file)) {
            return Err(DomainError::validation(format!(
                "file not found: [{}]",
                self.config_file
            )));
        }
        Ok(())
    }
}

/// Arguments of `ledgerconfig fileidxupdate`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileIndexUpdateOptions {
    pub msp_id: String,
    /// Semicolon-separated peer IDs
    pub peers: String,
    pub base_path: String,
    pub file_index_id: String,
    pub no_prompt: bool,
}

impl FileIndexUpdateOptions {
    pub fn validate(&self) -> DomainResult<()> {
        if self.msp_id.is_empty() {
            return Err(DomainError::validation("msp (--msp) is required"));
        }
        if self.peer_ids().is_empty() {
            return Err(DomainError::validation("peers (--peers) is required"));
        }
        if self.base_path.is_empty() {
            return Err(DomainError::validation("base path (--path) is required"));
        }
        if self.file_index_id.is_empty() {
            return Err(DomainError::validation("file index ID (--idxid) is required"));
        }
        Ok(())
    }

    /// Distinct peer IDs in the order first given.
    pub fn peer_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for id in self.peers.split(';').map(str::trim) {
            if !id.is_empty() && !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

/// Service for the `ledgerconfig` commands.
pub struct LedgerConfigService {
    settings: Arc<Settings>,
    factory: Arc<dyn ClientFactory>,
    fs: Arc<dyn FileSystem>,
    term: Arc<dyn Terminal>,
}

impl LedgerConfigService {
    pub fn new(
        settings: Arc<Settings>,
        factory: Arc<dyn ClientFactory>,
        fs: Arc<dyn FileSystem>,
        term: Arc<dyn Terminal>,
    ) -> Self {
        Self {
            settings,
            factory,
            fs,
            term,
        }
    }

    fn get_request(criteria: Vec<u8>) -> ChannelRequest {
        ChannelRequest::new(CONFIG_SCC, "get", vec![criteria])
    }

    /// Query configuration and print the raw result.
    pub fn query(&self, args: &CriteriaArgs) -> ApplicationResult<()> {
        args.validate()?;
        let criteria = args.to_bytes()?;
        let peers = &self.settings.current_context()?.peers;

        let channel = self.factory.channel()?;
        let resp = channel.query(&Self::get_request(criteria), peers)?;
        debug!("query returned {} bytes", resp.payload.len());

        print_line(self.term.as_ref(), &String::from_utf8_lossy(&resp.payload))
    }

    /// Save a configuration document, substituting `file://` references first.
    pub fn update(&self, opts: &UpdateOptions) -> ApplicationResult<()> {
        opts.validate(self.fs.as_ref())?;

        let (raw, config_file) = if opts.config.is_empty() {
            let path = Path::new(&opts.config_file);
            let bytes = self
                .fs
                .read(path)
                .with_path_context("read config file", path)?;
            (bytes, Some(path))
        } else {
            (opts.config.as_bytes().to_vec(), None)
        };

        let config: Config = serde_json::from_slice(&raw)
            .map_err(|e| DomainError::InvalidConfig(e.to_string()))?;
        let config = ConfigPreProcessor::new(self.fs.as_ref(), config_file).process(config)?;
        let config_bytes = serde_json::to_vec(&config).json_context("encode config")?;

        if !opts.no_prompt {
            let message = format!(
                "Updating the configuration with:\n\n{}\n\n",
                format_json(&config_bytes)?
            );
            if !confirm(self.term.as_ref(), &message)? {
                return Ok(());
            }
        }

        self.save(config_bytes)?;
        print_line(self.term.as_ref(), MSG_CONFIG_UPDATED)
    }

    /// Delete configuration matching the criteria.
    ///
    /// When prompting, the matching configuration is shown first; nothing
    /// matching ends the command without a delete.
    pub fn delete(&self, args: &CriteriaArgs, no_prompt: bool) -> ApplicationResult<()> {
        args.validate()?;
        let criteria = args.to_bytes()?;

        if !no_prompt {
            let existing = self
                .factory
                .channel()?
                .query(&Self::get_request(criteria.clone()), &[])?;
            if is_empty_result(&existing.payload) {
                return print_line(self.term.as_ref(), MSG_NO_CONFIG);
            }
            let message = format!(
                "The following configuration will be deleted:\n\n{}\n\n",
                format_json(&existing.payload)?
            );
            if !confirm(self.term.as_ref(), &message)? {
                return Ok(());
            }
        }

        let request = ChannelRequest::new(CONFIG_SCC, "delete", vec![criteria]);
        let resp = self.factory.channel()?.execute(&request)?;
        info!("configuration deleted in transaction [{}]", resp.tx_id);
        print_line(self.term.as_ref(), MSG_CONFIG_DELETED)
    }

    /// Point the file handler at `base_path` on each peer to a new index document.
    pub fn update_file_index(&self, opts: &FileIndexUpdateOptions) -> ApplicationResult<()> {
        opts.validate()?;

        let mut peers = Vec::new();
        for peer_id in opts.peer_ids() {
            let mut handler = self.load_handler_config(opts, peer_id)?;

            if !opts.file_index_id.starts_with(&handler.index_namespace) {
                return Err(DomainError::validation(format!(
                    "file index ID must begin with [{}]",
                    handler.index_namespace
                ))
                .into());
            }
            if handler.index_doc_id == opts.file_index_id {
                debug!("file index already set for peer [{}], skipping", peer_id);
                continue;
            }

            handler.index_doc_id = opts.file_index_id.clone();
            peers.push(Peer {
                peer_id: peer_id.to_string(),
                apps: vec![App {
                    app_name: FILE_HANDLER_APP_NAME.to_string(),
                    version: FILE_HANDLER_APP_VERSION.to_string(),
                    components: vec![Component {
                        name: opts.base_path.clone(),
                        version: FILE_HANDLER_COMPONENT_VERSION.to_string(),
                        format: "JSON".to_string(),
                        config: serde_json::to_string(&handler)
                            .json_context("encode file handler config")?,
                        tags: vec![],
                    }],
                    ..Default::default()
                }],
            });
        }

        if peers.is_empty() {
            return Err(ApplicationError::precondition(format!(
                "the file index ID for [{}] is already set to [{}]",
                opts.base_path, opts.file_index_id
            )));
        }

        let config = Config {
            msp_id: opts.msp_id.clone(),
            peers,
            apps: vec![],
        };
        let config_bytes = serde_json::to_vec(&config).json_context("encode config")?;

        if !opts.no_prompt {
            let message = format!(
                "Updating the configuration with:\n\n{}\n\n",
                format_json(&config_bytes)?
            );
            if !confirm(self.term.as_ref(), &message)? {
                return Ok(());
            }
        }

        self.save(config_bytes)?;
        print_line(self.term.as_ref(), MSG_FILE_INDEX_UPDATED)
    }

    fn load_handler_config(
        &self,
        opts: &FileIndexUpdateOptions,
        peer_id: &str,
    ) -> ApplicationResult<FileHandlerConfig> {
        let criteria = Criteria {
            msp_id: opts.msp_id.clone(),
            peer_id: peer_id.to_string(),
            app_name: FILE_HANDLER_APP_NAME.to_string(),
            app_version: FILE_HANDLER_APP_VERSION.to_string(),
            component_name: opts.base_path.clone(),
            component_version: FILE_HANDLER_COMPONENT_VERSION.to_string(),
        };
        let criteria = serde_json::to_vec(&criteria).json_context("encode criteria")?;

        let resp = self
            .factory
            .channel()?
            .query(&Self::get_request(criteria), &[])?;
        let results: Option<Vec<KeyValue>> =
            serde_json::from_slice(&resp.payload).json_context("decode query result")?;

        let Some(first) = results.unwrap_or_default().into_iter().next() else {
            return Err(ApplicationError::precondition(format!(
                "config not found for file handler [{}]",
                opts.base_path
            )));
        };

        serde_json::from_str(&first.value.config).json_context("decode file handler config")
    }

    fn save(&self, config: Vec<u8>) -> ApplicationResult<()> {
        let request = ChannelRequest::new(CONFIG_SCC, "save", vec![config]);
        let resp = self.factory.channel()?.execute(&request)?;
        info!("configuration saved in transaction [{}]", resp.tx_id);
        Ok(())
    }
}

/// `null`, an empty payload or an empty array all mean "nothing matched".
fn is_empty_result(payload: &[u8]) -> bool {
    let text = String::from_utf8_lossy(payload);
    matches!(text.trim(), "" | "null" | "[]")
}
