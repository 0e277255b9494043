//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

/// Fabric CLI extensions: chaincode lifecycle with custom collections, ledger config, file index
#[derive(Parser, Debug)]
#[command(name = "fabric-ext")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Extra settings file layered over the global config
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub settings: Option<PathBuf>,

    /// Context to use instead of current_context
    #[arg(long, global = true)]
    pub context: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fabric extensions
    Extensions {
        #[command(subcommand)]
        command: ExtensionsCommands,
    },

    /// Manages file uploads
    File {
        #[command(subcommand)]
        command: FileCommands,
    },

    /// Manage ledger configuration
    Ledgerconfig {
        #[command(subcommand)]
        command: LedgerConfigCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Flags shared by approvecc and commitcc.
#[derive(Args, Debug, Default)]
pub struct LifecycleArgs {
    /// Sets the endorsement policy
    #[arg(long, default_value = "")]
    pub policy: String,
    /// Sets the channel config policy
    #[arg(long = "channel-config-policy", default_value = "")]
    pub channel_config_policy: String,
    /// Sets the collections config (in JSON format)
    #[arg(long = "collections-config", default_value = "")]
    pub collections_config: String,
    /// Whether the chaincode requires 'Init' to be invoked
    #[arg(long = "init-required")]
    pub init_required: bool,
    /// Sets the endorsement plugin
    #[arg(long = "endorsement-plugin", default_value = "")]
    pub endorsement_plugin: String,
    /// Sets the validation plugin
    #[arg(long = "validation-plugin", default_value = "")]
    pub validation_plugin: String,
}

#[derive(Subcommand, Debug)]
pub enum ExtensionsCommands {
    /// Instantiates chaincode
    Instantiatecc {
        /// Chaincode name
        name: Option<String>,
        /// Chaincode version
        #[arg(value_name = "VERSION")]
        cc_version: Option<String>,
        /// Sets the endorsement policy
        #[arg(long, default_value = "")]
        policy: String,
        /// Sets the collections config (in JSON format)
        #[arg(long = "collections-config", default_value = "")]
        collections_config: String,
    },

    /// Approves a chaincode
    Approvecc {
        /// Chaincode name
        name: Option<String>,
        /// Chaincode version
        #[arg(value_name = "VERSION")]
        cc_version: Option<String>,
        /// Package ID
        package_id: Option<String>,
        /// Sequence number
        sequence: Option<String>,
        #[command(flatten)]
        lifecycle: LifecycleArgs,
    },

    /// Commits an approved chaincode
    Commitcc {
        /// Chaincode name
        name: Option<String>,
        /// Chaincode version
        #[arg(value_name = "VERSION")]
        cc_version: Option<String>,
        /// Sequence number
        sequence: Option<String>,
        #[command(flatten)]
        lifecycle: LifecycleArgs,
        /// Peer to send the commit to (repeatable)
        #[arg(long = "peer")]
        peers: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum FileCommands {
    /// Creates a file index document in Sidetree and returns the document
    Createidx {
        /// Sidetree operations URL
        #[arg(long, default_value = "")]
        url: String,
        /// Base path of the index, e.g. /content
        #[arg(long, default_value = "")]
        path: String,
        /// Authorization token for the Sidetree endpoint
        #[arg(long = "authtoken", default_value = "")]
        auth_token: String,
        /// Recovery public key (PEM)
        #[arg(long = "recoverykey", default_value = "")]
        recovery_key: String,
        /// File containing the recovery public key
        #[arg(long = "recoverykeyfile", default_value = "", value_hint = ValueHint::FilePath)]
        recovery_key_file: String,
        /// Update public key (PEM)
        #[arg(long = "updatekey", default_value = "")]
        update_key: String,
        /// File containing the update public key
        #[arg(long = "updatekeyfile", default_value = "", value_hint = ValueHint::FilePath)]
        update_key_file: String,
        /// Do not prompt for confirmation
        #[arg(long = "noprompt")]
        no_prompt: bool,
    },

    /// Upload files to DCAS and record them in the file index
    Upload {
        /// Content endpoint URL; its path is the base path
        #[arg(long, default_value = "")]
        url: String,
        /// Files to upload, separated by ';'
        #[arg(long, default_value = "")]
        files: String,
        /// File index document URL
        #[arg(long = "idxurl", default_value = "")]
        index_url: String,
        /// Authorization token for the Sidetree endpoint
        #[arg(long = "authtoken", default_value = "")]
        auth_token: String,
        /// Authorization token for the content endpoint (default: --authtoken)
        #[arg(long = "contentauthtoken", default_value = "")]
        content_auth_token: String,
        /// Private key signing the index update (PEM)
        #[arg(long = "signingkey", default_value = "")]
        signing_key: String,
        /// File containing the signing key
        #[arg(long = "signingkeyfile", default_value = "", value_hint = ValueHint::FilePath)]
        signing_key_file: String,
        /// Next update public key (PEM)
        #[arg(long = "nextupdatekey", default_value = "")]
        next_update_key: String,
        /// File containing the next update public key
        #[arg(long = "nextupdatekeyfile", default_value = "", value_hint = ValueHint::FilePath)]
        next_update_key_file: String,
        /// Do not prompt for confirmation
        #[arg(long = "noprompt")]
        no_prompt: bool,
    },
}

/// Criteria given as JSON or as individual fields.
#[derive(Args, Debug, Default)]
pub struct CriteriaFlags {
    /// Search criteria in JSON format
    #[arg(long, default_value = "")]
    pub criteria: String,
    /// MSP ID
    #[arg(long = "mspid", default_value = "")]
    pub msp_id: String,
    /// Peer ID
    #[arg(long = "peerid", default_value = "")]
    pub peer_id: String,
    /// Application name
    #[arg(long = "appname", default_value = "")]
    pub app_name: String,
    /// Application version
    #[arg(long = "appver", default_value = "")]
    pub app_version: String,
    /// Component name
    #[arg(long = "componentname", default_value = "")]
    pub component_name: String,
    /// Component version
    #[arg(long = "componentver", default_value = "")]
    pub component_version: String,
}

#[derive(Subcommand, Debug)]
pub enum LedgerConfigCommands {
    /// Query ledger configuration
    Query {
        #[command(flatten)]
        criteria: CriteriaFlags,
    },

    /// Update ledger configuration
    Update {
        /// Configuration in JSON format
        #[arg(long, default_value = "")]
        config: String,
        /// Path to the configuration file
        #[arg(long = "configfile", default_value = "", value_hint = ValueHint::FilePath)]
        config_file: String,
        /// Do not prompt for confirmation
        #[arg(long = "noprompt")]
        no_prompt: bool,
    },

    /// Delete ledger configuration
    Delete {
        #[command(flatten)]
        criteria: CriteriaFlags,
        /// Do not prompt for confirmation
        #[arg(long = "noprompt")]
        no_prompt: bool,
    },

    /// Update the ID of the file index document for a given path
    Fileidxupdate {
        /// MSP ID
        #[arg(long, default_value = "")]
        msp: String,
        /// Peer IDs, separated by ';'
        #[arg(long, default_value = "")]
        peers: String,
        /// Base path of the file handler
        #[arg(long, default_value = "")]
        path: String,
        /// ID of the file index document
        #[arg(long = "idxid", default_value = "")]
        index_id: String,
        /// Do not prompt for confirmation
        #[arg(long = "noprompt")]
        no_prompt: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Show config paths
    Path,
}
