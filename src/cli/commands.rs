//! Command dispatch: maps parsed arguments onto services

use std::fs;
use std::io;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::{
    ApproveOptions, CommitOptions, CreateIndexOptions, FileIndexUpdateOptions,
    InstantiateOptions, LifecycleOptions, UpdateOptions, UploadOptions,
};
use crate::application::{ApplicationError, CriteriaArgs};
use crate::cli::args::{
    Cli, Commands, ConfigCommands, CriteriaFlags, ExtensionsCommands, FileCommands,
    LedgerConfigCommands, LifecycleArgs,
};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Load settings, build the container and run the selected command.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given (see --help)".to_string(),
        ));
    };

    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    // init and path never read the settings layers
    match command {
        Commands::Config {
            command: ConfigCommands::Init { force },
        } => return config_init(*force),
        Commands::Config {
            command: ConfigCommands::Path,
        } => {
            config_path();
            return Ok(());
        }
        _ => {}
    }

    let settings = Settings::load(cli.settings.as_deref(), cli.context.as_deref())?;
    let container = ServiceContainer::new(settings);
    dispatch(command, &container)
}

/// Run `command` against the services in `container`.
pub fn dispatch(command: &Commands, container: &ServiceContainer) -> CliResult<()> {
    match command {
        Commands::Extensions { command } => extensions(command, container),
        Commands::File { command } => file(command, container),
        Commands::Ledgerconfig { command } => ledgerconfig(command, container),
        Commands::Config { command } => config(command, container),
        Commands::Completion { .. } => Err(CliError::Usage(
            "completion is handled before settings are loaded".to_string(),
        )),
    }
}

fn lifecycle_options(
    name: &Option<String>,
    version: &Option<String>,
    sequence: &Option<String>,
    args: &LifecycleArgs,
) -> LifecycleOptions {
    LifecycleOptions {
        name: name.clone().unwrap_or_default(),
        version: version.clone().unwrap_or_default(),
        sequence: sequence.clone().unwrap_or_default(),
        policy: args.policy.clone(),
        channel_config_policy: args.channel_config_policy.clone(),
        collections_config: args.collections_config.clone(),
        init_required: args.init_required,
        endorsement_plugin: args.endorsement_plugin.clone(),
        validation_plugin: args.validation_plugin.clone(),
    }
}

#[instrument(skip(container))]
fn extensions(command: &ExtensionsCommands, container: &ServiceContainer) -> CliResult<()> {
    let service = container.chaincode_service();
    match command {
        ExtensionsCommands::Instantiatecc {
            name,
            cc_version,
            policy,
            collections_config,
        } => service.instantiate(&InstantiateOptions {
            name: name.clone().unwrap_or_default(),
            version: cc_version.clone().unwrap_or_default(),
            policy: policy.clone(),
            collections_config: collections_config.clone(),
        })?,
        ExtensionsCommands::Approvecc {
            name,
            cc_version,
            package_id,
            sequence,
            lifecycle,
        } => service.approve(&ApproveOptions {
            package_id: package_id.clone().unwrap_or_default(),
            lifecycle: lifecycle_options(name, cc_version, sequence, lifecycle),
        })?,
        ExtensionsCommands::Commitcc {
            name,
            cc_version,
            sequence,
            lifecycle,
            peers,
        } => service.commit(&CommitOptions {
            peers: peers.clone(),
            lifecycle: lifecycle_options(name, cc_version, sequence, lifecycle),
        })?,
    }
    Ok(())
}

#[instrument(skip(container))]
fn file(command: &FileCommands, container: &ServiceContainer) -> CliResult<()> {
    let service = container.file_index_service();
    match command {
        FileCommands::Createidx {
            url,
            path,
            auth_token,
            recovery_key,
            recovery_key_file,
            update_key,
            update_key_file,
            no_prompt,
        } => service.create_index(&CreateIndexOptions {
            url: url.clone(),
            path: path.clone(),
            auth_token: auth_token.clone(),
            recovery_key: recovery_key.clone(),
            recovery_key_file: recovery_key_file.clone(),
            update_key: update_key.clone(),
            update_key_file: update_key_file.clone(),
            no_prompt: *no_prompt,
        })?,
        FileCommands::Upload {
            url,
            files,
            index_url,
            auth_token,
            content_auth_token,
            signing_key,
            signing_key_file,
            next_update_key,
            next_update_key_file,
            no_prompt,
        } => service.upload(&UploadOptions {
            url: url.clone(),
            files: files.clone(),
            index_url: index_url.clone(),
            auth_token: auth_token.clone(),
            content_auth_token: content_auth_token.clone(),
            signing_key: signing_key.clone(),
            signing_key_file: signing_key_file.clone(),
            next_update_key: next_update_key.clone(),
            next_update_key_file: next_update_key_file.clone(),
            no_prompt: *no_prompt,
        })?,
    }
    Ok(())
}

fn criteria_args(flags: &CriteriaFlags) -> CriteriaArgs {
    CriteriaArgs {
        criteria: flags.criteria.clone(),
        msp_id: flags.msp_id.clone(),
        peer_id: flags.peer_id.clone(),
        app_name: flags.app_name.clone(),
        app_version: flags.app_version.clone(),
        component_name: flags.component_name.clone(),
        component_version: flags.component_version.clone(),
    }
}

#[instrument(skip(container))]
fn ledgerconfig(command: &LedgerConfigCommands, container: &ServiceContainer) -> CliResult<()> {
    let service = container.ledger_config_service();
    match command {
        LedgerConfigCommands::Query { criteria } => service.query(&criteria_args(criteria))?,
        LedgerConfigCommands::Update {
            config,
            config_file,
            no_prompt,
        } => service.update(&UpdateOptions {
            config: config.clone(),
            config_file: config_file.clone(),
            no_prompt: *no_prompt,
        })?,
        LedgerConfigCommands::Delete {
            criteria,
            no_prompt,
        } => service.delete(&criteria_args(criteria), *no_prompt)?,
        LedgerConfigCommands::Fileidxupdate {
            msp,
            peers,
            path,
            index_id,
            no_prompt,
        } => service.update_file_index(&FileIndexUpdateOptions {
            msp_id: msp.clone(),
            peers: peers.clone(),
            base_path: path.clone(),
            file_index_id: index_id.clone(),
            no_prompt: *no_prompt,
        })?,
    }
    Ok(())
}

#[instrument(skip(container))]
fn config(command: &ConfigCommands, container: &ServiceContainer) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
        }
        ConfigCommands::Init { force } => config_init(*force)?,
        ConfigCommands::Path => config_path(),
    }
    Ok(())
}

fn config_init(force: bool) -> CliResult<()> {
    let path = global_config_path().ok_or_else(|| ApplicationError::Config {
        message: "cannot determine config directory".to_string(),
    })?;
    if path.exists() && !force {
        return Err(CliError::Usage(format!(
            "config file already exists: {} (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .map_err(|e| InfraError::io(format!("create {}", dir.display()), e))?;
    }
    fs::write(&path, Settings::template())
        .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
    debug!("wrote config template to {}", path.display());
    output::success(&format!("Created {}", path.display()));
    Ok(())
}

fn config_path() {
    match global_config_path() {
        Some(path) => {
            let status = if path.exists() { "exists" } else { "not found" };
            output::action("global", &format!("{} ({})", path.display(), status));
        }
        None => output::action("global", "unavailable"),
    }
}
