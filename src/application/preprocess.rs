//! `file://` reference substitution for ledger configuration documents

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{App, Component, Config, Peer, FILE_REF_PREFIX};
use crate::infrastructure::traits::FileSystem;
use crate::util::path::resolve_relative_to;

/// Replaces `file://<path>` config strings with the referenced file contents.
///
/// Relative paths resolve against the directory of the top-level config file;
/// with no config file (inline `--config`) they resolve against the working
/// directory. File contents are inserted verbatim and not processed further.
pub struct ConfigPreProcessor<'a> {
    fs: &'a dyn FileSystem,
    config_file: Option<PathBuf>,
}

impl<'a> ConfigPreProcessor<'a> {
    pub fn new(fs: &'a dyn FileSystem, config_file: Option<&Path>) -> Self {
        Self {
            fs,
            config_file: config_file.map(Path::to_path_buf),
        }
    }

    pub fn process(&self, config: Config) -> ApplicationResult<Config> {
        Ok(Config {
            msp_id: config.msp_id,
            peers: config
                .peers
                .into_iter()
                .map(|peer| self.visit_peer(peer))
                .collect::<ApplicationResult<_>>()?,
            apps: self.visit_apps(config.apps)?,
        })
    }

    fn visit_peer(&self, peer: Peer) -> ApplicationResult<Peer> {
        Ok(Peer {
            peer_id: peer.peer_id,
            apps: self.visit_apps(peer.apps)?,
        })
    }

    fn visit_apps(&self, apps: Vec<App>) -> ApplicationResult<Vec<App>> {
        apps.into_iter()
            .map(|app| {
                Ok(App {
                    config: self.visit_config(app.config)?,
                    components: app
                        .components
                        .into_iter()
                        .map(|c| self.visit_component(c))
                        .collect::<ApplicationResult<_>>()?,
                    ..app
                })
            })
            .collect()
    }

    fn visit_component(&self, component: Component) -> ApplicationResult<Component> {
        Ok(Component {
            config: self.visit_config(component.config)?,
            ..component
        })
    }

    fn visit_config(&self, config: String) -> ApplicationResult<String> {
        let Some(reference) = config.strip_prefix(FILE_REF_PREFIX) else {
            return Ok(config);
        };

        let path = resolve_relative_to(reference, self.config_file.as_deref());
        debug!("Substituting config from file: {}", path.display());
        self.fs
            .read_to_string(&path)
            .map_err(|source| ApplicationError::FileReference {
                reference: reference.to_string(),
                path,
                source,
            })
    }
}
