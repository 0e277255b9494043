//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{ChaincodeService, FileIndexService, LedgerConfigService};
use crate::config::Settings;
use crate::infrastructure::gateway::GatewayClientFactory;
use crate::infrastructure::http::UreqHttpClient;
use crate::infrastructure::traits::{
    ClientFactory, FileSystem, HttpClient, RealFileSystem, StdioTerminal, Terminal,
};

/// Container holding the I/O seams; services are built on demand.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Prompt input and command output
    pub term: Arc<dyn Terminal>,

    /// HTTP client for Sidetree and content endpoints
    pub http: Arc<dyn HttpClient>,

    /// Channel and lifecycle clients for the current context
    pub clients: Arc<dyn ClientFactory>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        let settings = Arc::new(settings);
        let http: Arc<dyn HttpClient> = Arc::new(UreqHttpClient::new(settings.http.timeout()));
        let clients = Arc::new(GatewayClientFactory::new(
            Arc::clone(&settings),
            Arc::clone(&http),
        ));
        Self {
            settings,
            fs: Arc::new(RealFileSystem),
            term: Arc::new(StdioTerminal),
            http,
            clients,
        }
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        term: Arc<dyn Terminal>,
        http: Arc<dyn HttpClient>,
        clients: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            fs,
            term,
            http,
            clients,
        }
    }

    pub fn ledger_config_service(&self) -> LedgerConfigService {
        LedgerConfigService::new(
            Arc::clone(&self.settings),
            Arc::clone(&self.clients),
            Arc::clone(&self.fs),
            Arc::clone(&self.term),
        )
    }

    pub fn chaincode_service(&self) -> ChaincodeService {
        ChaincodeService::new(
            Arc::clone(&self.settings),
            Arc::clone(&self.clients),
            Arc::clone(&self.term),
        )
    }

    pub fn file_index_service(&self) -> FileIndexService {
        FileIndexService::new(
            Arc::clone(&self.http),
            Arc::clone(&self.fs),
            Arc::clone(&self.term),
        )
    }
}
