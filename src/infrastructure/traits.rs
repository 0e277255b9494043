//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::application::ApplicationResult;
use crate::domain::{ApproveCcRequest, CommitCcRequest, InstantiateCcRequest};

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Read raw file contents.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// Interactive terminal: the output stream plus one-line reads from the input stream.
pub trait Terminal: Send + Sync {
    /// Write text to the output stream (no newline added).
    fn print(&self, text: &str) -> io::Result<()>;

    /// Read one line from the input stream. EOF yields an empty string.
    fn read_line(&self) -> io::Result<String>;

    /// Write text followed by a newline.
    fn println(&self, text: &str) -> io::Result<()> {
        self.print(text)?;
        self.print("\n")
    }
}

/// A chaincode invocation on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRequest {
    pub chaincode_id: String,
    pub function: String,
    pub args: Vec<Vec<u8>>,
}

impl ChannelRequest {
    pub fn new(chaincode_id: &str, function: &str, args: Vec<Vec<u8>>) -> Self {
        Self {
            chaincode_id: chaincode_id.to_string(),
            function: function.to_string(),
            args,
        }
    }
}

/// Result of a channel query or execute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelResponse {
    pub tx_id: String,
    pub payload: Vec<u8>,
}

/// Channel client: evaluate (query) or submit (execute) chaincode transactions.
pub trait Channel: Send + Sync {
    /// Evaluate a transaction. Empty `targets` lets the client pick endorsers.
    fn query(&self, request: &ChannelRequest, targets: &[String])
        -> ApplicationResult<ChannelResponse>;

    /// Submit a transaction for ordering and commit.
    fn execute(&self, request: &ChannelRequest) -> ApplicationResult<ChannelResponse>;
}

/// Resource management client: chaincode lifecycle operations on a channel.
pub trait ResourceManagement: Send + Sync {
    fn instantiate_cc(
        &self,
        channel: &str,
        request: &InstantiateCcRequest,
        targets: &[String],
    ) -> ApplicationResult<()>;

    fn approve_cc(
        &self,
        channel: &str,
        request: &ApproveCcRequest,
        targets: &[String],
    ) -> ApplicationResult<()>;

    fn commit_cc(
        &self,
        channel: &str,
        request: &CommitCcRequest,
        targets: &[String],
    ) -> ApplicationResult<()>;
}

/// Creates network clients for the current context.
pub trait ClientFactory: Send + Sync {
    fn channel(&self) -> ApplicationResult<Box<dyn Channel>>;

    fn resource_management(&self) -> ApplicationResult<Box<dyn ResourceManagement>>;
}

/// Per-request HTTP options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Sent as `Authorization: Bearer <token>` when set.
    pub auth_token: Option<String>,
}

impl RequestOptions {
    /// Options carrying `token` unless it is empty.
    pub fn with_auth_token(token: &str) -> Self {
        Self {
            auth_token: (!token.is_empty()).then(|| token.to_string()),
        }
    }
}

/// HTTP response. Non-200 responses carry the body in `error_msg`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub payload: Vec<u8>,
    pub error_msg: String,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Minimal HTTP client. Only transport failures are errors.
pub trait HttpClient: Send + Sync {
    fn post(&self, url: &str, body: &[u8], opts: &RequestOptions)
        -> ApplicationResult<HttpResponse>;

    fn get(&self, url: &str, opts: &RequestOptions) -> ApplicationResult<HttpResponse>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Terminal bound to the process stdin/stdout.
#[derive(Debug, Default)]
pub struct StdioTerminal;

impl Terminal for StdioTerminal {
    fn print(&self, text: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()
    }

    fn read_line(&self) -> io::Result<String> {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }
}
