use std::collections::VecDeque;
use std::env;
use std::io;
use std::sync::{Arc, Mutex, Once};

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::{Context, RetrySettings, Settings};
use crate::domain::{ApproveCcRequest, CommitCcRequest, InstantiateCcRequest};
use crate::infrastructure::traits::{
    Channel, ChannelRequest, ChannelResponse, ClientFactory, HttpClient, HttpResponse,
    RequestOptions, ResourceManagement, Terminal,
};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "trace");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "trace");
    }

    // Create a filter for noisy modules
    let noisy_modules = ["ureq", "rustls"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::ENTER)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Channel used by [`test_settings`].
pub const TEST_CHANNEL: &str = "mychannel";

/// Peers of the `test` context.
pub const TEST_PEERS: [&str; 2] = ["peer0.org1.example.com", "peer1.org1.example.com"];

/// Settings with a single active `test` context and millisecond retry backoff.
pub fn test_settings() -> Settings {
    let mut settings = Settings {
        current_context: "test".to_string(),
        retry: RetrySettings {
            attempts: 3,
            initial_backoff_ms: 1,
            backoff_factor: 1.0,
        },
        ..Default::default()
    };
    settings.contexts.insert(
        "test".to_string(),
        Context {
            gateway_url: "http://gateway.test".to_string(),
            channel: TEST_CHANNEL.to_string(),
            peers: TEST_PEERS.iter().map(|p| p.to_string()).collect(),
            organization: "Org1MSP".to_string(),
            user: "Admin".to_string(),
        },
    );
    settings
}

// ============================================================
// MOCKS
// ============================================================

/// Terminal with scripted input lines and captured output.
#[derive(Default)]
pub struct MockTerminal {
    input: Mutex<VecDeque<io::Result<String>>>,
    output: Mutex<String>,
}

impl MockTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminal whose first read returns `line`.
    pub fn with_input(line: &str) -> Self {
        let term = Self::default();
        term.push_input(line);
        term
    }

    pub fn push_input(&self, line: &str) {
        self.input
            .lock()
            .expect("terminal input lock")
            .push_back(Ok(line.to_string()));
    }

    pub fn push_read_error(&self) {
        self.input
            .lock()
            .expect("terminal input lock")
            .push_back(Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed")));
    }

    pub fn output(&self) -> String {
        self.output.lock().expect("terminal output lock").clone()
    }
}

impl Terminal for MockTerminal {
    fn print(&self, text: &str) -> io::Result<()> {
        self.output
            .lock()
            .expect("terminal output lock")
            .push_str(text);
        Ok(())
    }

    fn read_line(&self) -> io::Result<String> {
        self.input
            .lock()
            .expect("terminal input lock")
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Recorded channel invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub kind: &'static str,
    pub function: String,
    pub chaincode_id: String,
    pub args: Vec<String>,
    pub targets: Vec<String>,
}

/// Channel returning scripted query payloads and recording every call.
#[derive(Default)]
pub struct MockChannel {
    query_responses: Mutex<VecDeque<ApplicationResult<Vec<u8>>>>,
    execute_error: Mutex<Option<String>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_query_response(&self, payload: &str) {
        self.query_responses
            .lock()
            .expect("query lock")
            .push_back(Ok(payload.as_bytes().to_vec()));
    }

    pub fn push_query_error(&self, message: &str) {
        self.query_responses
            .lock()
            .expect("query lock")
            .push_back(Err(ApplicationError::Remote(message.to_string())));
    }

    pub fn fail_execute(&self, message: &str) {
        *self.execute_error.lock().expect("execute lock") = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn executes(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.kind == "execute")
            .collect()
    }

    fn record(&self, kind: &'static str, request: &ChannelRequest, targets: &[String]) {
        self.calls.lock().expect("calls lock").push(RecordedCall {
            kind,
            function: request.function.clone(),
            chaincode_id: request.chaincode_id.clone(),
            args: request
                .args
                .iter()
                .map(|a| String::from_utf8_lossy(a).into_owned())
                .collect(),
            targets: targets.to_vec(),
        });
    }
}

impl Channel for MockChannel {
    fn query(
        &self,
        request: &ChannelRequest,
        targets: &[String],
    ) -> ApplicationResult<ChannelResponse> {
        self.record("query", request, targets);
        let next = self
            .query_responses
            .lock()
            .expect("query lock")
            .pop_front()
            .unwrap_or_else(|| Ok(b"null".to_vec()));
        next.map(|payload| ChannelResponse {
            tx_id: String::new(),
            payload,
        })
    }

    fn execute(&self, request: &ChannelRequest) -> ApplicationResult<ChannelResponse> {
        self.record("execute", request, &[]);
        if let Some(msg) = self.execute_error.lock().expect("execute lock").clone() {
            return Err(ApplicationError::Remote(msg));
        }
        Ok(ChannelResponse {
            tx_id: "tx1".to_string(),
            payload: vec![],
        })
    }
}

/// Recorded lifecycle invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleCall {
    Instantiate {
        channel: String,
        request: InstantiateCcRequest,
        targets: Vec<String>,
    },
    Approve {
        channel: String,
        request: ApproveCcRequest,
        targets: Vec<String>,
    },
    Commit {
        channel: String,
        request: CommitCcRequest,
        targets: Vec<String>,
    },
}

#[derive(Default)]
pub struct MockResMgmt {
    error: Mutex<Option<String>>,
    calls: Mutex<Vec<LifecycleCall>>,
}

impl MockResMgmt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, message: &str) {
        *self.error.lock().expect("error lock") = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<LifecycleCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: LifecycleCall) -> ApplicationResult<()> {
        self.calls.lock().expect("calls lock").push(call);
        match self.error.lock().expect("error lock").clone() {
            Some(msg) => Err(ApplicationError::Remote(msg)),
            None => Ok(()),
        }
    }
}

impl ResourceManagement for MockResMgmt {
    fn instantiate_cc(
        &self,
        channel: &str,
        request: &InstantiateCcRequest,
        targets: &[String],
    ) -> ApplicationResult<()> {
        self.record(LifecycleCall::Instantiate {
            channel: channel.to_string(),
            request: request.clone(),
            targets: targets.to_vec(),
        })
    }

    fn approve_cc(
        &self,
        channel: &str,
        request: &ApproveCcRequest,
        targets: &[String],
    ) -> ApplicationResult<()> {
        self.record(LifecycleCall::Approve {
            channel: channel.to_string(),
            request: request.clone(),
            targets: targets.to_vec(),
        })
    }

    fn commit_cc(
        &self,
        channel: &str,
        request: &CommitCcRequest,
        targets: &[String],
    ) -> ApplicationResult<()> {
        self.record(LifecycleCall::Commit {
            channel: channel.to_string(),
            request: request.clone(),
            targets: targets.to_vec(),
        })
    }
}

/// Factory handing out shared mock clients.
pub struct MockFactory {
    pub channel: Arc<MockChannel>,
    pub res_mgmt: Arc<MockResMgmt>,
    error: Option<String>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            channel: Arc::new(MockChannel::new()),
            res_mgmt: Arc::new(MockResMgmt::new()),
            error: None,
        }
    }

    /// Factory whose client creation always fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::new()
        }
    }
}

impl Default for MockFactory {
    fn default() -> Self {
        Self::new()
    }
}

struct SharedChannel(Arc<MockChannel>);

impl Channel for SharedChannel {
    fn query(
        &self,
        request: &ChannelRequest,
        targets: &[String],
    ) -> ApplicationResult<ChannelResponse> {
        self.0.query(request, targets)
    }

    fn execute(&self, request: &ChannelRequest) -> ApplicationResult<ChannelResponse> {
        self.0.execute(request)
    }
}

struct SharedResMgmt(Arc<MockResMgmt>);

impl ResourceManagement for SharedResMgmt {
    fn instantiate_cc(
        &self,
        channel: &str,
        request: &InstantiateCcRequest,
        targets: &[String],
    ) -> ApplicationResult<()> {
        self.0.instantiate_cc(channel, request, targets)
    }

    fn approve_cc(
        &self,
        channel: &str,
        request: &ApproveCcRequest,
        targets: &[String],
    ) -> ApplicationResult<()> {
        self.0.approve_cc(channel, request, targets)
    }

    fn commit_cc(
        &self,
        channel: &str,
        request: &CommitCcRequest,
        targets: &[String],
    ) -> ApplicationResult<()> {
        self.0.commit_cc(channel, request, targets)
    }
}

impl ClientFactory for MockFactory {
    fn channel(&self) -> ApplicationResult<Box<dyn Channel>> {
        match &self.error {
            Some(msg) => Err(ApplicationError::Remote(msg.clone())),
            None => Ok(Box::new(SharedChannel(Arc::clone(&self.channel)))),
        }
    }

    fn resource_management(&self) -> ApplicationResult<Box<dyn ResourceManagement>> {
        match &self.error {
            Some(msg) => Err(ApplicationError::Remote(msg.clone())),
            None => Ok(Box::new(SharedResMgmt(Arc::clone(&self.res_mgmt)))),
        }
    }
}

/// Recorded HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub body: Vec<u8>,
    pub auth_token: Option<String>,
}

impl RecordedRequest {
    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }
}

/// HTTP client replaying scripted responses in order.
#[derive(Default)]
pub struct MockHttpClient {
    responses: Mutex<VecDeque<ApplicationResult<HttpResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, payload: &str) {
        self.push(HttpResponse {
            status: 200,
            payload: payload.as_bytes().to_vec(),
            ..Default::default()
        });
    }

    pub fn push_status(&self, status: u16, body: &str) {
        self.push(HttpResponse {
            status,
            error_msg: body.to_string(),
            ..Default::default()
        });
    }

    pub fn push_transport_error(&self, message: &str) {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(Err(ApplicationError::Remote(message.to_string())));
    }

    fn push(&self, response: HttpResponse) {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(Ok(response));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    fn respond(
        &self,
        method: &'static str,
        url: &str,
        body: &[u8],
        opts: &RequestOptions,
    ) -> ApplicationResult<HttpResponse> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(RecordedRequest {
                method,
                url: url.to_string(),
                body: body.to_vec(),
                auth_token: opts.auth_token.clone(),
            });
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Err(ApplicationError::Remote(format!("no response scripted for {url}"))))
    }
}

impl HttpClient for MockHttpClient {
    fn post(
        &self,
        url: &str,
        body: &[u8],
        opts: &RequestOptions,
    ) -> ApplicationResult<HttpResponse> {
        self.respond("POST", url, body, opts)
    }

    fn get(&self, url: &str, opts: &RequestOptions) -> ApplicationResult<HttpResponse> {
        self.respond("GET", url, &[], opts)
    }
}
