//! Fabric REST gateway client
//!
//! Implements the channel and resource-management seams as JSON calls against
//! `<gateway_url>/channels/<channel>/...`. Chaincode arguments and payloads are
//! base64 encoded. Submitting calls are retried on transport errors and 5xx.

use std::sync::Arc;
use std::thread;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::{Context, RetrySettings, Settings};
use crate::domain::{ApproveCcRequest, CommitCcRequest, InstantiateCcRequest};
use crate::infrastructure::traits::{
    Channel, ChannelRequest, ChannelResponse, ClientFactory, HttpClient, HttpResponse,
    RequestOptions, ResourceManagement,
};

/// Identity the gateway should transact as.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Identity<'a> {
    msp_id: &'a str,
    user: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionBody<'a> {
    identity: Identity<'a>,
    chaincode_id: &'a str,
    function: &'a str,
    args: Vec<String>,
    #[serde(skip_serializing_if = "no_targets")]
    targets: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LifecycleBody<'a, T: Serialize> {
    identity: Identity<'a>,
    request: &'a T,
    #[serde(skip_serializing_if = "no_targets")]
    targets: &'a [String],
}

fn no_targets(targets: &&[String]) -> bool {
    targets.is_empty()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionResult {
    #[serde(default)]
    tx_id: String,
    #[serde(default)]
    payload: String,
}

/// Shared plumbing for one gateway endpoint and context.
#[derive(Clone)]
struct GatewayConnection {
    http: Arc<dyn HttpClient>,
    retry: RetrySettings,
    context: Context,
}

impl GatewayConnection {
    fn url(&self, path: &str) -> String {
        format!(
            "{}/channels/{}/{}",
            self.context.gateway_url.trim_end_matches('/'),
            self.context.channel,
            path
        )
    }

    fn identity(&self) -> Identity<'_> {
        Identity {
            msp_id: &self.context.organization,
            user: &self.context.user,
        }
    }

    fn post_once(&self, url: &str, body: &[u8]) -> ApplicationResult<HttpResponse> {
        self.http.post(url, body, &RequestOptions::default())
    }

    /// POST with retries on transport errors and 5xx responses.
    fn post_with_retry(&self, url: &str, body: &[u8]) -> ApplicationResult<HttpResponse> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 0;
        loop {
            let result = self.post_once(url, body);
            let retryable = match &result {
                Ok(resp) => resp.status >= 500,
                Err(ApplicationError::Remote(_)) => true,
                Err(_) => false,
            };
            attempt += 1;
            if !retryable || attempt >= attempts {
                return result;
            }
            let backoff = self.retry.backoff(attempt - 1);
            warn!(
                "gateway call to [{}] failed (attempt {}/{}), retrying in {:?}",
                url, attempt, attempts, backoff
            );
            thread::sleep(backoff);
        }
    }

    fn check(url: &str, resp: HttpResponse) -> ApplicationResult<HttpResponse> {
        if resp.is_ok() {
            Ok(resp)
        } else {
            Err(ApplicationError::Remote(format!(
                "gateway request [{}] failed with status code {}: {}",
                url, resp.status, resp.error_msg
            )))
        }
    }

    fn transaction(
        &self,
        path: &str,
        request: &ChannelRequest,
        targets: &[String],
        retry: bool,
    ) -> ApplicationResult<ChannelResponse> {
        let url = self.url(path);
        let body = TransactionBody {
            identity: self.identity(),
            chaincode_id: &request.chaincode_id,
            function: &request.function,
            args: request.args.iter().map(|a| STANDARD.encode(a)).collect(),
            targets,
        };
        let body = serde_json::to_vec(&body)
            .map_err(|e| ApplicationError::operation("encode gateway request", e))?;

        debug!(
            "{} {}.{} on channel [{}]",
            path, request.chaincode_id, request.function, self.context.channel
        );
        let resp = if retry {
            self.post_with_retry(&url, &body)?
        } else {
            self.post_once(&url, &body)?
        };
        let resp = Self::check(&url, resp)?;

        if resp.payload.is_empty() {
            return Ok(ChannelResponse::default());
        }
        let result: TransactionResult = serde_json::from_slice(&resp.payload)
            .map_err(|e| ApplicationError::operation("decode gateway response", e))?;
        let payload = STANDARD
            .decode(result.payload.as_bytes())
            .map_err(|e| ApplicationError::operation("decode gateway payload", e))?;
        Ok(ChannelResponse {
            tx_id: result.tx_id,
            payload,
        })
    }

    fn lifecycle<T: Serialize>(
        &self,
        operation: &str,
        channel: &str,
        request: &T,
        targets: &[String],
    ) -> ApplicationResult<()> {
        let url = format!(
            "{}/channels/{}/lifecycle/{}",
            self.context.gateway_url.trim_end_matches('/'),
            channel,
            operation
        );
        let body = LifecycleBody {
            identity: self.identity(),
            request,
            targets,
        };
        let body = serde_json::to_vec(&body)
            .map_err(|e| ApplicationError::operation("encode lifecycle request", e))?;
        let resp = self.post_with_retry(&url, &body)?;
        Self::check(&url, resp)?;
        info!("lifecycle {} completed on channel [{}]", operation, channel);
        Ok(())
    }
}

/// Channel client over the gateway.
pub struct GatewayChannel {
    conn: GatewayConnection,
}

impl Channel for GatewayChannel {
    fn query(
        &self,
        request: &ChannelRequest,
        targets: &[String],
    ) -> ApplicationResult<ChannelResponse> {
        self.conn.transaction("query", request, targets, false)
    }

    fn execute(&self, request: &ChannelRequest) -> ApplicationResult<ChannelResponse> {
        let resp = self.conn.transaction("execute", request, &[], true)?;
        info!("transaction [{}] committed", resp.tx_id);
        Ok(resp)
    }
}

/// Resource management client over the gateway.
pub struct GatewayResourceManagement {
    conn: GatewayConnection,
}

impl ResourceManagement for GatewayResourceManagement {
    fn instantiate_cc(
        &self,
        channel: &str,
        request: &InstantiateCcRequest,
        targets: &[String],
    ) -> ApplicationResult<()> {
        self.conn.lifecycle("instantiate", channel, request, targets)
    }

    fn approve_cc(
        &self,
        channel: &str,
        request: &ApproveCcRequest,
        targets: &[String],
    ) -> ApplicationResult<()> {
        self.conn.lifecycle("approve", channel, request, targets)
    }

    fn commit_cc(
        &self,
        channel: &str,
        request: &CommitCcRequest,
        targets: &[String],
    ) -> ApplicationResult<()> {
        self.conn.lifecycle("commit", channel, request, targets)
    }
}

/// Creates gateway clients for the current context.
pub struct GatewayClientFactory {
    settings: Arc<Settings>,
    http: Arc<dyn HttpClient>,
}

impl GatewayClientFactory {
    pub fn new(settings: Arc<Settings>, http: Arc<dyn HttpClient>) -> Self {
        Self { settings, http }
    }

    fn connection(&self) -> ApplicationResult<GatewayConnection> {
        let context = self.settings.current_context()?;
        if context.gateway_url.is_empty() {
            return Err(ApplicationError::Config {
                message: format!(
                    "gateway_url not set for context: {}",
                    self.settings.current_context
                ),
            });
        }
        Ok(GatewayConnection {
            http: Arc::clone(&self.http),
            retry: self.settings.retry.clone(),
            context: context.clone(),
        })
    }
}

impl ClientFactory for GatewayClientFactory {
    fn channel(&self) -> ApplicationResult<Box<dyn Channel>> {
        let conn = self.connection()?;
        if conn.context.channel.is_empty() {
            return Err(ApplicationError::Config {
                message: format!(
                    "channel not set for context: {}",
                    self.settings.current_context
                ),
            });
        }
        Ok(Box::new(GatewayChannel { conn }))
    }

    fn resource_management(&self) -> ApplicationResult<Box<dyn ResourceManagement>> {
        Ok(Box::new(GatewayResourceManagement {
            conn: self.connection()?,
        }))
    }
}
