//! Blocking HTTP client backed by ureq

use std::io::Read;
use std::time::Duration;

use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult};
use crate::infrastructure::traits::{HttpClient, HttpResponse, RequestOptions};

const USER_AGENT: &str = concat!("fabric-ext/", env!("CARGO_PKG_VERSION"));

/// HTTP client using a shared ureq agent.
pub struct UreqHttpClient {
    agent: ureq::Agent,
}

impl UreqHttpClient {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self { agent }
    }

    fn with_auth(request: ureq::Request, opts: &RequestOptions) -> ureq::Request {
        match &opts.auth_token {
            Some(token) => request.set("Authorization", &format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Turns a ureq result into a response; only transport errors fail.
    fn handle(
        url: &str,
        result: Result<ureq::Response, ureq::Error>,
    ) -> ApplicationResult<HttpResponse> {
        match result {
            Ok(response) => {
                let status = response.status();
                let body = read_body(url, response)?;
                debug!("HTTP {} <- {} ({} bytes)", status, url, body.len());
                if status == 200 {
                    Ok(HttpResponse {
                        status,
                        payload: body,
                        ..Default::default()
                    })
                } else {
                    Ok(HttpResponse {
                        status,
                        error_msg: String::from_utf8_lossy(&body).into_owned(),
                        ..Default::default()
                    })
                }
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = read_body(url, response)?;
                debug!("HTTP {} <- {}", status, url);
                Ok(HttpResponse {
                    status,
                    error_msg: String::from_utf8_lossy(&body).into_owned(),
                    ..Default::default()
                })
            }
            Err(ureq::Error::Transport(e)) => Err(ApplicationError::Remote(format!(
                "request to [{}] failed: {}",
                url, e
            ))),
        }
    }
}

fn read_body(url: &str, response: ureq::Response) -> ApplicationResult<Vec<u8>> {
    let mut body = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut body)
        .map_err(|e| ApplicationError::operation(format!("reading response body from [{url}]"), e))?;
    Ok(body)
}

impl HttpClient for UreqHttpClient {
    fn post(
        &self,
        url: &str,
        body: &[u8],
        opts: &RequestOptions,
    ) -> ApplicationResult<HttpResponse> {
        debug!("HTTP POST -> {} ({} bytes)", url, body.len());
        let request = Self::with_auth(
            self.agent.post(url).set("Content-Type", "application/json"),
            opts,
        );
        Self::handle(url, request.send_bytes(body))
    }

    fn get(&self, url: &str, opts: &RequestOptions) -> ApplicationResult<HttpResponse> {
        debug!("HTTP GET -> {}", url);
        let request = Self::with_auth(self.agent.get(url), opts);
        Self::handle(url, request.call())
    }
}
