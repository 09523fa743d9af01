//! HTTP implementation of [`StsApi`] using the STS Query API.

use super::xml::{parse_assume_role, parse_error_response, parse_get_session_token};
use super::{AssumeRoleRequest, GetSessionTokenRequest, StsApi};
use crate::credentials::AwsCredentials;
use crate::error::StsError;
use crate::role::AssumedRoleCredential;
use crate::session::SessionToken;
use crate::signing::sign_request;
use async_trait::async_trait;
use chrono::Utc;
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE, HOST};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const GLOBAL_ENDPOINT: &str = "https://sts.amazonaws.com/";
const GLOBAL_SIGNING_REGION: &str = "us-east-1";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// STS client sending SigV4-signed form POSTs with reqwest.
#[derive(Debug, Clone)]
pub struct HttpStsClient {
    client: Client,
    endpoint: Url,
    signing_region: String,
}

impl HttpStsClient {
    /// Client for the regional endpoint `https://sts.<region>.amazonaws.com/`.
    ///
    /// An empty region selects the global endpoint.
    pub fn new(region: impl Into<String>) -> Result<Self, StsError> {
        Self::with_timeout(region, DEFAULT_TIMEOUT)
    }

    /// Same as [`new`](Self::new) with a custom request timeout.
    pub fn with_timeout(region: impl Into<String>, timeout: Duration) -> Result<Self, StsError> {
        let region = region.into();
        let (endpoint, signing_region) = if region.is_empty() {
            (GLOBAL_ENDPOINT.to_string(), GLOBAL_SIGNING_REGION.to_string())
        } else {
            (format!("https://sts.{}.amazonaws.com/", region), region)
        };
        let endpoint = Url::parse(&endpoint).map_err(|e| StsError::Transport {
            message: format!("invalid STS endpoint '{}': {}", endpoint, e),
            timeout: false,
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StsError::Transport {
                message: format!("failed to build HTTP client: {}", e),
                timeout: false,
            })?;

        Ok(Self {
            client,
            endpoint,
            signing_region,
        })
    }

    /// Send requests to `endpoint` instead, e.g. a VPC endpoint or a test server.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// The endpoint requests are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The region used in the signature scope.
    pub fn signing_region(&self) -> &str {
        &self.signing_region
    }

    fn host_header(&self) -> Result<HeaderValue, StsError> {
        let host = self.endpoint.host_str().ok_or_else(|| StsError::Signing {
            message: format!("endpoint '{}' has no host", self.endpoint),
        })?;
        let host = match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        host.parse().map_err(|_| StsError::Signing {
            message: format!("invalid host '{}'", host),
        })
    }

    async fn send(
        &self,
        base: &AwsCredentials,
        params: &[(String, String)],
    ) -> Result<String, StsError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();

        let mut headers = HeaderMap::new();
        headers.insert(HOST, self.host_header()?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));

        sign_request(
            "POST",
            self.endpoint.path(),
            &[],
            &mut headers,
            body.as_bytes(),
            base,
            &self.signing_region,
            &Utc::now(),
        )?;

        trace!("POST {} ({} bytes)", self.endpoint, body.len());

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| StsError::Transport {
                timeout: e.is_timeout(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| StsError::Transport {
            timeout: e.is_timeout(),
            message: e.to_string(),
        })?;

        if status.is_success() {
            return Ok(text);
        }

        debug!("STS returned HTTP {}", status.as_u16());
        Err(match parse_error_response(&text) {
            Some(doc) => StsError::Service {
                status: status.as_u16(),
                code: doc.code,
                message: doc.message,
                request_id: doc.request_id,
            },
            None => StsError::Service {
                status: status.as_u16(),
                code: status
                    .canonical_reason()
                    .unwrap_or("Unknown")
                    .replace(' ', ""),
                message: text.chars().take(256).collect(),
                request_id: None,
            },
        })
    }
}

#[async_trait]
impl StsApi for HttpStsClient {
    async fn get_session_token(
        &self,
        base: &AwsCredentials,
        request: &GetSessionTokenRequest,
    ) -> Result<SessionToken, StsError> {
        debug!(
            "GetSessionToken duration={}s mfa={}",
            request.duration.as_secs(),
            request.mfa.is_some()
        );
        let body = self.send(base, &request.to_params()).await?;
        parse_get_session_token(&body)
    }

    async fn assume_role(
        &self,
        base: &AwsCredentials,
        request: &AssumeRoleRequest,
    ) -> Result<AssumedRoleCredential, StsError> {
        debug!(
            "AssumeRole role={} session={} duration={}s mfa={}",
            request.role_arn,
            request.role_session_name,
            request.duration.as_secs(),
            request.mfa.is_some()
        );
        let body = self.send(base, &request.to_params()).await?;
        parse_assume_role(&body)
    }
}
