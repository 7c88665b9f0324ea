//! sponsor-rpc
//!
//! Minimal, blocking HTTP client for a gas-sponsorship service.
//! One endpoint: POST `<endpoint>` with a Multicall3-shaped batch
//! (`{multicallData: [{target, allowFailure, callData}], metadata}`).
//!
//! Replies are `{success: true, data: {...}}` or `{success: false, message | error}`.
//! Non-2xx statuses and `success: false` both surface as typed errors carrying
//! the upstream message verbatim.

use alloy_primitives::{Address, Bytes};
use base64::{engine::general_purpose, Engine as _};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default request timeout. Sponsors hold the request open until the batch
/// lands, so this is deliberately long.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("url parse: {0}")]
    Url(#[from] url::ParseError),
    #[error("sponsor HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("sponsor rejected request: {0}")]
    Rejected(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RpcError {
    /// True when the request may never have reached the sponsor.
    pub fn is_network(&self) -> bool {
        match self {
            Self::Http(err) => err.status().is_none() && !err.is_decode(),
            _ => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum SponsorAuth {
    /// Sent as `x-api-key`.
    ApiKey(String),
    Bearer(String),
    Basic { user: String, pass: String },
}

impl SponsorAuth {
    fn header(&self) -> Result<(HeaderName, HeaderValue), RpcError> {
        let (name, value) = match self {
            Self::ApiKey(key) => (HeaderName::from_static(API_KEY_HEADER), key.clone()),
            Self::Bearer(token) => (AUTHORIZATION, format!("Bearer {token}")),
            Self::Basic { user, pass } => {
                let enc = general_purpose::STANDARD.encode(format!("{user}:{pass}"));
                (AUTHORIZATION, format!("Basic {enc}"))
            }
        };
        let value = HeaderValue::from_str(&value)
            .map_err(|e| RpcError::Decode(format!("auth header encode: {e}")))?;
        Ok((name, value))
    }
}

/// One `Call3` entry as the sponsor expects it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCall {
    pub target: Address,
    pub allow_failure: bool,
    pub call_data: Bytes,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorRequest {
    pub multicall_data: Vec<WireCall>,
    #[serde(default)]
    pub metadata: Value,
}

/// Sponsor reply envelope. Fields stay loosely typed so that one odd field
/// never turns a confirmed submission into a decode failure.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorReply {
    pub success: Option<Value>,
    pub message: Option<Value>,
    pub error: Option<Value>,
    pub data: Option<Value>,
}

impl SponsorReply {
    pub fn is_success(&self) -> bool {
        self.success == Some(Value::Bool(true))
    }

    fn failure_message(&self) -> String {
        self.message
            .as_ref()
            .and_then(scalar_text)
            .or_else(|| self.error.as_ref().and_then(scalar_text))
            .unwrap_or_else(|| "sponsor reported failure without a message".to_string())
    }

    /// A `data` member that is not an object yields an empty payload.
    fn into_sponsored(self) -> SponsoredTx {
        self.data
            .and_then(|data| serde_json::from_value(data).ok())
            .unwrap_or_default()
    }
}

/// Success payload. Every field is optional and kept as raw JSON; numbers
/// arrive as JSON numbers or strings depending on the sponsor. Render with
/// [`scalar_text`].
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsoredTx {
    pub transaction_hash: Option<Value>,
    pub block_number: Option<Value>,
    pub gas_used: Option<Value>,
    pub gas_cost: Option<Value>,
    pub sponsor_address: Option<Value>,
    pub execution_details: Option<Value>,
}

impl SponsoredTx {
    /// Looks up `executionDetails.<key>`; absent when the details are not an object.
    pub fn execution_detail(&self, key: &str) -> Option<&Value> {
        self.execution_details.as_ref()?.as_object()?.get(key)
    }
}

/// Renders a JSON scalar as text. Objects and arrays are rendered as JSON.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .and_then(scalar_text)
            .or_else(|| Some(value.to_string())),
        other => Some(other.to_string()),
    }
}

#[derive(Clone)]
pub struct SponsorClient {
    endpoint: Url,
    client: Client,
    auth: Option<(HeaderName, HeaderValue)>,
}

impl SponsorClient {
    /// `endpoint` is the full submission URL, e.g. "https://sponsor.example/v1/execute".
    pub fn new(
        endpoint: &str,
        auth: Option<SponsorAuth>,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let endpoint = Url::parse(endpoint)?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        let auth = auth.as_ref().map(SponsorAuth::header).transpose()?;
        Ok(Self {
            endpoint,
            client,
            auth,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some((name, value)) = &self.auth {
            h.insert(name.clone(), value.clone());
        }
        h
    }

    /// Submits one batch. Exactly one HTTP request, no retries.
    pub fn submit(&self, request: &SponsorRequest) -> Result<SponsoredTx, RpcError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .headers(self.auth_headers())
            .json(request)
            .send()?;
        let status = resp.status();
        let body = resp.text()?;

        if !status.is_success() {
            let message = serde_json::from_str::<SponsorReply>(&body)
                .ok()
                .map(|reply| reply.failure_message())
                .filter(|_| !body.trim().is_empty())
                .unwrap_or_else(|| non_json_message(status.as_u16(), &body));
            return Err(RpcError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| RpcError::Decode(format!("sponsor reply: {e}")))?;
        let reply: SponsorReply = match value {
            Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
            _ => SponsorReply::default(),
        };
        if !reply.is_success() {
            return Err(RpcError::Rejected(reply.failure_message()));
        }
        Ok(reply.into_sponsored())
    }
}

fn non_json_message(status: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn request() -> SponsorRequest {
        SponsorRequest {
            multicall_data: vec![WireCall {
                target: Address::repeat_byte(0x11),
                allow_failure: false,
                call_data: Bytes::from(vec![0xa9, 0x05, 0x9c, 0xbb]),
            }],
            metadata: json!({"operation_type": "payment"}),
        }
    }

    fn client(server: &MockServer, auth: Option<SponsorAuth>) -> SponsorClient {
        SponsorClient::new(&server.url("/v1/execute"), auth, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn request_serialization_matches_sponsor_payload() {
        let serialized = serde_json::to_value(request()).unwrap();
        assert_eq!(
            serialized,
            json!({
                "multicallData": [{
                    "target": "0x1111111111111111111111111111111111111111",
                    "allowFailure": false,
                    "callData": "0xa9059cbb"
                }],
                "metadata": {"operation_type": "payment"}
            })
        );
    }

    #[test]
    fn submit_posts_batch_and_decodes_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/execute")
                .header("x-api-key", "secret")
                .json_body(serde_json::to_value(request()).unwrap());
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "success": true,
                    "data": {
                        "transactionHash": "0xabc",
                        "blockNumber": 123,
                        "gasUsed": "21000",
                        "sponsorAddress": "0x2222222222222222222222222222222222222222",
                        "executionDetails": {"explorerUrl": "https://scan/tx/0xabc"}
                    }
                }));
        });

        let tx = client(&server, Some(SponsorAuth::ApiKey("secret".into())))
            .submit(&request())
            .unwrap();
        mock.assert();
        assert_eq!(tx.transaction_hash, Some(json!("0xabc")));
        assert_eq!(tx.block_number.as_ref().and_then(scalar_text).as_deref(), Some("123"));
        assert_eq!(tx.gas_used.as_ref().and_then(scalar_text).as_deref(), Some("21000"));
        assert!(tx.gas_cost.is_none());
        assert_eq!(
            tx.execution_detail("explorerUrl").and_then(scalar_text).as_deref(),
            Some("https://scan/tx/0xabc")
        );
        assert!(tx.execution_detail("chainName").is_none());
    }

    #[test]
    fn success_false_keeps_upstream_message() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/execute");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": false, "message": "quota exhausted for key"}));
        });

        let err = client(&server, None).submit(&request()).unwrap_err();
        mock.assert();
        match err {
            RpcError::Rejected(msg) => assert_eq!(msg, "quota exhausted for key"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn error_field_is_used_when_message_missing() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/execute");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": false, "error": {"message": "gas too high"}}));
        });

        let err = client(&server, None).submit(&request()).unwrap_err();
        assert!(matches!(err, RpcError::Rejected(ref m) if m == "gas too high"));
    }

    #[test]
    fn http_error_becomes_status_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/execute");
            then.status(503).body("upstream unavailable");
        });

        let err = client(&server, None).submit(&request()).unwrap_err();
        mock.assert();
        assert_eq!(err.status(), Some(503));
        assert!(!err.is_network());
        match err {
            RpcError::Status { message, .. } => assert_eq!(message, "upstream unavailable"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn http_error_with_json_body_uses_its_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/execute");
            then.status(401)
                .header("content-type", "application/json")
                .json_body(json!({"success": false, "message": "invalid api key"}));
        });

        let err = client(&server, None).submit(&request()).unwrap_err();
        assert!(matches!(
            err,
            RpcError::Status { status: 401, ref message } if message == "invalid api key"
        ));
    }

    #[test]
    fn garbage_success_body_is_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/execute");
            then.status(200).body("<html>ok</html>");
        });

        let err = client(&server, None).submit(&request()).unwrap_err();
        assert!(matches!(err, RpcError::Decode(_)));
    }

    #[test]
    fn mistyped_success_fields_do_not_fail_the_submission() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/execute");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "success": true,
                    "data": {
                        "transactionHash": "0xabc",
                        "sponsorAddress": {"addr": "0x1"},
                        "executionDetails": {"explorerUrl": "u", "chainName": 8453}
                    }
                }));
        });

        let tx = client(&server, None).submit(&request()).unwrap();
        assert_eq!(tx.transaction_hash.as_ref().and_then(scalar_text).as_deref(), Some("0xabc"));
        assert_eq!(tx.sponsor_address, Some(json!({"addr": "0x1"})));
        assert_eq!(
            tx.execution_detail("chainName").and_then(scalar_text).as_deref(),
            Some("8453")
        );
        assert_eq!(tx.execution_detail("explorerUrl").and_then(scalar_text).as_deref(), Some("u"));
    }

    #[test]
    fn non_object_data_is_an_empty_payload() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/execute");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": true, "data": "queued", "message": 7}));
        });

        let tx = client(&server, None).submit(&request()).unwrap();
        assert_eq!(tx, SponsoredTx::default());
    }

    #[test]
    fn success_must_be_literal_true() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/execute");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": "yes", "data": {"transactionHash": "0xabc"}}));
        });

        let err = client(&server, None).submit(&request()).unwrap_err();
        assert!(matches!(err, RpcError::Rejected(_)), "{err:?}");
    }

    #[test]
    fn unreachable_sponsor_is_network_error() {
        let client =
            SponsorClient::new("http://127.0.0.1:9/execute", None, Duration::from_secs(2)).unwrap();
        let err = client.submit(&request()).unwrap_err();
        assert!(err.is_network(), "{err:?}");
    }

    #[test]
    fn basic_auth_header_is_encoded() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/execute")
                .header("authorization", "Basic dXNlcjpwYXNz");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": true}));
        });

        let auth = SponsorAuth::Basic {
            user: "user".into(),
            pass: "pass".into(),
        };
        let tx = client(&server, Some(auth)).submit(&request()).unwrap();
        mock.assert();
        assert_eq!(tx, SponsoredTx::default());
    }
}
