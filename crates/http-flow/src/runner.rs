//! Client capability execution.

use crate::errors::HttpFlowError;
use crate::extract::{apply_field_map, extract_path};
use crate::request::build_request;
use crate::transport::HttpTransport;
use agentry_core_types::{ClientDefinition, Credentials};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Structured result of one client capability call. Never a panic or a
/// propagated error: build failures and non-2xx responses both land here.
#[derive(Debug, Clone, Default)]
pub struct CallReport {
    pub success: bool,
    pub status: Option<u16>,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl CallReport {
    fn ok(status: u16, data: Value) -> Self {
        Self {
            success: true,
            status: Some(status),
            data: Some(data),
            error: None,
        }
    }

    fn failed(status: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Runs declarative client capabilities over a pluggable transport.
#[derive(Clone)]
pub struct ClientRunner {
    transport: Arc<dyn HttpTransport>,
}

impl ClientRunner {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Execute one capability of a client definition.
    ///
    /// Configuration errors (unknown capability, missing parameters or
    /// credential fields) are converted to a failed report here, the
    /// single catch point for this layer.
    pub async fn execute_capability(
        &self,
        client: &ClientDefinition,
        capability_name: &str,
        params: &HashMap<String, Value>,
        credentials: &Credentials,
    ) -> CallReport {
        let Some(capability) = client.capability(capability_name) else {
            return CallReport::failed(
                None,
                HttpFlowError::UnknownCapability {
                    client: client.id.clone(),
                    name: capability_name.to_string(),
                }
                .to_string(),
            );
        };

        let request = match build_request(client, capability, params, credentials) {
            Ok(request) => request,
            Err(err) => return CallReport::failed(None, err.to_string()),
        };

        let response = match self.transport.send(&request).await {
            Ok(response) => response,
            Err(err) => return CallReport::failed(None, err.to_string()),
        };

        if !response.is_success() {
            warn!(
                client = %client.id,
                capability = capability_name,
                status = response.status,
                "client call failed"
            );
            return CallReport::failed(Some(response.status), response.body);
        }

        let mut data: Value =
            serde_json::from_str(&response.body).unwrap_or(Value::String(response.body));

        if let Some(spec) = &capability.response {
            if let Some(path) = &spec.extract_path {
                data = extract_path(&data, path);
            }
            data = apply_field_map(data, &spec.field_map);
        }

        debug!(client = %client.id, capability = capability_name, "client call succeeded");
        CallReport::ok(response.status, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::PreparedRequest;
    use crate::transport::HttpResponse;
    use agentry_core_types::{
        AuthSpec, ClientCapabilityDefinition, ClientParam, HttpMethod, ParamLocation, ResponseSpec,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Canned transport that records the request it saw.
    struct CannedTransport {
        response: HttpResponse,
        seen: Mutex<Option<PreparedRequest>>,
    }

    impl CannedTransport {
        fn new(status: u16, body: &str) -> Self {
            Self {
                response: HttpResponse {
                    status,
                    body: body.to_string(),
                },
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for CannedTransport {
        async fn send(&self, request: &PreparedRequest) -> Result<HttpResponse, HttpFlowError> {
            *self.seen.lock().unwrap() = Some(request.clone());
            Ok(self.response.clone())
        }
    }

    fn weather_client() -> ClientDefinition {
        ClientDefinition {
            id: "weather".into(),
            name: "Weather API".into(),
            base_url: "https://api.example.com".into(),
            auth: AuthSpec::ApiKey {
                header_name: "X-API-Key".into(),
            },
            capabilities: vec![ClientCapabilityDefinition {
                name: "current".into(),
                method: HttpMethod::Get,
                path: "/weather".into(),
                parameters: vec![ClientParam {
                    name: "q".into(),
                    location: ParamLocation::Query,
                    required: true,
                    default: None,
                }],
                headers: HashMap::new(),
                body_template: None,
                response: Some(ResponseSpec {
                    extract_path: Some("data.current".into()),
                    field_map: HashMap::from([("temp_c".to_string(), "temperature".to_string())]),
                }),
            }],
        }
    }

    fn credentials() -> Credentials {
        Credentials::from([("api_key".to_string(), "k".to_string())])
    }

    #[tokio::test]
    async fn success_extracts_and_renames() {
        let transport = Arc::new(CannedTransport::new(
            200,
            r#"{"data": {"current": {"temp_c": 21, "wind": 5}}}"#,
        ));
        let runner = ClientRunner::new(transport.clone());
        let client = weather_client();
        let params = HashMap::from([("q".to_string(), json!("London"))]);

        let report = runner
            .execute_capability(&client, "current", &params, &credentials())
            .await;
        assert!(report.success);
        assert_eq!(report.status, Some(200));
        assert_eq!(report.data.unwrap(), json!({ "temperature": 21, "wind": 5 }));

        let seen = transport.seen.lock().unwrap().clone().unwrap();
        assert!(seen.url.query().unwrap().contains("q=London"));
        assert!(seen.headers.iter().any(|(name, _)| name == "X-API-Key"));
    }

    #[tokio::test]
    async fn not_found_response_is_a_structured_failure() {
        let runner = ClientRunner::new(Arc::new(CannedTransport::new(404, "no such city")));
        let client = weather_client();
        let params = HashMap::from([("q".to_string(), json!("Atlantis"))]);

        let report = runner
            .execute_capability(&client, "current", &params, &credentials())
            .await;
        assert!(!report.success);
        assert_eq!(report.status, Some(404));
        assert_eq!(report.error.as_deref(), Some("no such city"));
    }

    #[tokio::test]
    async fn unknown_capability_is_a_structured_failure() {
        let runner = ClientRunner::new(Arc::new(CannedTransport::new(200, "{}")));
        let client = weather_client();

        let report = runner
            .execute_capability(&client, "forecast", &HashMap::new(), &credentials())
            .await;
        assert!(!report.success);
        assert!(report.error.unwrap().contains("forecast"));
        assert_eq!(report.status, None);
    }

    #[tokio::test]
    async fn missing_parameter_is_a_structured_failure() {
        let runner = ClientRunner::new(Arc::new(CannedTransport::new(200, "{}")));
        let client = weather_client();

        let report = runner
            .execute_capability(&client, "current", &HashMap::new(), &credentials())
            .await;
        assert!(!report.success);
        assert!(report.error.unwrap().contains("'q'"));
    }

    #[tokio::test]
    async fn non_json_success_body_becomes_a_string_value() {
        let runner = ClientRunner::new(Arc::new(CannedTransport::new(200, "pong")));
        let mut client = weather_client();
        client.capabilities[0].response = None;
        let params = HashMap::from([("q".to_string(), json!("x"))]);

        let report = runner
            .execute_capability(&client, "current", &params, &credentials())
            .await;
        assert!(report.success);
        assert_eq!(report.data.unwrap(), json!("pong"));
    }
}
