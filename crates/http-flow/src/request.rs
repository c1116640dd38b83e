//! Pure request assembly.

use crate::errors::HttpFlowError;
use agentry_core_types::{
    AuthSpec, ClientCapabilityDefinition, ClientDefinition, Credentials, HttpMethod, ParamLocation,
};
use base64::Engine;
use serde_json::{Map, Value};
use std::collections::HashMap;
use url::Url;
use value_engine::{resolve, Scope};

/// A fully-shaped outbound request, ready for a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Build the concrete request for one capability call.
///
/// Path parameters substitute into the path template, query parameters are
/// appended url-encoded, exactly one auth scheme is injected, and a body
/// is shaped only for methods that accept one.
pub fn build_request(
    client: &ClientDefinition,
    capability: &ClientCapabilityDefinition,
    params: &HashMap<String, Value>,
    credentials: &Credentials,
) -> Result<PreparedRequest, HttpFlowError> {
    let supplied = collect_params(capability, params)?;

    // path template substitution
    let mut path = capability.path.clone();
    for (name, value) in supplied.iter_by_location(ParamLocation::Path) {
        path = path.replace(&format!("{{{name}}}"), &as_text(value));
    }

    let joined = format!(
        "{}/{}",
        client.base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = Url::parse(&joined).map_err(|err| HttpFlowError::InvalidUrl(err.to_string()))?;

    {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in supplied.iter_by_location(ParamLocation::Query) {
            pairs.append_pair(name, &as_text(value));
        }
    }

    let mut headers = Vec::new();
    inject_auth(&client.auth, credentials, &mut headers)?;
    for (name, value) in &capability.headers {
        headers.push((name.clone(), value.clone()));
    }
    for (name, value) in supplied.iter_by_location(ParamLocation::Header) {
        headers.push((name.to_string(), as_text(value)));
    }

    let body = if capability.method.accepts_body() {
        build_body(capability, &supplied)
    } else {
        None
    };

    Ok(PreparedRequest {
        method: capability.method,
        url,
        headers,
        body,
    })
}

struct SuppliedParams<'a> {
    entries: Vec<(&'a str, ParamLocation, Value)>,
}

impl<'a> SuppliedParams<'a> {
    fn iter_by_location(
        &self,
        location: ParamLocation,
    ) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.entries
            .iter()
            .filter(move |(_, loc, _)| *loc == location)
            .map(|(name, _, value)| (*name, value))
    }

    fn as_value_map(&self) -> HashMap<String, Value> {
        self.entries
            .iter()
            .map(|(name, _, value)| (name.to_string(), value.clone()))
            .collect()
    }
}

/// Merge call parameters with declared defaults; a required parameter with
/// neither is a configuration error.
fn collect_params<'a>(
    capability: &'a ClientCapabilityDefinition,
    params: &HashMap<String, Value>,
) -> Result<SuppliedParams<'a>, HttpFlowError> {
    let mut entries = Vec::new();
    for spec in &capability.parameters {
        let value = params.get(&spec.name).cloned().or_else(|| spec.default.clone());
        match value {
            Some(value) => entries.push((spec.name.as_str(), spec.location, value)),
            None if spec.required => {
                return Err(HttpFlowError::MissingParameter {
                    capability: capability.name.clone(),
                    name: spec.name.clone(),
                })
            }
            None => {}
        }
    }
    Ok(SuppliedParams { entries })
}

/// Inject exactly one auth scheme into the header list.
fn inject_auth(
    auth: &AuthSpec,
    credentials: &Credentials,
    headers: &mut Vec<(String, String)>,
) -> Result<(), HttpFlowError> {
    let field = |name: &str| -> Result<&str, HttpFlowError> {
        credentials
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| HttpFlowError::MissingCredential(name.to_string()))
    };

    match auth {
        AuthSpec::None => {}
        AuthSpec::Bearer => {
            headers.push(("Authorization".into(), format!("Bearer {}", field("token")?)));
        }
        AuthSpec::ApiKey { header_name } => {
            headers.push((header_name.clone(), field("api_key")?.to_string()));
        }
        AuthSpec::Basic => {
            let pair = format!("{}:{}", field("username")?, field("password")?);
            let encoded = base64::engine::general_purpose::STANDARD.encode(pair);
            headers.push(("Authorization".into(), format!("Basic {encoded}")));
        }
        AuthSpec::Oauth2 => {
            headers.push((
                "Authorization".into(),
                format!("Bearer {}", field("access_token")?),
            ));
        }
    }
    Ok(())
}

/// Template takes precedence; otherwise body-located parameters collect
/// into one object. No body parameters means no body at all.
fn build_body(
    capability: &ClientCapabilityDefinition,
    supplied: &SuppliedParams<'_>,
) -> Option<Value> {
    if let Some(template) = &capability.body_template {
        let vars = supplied.as_value_map();
        let config = HashMap::new();
        return Some(resolve(template, &Scope::new(&vars, &config)));
    }

    let mut body = Map::new();
    for (name, value) in supplied.iter_by_location(ParamLocation::Body) {
        body.insert(name.to_string(), value.clone());
    }
    if body.is_empty() {
        None
    } else {
        Some(Value::Object(body))
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
