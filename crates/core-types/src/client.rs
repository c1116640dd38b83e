//! Declarative HTTP client definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Named credential fields resolved by the credential vault collaborator.
pub type Credentials = HashMap<String, String>;

/// Authentication scheme for a client. Exactly one is injected per request.
///
/// Each variant names the credential fields it reads from the vault entry:
/// `token`, `api_key`, `username`/`password`, `access_token`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthSpec {
    #[default]
    None,
    /// `Authorization: Bearer <token>`.
    Bearer,
    /// `<header_name>: <api_key>`.
    ApiKey { header_name: String },
    /// `Authorization: Basic base64(username:password)`.
    Basic,
    /// OAuth2 access token presented as a bearer credential.
    Oauth2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Methods that carry a request body.
    pub fn accepts_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

/// Where a declared parameter lands in the outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamLocation {
    Path,
    Query,
    Body,
    Header,
}

/// One declared parameter of a client capability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientParam {
    pub name: String,
    pub location: ParamLocation,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
}

/// Response post-processing: path extraction then a flat field rename map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResponseSpec {
    /// Simplified path syntax: `$`, dotted fields, `field[n]`, `field[*]`.
    #[serde(default)]
    pub extract_path: Option<String>,
    /// Old name -> new name, applied to the extracted object(s).
    #[serde(default)]
    pub field_map: HashMap<String, String>,
}

/// One invocable HTTP call shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientCapabilityDefinition {
    pub name: String,
    pub method: HttpMethod,
    /// Path template; `{name}` segments are filled from path parameters.
    pub path: String,
    #[serde(default)]
    pub parameters: Vec<ClientParam>,
    /// Static headers sent with every call of this capability.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Body template with `{{name}}` placeholders; used instead of
    /// collecting body-located parameters when present.
    #[serde(default)]
    pub body_template: Option<Value>,
    #[serde(default)]
    pub response: Option<ResponseSpec>,
}

/// A declarative HTTP client: base URL, auth scheme, capabilities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientDefinition {
    pub id: String,
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthSpec,
    pub capabilities: Vec<ClientCapabilityDefinition>,
}

impl ClientDefinition {
    pub fn capability(&self, name: &str) -> Option<&ClientCapabilityDefinition> {
        self.capabilities.iter().find(|cap| cap.name == name)
    }

    /// Shape validation run before a definition is persisted or registered.
    pub fn validate(&self) -> Result<(), crate::agent::DefinitionError> {
        use crate::agent::DefinitionError;
        if self.id.trim().is_empty() {
            return Err(DefinitionError::EmptyId);
        }
        if self.capabilities.is_empty() {
            return Err(DefinitionError::NoCapabilities {
                id: self.id.clone(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for cap in &self.capabilities {
            if !seen.insert(cap.name.as_str()) {
                return Err(DefinitionError::DuplicateCapability {
                    id: self.id.clone(),
                    name: cap.name.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_spec_round_trips() {
        let auth = AuthSpec::ApiKey {
            header_name: "X-API-Key".into(),
        };
        let encoded = serde_json::to_string(&auth).expect("serialize");
        let decoded: AuthSpec = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded, auth);
    }

    #[test]
    fn only_body_methods_accept_bodies() {
        assert!(HttpMethod::Post.accepts_body());
        assert!(HttpMethod::Patch.accepts_body());
        assert!(!HttpMethod::Get.accepts_body());
        assert!(!HttpMethod::Delete.accepts_body());
    }
}
