//! File-backed definition persistence.
//!
//! Layout: `<root>/agents/<id>.json` and `<root>/clients/<id>.json`.
//! YAML files are accepted on load for hand-authored definitions; saves
//! always write JSON. Every save re-validates shape first, so a broken
//! definition never reaches disk.

use agentry_bridge::{BridgeError, DefinitionStore};
use agentry_core_types::{AgentDefinition, ClientDefinition};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

pub struct FileDefinitionStore {
    root: PathBuf,
}

impl FileDefinitionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dir(&self, kind: &str) -> PathBuf {
        self.root.join(kind)
    }

    async fn read<T: DeserializeOwned>(&self, kind: &str, id: &str) -> Result<T, BridgeError> {
        let dir = self.dir(kind);
        for ext in ["json", "yaml", "yml"] {
            let path = dir.join(format!("{id}.{ext}"));
            if !fs::try_exists(&path).await.unwrap_or(false) {
                continue;
            }
            let content = fs::read_to_string(&path)
                .await
                .map_err(|err| BridgeError::Storage(err.to_string()))?;
            return parse_definition(&path, &content);
        }
        Err(BridgeError::DefinitionNotFound(id.to_string()))
    }

    async fn write<T: Serialize>(&self, kind: &str, id: &str, value: &T) -> Result<(), BridgeError> {
        let dir = self.dir(kind);
        fs::create_dir_all(&dir)
            .await
            .map_err(|err| BridgeError::Storage(err.to_string()))?;
        let path = dir.join(format!("{id}.json"));
        let content = serde_json::to_string_pretty(value)
            .map_err(|err| BridgeError::Storage(err.to_string()))?;
        fs::write(&path, content)
            .await
            .map_err(|err| BridgeError::Storage(err.to_string()))?;
        info!(path = %path.display(), "definition saved");
        Ok(())
    }

    async fn list(&self, kind: &str) -> Result<Vec<String>, BridgeError> {
        let dir = self.dir(kind);
        if !fs::try_exists(&dir).await.unwrap_or(false) {
            return Ok(Vec::new());
        }
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|err| BridgeError::Storage(err.to_string()))?;
        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| BridgeError::Storage(err.to_string()))?
        {
            let path = entry.path();
            let known_ext = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| matches!(ext, "json" | "yaml" | "yml"))
                .unwrap_or(false);
            if !known_ext {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn delete(&self, kind: &str, id: &str) -> Result<(), BridgeError> {
        let dir = self.dir(kind);
        for ext in ["json", "yaml", "yml"] {
            let path = dir.join(format!("{id}.{ext}"));
            if fs::try_exists(&path).await.unwrap_or(false) {
                fs::remove_file(&path)
                    .await
                    .map_err(|err| BridgeError::Storage(err.to_string()))?;
                return Ok(());
            }
        }
        Err(BridgeError::DefinitionNotFound(id.to_string()))
    }
}

fn parse_definition<T: DeserializeOwned>(path: &Path, content: &str) -> Result<T, BridgeError> {
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml::from_str(content).map_err(|err| BridgeError::Storage(err.to_string()))
    } else {
        serde_json::from_str(content).map_err(|err| BridgeError::Storage(err.to_string()))
    }
}

#[async_trait]
impl DefinitionStore for FileDefinitionStore {
    async fn load_agent(&self, id: &str) -> Result<AgentDefinition, BridgeError> {
        self.read("agents", id).await
    }

    async fn save_agent(&self, agent: &AgentDefinition) -> Result<(), BridgeError> {
        agent
            .validate()
            .map_err(|err| BridgeError::Storage(err.to_string()))?;
        self.write("agents", &agent.id, agent).await
    }

    async fn list_agents(&self) -> Result<Vec<String>, BridgeError> {
        self.list("agents").await
    }

    async fn delete_agent(&self, id: &str) -> Result<(), BridgeError> {
        self.delete("agents", id).await
    }

    async fn load_client(&self, id: &str) -> Result<ClientDefinition, BridgeError> {
        self.read("clients", id).await
    }

    async fn save_client(&self, client: &ClientDefinition) -> Result<(), BridgeError> {
        client
            .validate()
            .map_err(|err| BridgeError::Storage(err.to_string()))?;
        self.write("clients", &client.id, client).await
    }

    async fn list_clients(&self) -> Result<Vec<String>, BridgeError> {
        self.list("clients").await
    }

    async fn delete_client(&self, id: &str) -> Result<(), BridgeError> {
        self.delete("clients", id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentry_core_types::{CapabilityDefinition, ExecutionMode, Step};
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_agent() -> AgentDefinition {
        AgentDefinition {
            id: "sampler".into(),
            name: "Sampler".into(),
            mode: ExecutionMode::Safe,
            assist: None,
            uses_raw_script: false,
            capabilities: vec![CapabilityDefinition {
                name: "main".into(),
                parameters: vec![],
                steps: vec![Step::Return {
                    value: Some(json!(1)),
                }],
            }],
        }
    }

    #[tokio::test]
    async fn save_load_list_delete_round_trip() {
        let dir = TempDir::new().expect("temp dir");
        let store = FileDefinitionStore::new(dir.path());

        let agent = sample_agent();
        store.save_agent(&agent).await.expect("save");
        assert_eq!(store.list_agents().await.unwrap(), vec!["sampler"]);

        let loaded = store.load_agent("sampler").await.expect("load");
        assert_eq!(loaded, agent);

        store.delete_agent("sampler").await.expect("delete");
        assert!(store.list_agents().await.unwrap().is_empty());
        assert!(matches!(
            store.load_agent("sampler").await,
            Err(BridgeError::DefinitionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn invalid_definitions_never_reach_disk() {
        let dir = TempDir::new().expect("temp dir");
        let store = FileDefinitionStore::new(dir.path());

        let mut agent = sample_agent();
        agent.mode = ExecutionMode::Safe;
        agent.capabilities[0].steps.push(Step::RunScript {
            script: "1".into(),
            args: vec![],
            timeout_ms: None,
            store_as: None,
        });
        assert!(store.save_agent(&agent).await.is_err());
        assert!(store.list_agents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn yaml_definitions_load_too() {
        let dir = TempDir::new().expect("temp dir");
        let store = FileDefinitionStore::new(dir.path());

        let yaml = r#"
id: handwritten
name: Handwritten
mode: safe
capabilities:
  - name: main
    steps:
      - Wait:
          ms: 1
"#;
        let agents_dir = dir.path().join("agents");
        std::fs::create_dir_all(&agents_dir).unwrap();
        std::fs::write(agents_dir.join("handwritten.yaml"), yaml).unwrap();

        let loaded = store.load_agent("handwritten").await.expect("load yaml");
        assert_eq!(loaded.id, "handwritten");
        assert_eq!(loaded.capabilities[0].steps.len(), 1);
    }
}
