//! `agentry`: run declarative agent and client capabilities from the
//! command line.

use agentry_bridge::PolicySettings;
use agentry_cli::{build_registry, load_definitions};
use agentry_core_types::{AgentDefinition, ClientDefinition};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agentry", about = "Declarative agent execution core", version)]
struct Cli {
    /// Directory holding agents/ and clients/ definition files
    #[arg(long, global = true, default_value = "definitions")]
    definitions: PathBuf,

    /// Reject everything but safe-mode agents
    #[arg(long, global = true)]
    strict_safe_mode: bool,

    /// Allow raw-script steps (requires an attached DOM bridge)
    #[arg(long, global = true)]
    allow_raw_script: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one capability of a registered agent
    Run {
        /// Agent definition id
        #[arg(long)]
        agent: String,
        /// Capability name
        #[arg(long)]
        capability: String,
        /// Call parameters as key=value (value parsed as JSON, else string)
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
        /// User-configuration entries as key=value
        #[arg(long = "config", value_name = "KEY=VALUE")]
        config: Vec<String>,
    },
    /// Call one capability of a registered HTTP client
    Call {
        /// Client definition id
        #[arg(long)]
        client: String,
        /// Capability name
        #[arg(long)]
        capability: String,
        /// Call parameters as key=value (value parsed as JSON, else string)
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
    /// List registered agents and clients
    List,
    /// Validate a definition file without registering it
    Validate {
        /// Path to a JSON or YAML definition
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let settings = PolicySettings {
        strict_safe_mode: cli.strict_safe_mode,
        allow_raw_script: cli.allow_raw_script,
        allow_model_assisted: true,
    };

    match cli.command {
        Command::Run {
            agent,
            capability,
            params,
            config,
        } => {
            let registry = build_registry(settings);
            load_definitions(&registry, &cli.definitions)
                .await
                .context("loading definitions")?;
            let report = registry
                .invoke_agent(
                    &agent,
                    &capability,
                    parse_pairs(&params)?,
                    Arc::new(parse_pairs(&config)?),
                    None,
                )
                .await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.success {
                std::process::exit(1);
            }
        }

        Command::Call {
            client,
            capability,
            params,
        } => {
            let registry = build_registry(settings);
            load_definitions(&registry, &cli.definitions)
                .await
                .context("loading definitions")?;
            let outcome = registry
                .invoke_client(&client, &capability, parse_pairs(&params)?)
                .await;
            println!("{}", serde_json::to_string_pretty(&outcome.into_value())?);
        }

        Command::List => {
            let registry = build_registry(settings);
            load_definitions(&registry, &cli.definitions)
                .await
                .context("loading definitions")?;
            let mut agents = registry.list_agents();
            agents.sort();
            let mut clients = registry.list_clients();
            clients.sort();
            println!("agents:");
            for id in agents {
                println!("  {id}");
            }
            println!("clients:");
            for id in clients {
                println!("  {id}");
            }
        }

        Command::Validate { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            validate_definition(&file, &content)?;
            println!("{} is valid", file.display());
        }
    }

    Ok(())
}

fn parse_pairs(pairs: &[String]) -> Result<HashMap<String, Value>> {
    let mut map = HashMap::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("expected KEY=VALUE, got '{pair}'");
        };
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        map.insert(key.to_string(), value);
    }
    Ok(map)
}

/// Try the file as an agent definition first, then as a client definition.
fn validate_definition(path: &PathBuf, content: &str) -> Result<()> {
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );

    let as_agent: Result<AgentDefinition, String> = if is_yaml {
        serde_yaml::from_str(content).map_err(|err| err.to_string())
    } else {
        serde_json::from_str(content).map_err(|err| err.to_string())
    };
    if let Ok(agent) = as_agent {
        agent.validate()?;
        return Ok(());
    }

    let as_client: Result<ClientDefinition, String> = if is_yaml {
        serde_yaml::from_str(content).map_err(|err| err.to_string())
    } else {
        serde_json::from_str(content).map_err(|err| err.to_string())
    };
    match as_client {
        Ok(client) => {
            client.validate()?;
            Ok(())
        }
        Err(err) => bail!("not a valid agent or client definition: {err}"),
    }
}
