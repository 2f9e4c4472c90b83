// src/settings.rs

use std::{net::SocketAddr, path::Path};

use clap::Parser;
use config::{builder::DefaultState, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

const DEFAULT_ADDR: &str = "0.0.0.0:10000";
const ENV_PREFIX: &str = "DOCTORBOT";

#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// Path to the local configuration TOML file.
    #[arg(short, value_name = "CONFIG_PATH")]
    pub config: std::path::PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Web {
    #[serde(deserialize_with = "deserialize_socket_addr")]
    pub address: SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSettings {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub api_url: String,
    pub api_key: String,
    /// Model tried once at startup.
    pub model: String,
    /// Model used for the rest of the process when that first call fails.
    pub fallback_model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Number of most recent turns rendered into the prompt. `0` keeps the
    /// whole conversation.
    pub history_turns: usize,
    /// Fail the turn instead of answering without graph context when the
    /// knowledge graph is unavailable.
    pub strict_graph: bool,
    /// Sampling temperature of every reply. Kept low for consistent
    /// medical phrasing.
    pub temperature: f32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_turns: 20,
            strict_graph: false,
            temperature: 0.4,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    pub web: Web,
    pub graph: GraphSettings,
    pub llm: LlmSettings,
    pub chat: ChatSettings,
}

impl Settings {
    /// Load settings from the given TOML file, with sane defaults.
    ///
    /// Values from the file can be overridden by environment variables such
    /// as `DOCTORBOT_LLM__API_KEY` or `DOCTORBOT_GRAPH__PASSWORD`, which keeps
    /// credentials out of the file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::load(path, environment())
    }

    fn load(path: &Path, env: Environment) -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::<DefaultState>::default()
            .set_default("web.address", DEFAULT_ADDR)?
            .set_default("graph.uri", "neo4j://127.0.0.1:7687")?
            .set_default("graph.user", "neo4j")?
            .set_default("graph.password", "")?
            .set_default("graph.timeout_secs", 10)?
            .set_default("llm.api_url", "https://api.cohere.com")?
            .set_default("llm.api_key", "")?
            .set_default("llm.model", "command-a-03-2025")?
            .set_default("llm.fallback_model", "command-r7b-12-2024")?
            .set_default("llm.timeout_secs", 60)?
            .set_default("chat.history_turns", 20)?
            .set_default("chat.strict_graph", false)?
            .set_default("chat.temperature", 0.4)?;

        let cfg = builder
            .add_source(File::from(path))
            .add_source(env)
            .build()?;

        cfg.try_deserialize()
    }

    /// Replaces the listening port with the value of a `PORT` variable, as
    /// set by hosting platforms.
    pub fn apply_port_override(&mut self, port: Option<&str>) -> Result<(), ConfigError> {
        if let Some(port) = port {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|e| ConfigError::Message(format!("invalid PORT {port:?}: {e}")))?;
            self.web.address.set_port(port);
        }
        Ok(())
    }
}

/// `DOCTORBOT_<SECTION>__<KEY>`, e.g. `DOCTORBOT_LLM__API_KEY`.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn deserialize_socket_addr<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}
