//! Server process configuration, layered the same way as
//! [`computor_orchestrator::config`]'s sibling `OrchestratorConfig`:
//! defaults, then an optional TOML file, then `COMPUTOR_`-prefixed
//! environment overrides.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitlabConfig {
    pub url: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreCredentials {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    pub database_url: String,
    pub gitlab: GitlabConfig,
    pub object_store: ObjectStoreCredentials,
    #[serde(default = "default_worktree_root")]
    pub worktree_root: String,
}

fn default_worktree_root() -> String {
    "/tmp/computor-worktrees".to_string()
}

impl ServerConfig {
    pub fn load(config_file: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder().set_default("bind_address", default_bind_address())?;
        if let Some(path) = config_file {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("COMPUTOR").separator("__").try_parsing(true));
        builder.build()?.try_deserialize()
    }
}
