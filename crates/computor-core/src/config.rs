//! Typed configuration for the orchestrator worker process, loaded
//! through the layered `config` crate (defaults, then a TOML file,
//! then environment overrides prefixed `COMPUTOR_`) rather than parsed
//! by hand.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    pub default_bucket: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_max_upload_bytes() -> u64 {
    50 * 1024 * 1024
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            default_bucket: "examples".to_string(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub task_queue: String,
    #[serde(default = "default_worktree_root", deserialize_with = "path_or_default")]
    pub worktree_root: String,
}

fn default_worktree_root() -> String {
    "/tmp/computor-worktrees".to_string()
}

fn path_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_worktree_root))
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            task_queue: "computor-orchestrator".to_string(),
            worktree_root: default_worktree_root(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrchestratorConfig {
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl OrchestratorConfig {
    /// Layer defaults, an optional config file, and `COMPUTOR_`
    /// environment overrides, in that priority order.
    pub fn load(config_file: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = config_file {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("COMPUTOR")
                .separator("__")
                .try_parsing(true),
        );
        builder.build()?.try_deserialize()
    }
}

/// Timeout envelope appropriate to an activity's nature, per §5:
/// fast DB activities ≤30s, provider calls ≤2min, repository
/// clone/push ≤10min, with heartbeats every ≤30s for long transfers.
#[derive(Debug, Clone, Copy)]
pub struct ActivityTimeouts;

impl ActivityTimeouts {
    pub const FAST_DB: Duration = Duration::from_secs(30);
    pub const PROVIDER_CALL: Duration = Duration::from_secs(2 * 60);
    pub const REPOSITORY_TRANSFER: Duration = Duration::from_secs(10 * 60);
    pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
}
