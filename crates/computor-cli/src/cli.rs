//! Command-line surface over HP/DP/AD/TG (§6). Connection details are
//! global flags (with `env` fallbacks via clap's `env` feature) shared
//! by every subcommand; each subcommand drives exactly one workflow
//! body in-process, without going through the DWE adapter or the REST
//! front door.

use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "computor", version, about = "Course Provisioning & Student-Template Orchestrator CLI")]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Postgres connection string for the catalog/hierarchy database.
    #[arg(long, env = "COMPUTOR_DATABASE_URL")]
    pub database_url: String,

    /// Base URL of the GitLab instance acting as the provider.
    #[arg(long, env = "COMPUTOR_GITLAB_URL")]
    pub gitlab_url: String,

    /// Personal/service access token for `gitlab_url`.
    #[arg(long, env = "COMPUTOR_GITLAB_TOKEN")]
    pub gitlab_token: String,

    /// S3/MinIO endpoint backing the content store.
    #[arg(long, env = "COMPUTOR_OBJECT_STORE_ENDPOINT")]
    pub object_store_endpoint: String,

    /// Bucket holding synchronized example archives.
    #[arg(long, env = "COMPUTOR_OBJECT_STORE_BUCKET")]
    pub object_store_bucket: String,

    #[arg(long, env = "COMPUTOR_OBJECT_STORE_ACCESS_KEY")]
    pub object_store_access_key: String,

    #[arg(long, env = "COMPUTOR_OBJECT_STORE_SECRET_KEY")]
    pub object_store_secret_key: String,

    /// Scratch directory for AD/TG clone/push working trees.
    #[arg(long, env = "COMPUTOR_WORKTREE_ROOT", default_value = "/tmp/computor-worktrees")]
    pub worktree_root: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Runs `DeployHierarchy` against a declarative YAML config file.
    DeployHierarchy {
        /// Path to the organization/courseFamily/course YAML (§6).
        #[arg(long)]
        config: std::path::PathBuf,
    },
    /// Prints the `DeploymentPlan` for a course without materializing anything.
    Plan {
        #[arg(long)]
        course_id: Uuid,
    },
    /// Runs `GenerateAssignments` for a course.
    GenerateAssignments {
        #[arg(long)]
        course_id: Uuid,
    },
    /// Runs `GenerateStudentTemplate` for a course.
    GenerateStudentTemplate {
        #[arg(long)]
        course_id: Uuid,
    },
}
