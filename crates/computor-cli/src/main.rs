mod cli;
mod exit;

use std::path::PathBuf;

use clap::Parser;
use cli::{Cli, Command, ConnectionArgs};
use computor_core::error::ComputorError;
use computor_git::GitLabClient;
use computor_orchestrator::config::DeployHierarchyConfig;
use computor_storage::{ContentStoreGateway, S3Backend};
use computor_workflow::activity::cancel_pair;

async fn run(cli: Cli) -> Result<serde_json::Value, ComputorError> {
    let ConnectionArgs {
        database_url,
        gitlab_url,
        gitlab_token,
        object_store_endpoint,
        object_store_bucket,
        object_store_access_key,
        object_store_secret_key,
        worktree_root,
    } = cli.connection;

    let db = sea_orm::Database::connect(&database_url)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
    let git = GitLabClient::new(gitlab_url, gitlab_token);
    let backend = S3Backend::new(&object_store_endpoint, &object_store_bucket, &object_store_access_key, &object_store_secret_key)?;
    let storage = ContentStoreGateway::new(backend, object_store_bucket);
    let (_cancel_handle, cancel) = cancel_pair();
    let worktree_root = PathBuf::from(worktree_root);

    match cli.command {
        Command::DeployHierarchy { config } => {
            let yaml = std::fs::read_to_string(&config).map_err(ComputorError::Io)?;
            let cfg = DeployHierarchyConfig::from_yaml(&yaml).map_err(|e| ComputorError::Validation(format!("invalid config: {e}")))?;
            let course = computor_orchestrator::deploy_hierarchy(&db, std::sync::Arc::new(git), &worktree_root, &cfg, cancel).await?;
            serde_json::to_value(course).map_err(|e| ComputorError::Validation(e.to_string()))
        }
        Command::Plan { course_id } => {
            let plan = computor_orchestrator::plan_course_deployment(&db, course_id).await?;
            serde_json::to_value(plan).map_err(|e| ComputorError::Validation(e.to_string()))
        }
        Command::GenerateAssignments { course_id } => {
            let workflow_id = computor_workflow::engine::derive_workflow_id("deploy-course", course_id);
            let outcomes = computor_orchestrator::generate_assignments(&db, &git, &storage, &worktree_root, course_id, &workflow_id, cancel).await?;
            let failed: Vec<_> = outcomes
                .iter()
                .filter_map(|o| o.result.as_ref().err().map(|e| format!("{}: {e}", o.deployment.target_path)))
                .collect();
            serde_json::to_value(serde_json::json!({ "deployed": outcomes.len() - failed.len(), "failed": failed }))
                .map_err(|e| ComputorError::Validation(e.to_string()))
        }
        Command::GenerateStudentTemplate { course_id } => {
            let built = computor_orchestrator::generate_student_template(&db, &git, &storage, &worktree_root, course_id, cancel).await?;
            serde_json::to_value(serde_json::json!({ "built": built })).map_err(|e| ComputorError::Validation(e.to_string()))
        }
    }
}

#[tokio::main]
async fn main() {
    computor_core::logging::init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).expect("json value is serializable"));
        }
        Err(err) => {
            let code = exit::exit_code_for(&err);
            eprintln!("error: {err}");
            std::process::exit(code);
        }
    }
}
