//! REST front door (§6) over the DWE adapter: every mutating route
//! submits a workflow and returns its id immediately; the only
//! synchronous route is example assignment, which is a single DB
//! transaction rather than a workflow.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/system/deploy/organizations", post(routes::deploy::deploy_organization))
        .route("/system/deploy/course-families", post(routes::deploy::deploy_course_family))
        .route("/system/deploy/courses", post(routes::deploy::deploy_course))
        .route("/system/hierarchy/create", post(routes::deploy::create_hierarchy))
        .route("/system/hierarchy/status/{workflow_id}", get(routes::workflow::hierarchy_status))
        .route("/system/courses/{course_id}/generate-assignments", post(routes::workflow::generate_assignments))
        .route(
            "/system/courses/{course_id}/generate-student-template",
            post(routes::workflow::generate_student_template),
        )
        .route("/course-contents/{course_content_id}/assign-example", post(routes::assign::assign_example))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
