//! `sea-orm` entity definitions for the data model in the design's §3.
//! Hand-written rather than codegen'd (the hierarchy/example tables
//! don't exist yet in any live database this workspace can introspect),
//! following the same field-per-column, `ActiveModelBehavior` shape
//! codegen would produce.

pub mod course;
pub mod course_content;
pub mod course_content_deployment;
pub mod course_family;
pub mod deployment_history;
pub mod example;
pub mod example_dependency;
pub mod example_repository;
pub mod example_version;
pub mod organization;
