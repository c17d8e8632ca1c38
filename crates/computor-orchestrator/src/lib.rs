//! Hierarchy Provisioner (HP, §4.6), Deployment Planner (DP, §4.7),
//! Assignment Deployer (AD, §4.8), and Template Generator (TG, §4.9) —
//! the four workflow-shaped components that turn a declarative
//! deployment config and a catalog of examples into a running course
//! with deployed, student-safe content.

pub mod config;
pub mod deployer;
pub mod planner;
pub mod provisioning;
pub mod template;

pub use config::{
    CourseConfig, CourseFamilyConfig, CourseSettingsConfig, DeployHierarchyConfig, ExecutionBackendConfig, GitlabTarget,
    OrganizationConfig, SourceConfig,
};
pub use deployer::{generate_assignments, DeploymentOutcome};
pub use planner::{plan_course_deployment, Deployment, DeploymentPlan};
pub use provisioning::{create_course, create_course_family, create_organization, deploy_hierarchy, CourseGitlabProperties, ProvisionState};
pub use template::generate_student_template;
