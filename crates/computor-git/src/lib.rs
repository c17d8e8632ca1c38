//! Git Host Gateway (GHG, §4.4): a capability over the hosting
//! provider for group/project provisioning and member access, plus a
//! `git`-CLI-backed transport for authenticated clone/commit/push.

pub mod client;
pub mod model;
pub mod transport;

pub use client::{GitHostGateway, GitLabClient};
pub use model::{
    AccessLevel, GitlabProperties, GroupSpec, GroupSpecBuilder, MemberPrincipal, ProjectSpec, ProjectSpecBuilder,
};
pub use transport::GitTransport;
