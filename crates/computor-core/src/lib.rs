//! Ambient types shared by every Computor crate: the error taxonomy
//! (§7 of the design), retry policies, and typed configuration loading.

pub mod config;
pub mod error;
pub mod logging;
pub mod retry;

pub use error::{ComputorError, ErrorKind};
pub use retry::RetryPolicy;
