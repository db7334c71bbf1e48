//! Safety governor daemon library
//!
//! This module provides the components of `governord`:
//! - REST API for operation evaluation, confirmation and audit reads
//! - Token-guarded admin API for approval factors, emergency stop and reset
//! - Background sweeper driving rollback expiry and posture evaluation
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod server;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError, DaemonResult};
pub use scheduler::Sweeper;
pub use server::Server;
