//! API request handlers

mod admin;
mod operations;
mod status;

pub use admin::*;
pub use operations::*;
pub use status::*;
