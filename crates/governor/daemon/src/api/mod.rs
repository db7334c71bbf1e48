//! API layer for governor-daemon

pub mod rest;

pub use rest::create_router;
