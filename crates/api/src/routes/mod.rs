//! HTTP routes

pub mod session;
pub mod state;
