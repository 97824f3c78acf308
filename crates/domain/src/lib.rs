//! Domain layer for deskctl.
//!
//! This crate contains:
//! - Domain models (Owner, Device, Command)
//! - The action payload union shared by the server and the agent
//! - Request/response types for the HTTP boundary

pub mod models;
