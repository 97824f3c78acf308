//! Device-side agent for deskctl.
//!
//! The agent registers itself against the server once, then runs a polling
//! loop: check in, fetch due commands, decrypt each payload with the local
//! private key, and dispatch it to the enabled executor modules. No inbound
//! port is ever opened; the server is only ever contacted outbound.

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod poller;
