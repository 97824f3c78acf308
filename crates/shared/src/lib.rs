//! Shared utilities and common types for the deskctl backend and agent.
//!
//! This crate provides common functionality used across all other crates:
//! - Registration token generation
//! - RSA-OAEP command payload encryption and decryption
//! - Password hashing with Argon2id
//! - JWT session tokens for the owner-facing API

pub mod crypto;
pub mod jwt;
pub mod password;
pub mod token;
