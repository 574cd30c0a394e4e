//! Core types, config, errors, and credential loading for chatvox.

pub mod auth;
pub mod config;
pub mod error;
pub mod types;
