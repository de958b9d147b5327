//! Registry module for Docker registry interactions
//!
//! This module provides challenge parsing, token management and the manifest client
//! for Docker Registry HTTP API v2.

pub mod auth;
pub mod challenge;
pub mod client;
pub mod token_cache;

pub use auth::Auth;
pub use challenge::AuthChallenge;
pub use client::{RegistryClient, RegistryClientBuilder};
pub use token_cache::TokenCache;
