//! Client for the LockUp laboratory access/scheduling backend.
pub mod api_client;
pub mod auth;
pub mod directory_getter;
pub mod enrollment;
pub mod error;
pub mod helpers;
pub mod identity_provider;
pub mod models;
pub mod poller;
pub mod run_tool;
pub mod session_store;
