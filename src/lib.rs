// Library surface for the typing engine and its host-side collaborators.
// The terminal frontend lives in main.rs and stays out of the lib.
pub mod app_dirs;
pub mod auth;
pub mod challenge;
pub mod clock;
pub mod config;
pub mod history;
pub mod runtime;
pub mod session;
pub mod store;
