//! Storage module
//!
//! Provides the per-process session storage (the `sessionStorage` area).

pub mod session_store;

pub use session_store::SessionStore;
