//! FalconX library
//!
//! Catalog storage, GitHub sync and admin login for the FalconX download
//! catalog. The `falconx` binary is a thin CLI over these modules.

pub mod app;
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod services;
pub mod storage;
