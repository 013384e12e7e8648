//! Command handlers

pub mod auth;
pub mod config;
pub mod prefs;
pub mod records;
pub mod status;
