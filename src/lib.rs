//! Community layer for a multi-site publishing host: the option registry
//! with its feature flags, and the sites directory page.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
mod util;
