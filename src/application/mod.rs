//! Application services layer.

pub mod context;
pub mod directory;
pub mod error;
pub mod hooks;
pub mod options;
pub mod repos;
