//! Server-side rendering of community pages.

pub mod directory;
pub mod l10n;
pub mod nonce;
pub mod views;
