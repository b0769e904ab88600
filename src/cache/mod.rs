//! Object cache used by the option registry.
//!
//! Entries are whole option tables addressed by `(namespace, key)`. The
//! cache is request-scoped: the binary builds one [`RequestCache`] per
//! invocation and the root options entry never outlives it.

mod store;

pub use store::{ObjectCache, RequestCache};
