//! # ScriptKV Scripts
//!
//! Purpose: Cache Lua sources from disk and run them on store sessions by
//! content hash, with a single source-upload fallback.
//!
//! ## Design Principles
//! 1. **Explicit Ownership**: The cache is an object shared through `Arc`,
//!    not a global; it lives as long as its last runner.
//! 2. **Hash First**: `EVALSHA` on the hot path, `EVAL` only after `NOSCRIPT`.
//! 3. **Typed Failures**: IO, store replies and transport faults stay distinct.

mod cache;
mod error;
mod runner;

pub use cache::{ScriptCache, ScriptFile};
pub use error::{ScriptError, ScriptResult};
pub use runner::{ScriptRunner, NOSCRIPT};
