//! Tier list storage core.
//!
//! Reads are served through a tag-indexed cache, writes flush exactly the tags
//! they made stale, and images dropped from a board are deleted from the
//! remote asset store in the background.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
