//! Application services layer.

pub mod error;
pub mod janitor;
pub mod orphans;
pub mod pagination;
pub mod repos;
pub mod tier_lists;
