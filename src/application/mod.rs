//! Application services layer scaffolding.

pub mod error;
pub mod fetch;
pub mod list;
pub mod pagination;
pub mod producers;
pub mod warm;
