//! Layered list cache and HTTP surface for the donor registry dashboard.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
