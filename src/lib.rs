//! postrank - trending and popular ordering from page-view statistics.
//!
//! Fetches top-viewed entities from a stats provider, caches them per
//! window and type set, merges the ranking with a host's own candidate
//! query, and keeps persisted lifetime view counters in step with the
//! provider.

pub mod config;
pub mod display;
pub mod models;
pub mod repository;
pub mod schema;
pub mod stats;
pub mod trending;
pub mod utils;
pub mod views;
