//! Client-side sparse cache for server-paginated collections, with the
//! projection of raw records into display-ready entities.

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod project;
