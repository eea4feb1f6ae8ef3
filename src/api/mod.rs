//! Collection endpoint contract: wire types and the HTTP binding.

mod client;
mod types;

pub use client::HttpEndpoint;
pub use types::{Metadata, PageRequest, PageResponse};
