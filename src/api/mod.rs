//! Typed client for the storefront REST API, with a cached variant.

mod cache;
mod cached_client;
mod client;
mod error;
pub mod types;

pub use cache::StoreQueryKey;
pub use cached_client::CachedStoreClient;
pub use client::StoreClient;
pub use error::ApiError;
