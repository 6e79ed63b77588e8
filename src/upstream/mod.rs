//! Client for the paginated upstream API.

pub mod api_types;
pub mod client;
pub mod error;
pub mod payload;
pub mod retry;

pub use api_types::Listing;
pub use client::ApiClient;
pub use error::FetchError;
pub use payload::Payload;
pub use retry::RetryPolicy;
