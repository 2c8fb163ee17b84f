//! HTTP client for the nutrition service REST API.
//!
//! All outbound traffic goes through [`ApiClient`], whose middleware chain
//! attaches the current bearer credential at call time and reports every
//! HTTP 401 to a registered [`UnauthorizedHandler`] before the call site
//! sees the failure.

mod client;
mod credentials;
mod error;
mod middleware;
pub mod models;

pub use client::{ApiClient, ApiClientConfig};
pub use credentials::{CredentialProvider, NoopUnauthorizedHandler, StoredTokenProvider, UnauthorizedHandler};
pub use error::{ApiError, ApiResult};
pub use middleware::{BearerAuthMiddleware, UnauthorizedMiddleware};
