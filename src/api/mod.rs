//! REST client module for the protected resource API.
//!
//! This module provides the `ApiClient` for calling application endpoints
//! that require `Authorization: Bearer <token>`, layering the silent
//! renew-and-retry protocol onto every outbound request.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
