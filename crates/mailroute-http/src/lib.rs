//! mailroute-http — HTTP provider adapter backed by `reqwest`.
//!
//! A vendor integration implements [`VendorApi`] (request shape and success
//! parsing). [`HttpMailProvider`] wraps it with the shared behavior:
//! - validation before any network call
//! - one POST per send with a bounded timeout
//! - status and transport error classification
//! - adaptive scoring of every outcome

pub mod classify;
pub mod client;
pub mod vendor;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use classify::{classify_decode, classify_transport};
pub use client::{HttpMailProvider, HttpProviderConfig};
pub use vendor::VendorApi;
