//! mailroute-providers — vendor profiles for the major transactional email APIs.
//!
//! Each module knows one vendor's endpoint, authentication and JSON shapes,
//! and builds a ready-to-register [`HttpMailProvider`](mailroute_http::HttpMailProvider).
//!
//! # Quick start
//! ```rust,no_run
//! use std::sync::Arc;
//! use mailroute_core::Dispatcher;
//! use mailroute_providers::{mandrill, sendgrid};
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher.register(Arc::new(sendgrid::provider("SG.KEY").unwrap()));
//! dispatcher.register(Arc::new(mandrill::provider("MD-KEY").unwrap()));
//! ```

pub mod mandrill;
pub mod sendgrid;
