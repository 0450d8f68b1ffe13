//! Common error handling utilities for the EHR Engine
//!
//! This crate holds the pieces of error handling that every other crate in the
//! workspace agrees on:
//!
//! - **Error Codes**: stable, machine-readable codes attached to API error bodies
//! - **Process Errors**: [`EhrError`], the error type binaries return from `main`
//!
//! Domain crates (`auth-identity`, `clinical-records`) define their own
//! `thiserror` enums; the HTTP server translates those into API responses and
//! picks the matching code from [`codes`].
//!
//! # Example
//!
//! ```rust
//! use error_common::{codes, ErrorCode};
//!
//! let code = ErrorCode::new(codes::authentication::INVALID_CREDENTIALS);
//! assert_eq!(code.category(), "AUTH");
//! ```

pub mod codes;
pub mod types;

pub use codes::ErrorCode;
pub use types::*;
