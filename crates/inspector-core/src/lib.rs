//! # inspector-core
//!
//! Capture-and-query engine behind `inspector-middleware`.
//!
//! - [`RequestRecord`] - snapshot of one request/response cycle
//! - [`RequestLog`] - shared, optionally bounded, newest-first log
//! - [`capture_request`] - drains a request body and rebuilds the request
//!   around a replayable copy
//! - [`paginate`] - computes a [`PageResult`] over the log
//!
//! This crate is framework-agnostic. Use `inspector-middleware` to plug it
//! into a tower stack.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod capture;
mod error;
pub mod form;
mod log;
mod paginate;
mod record;

pub use capture::{capture_body, capture_request, CapturedBody, ReplayBody};
pub use error::{BoxError, InspectorError, Result};
pub use form::FormFields;
pub use log::{RequestLog, DEFAULT_MAX_RECORDS};
pub use paginate::{
    paginate, PageQuery, PageResult, DEFAULT_MAX_PER_PAGE, DEFAULT_PAGE, DEFAULT_PER_PAGE,
};
pub use record::{
    param_map_from_pairs, CookiePair, FileHeader, MultipartForm, ParamMap, RequestRecord,
};
