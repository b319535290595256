//! # inspector-middleware
//!
//! Tower middleware that keeps an in-memory history of recent HTTP requests
//! for debugging.
//!
//! [`InspectorLayer`] records every request that passes through it (method,
//! path, status, content type, query and form parameters, multipart file
//! metadata, client address, cookies, headers and body) without changing
//! what downstream handlers see. Requests under the inspection path
//! (`/_inspector` by default) are not recorded; the layer computes the
//! requested page of the log and attaches it to the request for the handler
//! to render.
//!
//! ## Example
//!
//! ```ignore
//! use inspector_middleware::{page_from_request, page_json_response, InspectorLayer};
//! use tower::{service_fn, ServiceBuilder};
//!
//! let service = ServiceBuilder::new()
//!     .layer(InspectorLayer::new())
//!     .service(service_fn(|req: http::Request<_>| async move {
//!         if let Some(page) = page_from_request(&req) {
//!             return Ok::<_, std::convert::Infallible>(page_json_response(page));
//!         }
//!         Ok(handle(req).await)
//!     }));
//! ```
//!
//! ## Query parameters
//!
//! The inspection endpoint reads `page` (default 1) and `per_page`
//! (default 20, capped at 500). Invalid values fall back to the defaults.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod client_ip;
mod config;
mod layer;
mod response;

pub use client_ip::ClientAddr;
pub use config::{ConfigError, InspectorConfig, DEFAULT_INSPECTION_PATH, ENV_PREFIX};
pub use layer::{InspectorLayer, InspectorService};
pub use response::{page_from_request, page_json_response};

pub use inspector_core::{
    CookiePair, FileHeader, MultipartForm, PageQuery, PageResult, ParamMap, ReplayBody,
    RequestLog, RequestRecord,
};
