//! InspectorLayer middleware for request recording.
//!
//! The service drains each request body, hands an identical replayable body
//! to the inner service and, once the inner service has produced a response,
//! prepends a [`RequestRecord`] to the shared [`RequestLog`]. Requests under
//! the inspection path are never recorded; they get a [`PageResult`] in
//! their extensions instead.

use crate::client_ip::resolve_client_ip;
use crate::config::InspectorConfig;
use bytes::Bytes;
use chrono::Utc;
use http::{Request, Response};
use http_body::Body;
use inspector_core::form::{
    extract_form, header_media_type, headers_to_map, parse_cookies, parse_query,
};
use inspector_core::{
    capture_request, paginate, BoxError, PageQuery, PageResult, ReplayBody, RequestLog,
    RequestRecord,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Request recording middleware layer.
///
/// # Example
///
/// ```ignore
/// use inspector_middleware::{InspectorConfig, InspectorLayer};
/// use tower::ServiceBuilder;
///
/// let inspector = InspectorLayer::with_config(
///     InspectorConfig::new().max_records(500),
/// );
///
/// let service = ServiceBuilder::new()
///     .layer(inspector.clone())
///     .service(app);
///
/// // Later, from anywhere holding the layer:
/// let page = inspector.paginate(PageQuery::default());
/// ```
#[derive(Clone)]
pub struct InspectorLayer {
    config: Arc<InspectorConfig>,
    log: Arc<RequestLog>,
}

impl InspectorLayer {
    /// Create a new InspectorLayer with default configuration.
    pub fn new() -> Self {
        Self::with_config(InspectorConfig::new())
    }

    /// Create an InspectorLayer with custom configuration.
    pub fn with_config(config: InspectorConfig) -> Self {
        let log = match config.max_records {
            Some(max) => RequestLog::bounded(max),
            None => RequestLog::new(),
        };
        Self {
            config: Arc::new(config),
            log: Arc::new(log),
        }
    }

    /// Record into an existing log instead of the one built from the config.
    pub fn with_log(mut self, log: Arc<RequestLog>) -> Self {
        self.log = log;
        self
    }

    /// Get a reference to the request log.
    pub fn log(&self) -> &Arc<RequestLog> {
        &self.log
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// Compute a page over the current log using the configured inspection
    /// path and page size cap.
    pub fn paginate(&self, query: PageQuery) -> PageResult {
        paginate_with(&self.config, &self.log, query)
    }
}

impl Default for InspectorLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for InspectorLayer {
    type Service = InspectorService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InspectorService {
            inner,
            config: self.config.clone(),
            log: self.log.clone(),
        }
    }
}

/// Service produced by [`InspectorLayer`].
#[derive(Clone)]
pub struct InspectorService<S> {
    inner: S,
    config: Arc<InspectorConfig>,
    log: Arc<RequestLog>,
}

impl<S> InspectorService<S> {
    /// Get a reference to the request log.
    pub fn log(&self) -> &Arc<RequestLog> {
        &self.log
    }
}

impl<S, B, ResBody> Service<Request<B>> for InspectorService<S>
where
    S: Service<Request<ReplayBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        // The clone may not be ready; use the instance that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let config = self.config.clone();
        let log = self.log.clone();

        Box::pin(async move {
            if config.is_inspection_path(req.uri().path()) {
                let query = PageQuery::from_query_with_default(
                    req.uri().query(),
                    config.default_per_page,
                );
                let page = paginate_with(&config, &log, query);
                tracing::trace!(
                    page = page.current_page,
                    per_page = page.per_page,
                    total = page.total,
                    "Serving inspector page"
                );

                let (mut req, _) = capture_request(req).await;
                req.extensions_mut().insert(page);
                return inner.call(req).await;
            }

            let requested_at = Utc::now();
            let (req, captured) = capture_request(req).await;

            let method = req.method().clone();
            let path = req.uri().path().to_string();
            let get_params = parse_query(req.uri().query());
            let headers = headers_to_map(req.headers());
            let cookies = parse_cookies(req.headers());
            let client_ip = resolve_client_ip(&req, config.trust_forwarded_headers);
            let request_content_type = header_media_type(req.headers());
            let form = extract_form(&method, req.headers(), captured.bytes());
            // Multipart payloads carry file contents; only their metadata is kept.
            let body = if form.multipart.is_some() {
                String::new()
            } else {
                captured.recorded_text(config.max_body_capture)
            };
            drop(captured);

            let response = inner.call(req).await?;

            let status = response.status().as_u16();
            let content_type = match header_media_type(response.headers()) {
                ct if ct.is_empty() => request_content_type,
                ct => ct,
            };

            let record = RequestRecord::new(method.as_str(), path)
                .with_requested_at(requested_at)
                .with_status(status)
                .with_content_type(content_type)
                .with_get_params(get_params)
                .with_post_params(form.post_params)
                .with_multipart(form.multipart)
                .with_client_ip(client_ip)
                .with_cookies(cookies)
                .with_headers(headers)
                .with_body(body);

            let record = log.insert(record);
            tracing::debug!(
                method = %record.http_method,
                path = %record.request_url,
                status = record.http_status,
                "Recorded request"
            );

            Ok(response)
        })
    }
}

fn paginate_with(config: &InspectorConfig, log: &RequestLog, query: PageQuery) -> PageResult {
    paginate(
        log,
        query.clamp_per_page(config.max_per_page),
        &config.inspection_path,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layer() {
        let layer = InspectorLayer::new();
        assert_eq!(layer.config().path(), "/_inspector");
        assert_eq!(layer.log().capacity(), Some(1000));
        assert!(layer.log().is_empty());
    }

    #[test]
    fn test_unbounded_layer() {
        let layer = InspectorLayer::with_config(InspectorConfig::new().unbounded());
        assert_eq!(layer.log().capacity(), None);
    }

    #[test]
    fn test_shared_log() {
        let log = Arc::new(RequestLog::bounded(5));
        let layer = InspectorLayer::new().with_log(log.clone());
        let service = layer.layer(());

        log.insert(RequestRecord::new("GET", "/a"));
        assert_eq!(service.log().len(), 1);
        assert_eq!(layer.log().capacity(), Some(5));
    }

    #[test]
    fn test_layer_paginate_clamps_page_size() {
        let layer = InspectorLayer::with_config(InspectorConfig::new().max_per_page(Some(10)));
        for i in 0..25 {
            layer
                .log()
                .insert(RequestRecord::new("GET", format!("/{}", i)));
        }

        let page = layer.paginate(PageQuery::new(1, 100));
        assert_eq!(page.per_page, 10);
        assert_eq!(page.len(), 10);
        assert_eq!(page.total_page, 3);
        assert_eq!(page.next_page_url, "/_inspector?page=2&per_page=10");
    }
}
