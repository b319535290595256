//! Helpers for handlers that render the inspection endpoint.

use bytes::Bytes;
use http::{header, HeaderValue, Request, Response, StatusCode};
use http_body_util::Full;
use inspector_core::PageResult;

/// Page computed by the inspector for this request, if it targeted the
/// inspection path.
pub fn page_from_request<B>(req: &Request<B>) -> Option<&PageResult> {
    req.extensions().get::<PageResult>()
}

/// Render a page as an `application/json` response.
pub fn page_json_response(page: &PageResult) -> Response<Full<Bytes>> {
    match serde_json::to_vec(page) {
        Ok(body) => {
            let mut response = Response::new(Full::new(Bytes::from(body)));
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            response
        }
        Err(err) => {
            tracing::warn!(error = %err, "Failed to serialize inspector page");
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}
