//! Data structures for recorded requests.
//!
//! A [`RequestRecord`] is assembled by the recorder while a request is in
//! flight and becomes immutable once it is inserted into the
//! [`RequestLog`](crate::RequestLog), which hands it out as an `Arc`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered multi-map of parameter or header name to its values.
///
/// Keys are sorted; values keep the order in which they arrived.
pub type ParamMap = BTreeMap<String, Vec<String>>;

/// Build a [`ParamMap`] from name/value pairs, preserving value order per name.
pub fn param_map_from_pairs<I, K, V>(pairs: I) -> ParamMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut map = ParamMap::new();
    for (key, value) in pairs {
        map.entry(key.into()).or_default().push(value.into());
    }
    map
}

/// A single cookie sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookiePair {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
}

impl CookiePair {
    /// Create a new cookie pair.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Metadata of one uploaded file. The file contents are never kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    /// Client-supplied file name
    pub filename: String,

    /// Declared content type of the part, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Size of the file contents in bytes
    pub size: usize,

    /// Raw part headers
    pub headers: ParamMap,
}

/// Structure of a `multipart/form-data` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartForm {
    /// Text fields
    pub value: ParamMap,
    /// File fields, by form field name
    pub file: BTreeMap<String, Vec<FileHeader>>,
}

impl MultipartForm {
    /// Check whether the form has neither text nor file fields.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.file.is_empty()
    }
}

/// One completed request/response cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// When the request reached the recorder
    pub requested_at: DateTime<Utc>,

    /// Request path (without query string)
    pub request_url: String,

    /// HTTP method (GET, POST, etc.)
    pub http_method: String,

    /// Response status code
    pub http_status: u16,

    /// Media type of the exchange
    pub content_type: String,

    /// Query string parameters
    pub get_params: ParamMap,

    /// Urlencoded and multipart text fields
    pub post_params: ParamMap,

    /// Multipart structure, when the body was `multipart/form-data`
    pub post_multipart: Option<MultipartForm>,

    /// Client address
    pub client_ip: String,

    /// Cookies sent with the request
    pub cookies: Vec<CookiePair>,

    /// Request headers
    pub headers: ParamMap,

    /// Request body as text
    pub body: String,
}

impl RequestRecord {
    /// Start a record for `method` on `url`, stamped with the current time.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            requested_at: Utc::now(),
            request_url: url.into(),
            http_method: method.into(),
            http_status: 0,
            content_type: String::new(),
            get_params: ParamMap::new(),
            post_params: ParamMap::new(),
            post_multipart: None,
            client_ip: String::new(),
            cookies: Vec::new(),
            headers: ParamMap::new(),
            body: String::new(),
        }
    }

    /// Set the request timestamp.
    pub fn with_requested_at(mut self, at: DateTime<Utc>) -> Self {
        self.requested_at = at;
        self
    }

    /// Set the response status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = status;
        self
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Set the query parameters.
    pub fn with_get_params(mut self, params: ParamMap) -> Self {
        self.get_params = params;
        self
    }

    /// Set the form parameters.
    pub fn with_post_params(mut self, params: ParamMap) -> Self {
        self.post_params = params;
        self
    }

    /// Set the multipart structure.
    pub fn with_multipart(mut self, form: Option<MultipartForm>) -> Self {
        self.post_multipart = form;
        self
    }

    /// Set the client address.
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = ip.into();
        self
    }

    /// Set the cookies.
    pub fn with_cookies(mut self, cookies: Vec<CookiePair>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Set the request headers.
    pub fn with_headers(mut self, headers: ParamMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the captured body text.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}
