//! Incoming HTTP request type.
//!
//! A handler reads its inputs through three independent accessors, each
//! returning `None` for a missing key:
//!
//! | Accessor | Source | Example |
//! |---|---|---|
//! | [`Request::field`] | `{name}` segments of the route pattern | `example/field/{name}` |
//! | [`Request::data`]  | decoded body, addressed by dotted path | `client.name` |
//! | [`Request::query`] | query string | `?name=Jane` |

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method};
use serde_json::Value;
use tracing::debug;

use crate::serializer::Serializers;

/// An incoming HTTP request with its body already collected and decoded.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) fields: HashMap<String, String>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) data: Option<Value>,
}

impl Request {
    /// Builds a request from its parts, decoding the query string and the
    /// body. The body is decoded by the serializer matching `Content-Type`;
    /// an empty or undecodable body simply has no data.
    pub(crate) fn new(
        method: Method,
        path: String,
        raw_query: Option<&str>,
        headers: HeaderMap,
        body: Bytes,
        serializers: &Serializers,
    ) -> Self {
        let query = raw_query
            .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
            .unwrap_or_default();

        let data = if body.is_empty() {
            None
        } else {
            let content_type = headers
                .get(http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let codec = serializers.for_content_type(content_type);
            match codec.deserialize(&body) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!(content_type = codec.content_type(), "request body not decoded: {e}");
                    None
                }
            }
        };

        Self { method, path, headers, body, fields: HashMap::new(), query, data }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Mutable headers, for before-hooks that annotate the request.
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    /// Case-insensitive header lookup. Non-UTF-8 values are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path field.
    ///
    /// For a route `example/field/{name}`, `req.field("name")` on
    /// `/example/field/Jane%20Doe` returns `Some("Jane Doe")`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Returns the value at a dotted path inside the decoded body.
    ///
    /// Each segment selects an object key, or an array index when the
    /// current value is an array: `items.0.id`. An explicit JSON `null` is
    /// treated the same as a missing key.
    pub fn data(&self, path: &str) -> Option<&Value> {
        let mut current = self.data.as_ref()?;
        for segment in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        (!current.is_null()).then_some(current)
    }

    /// Returns the first value of a query-string parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Path fields are stored percent-decoded; a value that does not decode
    /// to UTF-8 is kept as matched.
    pub(crate) fn set_fields<'a>(&mut self, fields: impl Iterator<Item = (&'a str, &'a str)>) {
        self.fields = fields
            .map(|(k, v)| {
                let value = urlencoding::decode(v)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| v.to_owned());
                (k.to_owned(), value)
            })
            .collect();
    }
}
