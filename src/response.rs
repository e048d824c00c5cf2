//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! A [`Response`] carries a status, a [`Payload`] and a header map. Structured
//! payloads stay as [`serde_json::Value`] until the very end of the request,
//! so after-hooks can still inspect them and the negotiated serializer decides
//! the wire format.

use bytes::Bytes;
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use serde_json::Value;
use tracing::{error, warn};

use crate::serializer::Serializer;

// ── Payload ───────────────────────────────────────────────────────────────────

/// The body of a [`Response`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    /// Structured data, encoded by the negotiated serializer when sent.
    Data(Value),
    /// Bytes sent verbatim. Used for downloads and pre-encoded bodies.
    Raw(Bytes),
}

impl Payload {
    /// Raw bytes: `Payload::raw("Hello, World!")`.
    pub fn raw(body: impl Into<Bytes>) -> Self {
        Self::Raw(body.into())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self { Self::Data(value) }
}

impl From<serde_json::Map<String, Value>> for Payload {
    fn from(map: serde_json::Map<String, Value>) -> Self { Self::Data(Value::Object(map)) }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self { Self::Raw(bytes) }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use gantry::{Payload, Response, StatusCode};
/// use serde_json::json;
///
/// Response::new(StatusCode::OK, json!({"success": true}))
///     .header("Test", "It Worked!");
///
/// Response::new(StatusCode::OK, Payload::raw("Hello, World!"))
///     .download("hello_world.txt");
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) payload: Payload,
}

impl Response {
    pub fn new(status: StatusCode, payload: impl Into<Payload>) -> Self {
        Self { status, headers: HeaderMap::new(), payload: payload.into() }
    }

    /// Response with no body.
    pub fn status(status: StatusCode) -> Self {
        Self::new(status, Payload::Empty)
    }

    /// `{"error": message}` with the given status.
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::new(status, serde_json::json!({ "error": message }))
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn payload(&self) -> &Payload { &self.payload }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn set_payload(&mut self, payload: impl Into<Payload>) -> &mut Self {
        self.payload = payload.into();
        self
    }

    /// Header value as text, if present and valid UTF-8.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Sets `name` to `value`, replacing any previous value. Returns `self`
    /// for chaining from a handler.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// In-place form of [`header`](Response::header), for after-hooks.
    ///
    /// A name or value that is not valid in HTTP is dropped with a warning.
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!(header = name, "ignoring invalid response header"),
        }
        self
    }

    /// Marks the response as a file download named `filename`.
    pub fn download(mut self, filename: &str) -> Self {
        let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
        self.set_header(
            CONTENT_DISPOSITION.as_str(),
            &format!("attachment; filename=\"{escaped}\""),
        );
        self
    }

    /// The filename declared by [`download`](Response::download), if any.
    pub fn download_name(&self) -> Option<&str> {
        let disposition = self.header_value(CONTENT_DISPOSITION.as_str())?;
        let rest = disposition.strip_prefix("attachment;")?.trim_start();
        let quoted = rest.strip_prefix("filename=\"")?.strip_suffix('"')?;
        Some(quoted)
    }

    /// Encodes the payload and converts into the hyper response type.
    ///
    /// `Data` goes through `serializer`; `Raw` defaults to
    /// `application/octet-stream`. An explicit `Content-Type` set by the
    /// handler or a hook is never overwritten. A serializer failure becomes
    /// an empty `500`.
    pub(crate) fn into_http(self, serializer: &dyn Serializer) -> http::Response<Full<Bytes>> {
        let Self { status, mut headers, payload } = self;

        let (body, content_type) = match payload {
            Payload::Empty => (Bytes::new(), None),
            Payload::Raw(bytes) => (bytes, Some("application/octet-stream")),
            Payload::Data(value) => match serializer.serialize(&value) {
                Ok(bytes) => (bytes, Some(serializer.content_type())),
                Err(e) => {
                    error!(
                        content_type = serializer.content_type(),
                        "response payload not serialized: {e}",
                    );
                    let mut res = http::Response::new(Full::new(Bytes::new()));
                    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                    return res;
                }
            },
        };

        if let Some(ct) = content_type {
            headers.entry(CONTENT_TYPE).or_insert(HeaderValue::from_static(ct));
        }

        let mut res = http::Response::new(Full::new(body));
        *res.status_mut() = status;
        *res.headers_mut() = headers;
        res
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

/// Return a status directly from a handler: `return StatusCode::NO_CONTENT`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

/// `200 OK` with a structured payload.
impl IntoResponse for Value {
    fn into_response(self) -> Response { Response::new(StatusCode::OK, self) }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::new(StatusCode::OK, Payload::raw(self))
            .header(CONTENT_TYPE.as_str(), "text/plain; charset=utf-8")
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::new(StatusCode::OK, Payload::raw(self))
            .header(CONTENT_TYPE.as_str(), "text/plain; charset=utf-8")
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for Result<T, E> {
    fn into_response(self) -> Response {
        match self {
            Ok(ok) => ok.into_response(),
            Err(err) => err.into_response(),
        }
    }
}
