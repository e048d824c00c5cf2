//! Body codecs keyed by media type.
//!
//! A [`Serializer`] turns a structured payload ([`serde_json::Value`]) into
//! response bytes and request bytes back into a payload. The dispatcher picks
//! one per request: `Content-Type` decides how the body is read, `Accept`
//! decides how the response payload is written. JSON is the default on both
//! sides.
//!
//! ```rust
//! use gantry::{App, Config};
//! use gantry::serializer::FormSerializer;
//!
//! let mut app = App::new(Config::default());
//! app.add_serializer(FormSerializer);
//! ```

use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::error::Error;

/// A codec between structured payloads and body bytes.
pub trait Serializer: Send + Sync + 'static {
    /// Media type this serializer reads and writes, e.g. `application/json`.
    fn content_type(&self) -> &'static str;

    fn serialize(&self, value: &Value) -> Result<Bytes, Error>;

    fn deserialize(&self, body: &[u8]) -> Result<Value, Error>;
}

// ── JSON ──────────────────────────────────────────────────────────────────────

/// `application/json` via serde_json. The default serializer.
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn serialize(&self, value: &Value) -> Result<Bytes, Error> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    fn deserialize(&self, body: &[u8]) -> Result<Value, Error> {
        Ok(serde_json::from_slice(body)?)
    }
}

// ── Form ──────────────────────────────────────────────────────────────────────

/// `application/x-www-form-urlencoded` via serde_urlencoded.
///
/// Form bodies are flat, so nesting is expressed with dotted keys:
/// `client.name=Jane` decodes to `{"client": {"name": "Jane"}}` and encodes
/// back the same way. Array elements use their index as the key segment.
/// Every decoded leaf is a string; when a key repeats, the first value wins.
pub struct FormSerializer;

impl Serializer for FormSerializer {
    fn content_type(&self) -> &'static str {
        "application/x-www-form-urlencoded"
    }

    fn serialize(&self, value: &Value) -> Result<Bytes, Error> {
        if !value.is_object() {
            return Err(Error::Serialize("form payloads must be objects".to_owned()));
        }
        let mut pairs = Vec::new();
        flatten("", value, &mut pairs);
        serde_urlencoded::to_string(&pairs)
            .map(Bytes::from)
            .map_err(|e| Error::Serialize(e.to_string()))
    }

    fn deserialize(&self, body: &[u8]) -> Result<Value, Error> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_bytes(body).map_err(|e| Error::Serialize(e.to_string()))?;

        let mut root = Map::new();
        for (key, value) in pairs {
            insert_dotted(&mut root, &key, Value::String(value));
        }
        Ok(Value::Object(root))
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    let join = |key: &str| {
        if prefix.is_empty() { key.to_owned() } else { format!("{prefix}.{key}") }
    };
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten(&join(key), child, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten(&join(&index.to_string()), child, out);
            }
        }
        Value::Null => out.push((prefix.to_owned(), String::new())),
        Value::String(s) => out.push((prefix.to_owned(), s.clone())),
        other => out.push((prefix.to_owned(), other.to_string())),
    }
}

fn insert_dotted(root: &mut Map<String, Value>, key: &str, value: Value) {
    let mut segments = key.split('.').peekable();
    let mut map = root;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            map.entry(segment).or_insert(value);
            return;
        }
        map = match map
            .entry(segment)
            .or_insert_with(|| Value::Object(Map::new()))
        {
            Value::Object(child) => child,
            // A scalar already sits at this prefix (`a=1&a.b=2`); keep it.
            _ => return,
        };
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// The serializers an application knows about. The first entry is the
/// default and is always present.
#[derive(Clone)]
pub(crate) struct Serializers {
    codecs: Vec<Arc<dyn Serializer>>,
}

impl Serializers {
    /// Registers `serializer`, replacing any existing one for the same media type.
    pub(crate) fn insert(&mut self, serializer: Arc<dyn Serializer>) {
        let media = serializer.content_type();
        match self.codecs.iter_mut().find(|c| c.content_type().eq_ignore_ascii_case(media)) {
            Some(slot) => *slot = serializer,
            None => self.codecs.push(serializer),
        }
    }

    pub(crate) fn default_codec(&self) -> &Arc<dyn Serializer> {
        &self.codecs[0]
    }

    /// Serializer for a request body, chosen by its `Content-Type`.
    pub(crate) fn for_content_type(&self, header: Option<&str>) -> &Arc<dyn Serializer> {
        header
            .and_then(|h| self.find(essence(h)))
            .unwrap_or_else(|| self.default_codec())
    }

    /// Serializer for a response payload, chosen by the first `Accept` entry
    /// gantry can produce. Quality values are not weighed.
    pub(crate) fn for_accept(&self, header: Option<&str>) -> &Arc<dyn Serializer> {
        let Some(header) = header else { return self.default_codec() };
        for entry in header.split(',') {
            let media = essence(entry);
            if media == "*/*" {
                return self.default_codec();
            }
            if let Some(codec) = self.find(media) {
                return codec;
            }
        }
        self.default_codec()
    }

    fn find(&self, media: &str) -> Option<&Arc<dyn Serializer>> {
        self.codecs.iter().find(|c| c.content_type().eq_ignore_ascii_case(media))
    }
}

impl Default for Serializers {
    fn default() -> Self {
        Self { codecs: vec![Arc::new(JsonSerializer), Arc::new(FormSerializer)] }
    }
}

/// `text/html; charset=utf-8` → `text/html`
fn essence(value: &str) -> &str {
    value.split(';').next().unwrap_or_default().trim()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn form_dotted_keys_decode_into_nested_objects() {
        let value = FormSerializer
            .deserialize(b"client.name=John%20Doe&client.age=42&flag=")
            .unwrap();
        assert_eq!(value, json!({"client": {"name": "John Doe", "age": "42"}, "flag": ""}));
    }

    #[test]
    fn form_keeps_first_value_for_repeated_keys() {
        let value = FormSerializer.deserialize(b"a=1&a=2&a.b=3").unwrap();
        assert_eq!(value, json!({"a": "1"}));
    }

    #[test]
    fn form_encodes_nested_payload_with_dotted_keys() {
        let body = FormSerializer
            .serialize(&json!({"client": {"name": "Jane"}, "tags": ["x", "y"], "ok": true}))
            .unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains("client.name=Jane"));
        assert!(text.contains("tags.0=x"));
        assert!(text.contains("tags.1=y"));
        assert!(text.contains("ok=true"));
    }

    #[test]
    fn form_rejects_non_object_payloads() {
        assert!(FormSerializer.serialize(&json!(["a"])).is_err());
    }

    #[test]
    fn json_rejects_malformed_bodies() {
        assert!(JsonSerializer.deserialize(b"{not json").is_err());
    }

    #[test]
    fn content_type_selection_ignores_parameters_and_case() {
        let codecs = Serializers::default();
        let codec =
            codecs.for_content_type(Some("Application/X-WWW-Form-Urlencoded; charset=utf-8"));
        assert_eq!(codec.content_type(), "application/x-www-form-urlencoded");
        assert_eq!(codecs.for_content_type(None).content_type(), "application/json");
        assert_eq!(codecs.for_content_type(Some("text/csv")).content_type(), "application/json");
    }

    #[test]
    fn accept_selection_takes_first_known_entry() {
        let codecs = Serializers::default();
        let pick = |h: &str| codecs.for_accept(Some(h)).content_type();
        assert_eq!(
            pick("text/html, application/x-www-form-urlencoded;q=0.9"),
            "application/x-www-form-urlencoded",
        );
        assert_eq!(pick("*/*"), "application/json");
        assert_eq!(pick("image/png"), "application/json");
    }

    #[test]
    fn insert_replaces_codec_with_same_media_type() {
        struct Compact;
        impl Serializer for Compact {
            fn content_type(&self) -> &'static str { "application/json" }
            fn serialize(&self, _: &Value) -> Result<Bytes, Error> { Ok(Bytes::from_static(b"{}")) }
            fn deserialize(&self, _: &[u8]) -> Result<Value, Error> { Ok(Value::Null) }
        }

        let mut codecs = Serializers::default();
        codecs.insert(Arc::new(Compact));
        let out = codecs.default_codec().serialize(&json!({"a": 1})).unwrap();
        assert_eq!(&out[..], b"{}");
    }
}
