//! Shared action types for the pending-requests store and its clients.
//!
//! These are the literal interchange format between the request gate, the
//! pending-requests reducer and anything that dispatches into a store. An
//! action carrying `meta.httpRequest = { url, done }` takes part in
//! in-flight request tracking; every other action is invisible to it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

/// Metadata key under which the request tag travels on the wire.
pub const REQUEST_META_KEY: &str = "httpRequest";

// =====================================================
// Request tag
// =====================================================

/// Marks an action as part of a request lifecycle for `url`.
///
/// `done = false` is the begin action; `done = true` is the terminal action,
/// success and failure alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTag {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub done: bool,
}

impl RequestTag {
    pub fn begin(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            done: false,
        }
    }

    pub fn done(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            done: true,
        }
    }

    /// A tag without a url is never tracked.
    pub fn is_usable(&self) -> bool {
        !self.url.is_empty()
    }
}

// =====================================================
// Action
// =====================================================

/// An application action: a `type`, optional `meta`, and arbitrary fields.
///
/// `type` is carried as a string. Actions whose `type` is some other JSON
/// value are rejected at decode time.
///
/// `meta` is kept as the raw JSON value it arrived with, so an action the
/// request machinery does not recognise is forwarded exactly as received.
/// [`Action::request_tag`] is the typed view of `meta.httpRequest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "raw_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            meta: None,
            fields: Map::new(),
        }
    }

    /// Set a top-level field such as `payload` or `error`.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// A key of the `meta` record, if `meta` is an object holding it.
    pub fn meta_entry(&self, key: &str) -> Option<&Value> {
        self.meta.as_ref().and_then(|meta| meta.get(key))
    }

    /// Attach (or replace) the request tag, keeping any other metadata.
    ///
    /// A `meta` that is not an object is replaced.
    pub fn with_request_tag(mut self, tag: RequestTag) -> Self {
        let mut meta = match self.meta.take() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        meta.insert(
            REQUEST_META_KEY.to_string(),
            json!({ "url": tag.url, "done": tag.done }),
        );
        self.meta = Some(Value::Object(meta));
        self
    }

    /// The request tag, if the action carries a usable one.
    ///
    /// Tags that are not objects, have ill-typed fields, or have a missing or
    /// empty url are treated as absent.
    pub fn request_tag(&self) -> Option<RequestTag> {
        let raw = self.meta_entry(REQUEST_META_KEY)?;
        RequestTag::deserialize(raw)
            .ok()
            .filter(RequestTag::is_usable)
    }

    pub fn is_request_begin(&self) -> bool {
        self.request_tag().is_some_and(|tag| !tag.done)
    }

    pub fn is_request_done(&self) -> bool {
        self.request_tag().is_some_and(|tag| tag.done)
    }
}

/// Keeps an explicit `"meta": null` as `Some(Null)` so it re-serializes.
fn raw_meta<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
