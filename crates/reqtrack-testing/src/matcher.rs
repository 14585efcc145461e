use http::{HeaderMap, Method, Uri};
use serde_json::Value;

/// Matcher for HTTP requests
///
/// All criteria are combined with AND; an empty matcher matches everything.
#[derive(Debug, Clone, Default)]
pub struct RequestMatcher {
    pub(crate) method: Option<Method>,
    pub(crate) path: Option<String>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) json_fields: Vec<(String, Value)>,
}

impl RequestMatcher {
    /// Create a new matcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Match a specific HTTP method
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Match a specific path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Match a query parameter value
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Match a specific header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Match one field of a JSON body, addressed by JSON pointer
    /// (`/events/0/params/path`)
    pub fn json_field(mut self, pointer: impl Into<String>, value: impl serde::Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.json_fields.push((pointer.into(), value));
        self
    }

    /// Check if the matcher matches a request
    pub fn matches(&self, method: &Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) -> bool {
        if let Some(m) = &self.method {
            if m != method {
                return false;
            }
        }

        if let Some(p) = &self.path {
            if p != uri.path() {
                return false;
            }
        }

        if !self.query.is_empty() {
            let pairs = query_pairs(uri);
            let all_present = self
                .query
                .iter()
                .all(|(k, v)| pairs.iter().any(|(pk, pv)| pk == k && pv == v));
            if !all_present {
                return false;
            }
        }

        for (k, v) in &self.headers {
            match headers.get(k) {
                Some(val) if val == v.as_str() => {}
                _ => return false,
            }
        }

        if !self.json_fields.is_empty() {
            let Ok(actual) = serde_json::from_slice::<Value>(body) else {
                return false;
            };
            for (pointer, expected) in &self.json_fields {
                if actual.pointer(pointer) != Some(expected) {
                    return false;
                }
            }
        }

        true
    }
}

/// Decoded key/value pairs of the query string
pub(crate) fn query_pairs(uri: &Uri) -> Vec<(String, String)> {
    uri.query()
        .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
        .unwrap_or_default()
}
