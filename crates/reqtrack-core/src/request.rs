//! Request types for reqtrack

use bytes::Bytes;
use http::{header, request::Parts, Extensions, HeaderMap, Method, Uri, Version};
use std::borrow::Cow;
use std::net::SocketAddr;

/// HTTP Request wrapper
///
/// Holds the request head, the body the host already read off the wire,
/// and the address of the peer that sent it.
pub struct Request {
    pub(crate) parts: Parts,
    pub(crate) body: Option<Bytes>,
    pub(crate) remote_addr: Option<SocketAddr>,
}

impl Request {
    /// Create a new request from parts and an already collected body
    pub fn new(parts: Parts, body: Bytes, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            parts,
            body: Some(body),
            remote_addr,
        }
    }

    /// Build a request from an `http::Request` whose body is in memory
    pub fn from_http(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts, body, None)
    }

    /// Set the peer address
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Get the HTTP method
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Get the URI
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Get the HTTP version
    pub fn version(&self) -> Version {
        self.parts.version
    }

    /// Get the headers
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Get a header value as text
    ///
    /// Non-ASCII bytes are decoded as UTF-8; invalid sequences become U+FFFD.
    pub fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.parts
            .headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
    }

    /// Get the raw `User-Agent` header, or an empty string
    pub fn user_agent(&self) -> Cow<'_, str> {
        self.parts
            .headers
            .get(header::USER_AGENT)
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
            .unwrap_or(Cow::Borrowed(""))
    }

    /// Get request extensions
    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    /// Get mutable extensions
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    /// Get the request path
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Get the query string
    pub fn query_string(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    /// Address of the connected peer, including its port
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Borrow the body without consuming it
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Take the body bytes (can only be called once)
    pub fn take_body(&mut self) -> Option<Bytes> {
        self.body.take()
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("version", &self.parts.version)
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}
