//! Client identification.
//!
//! Neither value is a credential: the IP comes from headers any client can
//! set, and the fallback client id is only as stable as the visitor's IP
//! and user agent.

use cookie::Cookie;
use http::header;
use reqtrack_core::Request;

/// Proxy headers checked for the client IP, in order. First match wins.
pub const FORWARDED_IP_HEADERS: [&str; 2] = ["x-forwarded-for", "x-real-ip"];

/// Derive the client IP address.
///
/// Uses the first non-empty forwarding header (first entry of a comma
/// separated list), else the peer address without its port, else `""`.
pub fn client_ip(req: &Request) -> String {
    for name in FORWARDED_IP_HEADERS {
        let Some(value) = req.header(name) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        return value.split(',').next().unwrap_or_default().trim().to_string();
    }

    req.remote_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default()
}

/// Value of the cookie `name`, if the request carries a non-empty one.
pub fn cookie_value(req: &Request, name: &str) -> Option<String> {
    req.headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

/// Derive the client id: the analytics cookie when present, else the
/// client IP followed by the raw user agent.
pub fn client_id(req: &Request, cookie_name: &str) -> String {
    cookie_value(req, cookie_name).unwrap_or_else(|| format!("{}{}", client_ip(req), req.user_agent()))
}
