//! Request events and their collector wire format.

use crate::client;
use http::StatusCode;
use reqtrack_core::Request;
use serde::Serialize;
use std::time::Duration;

/// Event name every request is reported under.
pub const EVENT_NAME: &str = "api_request";

/// Summary of one request/response cycle.
///
/// Built once after the handler finishes, then moved to the dispatch task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestEvent {
    pub client_id: String,
    pub path: String,
    pub method: String,
    pub status_code: u16,
    pub response_time_ms: u64,
    pub user_agent: String,
    pub ip_address: String,
}

/// Request-side fields, read before the request is handed downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub path: String,
    pub method: String,
    pub user_agent: String,
    pub ip_address: String,
    pub client_id: String,
}

impl RequestInfo {
    /// Read path, method, user agent, client IP and client id from `req`.
    pub fn from_request(req: &Request, client_id_cookie: &str) -> Self {
        Self {
            path: req.path().to_string(),
            method: req.method().to_string(),
            user_agent: req.user_agent().into_owned(),
            ip_address: client::client_ip(req),
            client_id: client::client_id(req, client_id_cookie),
        }
    }

    /// Complete the event with the response outcome.
    pub fn into_event(self, status: StatusCode, elapsed: Duration) -> RequestEvent {
        RequestEvent {
            client_id: self.client_id,
            path: self.path,
            method: self.method,
            status_code: status.as_u16(),
            response_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            user_agent: self.user_agent,
            ip_address: self.ip_address,
        }
    }
}

/// Body POSTed to the collector.
#[derive(Debug, Serialize)]
pub struct CollectorPayload<'a> {
    client_id: &'a str,
    events: [CollectorEvent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct CollectorEvent<'a> {
    name: &'static str,
    params: EventParams<'a>,
}

#[derive(Debug, Serialize)]
struct EventParams<'a> {
    path: &'a str,
    method: &'a str,
    status_code: u16,
    response_time_ms: u64,
    user_agent: &'a str,
    ip_address: &'a str,
}

impl RequestEvent {
    /// Collector payload borrowing from this event.
    pub fn payload(&self) -> CollectorPayload<'_> {
        CollectorPayload {
            client_id: &self.client_id,
            events: [CollectorEvent {
                name: EVENT_NAME,
                params: EventParams {
                    path: &self.path,
                    method: &self.method,
                    status_code: self.status_code,
                    response_time_ms: self.response_time_ms,
                    user_agent: &self.user_agent,
                    ip_address: &self.ip_address,
                },
            }],
        }
    }

    /// Encode the collector payload as JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.payload())
    }
}
