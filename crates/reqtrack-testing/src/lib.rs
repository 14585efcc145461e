//! Testing utilities for reqtrack
//!
//! [`MockServer`] stands in for a remote collector: tests register
//! [`Expectation`]s with canned [`MockResponse`]s, point an interceptor at
//! [`MockServer::base_url`], then wait for and inspect what arrived.

pub mod expectation;
pub mod matcher;
pub mod server;

pub use expectation::{Expectation, MockResponse, Times};
pub use matcher::RequestMatcher;
pub use server::{ExpectationBuilder, MockServer, RecordedRequest};
