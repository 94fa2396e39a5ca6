//! Wire types for the `header_injector.plugins.v1` package.
//!
//! Messages are declared here with `prost` derives; the `PluginManager` and `Middleware`
//! service plumbing is generated by the build script.

use std::collections::HashMap;

/// Request body of parameterless calls.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Empty {}

/// Static identity of the plugin.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Metadata {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub version: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub description: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub commit_hash: ::prost::alloc::string::String,
    /// ISO 8601 build timestamp.
    #[prost(string, tag = "5")]
    pub build_date: ::prost::alloc::string::String,
}

/// Flow stages the plugin participates in ("request", "response").
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Capabilities {
    #[prost(string, repeated, tag = "1")]
    pub flows: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

/// Host-provided configuration map. Replaces the previous one wholesale.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PluginConfig {
    #[prost(map = "string, string", tag = "1")]
    pub values: HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
}

/// Successful control-call acknowledgement.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ack {
    #[prost(string, tag = "1")]
    pub message: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HealthStatus {
    #[prost(bool, tag = "1")]
    pub ok: bool,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RouteQuery {
    #[prost(string, tag = "1")]
    pub method: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub path: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ShouldHandleResponse {
    #[prost(bool, tag = "1")]
    pub handle: bool,
}

/// A single header. Headers travel as a repeated field so their order survives the wire.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Header {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub value: ::prost::alloc::string::String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Inbound HTTP request metadata as seen by the host proxy.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HttpRequest {
    #[prost(string, tag = "1")]
    pub method: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub url: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub path: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "4")]
    pub headers: ::prost::alloc::vec::Vec<Header>,
    #[prost(bytes = "vec", tag = "5")]
    pub body: ::prost::alloc::vec::Vec<u8>,
    #[prost(string, tag = "6")]
    pub remote_addr: ::prost::alloc::string::String,
    #[prost(string, tag = "7")]
    pub request_uri: ::prost::alloc::string::String,
}

impl HttpRequest {
    /// Returns the first value of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// Plugin verdict for a request.
///
/// `continue` set: the host forwards `modified_request` (or the original when absent).
/// `continue` unset: the host answers the client with `status_code`, `headers` and `body`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HttpResponse {
    #[prost(bool, tag = "1")]
    pub r#continue: bool,
    #[prost(int32, tag = "2")]
    pub status_code: i32,
    #[prost(message, repeated, tag = "3")]
    pub headers: ::prost::alloc::vec::Vec<Header>,
    #[prost(bytes = "vec", tag = "4")]
    pub body: ::prost::alloc::vec::Vec<u8>,
    #[prost(message, optional, tag = "5")]
    pub modified_request: ::core::option::Option<HttpRequest>,
}

include!(concat!(
    env!("OUT_DIR"),
    "/header_injector.plugins.v1.PluginManager.rs"
));
include!(concat!(
    env!("OUT_DIR"),
    "/header_injector.plugins.v1.Middleware.rs"
));
