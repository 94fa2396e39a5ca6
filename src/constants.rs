/// Plugin name reported by `GetMetadata` and injected as `X-Plugin-Name`.
pub const PLUGIN_NAME: &str = "header-injector";

/// Human readable description reported by `GetMetadata`.
pub const PLUGIN_DESCRIPTION: &str = "A Rust plugin that injects custom headers into requests";

/// Request flow - process incoming HTTP requests.
pub const FLOW_REQUEST: &str = "request";

/// Response flow - process outgoing HTTP responses.
pub const FLOW_RESPONSE: &str = "response";

/// Carries the plugin name on every processed request.
pub const HEADER_PLUGIN_NAME: &str = "X-Plugin-Name";

/// Carries the implementation language of the plugin.
pub const HEADER_PLUGIN_LANGUAGE: &str = "X-Plugin-Language";

/// Marks a request as processed by the plugin.
pub const HEADER_REQUEST_PROCESSED: &str = "X-Request-Processed";

/// Unix time in seconds at which the request was processed.
pub const HEADER_REQUEST_TIMESTAMP: &str = "X-Request-Timestamp";

/// Configuration key holding comma-separated path prefixes that bypass injection.
pub const CONFIG_EXCLUDED_PATHS: &str = "excluded_paths";

/// Prefixes excluded when `excluded_paths` is not configured.
pub const DEFAULT_EXCLUDED_PATHS: &[&str] = &["/health", "/docs"];
