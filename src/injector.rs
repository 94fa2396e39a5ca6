//! The header injector: stamps every non-excluded request with the plugin's identity.
//!
//! Injected headers, in order:
//!
//! | Header                | Value               |
//! |-----------------------|---------------------|
//! | `X-Plugin-Name`       | `header-injector`   |
//! | `X-Plugin-Language`   | `rust`              |
//! | `X-Request-Processed` | `true`              |
//! | `X-Request-Timestamp` | Unix time (seconds) |
//!
//! Header names compare case-insensitively. When the request already carries one of
//! these headers, the plugin's name and value replace it at its original position; the
//! caller's value never survives. Other injected headers are appended.

use crate::config::PluginSettings;
use crate::constants::{
    HEADER_PLUGIN_LANGUAGE, HEADER_PLUGIN_NAME, HEADER_REQUEST_PROCESSED,
    HEADER_REQUEST_TIMESTAMP, PLUGIN_DESCRIPTION, PLUGIN_NAME,
};
use crate::plugin::{Decision, Plugin, PluginIdentity};
use crate::proto::{Header, HttpRequest};
use crate::{PluginError, Result};
use std::borrow::Cow;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

type Clock = Box<dyn Fn() -> Result<u64> + Send + Sync>;

/// Identity headers injected ahead of the timestamp.
pub const IDENTITY_HEADERS: [(&str, &str); 3] = [
    (HEADER_PLUGIN_NAME, PLUGIN_NAME),
    (HEADER_PLUGIN_LANGUAGE, "rust"),
    (HEADER_REQUEST_PROCESSED, "true"),
];

pub struct HeaderInjector {
    clock: Clock,
}

impl HeaderInjector {
    pub fn new() -> Self {
        Self::with_clock(unix_seconds)
    }

    /// Uses `clock` instead of the system clock for `X-Request-Timestamp`.
    pub fn with_clock<F>(clock: F) -> Self
    where
        F: Fn() -> Result<u64> + Send + Sync + 'static,
    {
        Self {
            clock: Box::new(clock),
        }
    }

    /// Derives the outgoing request: original headers, identity overlay, timestamp.
    fn inject(&self, request: &HttpRequest) -> Result<HttpRequest> {
        let timestamp = (self.clock)()?;

        let mut derived = request.clone();
        for (name, value) in IDENTITY_HEADERS {
            overlay(&mut derived.headers, name, value);
        }
        overlay(
            &mut derived.headers,
            HEADER_REQUEST_TIMESTAMP,
            &timestamp.to_string(),
        );
        Ok(derived)
    }
}

impl Default for HeaderInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for HeaderInjector {
    fn identity(&self) -> PluginIdentity {
        PluginIdentity {
            name: PLUGIN_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: PLUGIN_DESCRIPTION.to_string(),
            commit_hash: env!("PLUGIN_COMMIT_HASH").to_string(),
            build_date: env!("PLUGIN_BUILD_DATE").to_string(),
        }
    }

    fn handle_request(&self, settings: &PluginSettings, request: &HttpRequest) -> Decision {
        let path = request_path(request);
        if settings.is_excluded(&path) {
            debug!("Path {} is excluded, forwarding untouched", path);
            return Decision::Continue(Some(request.clone()));
        }

        match self.inject(request) {
            Ok(derived) => {
                debug!(
                    "Added {} headers to {} {}",
                    IDENTITY_HEADERS.len() + 1,
                    request.method,
                    path
                );
                Decision::Continue(Some(derived))
            }
            Err(err) => Decision::Error(err),
        }
    }
}

/// Path used for exclusion matching: `path` when set, otherwise the path of `url`.
pub fn request_path(request: &HttpRequest) -> Cow<'_, str> {
    if !request.path.is_empty() {
        return Cow::Borrowed(&request.path);
    }
    match request.url.parse::<http::Uri>() {
        Ok(uri) => Cow::Owned(uri.path().to_string()),
        Err(_) => Cow::Borrowed(&request.url),
    }
}

/// Sets `name` to `value`. The first header matching `name` is replaced in place and
/// any later duplicates are dropped; without a match the header is appended.
fn overlay(headers: &mut Vec<Header>, name: &str, value: &str) {
    let mut found = false;
    headers.retain_mut(|header| {
        if !header.name.eq_ignore_ascii_case(name) {
            return true;
        }
        if found {
            return false;
        }
        found = true;
        header.name = name.to_string();
        header.value = value.to_string();
        true
    });
    if !found {
        headers.push(Header::new(name, value));
    }
}

fn unix_seconds() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|err| PluginError::Internal(format!("system clock before Unix epoch: {err}")))
}
