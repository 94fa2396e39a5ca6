//! # header-injector-plugin
//!
//! An out-of-process middleware plugin. A host proxy starts the plugin binary with a
//! socket address, drives it through its lifecycle over gRPC, and then asks it to
//! inspect each inbound HTTP request before forwarding it upstream.
//!
//! ## Services
//!
//! Two gRPC services share one plugin instance:
//!
//! - **`PluginManager`** (control): `GetMetadata`, `GetCapabilities`, `Initialize`,
//!   `Configure`, `Activate`, `Shutdown`, `CheckHealth`, `CheckReady`
//! - **`Middleware`** (data plane): `ShouldHandle`, `HandleRequest`, `HandleResponse`
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized -> Initialized -> Configured -> Active <-> Degraded
//!        \______________\_____________\___________\__________\____-> ShutDown
//! ```
//!
//! Data-plane calls are served only while `Configured` or `Active`. Control calls made
//! in the wrong state fail with `FAILED_PRECONDITION`; anything after `Shutdown` fails
//! with `UNAVAILABLE`. Metadata, capabilities, health and readiness are answered in
//! every state.
//!
//! ## Writing a plugin
//!
//! ```rust,no_run
//! use header_injector_plugin::{
//!     serve, Activation, Decision, HttpRequest, Plugin, PluginIdentity, PluginSettings,
//! };
//!
//! struct Tagger;
//!
//! impl Plugin for Tagger {
//!     fn identity(&self) -> PluginIdentity {
//!         PluginIdentity {
//!             name: "tagger".to_string(),
//!             version: "1.0.0".to_string(),
//!             description: "Tags requests".to_string(),
//!             ..Default::default()
//!         }
//!     }
//!
//!     fn handle_request(&self, _settings: &PluginSettings, request: &HttpRequest) -> Decision {
//!         let mut derived = request.clone();
//!         derived.headers.push(header_injector_plugin::Header::new("X-Tagged", "yes"));
//!         Decision::Continue(Some(derived))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     serve(Tagger, Activation::OnConfigure, None).await?;
//!     Ok(())
//! }
//! ```
//!
//! Run it:
//!
//! ```bash
//! header-injector --address /tmp/header-injector.sock --network unix
//! ```

// Wire types and generated service plumbing.
#[allow(clippy::all)]
#[allow(missing_docs)]
pub mod proto;

mod config;
mod constants;
mod error;
mod health;
mod injector;
mod lifecycle;
mod plugin;
mod server;

// Re-export public API.
pub use config::PluginSettings;
pub use constants::{
    FLOW_REQUEST, FLOW_RESPONSE, HEADER_PLUGIN_LANGUAGE, HEADER_PLUGIN_NAME,
    HEADER_REQUEST_PROCESSED, HEADER_REQUEST_TIMESTAMP, PLUGIN_NAME,
};
pub use error::{PluginError, Result};
pub use health::{health_report, readiness_report};
pub use injector::{request_path, HeaderInjector, IDENTITY_HEADERS};
pub use lifecycle::{Activation, Lifecycle, LifecycleState};
pub use plugin::{CapabilitySet, Decision, Plugin, PluginAdapter, PluginIdentity};
pub use proto::{
    Ack, Capabilities, Empty, Header, HealthStatus, HttpRequest, HttpResponse, Metadata,
    PluginConfig, RouteQuery, ShouldHandleResponse,
};
pub use server::{serve, Args, Network};
