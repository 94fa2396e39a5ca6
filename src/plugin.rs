use crate::config::PluginSettings;
use crate::constants::FLOW_REQUEST;
use crate::health::{health_report, readiness_report};
use crate::lifecycle::Lifecycle;
use crate::proto::{
    middleware_server::Middleware, plugin_manager_server::PluginManager, Ack, Capabilities,
    Empty, Header, HealthStatus, HttpRequest, HttpResponse, Metadata, PluginConfig, RouteQuery,
    ShouldHandleResponse,
};
use crate::PluginError;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info};

/// Immutable identity of a plugin build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginIdentity {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Commit the plugin was built from, empty when unknown.
    pub commit_hash: String,
    /// ISO 8601 build timestamp, empty when unknown.
    pub build_date: String,
}

impl From<PluginIdentity> for Metadata {
    fn from(identity: PluginIdentity) -> Self {
        Metadata {
            name: identity.name,
            version: identity.version,
            description: identity.description,
            commit_hash: identity.commit_hash,
            build_date: identity.build_date,
        }
    }
}

/// Flow stages a plugin declares support for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    flows: BTreeSet<&'static str>,
}

impl CapabilitySet {
    pub fn new(flows: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            flows: flows.into_iter().collect(),
        }
    }

    pub fn supports(&self, flow: &str) -> bool {
        self.flows.contains(flow)
    }
}

impl From<CapabilitySet> for Capabilities {
    fn from(set: CapabilitySet) -> Self {
        Capabilities {
            flows: set.flows.into_iter().map(str::to_string).collect(),
        }
    }
}

/// Outcome of one request transformation.
#[derive(Debug)]
pub enum Decision {
    /// Forward the request, replaced by the carried envelope when present.
    Continue(Option<HttpRequest>),
    /// Answer the client directly without reaching upstream.
    ShortCircuit {
        status_code: i32,
        headers: Vec<Header>,
        body: Vec<u8>,
    },
    /// The transformation could not be completed.
    Error(PluginError),
}

/// Request transformation logic served by a [`PluginAdapter`].
///
/// Lifecycle gating, configuration parsing and failure recovery are handled by the
/// adapter; implementations only decide what happens to a request. Everything here
/// runs synchronously and must not perform I/O beyond reading the clock.
pub trait Plugin: Send + Sync + 'static {
    /// Static identity, answered in any lifecycle state.
    fn identity(&self) -> PluginIdentity;

    /// Supported flows. Defaults to the request flow only.
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new([FLOW_REQUEST])
    }

    /// Cheap pre-filter the host may consult before `handle_request`.
    fn should_handle(&self, settings: &PluginSettings, _method: &str, path: &str) -> bool {
        !settings.is_excluded(path)
    }

    /// Decides what happens to `request`. The input is never mutated; modifications
    /// are returned as a derived copy.
    fn handle_request(&self, _settings: &PluginSettings, _request: &HttpRequest) -> Decision {
        Decision::Continue(None)
    }

    /// Processes an upstream response before it returns to the client. Only called by
    /// hosts for plugins that declare the response flow; passes through by default.
    fn handle_response(
        &self,
        _settings: &PluginSettings,
        response: &HttpResponse,
    ) -> Result<HttpResponse, PluginError> {
        Ok(HttpResponse {
            r#continue: true,
            ..response.clone()
        })
    }
}

/// Serves a [`Plugin`] through both generated services, sharing one [`Lifecycle`].
pub struct PluginAdapter<P: Plugin> {
    plugin: P,
    lifecycle: Arc<Lifecycle>,
}

impl<P: Plugin> PluginAdapter<P> {
    pub fn new(plugin: P, lifecycle: Arc<Lifecycle>) -> Self {
        Self { plugin, lifecycle }
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    /// Runs the plugin's transformation and turns its decision into a wire response.
    ///
    /// Internal failures and panics never drop the request: the original is forwarded
    /// untouched and the plugin is marked degraded.
    async fn transform(
        &self,
        settings: &PluginSettings,
        request: HttpRequest,
    ) -> Result<HttpResponse, Status> {
        let decision = catch_unwind(AssertUnwindSafe(|| {
            self.plugin.handle_request(settings, &request)
        }))
        .unwrap_or_else(|_| {
            Decision::Error(PluginError::Internal(
                "request transformation panicked".to_string(),
            ))
        });

        match decision {
            Decision::Continue(modified_request) => Ok(HttpResponse {
                r#continue: true,
                modified_request,
                ..Default::default()
            }),
            Decision::ShortCircuit {
                status_code,
                headers,
                body,
            } => Ok(HttpResponse {
                r#continue: false,
                status_code,
                headers,
                body,
                ..Default::default()
            }),
            Decision::Error(err @ PluginError::InvalidInput(_)) => {
                debug!("Rejecting {} {}: {}", request.method, request.url, err);
                Err(err.into())
            }
            Decision::Error(err) => {
                error!(
                    "Transformation of {} {} failed, forwarding unmodified: {}",
                    request.method, request.url, err
                );
                self.lifecycle.degrade().await;
                Ok(HttpResponse {
                    r#continue: true,
                    modified_request: Some(request),
                    ..Default::default()
                })
            }
        }
    }

    /// Response counterpart of [`transform`](Self::transform). On internal failure the
    /// upstream response is forwarded as received.
    async fn transform_response(
        &self,
        settings: &PluginSettings,
        response: HttpResponse,
    ) -> Result<HttpResponse, Status> {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.plugin.handle_response(settings, &response)
        }))
        .unwrap_or_else(|_| {
            Err(PluginError::Internal(
                "response transformation panicked".to_string(),
            ))
        });

        match outcome {
            Ok(modified) => Ok(modified),
            Err(err @ PluginError::InvalidInput(_)) => {
                debug!("Rejecting response {}: {}", response.status_code, err);
                Err(err.into())
            }
            Err(err) => {
                error!(
                    "Transformation of response {} failed, forwarding unmodified: {}",
                    response.status_code, err
                );
                self.lifecycle.degrade().await;
                Ok(HttpResponse {
                    r#continue: true,
                    ..response
                })
            }
        }
    }
}

fn ack(message: &str) -> Response<Ack> {
    Response::new(Ack {
        message: message.to_string(),
    })
}

#[tonic::async_trait]
impl<P: Plugin> PluginManager for PluginAdapter<P> {
    async fn get_metadata(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<Metadata>, Status> {
        Ok(Response::new(self.plugin.identity().into()))
    }

    async fn get_capabilities(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<Capabilities>, Status> {
        Ok(Response::new(self.plugin.capabilities().into()))
    }

    async fn initialize(&self, _request: Request<Empty>) -> Result<Response<Ack>, Status> {
        info!("Plugin initializing");
        self.lifecycle.initialize().await?;
        Ok(ack("Initialized successfully"))
    }

    async fn configure(&self, request: Request<PluginConfig>) -> Result<Response<Ack>, Status> {
        let config = request.into_inner();
        let settings = PluginSettings::from_map(&config.values)?;

        info!(
            "Configuring with excluded paths {:?} ({} ignored keys)",
            settings.excluded_paths,
            settings.ignored.len()
        );

        let state = self.lifecycle.configure(settings).await?;
        Ok(ack(&format!("Configuration applied, plugin is {state}")))
    }

    async fn activate(&self, _request: Request<Empty>) -> Result<Response<Ack>, Status> {
        self.lifecycle.activate().await?;
        Ok(ack("Activated"))
    }

    async fn shutdown(&self, _request: Request<Empty>) -> Result<Response<Ack>, Status> {
        if self.lifecycle.shutdown().await {
            info!("Plugin shut down, resources released");
            Ok(ack("Shutdown completed"))
        } else {
            Ok(ack("Already shut down"))
        }
    }

    async fn check_health(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<HealthStatus>, Status> {
        Ok(Response::new(health_report(self.lifecycle.state().await)))
    }

    async fn check_ready(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<HealthStatus>, Status> {
        Ok(Response::new(readiness_report(self.lifecycle.state().await)))
    }
}

#[tonic::async_trait]
impl<P: Plugin> Middleware for PluginAdapter<P> {
    async fn should_handle(
        &self,
        request: Request<RouteQuery>,
    ) -> Result<Response<ShouldHandleResponse>, Status> {
        let query = request.into_inner();
        let settings = self.lifecycle.serving_settings("ShouldHandle").await?;

        let handle = self
            .plugin
            .should_handle(&settings, &query.method, &query.path);
        debug!("ShouldHandle {} {}: {}", query.method, query.path, handle);

        Ok(Response::new(ShouldHandleResponse { handle }))
    }

    async fn handle_request(
        &self,
        request: Request<HttpRequest>,
    ) -> Result<Response<HttpResponse>, Status> {
        let req = request.into_inner();
        let settings = self.lifecycle.serving_settings("HandleRequest").await?;

        debug!("Processing request: {} {}", req.method, req.url);

        self.transform(&settings, req).await.map(Response::new)
    }

    async fn handle_response(
        &self,
        response: Request<HttpResponse>,
    ) -> Result<Response<HttpResponse>, Status> {
        let resp = response.into_inner();
        let settings = self.lifecycle.serving_settings("HandleResponse").await?;

        debug!("Processing response: {}", resp.status_code);

        self.transform_response(&settings, resp)
            .await
            .map(Response::new)
    }
}
