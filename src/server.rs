use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::plugin::{Plugin, PluginAdapter};
use crate::proto::middleware_server::MiddlewareServer;
use crate::proto::plugin_manager_server::PluginManagerServer;
use crate::{Activation, PluginError, Result};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::server::Router;
use tonic::transport::Server;
use tracing::{info, warn};

#[cfg(unix)]
use tokio::net::UnixListener;

/// Transport the plugin listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Network {
    Unix,
    Tcp,
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Unix => f.write_str("unix"),
            Network::Tcp => f.write_str("tcp"),
        }
    }
}

/// Command-line arguments for the plugin server.
#[derive(Parser, Debug)]
#[command(author, version, about = "header-injector plugin server", long_about = None)]
pub struct Args {
    /// Address to bind to (socket path for unix, host:port for tcp).
    #[arg(long, alias = "socket")]
    pub address: String,

    /// Network type.
    #[arg(long, alias = "mode", value_enum, default_value_t = Network::Unix)]
    pub network: Network,
}

/// Serves `plugin` until SIGINT/SIGTERM or a `Shutdown` call.
///
/// Handles:
/// - Command-line argument parsing (`args` defaults to `std::env::args()`)
/// - Binding the Unix socket or TCP listener before serving, so bind failures surface
///   as [`PluginError::Bind`]
/// - Registering the `PluginManager` and `Middleware` services over one shared
///   [`Lifecycle`]
/// - Removing the Unix socket file on exit
///
/// # Example
///
/// ```rust,no_run
/// use header_injector_plugin::{serve, Activation, HeaderInjector};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     serve(HeaderInjector::new(), Activation::OnConfigure, None).await?;
///     Ok(())
/// }
/// ```
pub async fn serve<P: Plugin>(
    plugin: P,
    activation: Activation,
    args: Option<Vec<String>>,
) -> Result<()> {
    // Parse command-line arguments.
    let args = if let Some(args) = args {
        Args::parse_from(args)
    } else {
        Args::parse()
    };

    info!(
        "Starting plugin server on {} ({})",
        args.address, args.network
    );

    let lifecycle = Arc::new(Lifecycle::new(activation));
    let adapter = Arc::new(PluginAdapter::new(plugin, Arc::clone(&lifecycle)));

    let router = Server::builder()
        .add_service(PluginManagerServer::from_arc(Arc::clone(&adapter)))
        .add_service(MiddlewareServer::from_arc(adapter));

    let result = match args.network {
        Network::Unix => serve_unix(router, &args.address, &lifecycle).await,
        Network::Tcp => serve_tcp(router, &args.address, &lifecycle).await,
    };

    lifecycle.shutdown().await;
    result
}

#[cfg(unix)]
async fn serve_unix(router: Router, address: &str, lifecycle: &Lifecycle) -> Result<()> {
    use tokio_stream::wrappers::UnixListenerStream;

    let path = PathBuf::from(address);

    // Remove existing socket file if it exists.
    if path.exists() {
        warn!("Removing existing socket file: {}", address);
        std::fs::remove_file(&path)?;
    }

    let listener = UnixListener::bind(&path).map_err(|source| PluginError::Bind {
        address: address.to_string(),
        source,
    })?;
    let stream = UnixListenerStream::new(listener);

    info!("Listening on Unix socket: {}", address);

    let served = router
        .serve_with_incoming_shutdown(stream, shutdown_signal(lifecycle))
        .await;

    // Clean up socket file on shutdown.
    if path.exists() {
        info!("Cleaning up socket file: {}", address);
        let _ = std::fs::remove_file(&path);
    }

    served.map_err(PluginError::from)
}

#[cfg(not(unix))]
async fn serve_unix(_router: Router, _address: &str, _lifecycle: &Lifecycle) -> Result<()> {
    Err(PluginError::Configuration(
        "Unix sockets not supported on this platform".to_string(),
    ))
}

async fn serve_tcp(router: Router, address: &str, lifecycle: &Lifecycle) -> Result<()> {
    let addr: SocketAddr = address
        .parse()
        .map_err(|e| PluginError::Configuration(format!("Invalid TCP address: {}", e)))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| PluginError::Bind {
            address: address.to_string(),
            source,
        })?;

    info!("Listening on TCP: {}", listener.local_addr()?);

    router
        .serve_with_incoming_shutdown(
            TcpListenerStream::new(listener),
            shutdown_signal(lifecycle),
        )
        .await?;

    Ok(())
}

/// Waits for SIGINT, SIGTERM, or the plugin reaching `ShutDown`.
async fn shutdown_signal(lifecycle: &Lifecycle) {
    let mut events = lifecycle.subscribe();
    let shut_down = async move {
        if events
            .wait_for(|state| *state == LifecycleState::ShutDown)
            .await
            .is_err()
        {
            std::future::pending::<()>().await;
        }
    };

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT, shutting down gracefully");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        }
        _ = shut_down => {
            info!("Shutdown requested by host, stopping server");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_accept_long_and_legacy_flag_names() {
        let args = Args::parse_from(["plugin", "--address", "/tmp/p.sock"]);
        assert_eq!(args.network, Network::Unix);

        let args = Args::parse_from(["plugin", "--socket", "127.0.0.1:5000", "--mode", "tcp"]);
        assert_eq!(args.address, "127.0.0.1:5000");
        assert_eq!(args.network, Network::Tcp);
    }

    #[test]
    fn unknown_network_is_rejected() {
        assert!(Args::try_parse_from(["plugin", "--address", "x", "--network", "udp"]).is_err());
    }

    #[tokio::test]
    async fn invalid_tcp_address_fails_fast() {
        let lifecycle = Lifecycle::default();
        let router = Server::builder().add_service(MiddlewareServer::new(PluginAdapter::new(
            crate::HeaderInjector::new(),
            Arc::new(Lifecycle::default()),
        )));
        let err = serve_tcp(router, "not-an-address", &lifecycle)
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Configuration(_)));
    }

    #[tokio::test]
    async fn occupied_tcp_port_is_a_bind_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = taken.local_addr().unwrap().to_string();

        let lifecycle = Lifecycle::default();
        let router = Server::builder().add_service(MiddlewareServer::new(PluginAdapter::new(
            crate::HeaderInjector::new(),
            Arc::new(Lifecycle::default()),
        )));
        let err = serve_tcp(router, &address, &lifecycle).await.unwrap_err();
        assert!(matches!(err, PluginError::Bind { .. }));
    }

    #[tokio::test]
    async fn shutdown_call_stops_the_server() {
        let lifecycle = Arc::new(Lifecycle::default());
        let router = Server::builder().add_service(MiddlewareServer::new(PluginAdapter::new(
            crate::HeaderInjector::new(),
            Arc::clone(&lifecycle),
        )));

        let served = {
            let lifecycle = Arc::clone(&lifecycle);
            tokio::spawn(async move { serve_tcp(router, "127.0.0.1:0", &lifecycle).await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        lifecycle.shutdown().await;

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), served)
            .await
            .expect("server did not stop")
            .expect("server task panicked");
        assert!(result.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unix_socket_replaces_stale_file_and_cleans_up() {
        let path = std::env::temp_dir().join(format!(
            "header-injector-{}-{:?}.sock",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::write(&path, b"stale").unwrap();
        let address = path.to_string_lossy().into_owned();

        let lifecycle = Arc::new(Lifecycle::default());
        let router = Server::builder().add_service(MiddlewareServer::new(PluginAdapter::new(
            crate::HeaderInjector::new(),
            Arc::clone(&lifecycle),
        )));

        let served = {
            let lifecycle = Arc::clone(&lifecycle);
            tokio::spawn(async move { serve_unix(router, &address, &lifecycle).await })
        };

        let mut bound = false;
        for _ in 0..100 {
            if std::fs::symlink_metadata(&path)
                .map(|meta| std::os::unix::fs::FileTypeExt::is_socket(&meta.file_type()))
                .unwrap_or(false)
            {
                bound = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(bound, "socket was not bound at {}", path.display());

        lifecycle.shutdown().await;

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), served)
            .await
            .expect("server did not stop")
            .expect("server task panicked");
        assert!(result.is_ok());
        assert!(!path.exists());
    }
}

