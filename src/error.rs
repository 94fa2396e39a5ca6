use crate::lifecycle::LifecycleState;
use thiserror::Error;
use tonic::{Code, Status};

/// Error types for plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Configuration was rejected; nothing was applied.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid input provided to the plugin.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Call issued in a lifecycle state that does not allow it.
    #[error("{operation} not allowed while plugin is {state}")]
    Lifecycle {
        operation: &'static str,
        state: LifecycleState,
    },

    /// Call arrived after `Shutdown`.
    #[error("plugin shut down")]
    ShutDown,

    /// Internal plugin error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// The listening endpoint could not be bound.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// gRPC transport error.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

impl From<PluginError> for Status {
    fn from(err: PluginError) -> Self {
        match err {
            PluginError::Configuration(msg) => Status::new(Code::InvalidArgument, msg),
            PluginError::InvalidInput(msg) => Status::new(Code::InvalidArgument, msg),
            err @ PluginError::Lifecycle { .. } => {
                Status::new(Code::FailedPrecondition, err.to_string())
            }
            err @ PluginError::ShutDown => Status::new(Code::Unavailable, err.to_string()),
            PluginError::Internal(msg) => Status::new(Code::Internal, msg),
            err @ PluginError::Bind { .. } => Status::new(Code::Internal, err.to_string()),
            PluginError::Io(err) => Status::new(Code::Internal, err.to_string()),
            PluginError::Transport(err) => Status::new(Code::Unavailable, err.to_string()),
        }
    }
}

/// Result type for plugin operations.
pub type Result<T> = std::result::Result<T, PluginError>;
