use crate::config::PluginSettings;
use crate::{PluginError, Result};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

/// Readiness of the plugin process.
///
/// States only move forward, with the single exception of `Active` <-> `Degraded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    Configured,
    Active,
    Degraded,
    ShutDown,
}

impl LifecycleState {
    /// Returns true when data-plane calls may be served.
    pub fn serves_traffic(self) -> bool {
        matches!(self, LifecycleState::Configured | LifecycleState::Active)
    }

    /// Lower-case name used in logs and status messages.
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Configured => "configured",
            LifecycleState::Active => "active",
            LifecycleState::Degraded => "degraded",
            LifecycleState::ShutDown => "shut down",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When the plugin moves from `Configured` to `Active`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Activation {
    /// The first successful `Configure` activates the plugin.
    #[default]
    OnConfigure,
    /// The host must call `Activate` after `Configure`.
    Explicit,
}

struct Inner {
    state: LifecycleState,
    settings: Option<Arc<PluginSettings>>,
}

/// The single shared state cell of a plugin process.
///
/// Control calls take the write lock, so transitions are totally ordered. Data-plane
/// calls take the read lock only long enough to copy out the current settings.
pub struct Lifecycle {
    activation: Activation,
    inner: RwLock<Inner>,
    events: watch::Sender<LifecycleState>,
}

impl Lifecycle {
    /// Creates an `Uninitialized` lifecycle with the given activation policy.
    pub fn new(activation: Activation) -> Self {
        let (events, _) = watch::channel(LifecycleState::Uninitialized);
        Self {
            activation,
            inner: RwLock::new(Inner {
                state: LifecycleState::Uninitialized,
                settings: None,
            }),
            events,
        }
    }

    /// Activation policy chosen at construction.
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Current state, read under the shared lock.
    pub async fn state(&self) -> LifecycleState {
        self.inner.read().await.state
    }

    /// Subscribes to state changes. The receiver observes the latest state.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.events.subscribe()
    }

    /// `Uninitialized` -> `Initialized`. Re-entrant while `Initialized`.
    pub async fn initialize(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.state {
            LifecycleState::Uninitialized => {
                inner.settings = Some(Arc::new(PluginSettings::default()));
                self.transition(&mut inner, LifecycleState::Initialized);
                Ok(())
            }
            LifecycleState::Initialized => {
                debug!("Initialize called while already initialized");
                Ok(())
            }
            LifecycleState::ShutDown => Err(PluginError::ShutDown),
            state => Err(PluginError::Lifecycle {
                operation: "Initialize",
                state,
            }),
        }
    }

    /// Swaps in `settings` and returns the resulting state.
    ///
    /// From `Initialized` or `Configured` the plugin becomes `Configured` (and `Active`
    /// right away under [`Activation::OnConfigure`]). From `Active` or `Degraded` the
    /// plugin is reconfigured in place and ends up `Active`.
    pub async fn configure(&self, settings: PluginSettings) -> Result<LifecycleState> {
        let mut inner = self.inner.write().await;
        let next = match inner.state {
            LifecycleState::Initialized | LifecycleState::Configured => {
                match self.activation {
                    Activation::OnConfigure => LifecycleState::Active,
                    Activation::Explicit => LifecycleState::Configured,
                }
            }
            LifecycleState::Active | LifecycleState::Degraded => LifecycleState::Active,
            LifecycleState::ShutDown => return Err(PluginError::ShutDown),
            state @ LifecycleState::Uninitialized => {
                return Err(PluginError::Lifecycle {
                    operation: "Configure",
                    state,
                })
            }
        };

        inner.settings = Some(Arc::new(settings));
        if inner.state == LifecycleState::Initialized && next == LifecycleState::Active {
            self.transition(&mut inner, LifecycleState::Configured);
        }
        self.transition(&mut inner, next);
        Ok(next)
    }

    /// `Configured` | `Degraded` -> `Active`. A no-op while already `Active`.
    pub async fn activate(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.state {
            LifecycleState::Configured | LifecycleState::Degraded => {
                self.transition(&mut inner, LifecycleState::Active);
                Ok(())
            }
            LifecycleState::Active => Ok(()),
            LifecycleState::ShutDown => Err(PluginError::ShutDown),
            state => Err(PluginError::Lifecycle {
                operation: "Activate",
                state,
            }),
        }
    }

    /// Moves to `ShutDown` from any state and releases the settings.
    ///
    /// Returns false when the plugin was already shut down.
    pub async fn shutdown(&self) -> bool {
        let mut inner = self.inner.write().await;
        if inner.state == LifecycleState::ShutDown {
            debug!("Shutdown called while already shut down");
            return false;
        }
        inner.settings = None;
        self.transition(&mut inner, LifecycleState::ShutDown);
        true
    }

    /// `Active` -> `Degraded`. Any other state is left alone.
    pub async fn degrade(&self) -> bool {
        let mut inner = self.inner.write().await;
        if inner.state != LifecycleState::Active {
            return false;
        }
        self.transition(&mut inner, LifecycleState::Degraded);
        true
    }

    /// Returns the settings a data-plane call should run against, or the reason it
    /// must not run at all.
    pub async fn serving_settings(&self, operation: &'static str) -> Result<Arc<PluginSettings>> {
        let inner = self.inner.read().await;
        match (inner.state, &inner.settings) {
            (LifecycleState::ShutDown, _) => Err(PluginError::ShutDown),
            (state, Some(settings)) if state.serves_traffic() => Ok(Arc::clone(settings)),
            (state, _) => Err(PluginError::Lifecycle { operation, state }),
        }
    }

    fn transition(&self, inner: &mut Inner, next: LifecycleState) {
        let previous = inner.state;
        if previous == next {
            return;
        }
        inner.state = next;
        if next == LifecycleState::Degraded {
            warn!("Plugin state {} -> {}", previous, next);
        } else {
            info!("Plugin state {} -> {}", previous, next);
        }
        self.events.send_replace(next);
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new(Activation::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    const ALL_STATES: [LifecycleState; 6] = [
        LifecycleState::Uninitialized,
        LifecycleState::Initialized,
        LifecycleState::Configured,
        LifecycleState::Active,
        LifecycleState::Degraded,
        LifecycleState::ShutDown,
    ];

    /// Drives a fresh lifecycle into `target` through the public transitions.
    async fn lifecycle_in(target: LifecycleState) -> Lifecycle {
        let lifecycle = Lifecycle::new(Activation::Explicit);
        if target == LifecycleState::Uninitialized {
            return lifecycle;
        }
        if target == LifecycleState::ShutDown {
            lifecycle.shutdown().await;
            return lifecycle;
        }
        lifecycle.initialize().await.unwrap();
        if target == LifecycleState::Initialized {
            return lifecycle;
        }
        lifecycle.configure(PluginSettings::default()).await.unwrap();
        if target == LifecycleState::Configured {
            return lifecycle;
        }
        lifecycle.activate().await.unwrap();
        if target == LifecycleState::Degraded {
            assert!(lifecycle.degrade().await);
        }
        lifecycle
    }

    #[tokio::test]
    async fn helper_reaches_every_state() {
        for state in ALL_STATES {
            assert_eq!(lifecycle_in(state).await.state().await, state);
        }
    }

    #[tokio::test]
    async fn initialize_is_reentrant() {
        let lifecycle = Lifecycle::default();
        assert_ok!(lifecycle.initialize().await);
        assert_ok!(lifecycle.initialize().await);
        assert_eq!(lifecycle.state().await, LifecycleState::Initialized);
    }

    #[tokio::test]
    async fn configure_before_initialize_fails_without_side_effects() {
        let lifecycle = Lifecycle::default();
        let err = assert_err!(lifecycle.configure(PluginSettings::default()).await);
        assert!(matches!(err, PluginError::Lifecycle { .. }));
        assert_eq!(lifecycle.state().await, LifecycleState::Uninitialized);
    }

    #[tokio::test]
    async fn configure_activates_immediately_by_default() {
        let lifecycle = Lifecycle::default();
        lifecycle.initialize().await.unwrap();
        let state = assert_ok!(lifecycle.configure(PluginSettings::default()).await);
        assert_eq!(state, LifecycleState::Active);
    }

    #[tokio::test]
    async fn explicit_activation_waits_for_activate() {
        let lifecycle = lifecycle_in(LifecycleState::Configured).await;
        assert_eq!(lifecycle.activation(), Activation::Explicit);
        assert_ok!(lifecycle.serving_settings("HandleRequest").await);
        assert_ok!(lifecycle.activate().await);
        assert_ok!(lifecycle.activate().await);
        assert_eq!(lifecycle.state().await, LifecycleState::Active);
    }

    #[tokio::test]
    async fn serving_settings_only_in_configured_or_active() {
        for state in ALL_STATES {
            let lifecycle = lifecycle_in(state).await;
            let result = lifecycle.serving_settings("HandleRequest").await;
            assert_eq!(result.is_ok(), state.serves_traffic(), "state {state}");
            assert_eq!(lifecycle.state().await, state);
        }
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_from_every_state() {
        for state in ALL_STATES {
            let lifecycle = lifecycle_in(state).await;
            let first = lifecycle.shutdown().await;
            assert_eq!(first, state != LifecycleState::ShutDown);
            assert!(!lifecycle.shutdown().await);
            assert!(!lifecycle.shutdown().await);
            assert_eq!(lifecycle.state().await, LifecycleState::ShutDown);
        }
    }

    #[tokio::test]
    async fn calls_after_shutdown_report_shut_down() {
        let lifecycle = lifecycle_in(LifecycleState::Active).await;
        lifecycle.shutdown().await;
        assert!(matches!(
            lifecycle.initialize().await,
            Err(PluginError::ShutDown)
        ));
        assert!(matches!(
            lifecycle.configure(PluginSettings::default()).await,
            Err(PluginError::ShutDown)
        ));
        assert!(matches!(lifecycle.activate().await, Err(PluginError::ShutDown)));
        assert!(matches!(
            lifecycle.serving_settings("HandleRequest").await,
            Err(PluginError::ShutDown)
        ));
    }

    #[tokio::test]
    async fn degraded_recovers_through_activate_or_configure() {
        let lifecycle = lifecycle_in(LifecycleState::Degraded).await;
        assert_ok!(lifecycle.activate().await);
        assert_eq!(lifecycle.state().await, LifecycleState::Active);

        assert!(lifecycle.degrade().await);
        let state = assert_ok!(lifecycle.configure(PluginSettings::default()).await);
        assert_eq!(state, LifecycleState::Active);
    }

    #[tokio::test]
    async fn degrade_only_leaves_active() {
        let lifecycle = lifecycle_in(LifecycleState::Configured).await;
        assert!(!lifecycle.degrade().await);
        assert_eq!(lifecycle.state().await, LifecycleState::Configured);
    }

    #[tokio::test]
    async fn initialize_after_configure_is_a_violation() {
        let lifecycle = lifecycle_in(LifecycleState::Active).await;
        let err = assert_err!(lifecycle.initialize().await);
        assert!(matches!(
            err,
            PluginError::Lifecycle {
                state: LifecycleState::Active,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn subscribers_observe_shutdown() {
        let lifecycle = lifecycle_in(LifecycleState::Active).await;
        let mut events = lifecycle.subscribe();
        assert_eq!(*events.borrow(), LifecycleState::Active);
        lifecycle.shutdown().await;
        let state = events
            .wait_for(|s| *s == LifecycleState::ShutDown)
            .await
            .map(|s| *s);
        assert_eq!(state.ok(), Some(LifecycleState::ShutDown));
    }
}
