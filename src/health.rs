use crate::lifecycle::LifecycleState;
use crate::proto::HealthStatus;

/// Health verdict for `state`. Healthy only while `Active`.
pub fn health_report(state: LifecycleState) -> HealthStatus {
    let (ok, message) = match state {
        LifecycleState::Active => (true, "Healthy"),
        LifecycleState::Uninitialized => (false, "Not initialized"),
        LifecycleState::Initialized => (false, "Initialized but not configured"),
        LifecycleState::Configured => (false, "Configured but not active"),
        LifecycleState::Degraded => (false, "Degraded: request transformation failed"),
        LifecycleState::ShutDown => (false, "Plugin shut down"),
    };
    HealthStatus {
        ok,
        message: message.to_string(),
    }
}

/// Readiness verdict for `state`. Ready whenever data-plane calls are served.
pub fn readiness_report(state: LifecycleState) -> HealthStatus {
    let ok = state.serves_traffic();
    let message = if ok {
        "Ready".to_string()
    } else {
        format!("Not ready: plugin is {state}")
    };
    HealthStatus { ok, message }
}
