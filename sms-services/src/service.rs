//! Service trait and lifecycle management.
//!
//! Services implement the `Service` trait which provides a standard
//! lifecycle (init, shutdown) and health checking interface.

use async_trait::async_trait;
use sms_core::error::SmsResult;

/// Lifecycle state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Service has been created but not initialized.
    Created,
    /// Service is initializing.
    Initializing,
    /// Service is running and ready.
    Running,
    /// Service is shutting down.
    ShuttingDown,
    /// Service has been stopped.
    Stopped,
    /// Service encountered a fatal error.
    Failed,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Initializing => write!(f, "initializing"),
            Self::Running => write!(f, "running"),
            Self::ShuttingDown => write!(f, "shutting_down"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Lifecycle interface shared by the message store services.
///
/// `init` is called once before the service is used and `shutdown` once
/// when it is torn down. Both may suspend on store I/O.
#[async_trait]
pub trait Service: Send + Sync {
    /// Human-readable name of this service.
    fn name(&self) -> &str;

    /// Current state of this service.
    fn state(&self) -> ServiceState;

    /// Initialize the service.
    async fn init(&mut self) -> SmsResult<()>;

    /// Gracefully shut down the service.
    async fn shutdown(&mut self) -> SmsResult<()>;

    /// Health check. Returns true if the service is operational.
    fn is_healthy(&self) -> bool {
        self.state() == ServiceState::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestService {
        state: ServiceState,
    }

    #[async_trait]
    impl Service for TestService {
        fn name(&self) -> &str { "test" }
        fn state(&self) -> ServiceState { self.state }
        async fn init(&mut self) -> SmsResult<()> {
            self.state = ServiceState::Running;
            Ok(())
        }
        async fn shutdown(&mut self) -> SmsResult<()> {
            self.state = ServiceState::Stopped;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_service_lifecycle() {
        let mut svc = TestService { state: ServiceState::Created };
        assert!(!svc.is_healthy());
        svc.init().await.unwrap();
        assert!(svc.is_healthy());
        assert_eq!(svc.name(), "test");
        svc.shutdown().await.unwrap();
        assert!(!svc.is_healthy());
        assert_eq!(svc.state().to_string(), "stopped");
    }
}
