//! Executor dispatch: routing decrypted payloads to capability modules.
//!
//! Each command type maps to one executor (media, volume, brightness). The
//! modules are enabled or disabled purely in device-local config; a payload
//! for a disabled module is an unsupported action, reported upstream like
//! any other per-command failure.

pub mod brightness;
pub mod media;
pub mod volume;

pub use brightness::BrightnessExecutor;
pub use media::MediaExecutor;
pub use volume::VolumeExecutor;

use async_trait::async_trait;
use domain::models::{ActionPayload, CommandType};
use std::time::Duration;
use tokio::process::Command as OsCommand;

use crate::config::EnabledModules;
use crate::error::AgentError;

/// Upper bound on a single executor invocation. Expiry counts as an
/// executor failure; a wedged OS tool must not stall the poll loop forever.
pub const EXECUTOR_TIMEOUT: Duration = Duration::from_secs(10);

/// A device-local capability performing the OS side effect for one command
/// type.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Module name, used in log lines and failure reasons.
    fn name(&self) -> &'static str;

    /// Perform the side effect described by the payload.
    async fn execute(&self, payload: &ActionPayload) -> Result<(), AgentError>;
}

/// Routes payloads to the executor matching their command type.
pub struct Dispatcher {
    media: Option<Box<dyn Executor>>,
    volume: Option<Box<dyn Executor>>,
    brightness: Option<Box<dyn Executor>>,
    timeout: Duration,
}

impl Dispatcher {
    /// Build a dispatcher with the stock executors, honoring module flags.
    pub fn from_config(modules: &EnabledModules) -> Self {
        Self {
            media: modules
                .media
                .then(|| Box::new(MediaExecutor) as Box<dyn Executor>),
            volume: modules
                .volume
                .then(|| Box::new(VolumeExecutor) as Box<dyn Executor>),
            brightness: modules
                .brightness
                .then(|| Box::new(BrightnessExecutor) as Box<dyn Executor>),
            timeout: EXECUTOR_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_executors(
        media: Option<Box<dyn Executor>>,
        volume: Option<Box<dyn Executor>>,
        brightness: Option<Box<dyn Executor>>,
        timeout: Duration,
    ) -> Self {
        Self {
            media,
            volume,
            brightness,
            timeout,
        }
    }

    /// Execute one payload, bounded by the executor timeout.
    pub async fn dispatch(&self, payload: &ActionPayload) -> Result<(), AgentError> {
        let slot = match payload.command_type() {
            CommandType::Media => &self.media,
            CommandType::Volume => &self.volume,
            CommandType::Brightness => &self.brightness,
        };

        let executor = slot
            .as_ref()
            .ok_or(AgentError::UnsupportedAction(payload.command_type()))?;

        match tokio::time::timeout(self.timeout, executor.execute(payload)).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Executor(format!(
                "{} executor timed out after {}s",
                executor.name(),
                self.timeout.as_secs()
            ))),
        }
    }
}

/// Run an OS control command to completion.
pub(crate) async fn run_os_command(program: &str, args: &[String]) -> Result<(), AgentError> {
    let output = OsCommand::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| AgentError::Executor(format!("{} failed to start: {}", program, e)))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(AgentError::Executor(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::{MediaAction, VolumeAction};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct RecordingExecutor {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Executor for RecordingExecutor {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn execute(&self, _payload: &ActionPayload) -> Result<(), AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct SlowExecutor;

    #[async_trait]
    impl Executor for SlowExecutor {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn execute(&self, _payload: &ActionPayload) -> Result<(), AgentError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl Executor for FailingExecutor {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn execute(&self, _payload: &ActionPayload) -> Result<(), AgentError> {
            Err(AgentError::Executor("no players found".to_string()))
        }
    }

    fn media_payload() -> ActionPayload {
        ActionPayload::Media {
            action: MediaAction::Next,
        }
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_matching_executor() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::with_executors(
            Some(Box::new(RecordingExecutor {
                calls: Arc::clone(&calls),
            })),
            None,
            None,
            Duration::from_secs(1),
        );

        dispatcher.dispatch(&media_payload()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_disabled_module() {
        let dispatcher = Dispatcher::with_executors(None, None, None, Duration::from_secs(1));

        let result = dispatcher
            .dispatch(&ActionPayload::Volume {
                action: VolumeAction::Mute,
                value: None,
            })
            .await;

        assert!(matches!(
            result,
            Err(AgentError::UnsupportedAction(CommandType::Volume))
        ));
    }

    #[tokio::test]
    async fn test_dispatch_times_out() {
        let dispatcher = Dispatcher::with_executors(
            Some(Box::new(SlowExecutor)),
            None,
            None,
            Duration::from_millis(20),
        );

        let result = dispatcher.dispatch(&media_payload()).await;
        match result {
            Err(AgentError::Executor(msg)) => assert!(msg.contains("timed out")),
            other => panic!("Expected timeout error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_dispatch_propagates_executor_failure() {
        let dispatcher = Dispatcher::with_executors(
            Some(Box::new(FailingExecutor)),
            None,
            None,
            Duration::from_secs(1),
        );

        let result = dispatcher.dispatch(&media_payload()).await;
        match result {
            Err(AgentError::Executor(msg)) => assert!(msg.contains("no players found")),
            other => panic!("Expected executor error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_from_config_honors_flags() {
        let dispatcher = Dispatcher::from_config(&EnabledModules {
            media: true,
            volume: false,
            brightness: true,
        });
        assert!(dispatcher.media.is_some());
        assert!(dispatcher.volume.is_none());
        assert!(dispatcher.brightness.is_some());
    }
}
