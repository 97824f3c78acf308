//! The cooperative poll loop.
//!
//! One poll-and-dispatch cycle is in flight at a time: the loop only looks at
//! the shutdown signal and the timer between cycles, so a termination request
//! lets the current batch finish instead of killing it mid-dispatch. Commands
//! inside one batch run sequentially — ordering of OS side effects matters.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use domain::models::{ActionPayload, Command};

use crate::client::ApiClient;
use crate::error::AgentError;
use crate::executor::Dispatcher;

/// The device-side poll loop.
pub struct Poller {
    client: ApiClient,
    dispatcher: Dispatcher,
    device_id: i64,
    private_key_pem: String,
    interval: Duration,
}

impl Poller {
    pub fn new(
        client: ApiClient,
        dispatcher: Dispatcher,
        device_id: i64,
        private_key_pem: String,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            dispatcher,
            device_id,
            private_key_pem,
            interval,
        }
    }

    /// Run until the shutdown signal flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        // A cycle that overruns the interval must not cause a burst of
        // catch-up polls afterwards.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            device_id = self.device_id,
            interval_ms = self.interval.as_millis() as u64,
            "Polling started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.cycle().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Poll loop stopped");
                        break;
                    }
                }
            }
        }
    }

    /// One check-in, poll, and dispatch pass.
    ///
    /// Network failures are logged and swallowed; the next tick retries.
    async fn cycle(&self) {
        if let Err(e) = self.client.check_in(self.device_id).await {
            debug!(error = %e, "Check-in failed");
        }

        let commands = match self.client.poll(self.device_id).await {
            Ok(commands) => commands,
            Err(e) => {
                warn!(error = %e, "Poll failed; retrying on next tick");
                return;
            }
        };

        if commands.is_empty() {
            return;
        }

        info!(count = commands.len(), "Received commands");

        for command in commands {
            if let Err(e) = self.process(&command).await {
                warn!(command_id = command.id, error = %e, "Command failed");
                if let Err(report_err) = self
                    .client
                    .report_failure(command.id, &e.to_string())
                    .await
                {
                    warn!(
                        command_id = command.id,
                        error = %report_err,
                        "Could not report failure"
                    );
                }
            } else {
                info!(
                    command_id = command.id,
                    command_type = %command.command_type,
                    "Command executed"
                );
            }
        }
    }

    /// Decrypt and execute one command. All failure paths funnel into a
    /// single error so the caller makes exactly one failure report.
    async fn process(&self, command: &Command) -> Result<(), AgentError> {
        let plaintext = shared::crypto::decrypt_payload(&self.private_key_pem, &command.payload)?;

        let payload = ActionPayload::from_bytes(&plaintext)
            .map_err(|e| AgentError::MalformedPayload(e.to_string()))?;

        if payload.command_type() != command.command_type {
            return Err(AgentError::PayloadTypeMismatch(command.command_type));
        }

        self.dispatcher.dispatch(&payload).await
    }
}
