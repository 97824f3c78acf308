//! Volume executor, driving the default PulseAudio/PipeWire sink via pactl.

use async_trait::async_trait;
use domain::models::{ActionPayload, VolumeAction};

use super::{run_os_command, Executor};
use crate::error::AgentError;

const PACTL: &str = "pactl";
const DEFAULT_SINK: &str = "@DEFAULT_SINK@";

/// Relative step for increase/decrease, in percent.
const VOLUME_STEP: u8 = 10;

/// Executes volume actions against the default audio sink.
pub struct VolumeExecutor;

fn mute_args(muted: bool) -> Vec<String> {
    vec![
        "set-sink-mute".to_string(),
        DEFAULT_SINK.to_string(),
        if muted { "1" } else { "0" }.to_string(),
    ]
}

fn set_volume_args(spec: String) -> Vec<String> {
    vec!["set-sink-volume".to_string(), DEFAULT_SINK.to_string(), spec]
}

/// The pactl invocations for one action, in execution order.
///
/// Raising the volume also unmutes, so an increase on a muted sink becomes
/// audible.
fn pactl_invocations(action: VolumeAction, value: Option<u8>) -> Vec<Vec<String>> {
    match action {
        VolumeAction::Set => {
            let v = value.unwrap_or(0);
            let mut invocations = Vec::new();
            if v > 0 {
                invocations.push(mute_args(false));
            }
            invocations.push(set_volume_args(format!("{}%", v)));
            invocations
        }
        VolumeAction::Increase => vec![
            mute_args(false),
            set_volume_args(format!("+{}%", VOLUME_STEP)),
        ],
        VolumeAction::Decrease => vec![set_volume_args(format!("-{}%", VOLUME_STEP))],
        VolumeAction::Mute => vec![mute_args(true)],
        VolumeAction::Unmute => vec![mute_args(false)],
    }
}

#[async_trait]
impl Executor for VolumeExecutor {
    fn name(&self) -> &'static str {
        "volume"
    }

    async fn execute(&self, payload: &ActionPayload) -> Result<(), AgentError> {
        let ActionPayload::Volume { action, value } = payload else {
            return Err(AgentError::Executor(
                "volume executor received a non-volume payload".to_string(),
            ));
        };

        for args in pactl_invocations(*action, *value) {
            run_os_command(PACTL, &args).await?;
        }
        Ok(())
    }
}
