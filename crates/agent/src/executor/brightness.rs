//! Brightness executor, driving the backlight via brightnessctl.

use async_trait::async_trait;
use domain::models::{ActionPayload, BrightnessAction};

use super::{run_os_command, Executor};
use crate::error::AgentError;

const BRIGHTNESSCTL: &str = "brightnessctl";

/// Relative step for increase/decrease, in percent.
const BRIGHTNESS_STEP: u8 = 10;

/// Executes brightness actions against the primary backlight device.
pub struct BrightnessExecutor;

fn brightnessctl_args(action: BrightnessAction, value: Option<u8>) -> Vec<String> {
    let spec = match action {
        BrightnessAction::Set => format!("{}%", value.unwrap_or(0)),
        BrightnessAction::Increase => format!("+{}%", BRIGHTNESS_STEP),
        // brightnessctl spells "subtract" with a trailing minus
        BrightnessAction::Decrease => format!("{}%-", BRIGHTNESS_STEP),
    };
    vec!["set".to_string(), spec]
}

#[async_trait]
impl Executor for BrightnessExecutor {
    fn name(&self) -> &'static str {
        "brightness"
    }

    async fn execute(&self, payload: &ActionPayload) -> Result<(), AgentError> {
        let ActionPayload::Brightness { action, value } = payload else {
            return Err(AgentError::Executor(
                "brightness executor received a non-brightness payload".to_string(),
            ));
        };

        run_os_command(BRIGHTNESSCTL, &brightnessctl_args(*action, *value)).await
    }
}
