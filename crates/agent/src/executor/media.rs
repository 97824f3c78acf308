//! Media executor, driving the active MPRIS player via playerctl.

use async_trait::async_trait;
use domain::models::{ActionPayload, MediaAction};

use super::{run_os_command, Executor};
use crate::error::AgentError;

const PLAYERCTL: &str = "playerctl";

/// Executes media transport actions against the active player.
pub struct MediaExecutor;

fn playerctl_args(action: MediaAction) -> Vec<String> {
    let subcommand = match action {
        MediaAction::Next => "next",
        MediaAction::Previous => "previous",
        MediaAction::PlayPause => "play-pause",
        MediaAction::Stop => "stop",
    };
    vec![subcommand.to_string()]
}

#[async_trait]
impl Executor for MediaExecutor {
    fn name(&self) -> &'static str {
        "media"
    }

    async fn execute(&self, payload: &ActionPayload) -> Result<(), AgentError> {
        let ActionPayload::Media { action } = payload else {
            return Err(AgentError::Executor(
                "media executor received a non-media payload".to_string(),
            ));
        };

        run_os_command(PLAYERCTL, &playerctl_args(*action)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playerctl_args() {
        assert_eq!(playerctl_args(MediaAction::Next), vec!["next"]);
        assert_eq!(playerctl_args(MediaAction::Previous), vec!["previous"]);
        assert_eq!(playerctl_args(MediaAction::PlayPause), vec!["play-pause"]);
        assert_eq!(playerctl_args(MediaAction::Stop), vec!["stop"]);
    }
}
