// MIT License - Copyright (c) 2026 Peter Wright

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;
use crate::protocol::{Action, Argument, Frame, OUTPUT};
use crate::session::BridgeSession;

/// Longest fade the bridge accepts: 4 hours.
const MAX_FADE_SECS: f64 = 14_400.0;

/// A zone-level device: a dimmer, switch, fan controller or shade.
///
/// All of them speak `OUTPUT` commands; only the meaning of the level
/// differs (brightness, on/off, fan speed, position).
pub struct Output {
    session: Arc<BridgeSession>,
    integration_id: u32,
}

impl Output {
    pub fn new(session: Arc<BridgeSession>, integration_id: u32) -> Self {
        Self {
            session,
            integration_id,
        }
    }

    pub fn integration_id(&self) -> u32 {
        self.integration_id
    }

    /// Set the level (0-100), optionally fading over `fade`.
    pub async fn set_level(&self, percent: f64, fade: Option<Duration>) -> Result<()> {
        let mut args = vec![Argument::Level(percent.clamp(0.0, 100.0))];
        if let Some(fade) = fade {
            args.push(Argument::Text(format_fade(fade.as_secs_f64())));
        }
        self.session
            .write(OUTPUT, self.integration_id, Action::Set as u32, &args)
            .await
    }

    /// Start raising the level; pair with [`Output::stop`].
    pub async fn raise(&self) -> Result<()> {
        self.session
            .write(OUTPUT, self.integration_id, Action::Raising as u32, &[])
            .await
    }

    /// Start lowering the level; pair with [`Output::stop`].
    pub async fn lower(&self) -> Result<()> {
        self.session
            .write(OUTPUT, self.integration_id, Action::Lowering as u32, &[])
            .await
    }

    /// Stop an in-progress raise or lower.
    pub async fn stop(&self) -> Result<()> {
        self.session
            .write(OUTPUT, self.integration_id, Action::Stop as u32, &[])
            .await
    }

    /// Ask the bridge to report the current level.
    ///
    /// The answer arrives asynchronously as a notification frame; match it
    /// with [`Output::level_from`] in a subscriber.
    pub async fn query_level(&self) -> Result<()> {
        self.session
            .query(OUTPUT, self.integration_id, Action::Set as u32)
            .await
    }

    /// Level carried by a frame addressed to this output, if any.
    pub fn level_from(&self, frame: &Frame) -> Option<f64> {
        (frame.mode == OUTPUT
            && frame.integration_id == self.integration_id
            && frame.action == Action::Set as u32)
            .then_some(frame.value)
    }
}

/// Format a fade time the way the bridge expects: seconds with two decimals
/// under a minute, `HH:MM:SS` above, capped at 4 hours.
pub fn format_fade(seconds: f64) -> String {
    let seconds = if seconds > MAX_FADE_SECS {
        warn!("Fade time exceeded maximum of 4 hours. 4 hours will be used instead.");
        MAX_FADE_SECS
    } else {
        seconds
    };
    if seconds < 60.0 {
        format!("{seconds:.2}")
    } else {
        let total = seconds as u64;
        format!(
            "{:02}:{:02}:{:02}",
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;

    #[test]
    fn test_format_fade_short() {
        assert_eq!(format_fade(2.5), "2.50");
        assert_eq!(format_fade(0.0), "0.00");
        assert_eq!(format_fade(59.99), "59.99");
    }

    #[test]
    fn test_format_fade_long() {
        assert_eq!(format_fade(60.0), "00:01:00");
        assert_eq!(format_fade(90.0), "00:01:30");
        assert_eq!(format_fade(3_725.0), "01:02:05");
    }

    #[test]
    fn test_format_fade_capped() {
        assert_eq!(format_fade(20_000.0), "04:00:00");
    }

    #[test]
    fn test_level_from_matches_own_frames_only() {
        let session = BridgeSession::new(BridgeConfig::builder().host("h").build());
        let output = Output::new(session, 5);

        let set = Frame {
            mode: "OUTPUT".to_string(),
            integration_id: 5,
            action: Action::Set as u32,
            value: 42.5,
        };
        assert_eq!(output.level_from(&set), Some(42.5));

        let other_id = Frame {
            integration_id: 6,
            ..set.clone()
        };
        assert_eq!(output.level_from(&other_id), None);

        let other_action = Frame {
            action: Action::Raising as u32,
            ..set.clone()
        };
        assert_eq!(output.level_from(&other_action), None);

        let device = Frame {
            mode: "DEVICE".to_string(),
            ..set
        };
        assert_eq!(output.level_from(&device), None);
    }
}
