// MIT License - Copyright (c) 2026 Peter Wright

use std::sync::Arc;

use crate::error::Result;
use crate::protocol::{Argument, Button, Frame, DEVICE};
use crate::session::BridgeSession;

/// Integration ID the bridge answers on; scene buttons live here.
const BRIDGE_INTEGRATION_ID: u32 = 1;

/// A button press or release on a keypad or remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: u32,
    pub action: Button,
}

/// A button remote (Pico) or keypad, identified by its integration ID.
pub struct Keypad {
    session: Arc<BridgeSession>,
    integration_id: u32,
}

impl Keypad {
    pub fn new(session: Arc<BridgeSession>, integration_id: u32) -> Self {
        Self {
            session,
            integration_id,
        }
    }

    pub fn integration_id(&self) -> u32 {
        self.integration_id
    }

    /// Decode a frame into a button event for this keypad, if it is one.
    ///
    /// `DEVICE` frames carry the button number in the action field and the
    /// press/release code in the value field.
    pub fn event_from(&self, frame: &Frame) -> Option<ButtonEvent> {
        if frame.mode != DEVICE || frame.integration_id != self.integration_id {
            return None;
        }
        let action = Button::from_value(frame.value as u32)?;
        Some(ButtonEvent {
            button: frame.action,
            action,
        })
    }

    /// Emit a synthetic press of the given button.
    pub async fn press(&self, button: u32) -> Result<()> {
        self.session
            .write(
                DEVICE,
                self.integration_id,
                button,
                &[Argument::Integer(Button::Press as i64)],
            )
            .await
    }

    /// Emit a synthetic release of the given button.
    pub async fn release(&self, button: u32) -> Result<()> {
        self.session
            .write(
                DEVICE,
                self.integration_id,
                button,
                &[Argument::Integer(Button::Release as i64)],
            )
            .await
    }
}

/// A scene programmed on the bridge, activated by pressing its button.
pub struct Scene {
    session: Arc<BridgeSession>,
    scene_id: u32,
}

impl Scene {
    pub fn new(session: Arc<BridgeSession>, scene_id: u32) -> Self {
        Self { session, scene_id }
    }

    pub fn scene_id(&self) -> u32 {
        self.scene_id
    }

    /// Activate the scene.
    pub async fn activate(&self) -> Result<()> {
        self.session
            .write(
                DEVICE,
                BRIDGE_INTEGRATION_ID,
                self.scene_id,
                &[Argument::Integer(Button::Press as i64)],
            )
            .await
    }

    /// True when the frame reports this scene's button being pressed.
    pub fn activated_by(&self, frame: &Frame) -> bool {
        frame.mode == DEVICE
            && frame.integration_id == BRIDGE_INTEGRATION_ID
            && frame.action == self.scene_id
            && Button::from_value(frame.value as u32) == Some(Button::Press)
    }
}
