// MIT License - Copyright (c) 2026 Peter Wright

//! Typed handles over a shared session, one per controllable device.

pub mod keypad;
pub mod output;
