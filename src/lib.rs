// MIT License - Copyright (c) 2026 Peter Wright
//
//! # lutron-lip-bridge
//!
//! Direct telnet communication with Lutron Caseta Smart Bridge PRO and
//! RA2 Select main repeaters, using the integration protocol the bridge
//! exposes on port 23 (enable it in the mobile app first).
//!
//! One physical connection is shared per bridge host: ask the
//! [`BridgeRegistry`] for a [`BridgeSession`], open it, register a
//! subscriber, then issue writes and queries from as many callers as
//! needed. A background read loop fans every notification out to all
//! subscribers; a 60-second keepalive ping detects and repairs dropped
//! connections.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lutron_lip_bridge::{BridgeRegistry, Output};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = BridgeRegistry::new();
//!     let session = registry.get_or_create("192.168.1.100");
//!
//!     session.open().await;
//!     session.register(|frame| {
//!         println!(
//!             "{} {} {} {}",
//!             frame.mode, frame.integration_id, frame.action, frame.value
//!         );
//!     });
//!     session.start();
//!
//!     let light = Output::new(Arc::clone(&session), 2);
//!     light.set_level(75.0, None).await?;
//!     light.query_level().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     session.stop().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod devices;
pub mod error;
pub mod integration;
pub mod protocol;
pub mod registry;
pub mod session;

// Re-exports for convenience
pub use config::{BridgeConfig, BridgeConfigBuilder, DEFAULT_PASSWORD, DEFAULT_PORT, DEFAULT_USERNAME};
pub use connection::{Connection, ConnectionState, ReadOutcome};
pub use devices::keypad::{ButtonEvent, Keypad, Scene};
pub use devices::output::Output;
pub use error::{LipError, Result};
pub use integration::{
    apply_kind_overrides, load_integration_report, parse_integration_report, DeviceKind,
    InventoryDevice,
};
pub use protocol::{Action, Argument, Button, Frame, DEVICE, OUTPUT};
pub use registry::BridgeRegistry;
pub use session::{BridgeSession, FrameCallback, SubscriptionToken};
