// MIT License - Copyright (c) 2026 Peter Wright

//! Integration report parsing.
//!
//! The bridge's mobile app exports a JSON integration report listing every
//! programmed device and its integration ID. Zones (lights, switches,
//! shades) live under `LIPIdList.Zones`; button remotes and the bridge
//! itself under `LIPIdList.Devices`. Scene buttons are the named buttons of
//! the bridge device (integration ID 1).

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{LipError, Result};

/// Role a device plays, deciding which commands apply to it.
///
/// Zones default to [`DeviceKind::Light`]; use
/// [`apply_kind_overrides`] to mark individual IDs as switches, covers or
/// fans, since the report does not distinguish them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Light,
    Switch,
    Cover,
    Fan,
    Scene,
    Sensor,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Switch => "switch",
            Self::Cover => "cover",
            Self::Fan => "fan",
            Self::Scene => "scene",
            Self::Sensor => "sensor",
        }
    }
}

/// One device from the integration report.
#[derive(Debug, Clone)]
pub struct InventoryDevice {
    pub integration_id: u32,
    pub name: String,
    pub kind: DeviceKind,
    /// Area the device is assigned to, when present in the report.
    pub area_name: Option<String>,
    /// Button numbers, for button-remote sensors.
    pub buttons: Vec<u32>,
    /// Bridge button number, for scenes.
    pub scene_id: Option<u32>,
}

#[derive(Deserialize)]
struct IntegrationReport {
    #[serde(rename = "LIPIdList")]
    lip_id_list: Option<LipIdList>,
}

#[derive(Deserialize)]
struct LipIdList {
    #[serde(default, rename = "Zones")]
    zones: Vec<ZoneEntry>,
    #[serde(default, rename = "Devices")]
    devices: Vec<DeviceEntry>,
}

#[derive(Deserialize)]
struct ZoneEntry {
    #[serde(rename = "ID")]
    id: u32,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Area")]
    area: Option<AreaEntry>,
}

#[derive(Deserialize)]
struct DeviceEntry {
    #[serde(rename = "ID")]
    id: u32,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Buttons")]
    buttons: Option<Vec<ButtonEntry>>,
    #[serde(rename = "Area")]
    area: Option<AreaEntry>,
}

#[derive(Deserialize)]
struct ButtonEntry {
    #[serde(rename = "Number")]
    number: u32,
    #[serde(default, rename = "Name")]
    name: Option<String>,
}

#[derive(Deserialize)]
struct AreaEntry {
    #[serde(rename = "Name")]
    name: Option<String>,
}

/// The bridge's own integration ID; its buttons are the programmed scenes.
const BRIDGE_DEVICE_ID: u32 = 1;

/// Load and parse an integration report file.
pub fn load_integration_report(path: impl AsRef<Path>) -> Result<Vec<InventoryDevice>> {
    let text = fs::read_to_string(path)?;
    parse_integration_report(&text)
}

/// Parse an integration report from its JSON text.
///
/// Zones become lights; non-bridge devices with buttons become button
/// sensors; named buttons on the bridge device become scenes. A report
/// without `LIPIdList` yields no devices.
pub fn parse_integration_report(text: &str) -> Result<Vec<InventoryDevice>> {
    let report: IntegrationReport =
        serde_json::from_str(text).map_err(|e| LipError::Report {
            details: e.to_string(),
        })?;

    let Some(list) = report.lip_id_list else {
        warn!("'LIPIdList' not found in the integration report. No devices will be loaded.");
        return Ok(Vec::new());
    };

    let mut devices = Vec::new();

    for zone in list.zones {
        devices.push(InventoryDevice {
            integration_id: zone.id,
            name: zone.name,
            kind: DeviceKind::Light,
            area_name: zone.area.and_then(|a| a.name),
            buttons: Vec::new(),
            scene_id: None,
        });
    }

    for device in list.devices {
        let Some(buttons) = device.buttons else {
            continue;
        };
        if device.id == BRIDGE_DEVICE_ID {
            for button in buttons {
                let Some(name) = button.name else { continue };
                // Unprogrammed bridge buttons keep their "Button N" placeholder
                if name.starts_with("Button ") {
                    continue;
                }
                info!("Found scene {}, {}", button.number, name);
                devices.push(InventoryDevice {
                    integration_id: BRIDGE_DEVICE_ID,
                    name,
                    kind: DeviceKind::Scene,
                    area_name: None,
                    buttons: Vec::new(),
                    scene_id: Some(button.number),
                });
            }
        } else {
            devices.push(InventoryDevice {
                integration_id: device.id,
                name: device.name,
                kind: DeviceKind::Sensor,
                area_name: device.area.and_then(|a| a.name),
                buttons: buttons.iter().map(|b| b.number).collect(),
                scene_id: None,
            });
        }
    }

    Ok(devices)
}

/// Reclassify the listed integration IDs as `kind`.
///
/// The report cannot tell a switch, cover or fan apart from a light; the
/// caller supplies the IDs per kind. IDs missing from the inventory are
/// logged and skipped.
pub fn apply_kind_overrides(devices: &mut [InventoryDevice], kind: DeviceKind, ids: &[u32]) {
    for &id in ids {
        match devices
            .iter_mut()
            .find(|d| d.integration_id == id && d.kind != DeviceKind::Scene)
        {
            Some(device) => device.kind = kind,
            None => warn!(
                "Integration ID {} for type {} not found in the integration report.",
                id,
                kind.as_str()
            ),
        }
    }
}
