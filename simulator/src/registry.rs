use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{Error, Result};

/// Immutable identity of a simulated device, as listed in the registry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdentity {
    pub device_id: u32,
    pub serial: String,
    pub name: String,
    pub location: String,
}

/// Reads the device registry. Any failure here is fatal for the process.
pub fn load_registry(path: impl AsRef<Path>) -> Result<Vec<DeviceIdentity>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| Error::Registry {
        path: path.to_path_buf(),
        source,
    })?;

    let devices = parse_registry(&raw).map_err(|source| Error::RegistryFormat {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), devices = devices.len(), "Loaded device registry");
    Ok(devices)
}

fn parse_registry(raw: &str) -> serde_json::Result<Vec<DeviceIdentity>> {
    serde_json::from_str(raw)
}
