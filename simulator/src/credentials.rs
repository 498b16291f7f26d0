use std::collections::HashMap;
use std::env;

use crate::registry::DeviceIdentity;

const TOKEN_PREFIX: &str = "TOKEN_DEVICE_";

/// Device tokens, resolved once at startup and keyed by device ID.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    tokens: HashMap<u32, String>,
}

impl Credentials {
    /// Looks up `TOKEN_DEVICE_<id>` for every device in the registry.
    pub fn from_env(devices: &[DeviceIdentity]) -> Self {
        Self::resolve(devices, |key| env::var(key).ok())
    }

    /// Resolves tokens through an arbitrary lookup keyed by variable name.
    pub fn resolve<F>(devices: &[DeviceIdentity], lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let tokens = devices
            .iter()
            .filter_map(|device| {
                lookup(&token_key(device.device_id))
                    .filter(|token| !token.is_empty())
                    .map(|token| (device.device_id, token))
            })
            .collect();

        Self { tokens }
    }

    pub fn get(&self, device_id: u32) -> Option<&str> {
        self.tokens.get(&device_id).map(String::as_str)
    }
}

impl FromIterator<(u32, String)> for Credentials {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

pub fn token_key(device_id: u32) -> String {
    format!("{TOKEN_PREFIX}{device_id}")
}
