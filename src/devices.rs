use crate::{Result, ScreenshotError};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Widths at or below this are emulated as touch-capable mobile screens.
pub const MOBILE_MAX_WIDTH: u32 = 768;

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub scale_factor: f64,
    pub is_mobile: bool,
    pub has_touch: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            scale_factor: 1.0,
            is_mobile: false,
            has_touch: false,
        }
    }
}

/// A viewport entry as written in the sites file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSpec {
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_mobile: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_touch: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl DeviceSpec {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scale_factor: None,
            is_mobile: None,
            has_touch: None,
            user_agent: None,
        }
    }

    pub fn validate(&self, device: &str) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ScreenshotError::ConfigError(format!(
                "Viewport for \"{}\" must have non-zero width and height",
                device
            )));
        }

        if let Some(scale) = self.scale_factor
            && !(0.5..=5.0).contains(&scale)
        {
            return Err(ScreenshotError::ConfigError(format!(
                "Viewport for \"{}\": scale_factor must be between 0.5 and 5.0",
                device
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub name: String,
    pub viewport: Viewport,
    pub user_agent: String,
}

pub static DEVICE_PRESETS: Lazy<Vec<DeviceProfile>> = Lazy::new(|| {
    vec![
        DeviceProfile {
            name: String::from("desktop"),
            viewport: Viewport {
                width: 1920,
                height: 1080,
                scale_factor: 1.0,
                is_mobile: false,
                has_touch: false,
            },
            user_agent: String::from(DESKTOP_USER_AGENT),
        },
        DeviceProfile {
            name: String::from("mobile"),
            viewport: Viewport {
                width: 375,
                height: 667,
                scale_factor: 2.0,
                is_mobile: true,
                has_touch: true,
            },
            user_agent: String::from(MOBILE_USER_AGENT),
        },
        DeviceProfile {
            name: String::from("tablet"),
            viewport: Viewport {
                width: 768,
                height: 1024,
                scale_factor: 2.0,
                is_mobile: true,
                has_touch: true,
            },
            user_agent: String::from(
                "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
            ),
        },
    ]
});

pub fn get_preset(name: &str) -> Option<&'static DeviceProfile> {
    DEVICE_PRESETS
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(name))
}

/// Resolves the emulation profile for `device`.
///
/// A viewport table entry wins over the preset for dimensions and flags; the
/// preset still supplies the user agent unless the entry names one. Devices
/// that are neither in the table nor a preset cannot be emulated.
pub fn resolve_profile(
    device: &str,
    viewports: &BTreeMap<String, DeviceSpec>,
) -> Result<DeviceProfile> {
    let preset = get_preset(device);

    let Some(spec) = viewports.get(device) else {
        return preset
            .map(|p| DeviceProfile {
                name: device.to_string(),
                ..p.clone()
            })
            .ok_or_else(|| ScreenshotError::DeviceNotFound(device.to_string()));
    };

    let small = spec.width <= MOBILE_MAX_WIDTH;
    let is_mobile = spec.is_mobile.unwrap_or(small);
    let viewport = Viewport {
        width: spec.width,
        height: spec.height,
        scale_factor: spec
            .scale_factor
            .or(preset.map(|p| p.viewport.scale_factor))
            .unwrap_or(1.0),
        is_mobile,
        has_touch: spec.has_touch.unwrap_or(small),
    };

    let user_agent = spec
        .user_agent
        .clone()
        .or_else(|| preset.map(|p| p.user_agent.clone()))
        .unwrap_or_else(|| {
            if is_mobile {
                MOBILE_USER_AGENT.to_string()
            } else {
                DESKTOP_USER_AGENT.to_string()
            }
        });

    Ok(DeviceProfile {
        name: device.to_string(),
        viewport,
        user_agent,
    })
}
