//! Per-class device layout

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of phone being backed up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    #[value(name = "iphone")]
    IPhone,
    #[value(alias = "pixel")]
    #[serde(alias = "pixel")]
    Android,
}

/// Where a class of device keeps its camera roll, and how to recognise it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    pub class: DeviceClass,
    /// Case-insensitive substring of the transport's display name
    pub name_pattern: &'static str,
    /// Device-relative DCIM directory
    pub media_root: &'static str,
}

pub const DEVICE_PROFILES: &[DeviceProfile] = &[
    DeviceProfile {
        class: DeviceClass::IPhone,
        name_pattern: "iPhone",
        media_root: "Internal Storage/DCIM",
    },
    DeviceProfile {
        class: DeviceClass::Android,
        name_pattern: "Pixel",
        media_root: "Internal shared storage/DCIM",
    },
];

impl DeviceClass {
    pub fn profile(self) -> &'static DeviceProfile {
        DEVICE_PROFILES
            .iter()
            .find(|p| p.class == self)
            .unwrap_or(&DEVICE_PROFILES[0])
    }

    pub fn name_pattern(self) -> &'static str {
        self.profile().name_pattern
    }

    pub fn media_root(self) -> &'static Utf8Path {
        Utf8Path::new(self.profile().media_root)
    }

    /// Parse user input such as "iphone", "Pixel" or "android"
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "iphone" | "1" => Some(DeviceClass::IPhone),
            "android" | "pixel" | "2" => Some(DeviceClass::Android),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::IPhone => write!(f, "iPhone"),
            DeviceClass::Android => write!(f, "Android"),
        }
    }
}
