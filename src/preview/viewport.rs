use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Container size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Device classes the preview container can emulate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewportPreset {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

impl ViewportPreset {
    pub const ALL: [ViewportPreset; 3] = [Self::Desktop, Self::Tablet, Self::Mobile];

    pub fn dimensions(self) -> Dimensions {
        match self {
            Self::Desktop => Dimensions {
                width: 1280,
                height: 800,
            },
            Self::Tablet => Dimensions {
                width: 768,
                height: 1024,
            },
            Self::Mobile => Dimensions {
                width: 375,
                height: 667,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Tablet => "tablet",
            Self::Mobile => "mobile",
        }
    }
}

impl fmt::Display for ViewportPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewportPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "desktop" => Ok(Self::Desktop),
            "tablet" => Ok(Self::Tablet),
            "mobile" => Ok(Self::Mobile),
            _ => Err(format!("Invalid viewport preset: {}", s)),
        }
    }
}
