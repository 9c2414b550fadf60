use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cgi::value::{ParsedResponse, Value};

/// Identity fields gathered from four independent `magicBox` calls.
/// Any of them may be missing; partial results are normal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,
}

impl SystemInfo {
    pub fn is_empty(&self) -> bool {
        self.device_type.is_none()
            && self.serial_number.is_none()
            && self.hardware_version.is_none()
            && self.software_version.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PtzAction {
    Start,
    Stop,
}

impl PtzAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

/// Movement or preset verb understood by `ptz.cgi`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PtzCode {
    Up,
    Down,
    Left,
    Right,
    LeftUp,
    RightUp,
    LeftDown,
    RightDown,
    ZoomTele,
    ZoomWide,
    FocusNear,
    FocusFar,
    IrisLarge,
    IrisSmall,
    GotoPreset,
    SetPreset,
    ClearPreset,
    /// Any verb not listed above, passed through as-is.
    Other(String),
}

impl PtzCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::LeftUp => "LeftUp",
            Self::RightUp => "RightUp",
            Self::LeftDown => "LeftDown",
            Self::RightDown => "RightDown",
            Self::ZoomTele => "ZoomTele",
            Self::ZoomWide => "ZoomWide",
            Self::FocusNear => "FocusNear",
            Self::FocusFar => "FocusFar",
            Self::IrisLarge => "IrisLarge",
            Self::IrisSmall => "IrisSmall",
            Self::GotoPreset => "GotoPreset",
            Self::SetPreset => "SetPreset",
            Self::ClearPreset => "ClearPreset",
            Self::Other(code) => code,
        }
    }

    /// Diagonal moves take a vertical and a horizontal speed.
    pub fn is_diagonal(&self) -> bool {
        matches!(
            self,
            Self::LeftUp | Self::RightUp | Self::LeftDown | Self::RightDown
        )
    }
}

impl fmt::Display for PtzCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fire-and-forget `ptz.cgi` request.
///
/// The meaning of `arg1..arg3` depends on `code`: directional moves carry
/// the speed in `arg2` (diagonals use `arg1` for the vertical speed),
/// preset verbs carry the preset index in `arg2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtzCommand {
    pub action: PtzAction,
    pub code: PtzCode,
    pub channel: u32,
    pub arg1: i32,
    pub arg2: i32,
    pub arg3: i32,
}

impl PtzCommand {
    pub fn movement(action: PtzAction, code: PtzCode, channel: u32, speed: i32) -> Self {
        let arg1 = if code.is_diagonal() { speed } else { 0 };
        Self {
            action,
            code,
            channel,
            arg1,
            arg2: speed,
            arg3: 0,
        }
    }

    pub fn preset(code: PtzCode, channel: u32, index: i32) -> Self {
        Self {
            action: PtzAction::Start,
            code,
            channel,
            arg1: 0,
            arg2: index,
            arg3: 0,
        }
    }

    pub(crate) fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("action", self.action.as_str().to_string()),
            ("channel", self.channel.to_string()),
            ("code", self.code.as_str().to_string()),
            ("arg1", self.arg1.to_string()),
            ("arg2", self.arg2.to_string()),
            ("arg3", self.arg3.to_string()),
        ]
    }
}

/// A stored PTZ position as listed by `ptz.cgi?action=getPresets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub index: i64,
    pub name: String,
}

impl Preset {
    /// Collect presets from a parsed `presets[n].Index` / `presets[n].Name`
    /// listing. Placeholder entries without an index are skipped.
    pub fn from_response(parsed: &ParsedResponse) -> Vec<Preset> {
        let Some(entries) = parsed.get("presets").and_then(Value::as_list) else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(Value::as_map)
            .filter_map(|entry| {
                let index = entry.get("Index").and_then(Value::as_i64)?;
                let name = entry
                    .get("Name")
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                Some(Preset { index, name })
            })
            .collect()
    }
}
