//! On-screen overlays as described by the `VideoWidget` config table.

use serde::{Deserialize, Serialize};

use crate::cgi::value::{ParsedResponse, Value};

/// Upper bound of the camera's normalized overlay coordinate space.
pub const RECT_MAX: i64 = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    Name,
    Timestamp,
    Logo,
}

impl OverlayKind {
    pub const ALL: [OverlayKind; 3] = [OverlayKind::Name, OverlayKind::Timestamp, OverlayKind::Logo];

    /// Section name inside `VideoWidget[n]`.
    pub fn config_key(&self) -> &'static str {
        match self {
            Self::Name => "ChannelTitle",
            Self::Timestamp => "TimeTitle",
            Self::Logo => "PictureTitle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl Rect {
    /// Whether the rectangle is non-empty and inside `0..=RECT_MAX`.
    /// The camera decides what it accepts; this is for display logic only.
    pub fn is_well_formed(&self) -> bool {
        let in_range = |v: i64| (0..=RECT_MAX).contains(&v);
        self.left < self.right
            && self.top < self.bottom
            && [self.left, self.top, self.right, self.bottom]
                .into_iter()
                .all(in_range)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayDescriptor {
    pub kind: OverlayKind,
    pub visible: bool,
    pub rect: Option<Rect>,
    pub background: Option<Rgba>,
    pub foreground: Option<Rgb>,
}

impl OverlayDescriptor {
    /// Read every overlay present for `channel` from a parsed
    /// `getConfig&name=VideoWidget` response. Both the `table.`-prefixed
    /// form the camera emits and the bare form are accepted.
    pub fn from_config(parsed: &ParsedResponse, channel: usize) -> Vec<OverlayDescriptor> {
        let root = parsed
            .get("table")
            .and_then(Value::as_map)
            .unwrap_or(parsed);

        let Some(widget) = root
            .get("VideoWidget")
            .and_then(Value::as_list)
            .and_then(|channels| channels.get(channel))
            .and_then(Value::as_map)
        else {
            return Vec::new();
        };

        OverlayKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let section = widget.get(kind.config_key()).and_then(Value::as_map)?;
                Some(Self::from_section(kind, section))
            })
            .collect()
    }

    fn from_section(kind: OverlayKind, section: &ParsedResponse) -> Self {
        let rect = int_components::<4>(section.get("Rect")).map(|[left, top, right, bottom]| Rect {
            left,
            top,
            right,
            bottom,
        });
        let background = int_components::<4>(section.get("BackColor")).map(|[r, g, b, a]| Rgba {
            r: channel_byte(r),
            g: channel_byte(g),
            b: channel_byte(b),
            a: channel_byte(a),
        });
        let foreground = int_components::<3>(section.get("FrontColor")).map(|[r, g, b]| Rgb {
            r: channel_byte(r),
            g: channel_byte(g),
            b: channel_byte(b),
        });

        Self {
            kind,
            visible: section
                .get("EncodeBlend")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            rect,
            background,
            foreground,
        }
    }

    /// `setConfig` parameters that write this overlay back to `channel`.
    /// Absent components are left untouched on the camera.
    pub fn to_config_params(&self, channel: usize) -> Vec<(String, String)> {
        let prefix = format!("VideoWidget[{}].{}", channel, self.kind.config_key());
        let mut params = vec![(format!("{}.EncodeBlend", prefix), self.visible.to_string())];

        if let Some(rect) = self.rect {
            let values = [rect.left, rect.top, rect.right, rect.bottom];
            push_indexed(&mut params, &prefix, "Rect", &values);
        }
        if let Some(bg) = self.background {
            let values = [bg.r, bg.g, bg.b, bg.a].map(i64::from);
            push_indexed(&mut params, &prefix, "BackColor", &values);
        }
        if let Some(fg) = self.foreground {
            let values = [fg.r, fg.g, fg.b].map(i64::from);
            push_indexed(&mut params, &prefix, "FrontColor", &values);
        }

        params
    }
}

fn push_indexed(params: &mut Vec<(String, String)>, prefix: &str, field: &str, values: &[i64]) {
    for (i, v) in values.iter().enumerate() {
        params.push((format!("{}.{}[{}]", prefix, field, i), v.to_string()));
    }
}

fn int_components<const N: usize>(value: Option<&Value>) -> Option<[i64; N]> {
    let items = value?.as_list()?;
    if items.len() < N {
        return None;
    }

    let mut out = [0i64; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_f64()?.round() as i64;
    }
    Some(out)
}

fn channel_byte(v: i64) -> u8 {
    v.clamp(0, 255) as u8
}
