pub mod overlay;
pub mod parser;
pub mod types;
pub mod value;

pub use overlay::{OverlayDescriptor, OverlayKind, Rect, Rgb, Rgba};
pub use parser::{extract_flat_values, parse_json, parse_key_value};
pub use types::{Preset, PtzAction, PtzCode, PtzCommand, SystemInfo};
pub use value::{ParsedResponse, Value};
