//! Parser for the camera's line-oriented `key=value` response format.
//!
//! Keys may describe nested structure with dotted segments (`a.b.c`) and
//! indexed segments (`name[3]`), freely combined:
//!
//! ```text
//! Encode[0].MainFormat[0].Video.Width=1920
//! ```
//!
//! Parsing never fails. Firmware frames success and failure inconsistently,
//! so unusable lines are skipped and the caller gets whatever structure the
//! remaining lines describe.

use std::collections::BTreeMap;

use crate::cgi::value::{ParsedResponse, Value};

/// Indexed segments beyond this are dropped instead of growing a sequence
/// to match.
const MAX_INDEX: usize = 1 << 16;

/// Keys with more segments than this are dropped. Each segment is one
/// level of nesting in the result.
const MAX_DEPTH: usize = 32;

/// Parse a `key=value` response body.
pub fn parse_key_value(text: &str) -> ParsedResponse {
    let mut result = ParsedResponse::new();

    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "OK" {
        return result;
    }

    for line in text.split('\n') {
        let line = line.trim();
        if line.is_empty() || line == "Error" {
            continue;
        }

        let Some((key, raw_value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        assign_path(&mut result, key, coerce_value(raw_value.trim()));
    }

    result
}

/// Parse a JSON body from newer endpoints. Malformed input is logged and
/// yields `None`.
pub fn parse_json(text: &str) -> Option<serde_json::Value> {
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Failed to parse JSON response: {}", e);
            None
        }
    }
}

/// Flatten nested mappings into dotted keys with stringified leaves.
///
/// Sequences are leaves here and are not walked into.
pub fn extract_flat_values(parsed: &ParsedResponse, prefix: &str) -> BTreeMap<String, String> {
    let mut flat = BTreeMap::new();
    flatten_into(parsed, prefix, &mut flat);
    flat
}

fn flatten_into(map: &ParsedResponse, prefix: &str, out: &mut BTreeMap<String, String>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Map(nested) => flatten_into(nested, &path, out),
            leaf => {
                out.insert(path, leaf.to_string());
            }
        }
    }
}

fn coerce_value(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    if is_decimal(raw) {
        if let Ok(n) = raw.parse::<f64>() {
            return Value::Number(n);
        }
    }

    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Value::String(raw[1..raw.len() - 1].to_string());
    }

    Value::String(raw.to_string())
}

/// `-?\d+(\.\d+)?`
fn is_decimal(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());

    match unsigned.split_once('.') {
        Some((int, frac)) => all_digits(int) && all_digits(frac),
        None => all_digits(unsigned),
    }
}

/// Split `name[index]` into its parts. Plain segments yield `None`.
pub(crate) fn split_indexed(segment: &str) -> Option<(&str, usize)> {
    let inner = segment.strip_suffix(']')?;
    let open = inner.rfind('[')?;
    let (name, digits) = (&inner[..open], &inner[open + 1..]);

    if name.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok().map(|index| (name, index))
}

fn assign_path(root: &mut ParsedResponse, key: &str, value: Value) {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.len() > MAX_DEPTH {
        tracing::debug!("Skipping key nested {} levels deep", segments.len());
        return;
    }
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        current = match descend(current, segment) {
            Some(next) => next,
            None => return,
        };
    }

    match split_indexed(last) {
        Some((name, index)) => {
            if index > MAX_INDEX {
                tracing::debug!("Skipping out-of-range index in key {}", key);
                return;
            }
            let items = list_slot(current, name);
            if items.len() <= index {
                items.resize(index + 1, Value::empty_map());
            }
            items[index] = value;
        }
        None => {
            current.insert(*last, value);
        }
    }
}

/// Step into the mapping a non-final segment names, creating it (and any
/// sparse sequence entries before it) as needed.
fn descend<'a>(map: &'a mut ParsedResponse, segment: &str) -> Option<&'a mut ParsedResponse> {
    let slot = match split_indexed(segment) {
        Some((name, index)) => {
            if index > MAX_INDEX {
                return None;
            }
            let items = list_slot(map, name);
            if items.len() <= index {
                items.resize(index + 1, Value::empty_map());
            }
            &mut items[index]
        }
        None => map
            .entries_mut()
            .entry(segment.to_string())
            .or_insert_with(Value::empty_map),
    };

    Some(ensure_map(slot))
}

fn ensure_map(slot: &mut Value) -> &mut ParsedResponse {
    if !matches!(slot, Value::Map(_)) {
        *slot = Value::empty_map();
    }
    match slot {
        Value::Map(map) => map,
        _ => unreachable!("slot holds a map"),
    }
}

fn list_slot<'a>(map: &'a mut ParsedResponse, name: &str) -> &'a mut Vec<Value> {
    let slot = map
        .entries_mut()
        .entry(name.to_string())
        .or_insert_with(|| Value::List(Vec::new()));

    if !matches!(slot, Value::List(_)) {
        *slot = Value::List(Vec::new());
    }
    match slot {
        Value::List(items) => items,
        _ => unreachable!("slot holds a list"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_flat_values_are_coerced() {
        let parsed = parse_key_value("Focus=0.5\nEnable=true\nName=\"Cam1\"\nMode=Auto");

        assert_eq!(parsed.get("Focus"), Some(&Value::Number(0.5)));
        assert_eq!(parsed.get("Enable"), Some(&Value::Bool(true)));
        assert_eq!(parsed.get("Name"), Some(&Value::String("Cam1".to_string())));
        assert_eq!(parsed.get("Mode"), Some(&Value::String("Auto".to_string())));
    }

    #[test]
    fn test_boolean_coercion_ignores_case() {
        let parsed = parse_key_value("a=TRUE\nb=False");
        assert_eq!(parsed.get("a"), Some(&Value::Bool(true)));
        assert_eq!(parsed.get("b"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_number_pattern_is_strict() {
        let parsed = parse_key_value("neg=-12\nver=2.400.0000.0.R\ntrailing=1.\nlead=.5\nhex=0x10");

        assert_eq!(parsed.get("neg"), Some(&Value::Number(-12.0)));
        assert_eq!(parsed.get("ver"), Some(&Value::String("2.400.0000.0.R".to_string())));
        assert_eq!(parsed.get("trailing"), Some(&Value::String("1.".to_string())));
        assert_eq!(parsed.get("lead"), Some(&Value::String(".5".to_string())));
        assert_eq!(parsed.get("hex"), Some(&Value::String("0x10".to_string())));
    }

    #[test]
    fn test_empty_and_ok_bodies_yield_empty_mapping() {
        assert!(parse_key_value("").is_empty());
        assert!(parse_key_value("   ").is_empty());
        assert!(parse_key_value("OK").is_empty());
        assert!(parse_key_value("  OK\r\n").is_empty());
    }

    #[test]
    fn test_error_line_is_skipped() {
        let parsed = parse_key_value("Error\nfoo=1");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("foo"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_lines_without_key_are_skipped() {
        let parsed = parse_key_value("Error\nBad Request!\n=orphan\n  \nsn=ABC123\r\n");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("sn"), Some(&Value::String("ABC123".to_string())));
    }

    #[test]
    fn test_value_keeps_everything_after_first_equals() {
        let parsed = parse_key_value("url=rtsp://host/?a=1&b=2");
        assert_eq!(
            parsed.get("url"),
            Some(&Value::String("rtsp://host/?a=1&b=2".to_string()))
        );
    }

    #[test]
    fn test_dotted_paths_nest() {
        let parsed = parse_key_value("status.Focus=0.5\nstatus.Zoom=0.5");
        assert_eq!(
            parsed.get("status"),
            Some(&map(vec![
                ("Focus", Value::Number(0.5)),
                ("Zoom", Value::Number(0.5)),
            ]))
        );
    }

    #[test]
    fn test_indexed_and_dotted_segments_combine() {
        let parsed = parse_key_value(
            "Encode[0].MainFormat[0].Video.Width=1920\nEncode[0].MainFormat[0].Video.Height=1080",
        );

        let encode = parsed.get("Encode").and_then(Value::as_list).unwrap();
        assert_eq!(encode.len(), 1);
        let main_format = encode[0]
            .as_map()
            .and_then(|m| m.get("MainFormat"))
            .and_then(Value::as_list)
            .unwrap();
        assert_eq!(
            main_format[0],
            map(vec![(
                "Video",
                map(vec![
                    ("Width", Value::Number(1920.0)),
                    ("Height", Value::Number(1080.0)),
                ])
            )])
        );
    }

    #[test]
    fn test_final_indexed_segment_assigns_in_place() {
        let parsed = parse_key_value(
            "VideoWidget[0].ChannelTitle.Rect[0]=256\nVideoWidget[0].ChannelTitle.Rect[3]=1024",
        );

        let rect = parsed
            .get_path("VideoWidget[0].ChannelTitle.Rect")
            .and_then(Value::as_list)
            .unwrap();
        assert_eq!(rect.len(), 4);
        assert_eq!(rect[0], Value::Number(256.0));
        assert_eq!(rect[1], Value::empty_map());
        assert_eq!(rect[2], Value::empty_map());
        assert_eq!(rect[3], Value::Number(1024.0));
    }

    #[test]
    fn test_sparse_indices_leave_placeholders() {
        let parsed = parse_key_value("presets[2].Name=Door");
        let presets = parsed.get("presets").and_then(Value::as_list).unwrap();
        assert_eq!(presets.len(), 3);
        assert_eq!(presets[0], Value::empty_map());
        assert_eq!(
            presets[2],
            map(vec![("Name", Value::String("Door".to_string()))])
        );
    }

    #[test]
    fn test_later_container_replaces_scalar() {
        let parsed = parse_key_value("a=1\na.b=2");
        assert_eq!(parsed.get("a"), Some(&map(vec![("b", Value::Number(2.0))])));
    }

    #[test]
    fn test_huge_index_is_skipped() {
        let parsed = parse_key_value("x[99999999]=1\ny=2");
        assert!(parsed.get("x").is_none());
        assert_eq!(parsed.get("y"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_deep_key_is_skipped() {
        let body = format!("{}x=1\ny=2", "a.".repeat(20_000));
        let parsed = parse_key_value(&body);
        assert!(parsed.get("a").is_none());
        assert_eq!(parsed.get("y"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_key_at_depth_limit_is_kept() {
        let key = format!("{}x", "a.".repeat(MAX_DEPTH - 1));
        let parsed = parse_key_value(&format!("{}=1", key));
        assert_eq!(parsed.get_path(&key), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let body = "table.Encode[0].MainFormat[0].Video.Width=1920\nsn=ABC\nEnable=false";
        assert_eq!(parse_key_value(body), parse_key_value(body));
    }

    #[test]
    fn test_split_indexed() {
        assert_eq!(split_indexed("Encode[0]"), Some(("Encode", 0)));
        assert_eq!(split_indexed("a[0][12]"), Some(("a[0]", 12)));
        assert_eq!(split_indexed("Encode"), None);
        assert_eq!(split_indexed("[3]"), None);
        assert_eq!(split_indexed("Encode[x]"), None);
        assert_eq!(split_indexed("Encode[]"), None);
    }

    #[test]
    fn test_parse_json_returns_none_on_garbage() {
        assert!(parse_json("{not json").is_none());
        let value = parse_json(r#"{"result":true}"#).unwrap();
        assert_eq!(value["result"], serde_json::Value::Bool(true));
    }

    #[test]
    fn test_extract_flat_values_walks_maps_only() {
        let parsed = parse_key_value("version=2.400.0000.0.R\nbuild.Date=2016-06-16\nlist[0]=1");
        let flat = extract_flat_values(&parsed, "");

        assert_eq!(flat.get("version").map(String::as_str), Some("2.400.0000.0.R"));
        assert_eq!(flat.get("build.Date").map(String::as_str), Some("2016-06-16"));
        assert_eq!(flat.get("list").map(String::as_str), Some("[1]"));
        assert!(!flat.contains_key("list[0]"));
    }

    #[test]
    fn test_extract_flat_values_applies_prefix() {
        let parsed = parse_key_value("Width=1920");
        let flat = extract_flat_values(&parsed, "Video");
        assert_eq!(flat.get("Video.Width").map(String::as_str), Some("1920"));
    }
}
