// ABOUTME: Derives the remote API update mask from a partial photo metadata object
// ABOUTME: Two-level walk, camelCase to snake_case, filtered against the editable whitelist

use serde_json::Value;

/// Field paths the remote API accepts in an update mask. Derived paths not
/// in this list are silently dropped.
pub const UPDATE_MASK: &[&str] = &[
    "pose.heading",
    "pose.lat_lng_pair",
    "pose.pitch",
    "pose.roll",
    "pose.level",
    "pose.altitude",
    "connections",
    "places",
];

/// Convert a camelCase key to the remote schema's snake_case form
pub fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Derive the update-mask paths a partial metadata object touches.
///
/// The walk is exactly two levels deep: top-level keys, plus the immediate
/// children of top-level keys whose value is an object. The remote schema's
/// editable surface is shallow, so deeper nesting is deliberately never
/// inspected. Top-level object keys contribute only their filtered children,
/// never themselves. Surviving paths keep their insertion order, deduplicated.
pub fn derive_mask(partial: &Value) -> Vec<String> {
    let Some(obj) = partial.as_object() else {
        return Vec::new();
    };

    let mut paths = Vec::new();
    let push = |paths: &mut Vec<String>, path: String| {
        if UPDATE_MASK.contains(&path.as_str()) && !paths.contains(&path) {
            paths.push(path);
        }
    };

    for (key, value) in obj {
        match value {
            Value::Object(children) => {
                for child in children.keys() {
                    push(
                        &mut paths,
                        format!("{}.{}", camel_to_snake(key), camel_to_snake(child)),
                    );
                }
            }
            _ => push(&mut paths, camel_to_snake(key)),
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_to_snake() {
        assert_eq!(camel_to_snake("latLngPair"), "lat_lng_pair");
        assert_eq!(camel_to_snake("heading"), "heading");
        assert_eq!(camel_to_snake("captureTime"), "capture_time");
        // Leading uppercase gets a leading underscore, matching the original scheme
        assert_eq!(camel_to_snake("Pose"), "_pose");
    }

    #[test]
    fn test_nested_whitelisted_child_survives() {
        let partial = json!({
            "pose": {"latLngPair": {"latitude": 1.0, "longitude": 2.0}},
            "captureTime": "2024-01-01T00:00:00Z",
            "irrelevantField": 1,
        });
        assert_eq!(derive_mask(&partial), vec!["pose.lat_lng_pair"]);
    }

    #[test]
    fn test_empty_object_yields_empty_mask() {
        assert!(derive_mask(&json!({})).is_empty());
    }

    #[test]
    fn test_non_object_yields_empty_mask() {
        assert!(derive_mask(&json!("not an object")).is_empty());
        assert!(derive_mask(&json!(null)).is_empty());
    }

    #[test]
    fn test_order_preserved_and_top_level_arrays_allowed() {
        let partial = json!({
            "connections": [{"target": {"id": "abc"}}],
            "pose": {"heading": 90.0, "pitch": 0.5},
            "places": [],
        });
        assert_eq!(
            derive_mask(&partial),
            vec!["connections", "pose.heading", "pose.pitch", "places"]
        );
    }

    #[test]
    fn test_depth_limit_stops_at_two_levels() {
        // latLngPair's own children must never produce paths
        let partial = json!({
            "pose": {"latLngPair": {"latitude": 1.0}},
        });
        assert_eq!(derive_mask(&partial), vec!["pose.lat_lng_pair"]);
    }

    #[test]
    fn test_top_level_object_key_itself_never_added() {
        // "pose" alone is not a legal mask path even though all its children are dropped
        let partial = json!({"pose": {"unknownChild": 1}});
        assert!(derive_mask(&partial).is_empty());
    }
}
