//! Nested assignment from flat property paths.
//!
//! A path is a list of keys. Paths containing `.` split on `.`
//! ("xaxis.title.text"); otherwise they split on `_`, the legacy widget form
//! ("marker_color" => marker -> color).

use serde_json::{Map, Value};

/// Recursive string-keyed mapping used for every nested part of a chart.
pub type Tree = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty property path")]
    Empty,

    #[error("property path {path:?} has an empty segment")]
    EmptySegment { path: String },

    #[error("property path {path:?} descends into non-mapping value at {segment:?}")]
    NotAMapping { path: String, segment: String },
}

/// Split a property path into its keys.
pub fn segments(path: &str) -> Result<Vec<&str>, PathError> {
    if path.trim().is_empty() {
        return Err(PathError::Empty);
    }
    let sep = if path.contains('.') { '.' } else { '_' };
    let keys: Vec<&str> = path.split(sep).collect();
    if keys.iter().any(|k| k.is_empty()) {
        return Err(PathError::EmptySegment {
            path: path.to_string(),
        });
    }
    Ok(keys)
}

/// Assign `value` at `path` inside `root`, creating intermediate mappings.
///
/// Re-expanding a path only replaces its leaf; sibling branches are never
/// touched. Descending through an existing non-mapping value is an error and
/// leaves `root` unchanged.
pub fn expand(root: &mut Tree, path: &str, value: Value) -> Result<(), PathError> {
    let keys = segments(path)?;
    let (leaf, parents) = keys.split_last().ok_or(PathError::Empty)?;

    // Check the whole walk first so a failing path leaves no empty branches.
    let mut cursor = Some(&*root);
    for key in parents {
        match cursor.and_then(|m| m.get(*key)) {
            None => cursor = None,
            Some(Value::Object(child)) => cursor = Some(child),
            Some(_) => {
                return Err(PathError::NotAMapping {
                    path: path.to_string(),
                    segment: (*key).to_string(),
                });
            }
        }
    }

    let mut node = root;
    for key in parents {
        let entry = node
            .entry((*key).to_string())
            .or_insert_with(|| Value::Object(Tree::new()));
        let Value::Object(child) = entry else {
            return Err(PathError::NotAMapping {
                path: path.to_string(),
                segment: (*key).to_string(),
            });
        };
        node = child;
    }
    node.insert((*leaf).to_string(), value);
    Ok(())
}

/// Read the value at a dotted path (`payload.chart`) inside any JSON value.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|k| !k.is_empty())
        .try_fold(root, |node, key| node.as_object()?.get(key))
}

/// Deep-merge `overlay` into `base`: mappings merge key by key, anything else
/// replaces.
pub fn merge(base: &mut Tree, overlay: &Tree) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Object(dst)), Value::Object(src)) => merge(dst, src),
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tree(v: Value) -> Tree {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn dotted_and_underscored_paths() {
        assert_eq!(segments("xaxis.title.text").unwrap(), vec!["xaxis", "title", "text"]);
        assert_eq!(segments("marker_color").unwrap(), vec!["marker", "color"]);
        assert_eq!(segments("error_y.visible").unwrap(), vec!["error_y", "visible"]);
        assert_eq!(segments("mode").unwrap(), vec!["mode"]);
        assert_eq!(segments(""), Err(PathError::Empty));
        assert!(matches!(segments("a..b"), Err(PathError::EmptySegment { .. })));
    }

    #[test]
    fn expand_creates_nested_mappings() {
        let mut root = Tree::new();
        expand(&mut root, "marker_line_width", json!(2)).unwrap();
        expand(&mut root, "marker_color", json!("red")).unwrap();
        expand(&mut root, "mode", json!("lines")).unwrap();
        assert_eq!(
            Value::Object(root),
            json!({ "marker": { "line": { "width": 2 }, "color": "red" }, "mode": "lines" })
        );
    }

    #[test]
    fn reexpanding_overwrites_only_the_leaf() {
        let mut root = tree(json!({ "marker": { "color": "red", "size": 4 } }));
        expand(&mut root, "marker.color", json!("blue")).unwrap();
        assert_eq!(
            Value::Object(root),
            json!({ "marker": { "color": "blue", "size": 4 } })
        );
    }

    #[test]
    fn distinct_paths_are_order_independent() {
        let paths = [
            ("xaxis.title.text", json!("time")),
            ("xaxis.type", json!("date")),
            ("yaxis.range", json!([0, 10])),
            ("showlegend", json!(true)),
        ];

        let mut forward = Tree::new();
        for (p, v) in paths.iter() {
            expand(&mut forward, p, v.clone()).unwrap();
        }
        let mut reverse = Tree::new();
        for (p, v) in paths.iter().rev() {
            expand(&mut reverse, p, v.clone()).unwrap();
        }
        assert_eq!(forward, reverse);
    }

    #[test]
    fn descending_into_a_scalar_fails_without_side_effects() {
        let mut root = tree(json!({ "x": ["2024-01-01 00:00:00"] }));
        let err = expand(&mut root, "x.foo.bar", json!(1)).unwrap_err();
        assert_eq!(
            err,
            PathError::NotAMapping {
                path: "x.foo.bar".to_string(),
                segment: "x".to_string()
            }
        );
        assert_eq!(Value::Object(root), json!({ "x": ["2024-01-01 00:00:00"] }));
    }

    #[test]
    fn lookup_follows_dotted_paths() {
        let msg = json!({ "payload": { "chart": { "data": { "y": [1] } } } });
        assert_eq!(lookup(&msg, "payload.chart.data"), Some(&json!({ "y": [1] })));
        assert_eq!(lookup(&msg, "payload.missing"), None);
        assert_eq!(lookup(&msg, "payload.chart.data.y.0"), None);
    }

    #[test]
    fn merge_is_deep_for_mappings() {
        let mut base = tree(json!({ "xaxis": { "type": "date", "title": "t" }, "width": 300 }));
        let overlay = tree(json!({ "xaxis": { "title": "time" }, "width": 400 }));
        merge(&mut base, &overlay);
        assert_eq!(
            Value::Object(base),
            json!({ "xaxis": { "type": "date", "title": "time" }, "width": 400 })
        );
    }
}
