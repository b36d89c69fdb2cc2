//! JSON 内容数组
//!
//! 顶层是 `Array<Content | null>`。粘贴或导入的数据是无类型的，
//! 每个元素单独经过注册表校验。

use crate::error::FileError;
use serde_json::Value;
use std::path::Path;
use std::rc::Rc;
use zdraft_core::content::ContentArray;
use zdraft_core::registry::ContentRegistry;

pub fn to_json_string(contents: &ContentArray) -> Result<String, FileError> {
    Ok(serde_json::to_string_pretty(contents)?)
}

/// 解析并校验 JSON 内容数组
pub fn from_json_str(json: &str, registry: &ContentRegistry) -> Result<ContentArray, FileError> {
    let values: Vec<Value> = serde_json::from_str(json)?;
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            if value.is_null() {
                return Ok(None);
            }
            registry
                .validate_value(value)
                .map(|content| Some(Rc::new(content)))
                .map_err(|source| FileError::InvalidContent { index, source })
        })
        .collect()
}

pub fn save_json(contents: &ContentArray, path: &Path) -> Result<(), FileError> {
    std::fs::write(path, to_json_string(contents)?)?;
    tracing::info!("Saved {} contents to {}", contents.len(), path.display());
    Ok(())
}

pub fn load_json(path: &Path, registry: &ContentRegistry) -> Result<ContentArray, FileError> {
    let contents = from_json_str(&std::fs::read_to_string(path)?, registry)?;
    tracing::info!("Loaded {} contents from {}", contents.len(), path.display());
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zdraft_core::content::{content_array, Content, ContentKind, TextContent};
    use zdraft_core::math::Point2;
    use zdraft_core::patch::PathSegment;

    #[test]
    fn test_parse_with_tombstones() {
        let json = r#"[
            {"type": "line", "points": [[0, 0], [10, 0]], "strokeWidth": 2},
            null,
            {"type": "circle", "x": 1, "y": 2, "r": 3, "visible": false}
        ]"#;
        let contents = from_json_str(json, &ContentRegistry::with_default_models()).unwrap();
        assert_eq!(contents.len(), 3);
        assert!(contents[1].is_none());

        let circle = contents[2].as_ref().unwrap();
        assert!(!circle.is_visible());
        assert!(matches!(circle.kind, ContentKind::Circle(_)));
    }

    #[test]
    fn test_invalid_entry_reports_index() {
        let json = r#"[null, {"type": "line", "points": [[0, 0]]}]"#;
        let err = from_json_str(json, &ContentRegistry::with_default_models()).unwrap_err();
        match err {
            FileError::InvalidContent { index, source } => {
                assert_eq!(index, 1);
                assert_eq!(source.path, vec![PathSegment::from("points")]);
            }
            other => panic!("unexpected {:?}", other),
        }

        let unknown = r#"[{"type": "spline"}]"#;
        assert!(from_json_str(unknown, &ContentRegistry::with_default_models()).is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contents.json");
        let mut contents = content_array([Content::from(TextContent::new(Point2::new(1.0, 2.0), "abc"))]);
        contents.push(None);

        save_json(&contents, &path).unwrap();
        let loaded = load_json(&path, &ContentRegistry::with_default_models()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].as_deref(), contents[0].as_deref());
        assert!(loaded[1].is_none());
    }
}
