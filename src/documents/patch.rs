/// Field-level patch operations
///
/// A patch is an ordered sequence of operations applied to the document's
/// JSON form. Paths are dot-separated and may address top-level fields
/// ("content") or keys inside the metadata map ("metadata.risk_score").
/// The identity fields are immutable through this interface.
use crate::errors::StoreError;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum PatchOperation {
    /// Create or overwrite the value at `path`
    Set { path: String, value: Value },

    /// Overwrite the value at `path`; fails if the path does not exist
    Replace { path: String, value: Value },
}

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("path '{0}' does not exist")]
    UnknownPath(String),

    #[error("field '{0}' cannot be modified")]
    ProtectedField(String),

    #[error("path '{0}' traverses a non-object value")]
    NotAnObject(String),
}

impl PatchError {
    fn into_store_error(self, path: &str) -> StoreError {
        StoreError::InvalidPatch {
            path: path.to_string(),
            reason: self.to_string(),
        }
    }
}

const PROTECTED_FIELDS: &[&str] = &["id", "partition_key"];

/// Apply operations in order to a document's JSON representation.
/// Applying the same `Set` twice yields the same result as applying it once.
pub fn apply_operations(doc: &mut Value, operations: &[PatchOperation]) -> Result<(), StoreError> {
    for op in operations {
        match op {
            PatchOperation::Set { path, value } => {
                write_path(doc, path, value.clone(), true).map_err(|e| e.into_store_error(path))?;
            }
            PatchOperation::Replace { path, value } => {
                write_path(doc, path, value.clone(), false)
                    .map_err(|e| e.into_store_error(path))?;
            }
        }
    }
    Ok(())
}

fn write_path(doc: &mut Value, path: &str, value: Value, create: bool) -> Result<(), PatchError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.is_empty() || segments[0].is_empty() {
        return Err(PatchError::UnknownPath(path.to_string()));
    }
    if PROTECTED_FIELDS.contains(&segments[0]) {
        return Err(PatchError::ProtectedField(segments[0].to_string()));
    }

    let mut current = doc;
    for segment in &segments[..segments.len() - 1] {
        let map = current
            .as_object_mut()
            .ok_or_else(|| PatchError::NotAnObject(path.to_string()))?;

        if !map.contains_key(*segment) {
            if create {
                map.insert(segment.to_string(), Value::Object(Default::default()));
            } else {
                return Err(PatchError::UnknownPath(path.to_string()));
            }
        }
        current = map
            .get_mut(*segment)
            .ok_or_else(|| PatchError::UnknownPath(path.to_string()))?;
    }

    let leaf = *segments.last().unwrap_or(&"");
    let map = current
        .as_object_mut()
        .ok_or_else(|| PatchError::NotAnObject(path.to_string()))?;

    if !create && !map.contains_key(leaf) {
        return Err(PatchError::UnknownPath(path.to_string()));
    }

    map.insert(leaf.to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_creates_nested_paths() {
        let mut doc = json!({ "id": "d1", "partition_key": "pk", "metadata": {} });
        let ops = vec![PatchOperation::Set {
            path: "metadata.risk_score".to_string(),
            value: json!(0.8),
        }];

        apply_operations(&mut doc, &ops).unwrap();
        assert_eq!(doc["metadata"]["risk_score"], json!(0.8));
    }

    #[test]
    fn set_is_idempotent() {
        let mut once = json!({ "id": "d1", "partition_key": "pk", "content": "old" });
        let mut twice = once.clone();
        let ops = vec![PatchOperation::Set {
            path: "content".to_string(),
            value: json!("new"),
        }];

        apply_operations(&mut once, &ops).unwrap();
        apply_operations(&mut twice, &ops).unwrap();
        apply_operations(&mut twice, &ops).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn replace_requires_existing_path() {
        let mut doc = json!({ "id": "d1", "partition_key": "pk" });
        let ops = vec![PatchOperation::Replace {
            path: "metadata.risk_score".to_string(),
            value: json!(0.5),
        }];

        assert!(apply_operations(&mut doc, &ops).is_err());
    }

    #[test]
    fn identity_fields_are_protected() {
        let mut doc = json!({ "id": "d1", "partition_key": "pk" });
        let ops = vec![PatchOperation::Set {
            path: "id".to_string(),
            value: json!("d2"),
        }];

        assert!(apply_operations(&mut doc, &ops).is_err());
        assert_eq!(doc["id"], json!("d1"));
    }

    #[test]
    fn operations_apply_in_order() {
        let mut doc = json!({ "id": "d1", "partition_key": "pk", "content": "a" });
        let ops = vec![
            PatchOperation::Set {
                path: "content".to_string(),
                value: json!("b"),
            },
            PatchOperation::Replace {
                path: "content".to_string(),
                value: json!("c"),
            },
        ];

        apply_operations(&mut doc, &ops).unwrap();
        assert_eq!(doc["content"], json!("c"));
    }
}
