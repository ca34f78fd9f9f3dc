//! Persisted model artifacts
//!
//! An artifact pairs a fitted [`Regressor`] with the exact ordered list of
//! feature columns it was trained on. It is stored as canonical JSON (sorted
//! object keys) together with a BLAKE3 hash of the regressor, and is written
//! atomically so that model and schema can never be observed out of sync.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{map::Map, ser::PrettyFormatter, Serializer, Value};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::errors::{CoreError, Result};
use crate::model::{ModelKind, Regressor};

/// Current artifact format version
pub const ARTIFACT_VERSION: u32 = 1;

/// Recursively sort JSON object keys to obtain a canonical representation.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::with_capacity(entries.len());
            for (key, val) in entries {
                sorted.insert(key, canonicalize(val));
            }

            Value::Object(sorted)
        }
        Value::Array(elements) => Value::Array(elements.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serialize a value into compact canonical JSON.
pub fn canonical_json_string<T: Serialize>(value: &T) -> Result<String> {
    let canonical = canonicalize(serde_json::to_value(value)?);
    Ok(serde_json::to_string(&canonical)?)
}

/// Serialize a value into indented canonical JSON and write it out.
pub fn write_canonical_json<T, W>(mut writer: W, value: &T) -> Result<()>
where
    T: Serialize,
    W: Write,
{
    let canonical = canonicalize(serde_json::to_value(value)?);
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = Serializer::with_formatter(&mut writer, formatter);
    canonical.serialize(&mut serializer)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// BLAKE3 hex digest of a regressor's canonical JSON
pub fn regressor_hash(model: &Regressor) -> Result<String> {
    let json = canonical_json_string(model)?;
    Ok(hex::encode(blake3::hash(json.as_bytes()).as_bytes()))
}

/// A fitted model together with its feature schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub model_kind: ModelKind,
    /// Name of the predicted column
    pub target: String,
    /// Feature columns in the order the model expects
    pub columns: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// BLAKE3 hex digest of `model`
    pub model_hash: String,
    pub model: Regressor,
}

impl ModelArtifact {
    pub fn new(model: Regressor, columns: Vec<String>, target: impl Into<String>) -> Result<Self> {
        let model_hash = regressor_hash(&model)?;
        Ok(Self {
            version: ARTIFACT_VERSION,
            model_kind: model.kind(),
            target: target.into(),
            columns,
            created_at: Utc::now(),
            model_hash,
            model,
        })
    }

    /// Recompute the model hash and compare it with the stored one.
    pub fn verify(&self) -> Result<()> {
        if self.version != ARTIFACT_VERSION {
            return Err(CoreError::Integrity(format!(
                "unsupported artifact version {}",
                self.version
            )));
        }
        if self.model.kind() != self.model_kind {
            return Err(CoreError::Integrity(format!(
                "model kind {} does not match stored kind {}",
                self.model.kind(),
                self.model_kind
            )));
        }
        let actual = regressor_hash(&self.model)?;
        if actual != self.model_hash {
            return Err(CoreError::Integrity(format!(
                "hash mismatch: stored {}, computed {}",
                self.model_hash, actual
            )));
        }
        Ok(())
    }

    /// Write the artifact to `path`, replacing any existing file.
    ///
    /// Parent directories are created. The file is staged next to the
    /// destination and renamed into place.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        write_canonical_json(&mut staged, self)?;
        staged.as_file().sync_all()?;
        staged
            .persist(path)
            .map_err(|err| CoreError::Io(err.error))?;

        info!(
            path = %path.display(),
            kind = %self.model_kind,
            hash = %self.model_hash,
            "Saved model artifact"
        );
        Ok(())
    }

    /// Read and verify an artifact.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::ModelNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&content)?;
        artifact.verify()?;

        debug!(
            path = %path.display(),
            kind = %artifact.model_kind,
            columns = artifact.columns.len(),
            "Loaded model artifact"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearModel;
    use tempfile::tempdir;

    fn artifact() -> ModelArtifact {
        let model = Regressor::Linear(LinearModel {
            intercept: 5.0,
            coefficients: vec![1.0, 2.0],
        });
        ModelArtifact::new(model, vec!["b".into(), "a".into()], "profit").unwrap()
    }

    #[test]
    fn test_canonical_json_sorts_keys() {
        #[derive(Serialize)]
        struct Unsorted {
            zeta: u8,
            alpha: u8,
        }
        let json = canonical_json_string(&Unsorted { zeta: 1, alpha: 2 }).unwrap();
        assert_eq!(json, r#"{"alpha":2,"zeta":1}"#);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/models/model.json");

        let original = artifact();
        original.save(&path).unwrap();
        let loaded = ModelArtifact::load(&path).unwrap();

        assert_eq!(loaded, original);
        assert_eq!(loaded.columns, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");

        artifact().save(&path).unwrap();
        let mut second = artifact();
        second.target = "other".into();
        second.save(&path).unwrap();

        assert_eq!(ModelArtifact::load(&path).unwrap().target, "other");
    }

    #[test]
    fn test_load_missing_model() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(matches!(
            ModelArtifact::load(&path),
            Err(CoreError::ModelNotFound(p)) if p == path
        ));
    }

    #[test]
    fn test_tampered_model_fails_verification() {
        let mut tampered = artifact();
        if let Regressor::Linear(ref mut m) = tampered.model {
            m.intercept = 6.0;
        }
        assert!(matches!(tampered.verify(), Err(CoreError::Integrity(_))));
    }
}
