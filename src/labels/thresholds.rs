//! Per-class minimum confidence table.

use super::LabelCatalog;
use crate::constants::confidence;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Per-class confidence thresholds resolved against a [`LabelCatalog`].
///
/// Classes without an explicit entry fall back to the table default.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    per_class: Vec<Option<f32>>,
    default: f32,
}

impl ThresholdTable {
    /// Table where every class uses `default`.
    pub fn uniform(default: f32) -> Self {
        Self {
            per_class: Vec::new(),
            default,
        }
    }

    /// Load thresholds from a JSON object of `{class name: threshold}`.
    ///
    /// Names the catalog does not know are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed, or
    /// any value lies outside `[0, 1]`.
    pub fn load(path: &Path, catalog: &LabelCatalog, default: f32) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::ThresholdsRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let raw: HashMap<String, f64> =
            serde_json::from_str(&content).map_err(|e| Error::ThresholdsParse {
                path: path.to_path_buf(),
                source: e,
            })?;

        let table = Self::from_map(&raw, catalog, default)?;
        debug!(
            "Loaded {} class thresholds from {}",
            table.explicit_count(),
            path.display()
        );
        Ok(table)
    }

    /// Resolve an in-memory `{class name: threshold}` map against `catalog`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThresholds`] for values outside `[0, 1]`.
    pub fn from_map(
        raw: &HashMap<String, f64>,
        catalog: &LabelCatalog,
        default: f32,
    ) -> Result<Self> {
        let mut per_class = vec![None; catalog.len()];

        for (name, &value) in raw {
            if !value.is_finite()
                || value < f64::from(confidence::MIN)
                || value > f64::from(confidence::MAX)
            {
                return Err(Error::InvalidThresholds {
                    class: name.clone(),
                    value,
                });
            }

            match catalog.id(name) {
                #[allow(clippy::cast_possible_truncation)]
                Some(id) => per_class[id] = Some(value as f32),
                None => warn!("Ignoring threshold for unknown class '{name}'"),
            }
        }

        Ok(Self { per_class, default })
    }

    /// Threshold for class `id`, falling back to the table default.
    pub fn threshold_for(&self, id: usize) -> f32 {
        self.threshold_or(id, self.default)
    }

    /// Threshold for class `id`, falling back to `fallback` when the class
    /// has no explicit entry.
    pub fn threshold_or(&self, id: usize, fallback: f32) -> f32 {
        self.per_class
            .get(id)
            .copied()
            .flatten()
            .unwrap_or(fallback)
    }

    fn explicit_count(&self) -> usize {
        self.per_class.iter().filter(|t| t.is_some()).count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn catalog() -> LabelCatalog {
        LabelCatalog::from_mapping(
            [("Monstera", 0), ("Sansevieria", 1), ("Ficus", 2)]
                .into_iter()
                .map(|(n, i)| (n.to_string(), i))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_uniform_table() {
        let table = ThresholdTable::uniform(0.4);
        assert!((table.threshold_for(0) - 0.4).abs() < f32::EPSILON);
        assert!((table.threshold_for(99) - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_resolves_names_and_falls_back() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"Monstera": 0.6, "Cactus": 0.9}}"#).unwrap();

        let table = ThresholdTable::load(file.path(), &catalog(), 0.5).unwrap();
        assert!((table.threshold_for(0) - 0.6).abs() < 1e-6);
        assert!((table.threshold_for(1) - 0.5).abs() < f32::EPSILON);
        assert!((table.threshold_or(2, 0.7) - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_rejects_out_of_range() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"Ficus": 1.5}}"#).unwrap();

        let err = ThresholdTable::load(file.path(), &catalog(), 0.5).unwrap_err();
        assert!(matches!(err, Error::InvalidThresholds { .. }));
    }

    #[test]
    fn test_load_rejects_non_numeric() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"Ficus": "high"}}"#).unwrap();

        let err = ThresholdTable::load(file.path(), &catalog(), 0.5).unwrap_err();
        assert!(matches!(err, Error::ThresholdsParse { .. }));
    }
}
