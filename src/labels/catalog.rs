//! Bidirectional mapping between class names and model output indices.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, error};

/// On-disk layout of the label mapping file.
#[derive(Debug, Deserialize)]
struct LabelMappingFile {
    genus_to_id: HashMap<String, usize>,
}

/// Immutable catalog of class names indexed by dense model output ids.
///
/// Ids always cover exactly `0..len()`, so every model output index below
/// `len()` resolves to a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCatalog {
    names: Vec<String>,
    ids: HashMap<String, usize>,
}

impl LabelCatalog {
    /// Load a catalog from a JSON file containing a `genus_to_id` object.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read, is not valid
    /// JSON, lacks `genus_to_id`, or the mapping is not a dense bijection.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::LabelsRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: LabelMappingFile =
            serde_json::from_str(&content).map_err(|e| Error::LabelsParse {
                path: path.to_path_buf(),
                source: e,
            })?;

        let catalog = Self::from_mapping(file.genus_to_id)?;
        debug!("Loaded {} labels from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Build a catalog from an in-memory `name -> id` mapping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLabels`] if the mapping is empty, two names share
    /// an id, or the ids are not exactly `0..N-1`.
    pub fn from_mapping(mapping: HashMap<String, usize>) -> Result<Self> {
        if mapping.is_empty() {
            return Err(Error::InvalidLabels {
                message: "label mapping is empty".to_string(),
            });
        }

        let len = mapping.len();
        let mut slots: Vec<Option<String>> = vec![None; len];

        for (name, &id) in &mapping {
            let Some(slot) = slots.get_mut(id) else {
                return Err(Error::InvalidLabels {
                    message: format!(
                        "id {id} for '{name}' is out of range (ids must cover 0..{len})"
                    ),
                });
            };
            if let Some(existing) = slot {
                return Err(Error::InvalidLabels {
                    message: format!("id {id} is assigned to both '{existing}' and '{name}'"),
                });
            }
            *slot = Some(name.clone());
        }

        // With len names, len slots and no duplicates every slot is filled.
        let names: Vec<String> = slots.into_iter().flatten().collect();
        if names.len() != len {
            return Err(Error::InvalidLabels {
                message: "label ids are not contiguous".to_string(),
            });
        }

        Ok(Self {
            names,
            ids: mapping,
        })
    }

    /// Resolve a model output index to its class name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownClass`] when `id` is outside the catalog.
    pub fn id_to_name(&self, id: usize) -> Result<&str> {
        self.name(id).ok_or_else(|| {
            error!(
                "Model output index {id} has no label (catalog has {} classes)",
                self.len()
            );
            Error::UnknownClass {
                id,
                catalog_size: self.len(),
            }
        })
    }

    /// Class name for `id`, if any.
    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Output index for `name`, if any.
    pub fn id(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the catalog is empty. Loaded catalogs never are.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Class names in id order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Check the catalog against the number of classes a model declares.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLabels`] when the counts differ.
    pub fn ensure_cardinality(&self, model_classes: usize) -> Result<()> {
        if model_classes == self.len() {
            Ok(())
        } else {
            Err(Error::InvalidLabels {
                message: format!(
                    "model declares {model_classes} output classes but the label mapping has {}",
                    self.len()
                ),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn mapping(entries: &[(&str, usize)]) -> HashMap<String, usize> {
        entries
            .iter()
            .map(|(name, id)| ((*name).to_string(), *id))
            .collect()
    }

    #[test]
    fn test_from_mapping_orders_names_by_id() {
        let catalog =
            LabelCatalog::from_mapping(mapping(&[("Sansevieria", 1), ("Monstera", 0)])).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.names(), ["Monstera", "Sansevieria"]);
        assert_eq!(catalog.id_to_name(1).unwrap(), "Sansevieria");
        assert_eq!(catalog.id("Monstera"), Some(0));
    }

    #[test]
    fn test_from_mapping_rejects_duplicate_ids() {
        let err = LabelCatalog::from_mapping(mapping(&[("Ficus", 0), ("Pothos", 0)])).unwrap_err();
        assert!(matches!(err, Error::InvalidLabels { .. }));
    }

    #[test]
    fn test_from_mapping_rejects_gaps() {
        let err = LabelCatalog::from_mapping(mapping(&[("Ficus", 0), ("Pothos", 2)])).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_from_mapping_rejects_empty() {
        let err = LabelCatalog::from_mapping(HashMap::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_id_to_name_unknown_class() {
        let catalog = LabelCatalog::from_mapping(mapping(&[("Aloe", 0)])).unwrap();
        let err = catalog.id_to_name(3).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownClass {
                id: 3,
                catalog_size: 1
            }
        ));
    }

    #[test]
    fn test_ensure_cardinality() {
        let catalog = LabelCatalog::from_mapping(mapping(&[("Aloe", 0), ("Ficus", 1)])).unwrap();
        assert!(catalog.ensure_cardinality(2).is_ok());
        assert!(catalog.ensure_cardinality(3).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"genus_to_id": {{"Monstera": 0, "Sansevieria": 1}}, "id_to_genus": {{}}}}"#
        )
        .unwrap();

        let catalog = LabelCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.name(0), Some("Monstera"));
    }

    #[test]
    fn test_load_missing_field() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"Monstera": 0}}"#).unwrap();

        let err = LabelCatalog::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::LabelsParse { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = LabelCatalog::load(Path::new("/nonexistent/labels.json")).unwrap_err();
        assert!(matches!(err, Error::LabelsRead { .. }));
    }
}
