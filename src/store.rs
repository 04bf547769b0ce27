//! Feature store boundary.
//!
//! The pipeline never sees raw traffic; it consumes per-granularity feature
//! tensors that an upstream feature-extraction job has already built. Each
//! granularity level is one JSON document holding the ordered unit list and a
//! samples × features × timesteps series block, which we flatten row-major
//! into the 2D matrix the partitioners work on.
use crate::error::EacError;
use ndarray::Array2;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One granularity level's worth of features, ready for partitioning.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub mask: u8,
    /// Unit identifiers, one per tensor row, in canonical order.
    pub units: Vec<String>,
    pub tensor: Array2<f64>,
}

/// Supplier of per-granularity feature tensors.
///
/// `load` returns `Ok(None)` when the level simply has no data; the ensemble
/// driver treats that as a skippable omission, not a failure.
pub trait FeatureStore {
    fn load(&self, mask: u8) -> Result<Option<FeatureSet>, EacError>;
}

/// On-disk document layout for one granularity level.
#[derive(Debug, Deserialize)]
struct LevelDocument {
    units: Vec<String>,
    /// samples × features × timesteps; `null` marks a missing measurement
    series: Vec<Vec<Vec<Option<f64>>>>,
}

/// Directory-backed store: one `level_<width>.json` per granularity.
pub struct DirFeatureStore {
    root: PathBuf,
}

impl DirFeatureStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    fn level_path(&self, mask: u8) -> PathBuf {
        self.root.join(format!("level_{mask}.json"))
    }
}

impl FeatureStore for DirFeatureStore {
    fn load(&self, mask: u8) -> Result<Option<FeatureSet>, EacError> {
        let path = self.level_path(mask);
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&path)?;
        let document: LevelDocument = serde_json::from_str(&raw)?;
        let set = flatten_document(mask, document)?;
        log::info!(
            "Loaded /{} features: {} units x {} values",
            mask,
            set.tensor.nrows(),
            set.tensor.ncols()
        );
        Ok(Some(set))
    }
}

/// Flattens the 3D series block into a (units × features*timesteps) matrix.
///
/// Non-finite entries are zero-filled rather than dropped; dropping values
/// would shift the row layout and desynchronize rows from the unit list.
fn flatten_document(mask: u8, document: LevelDocument) -> Result<FeatureSet, EacError> {
    if document.units.len() != document.series.len() {
        return Err(EacError::Config(format!(
            "level {}: {} units but {} series rows",
            mask,
            document.units.len(),
            document.series.len()
        )));
    }
    if document.series.is_empty() {
        return Err(EacError::Config(format!("level {mask}: empty series block")));
    }

    let width: usize = document.series[0].iter().map(Vec::len).sum();
    let mut flat = Vec::with_capacity(document.series.len() * width);
    let mut scrubbed = 0usize;

    for (unit, sample) in document.units.iter().zip(&document.series) {
        let row_width: usize = sample.iter().map(Vec::len).sum();
        if row_width != width {
            return Err(EacError::Config(format!(
                "level {mask}: unit {unit} has {row_width} values, expected {width}"
            )));
        }
        for feature in sample {
            for &value in feature {
                match value {
                    Some(v) if v.is_finite() => flat.push(v),
                    _ => {
                        flat.push(0.0);
                        scrubbed += 1;
                    }
                }
            }
        }
    }

    if scrubbed > 0 {
        log::warn!("Level /{mask}: zero-filled {scrubbed} non-finite feature values");
    }

    let tensor = Array2::from_shape_vec((document.units.len(), width), flat)
        .map_err(|e| EacError::Config(format!("level {mask}: bad tensor shape: {e}")))?;

    Ok(FeatureSet { mask, units: document.units, tensor })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_level(dir: &Path, mask: u8, body: &str) {
        fs::write(dir.join(format!("level_{mask}.json")), body).unwrap();
    }

    #[test]
    fn missing_level_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirFeatureStore::new(dir.path());
        assert!(store.load(24).unwrap().is_none());
    }

    #[test]
    fn loads_and_flattens() {
        let dir = tempfile::tempdir().unwrap();
        write_level(
            dir.path(),
            32,
            r#"{"units":["10.0.0.1","10.0.0.2"],
                "series":[[[1.0,2.0],[3.0,4.0]],[[5.0,6.0],[7.0,8.0]]]}"#,
        );
        let store = DirFeatureStore::new(dir.path());
        let set = store.load(32).unwrap().unwrap();
        assert_eq!(set.units, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(set.tensor.shape(), &[2, 4]);
        assert_eq!(set.tensor[[1, 2]], 7.0);
    }

    #[test]
    fn zero_fills_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        write_level(
            dir.path(),
            32,
            r#"{"units":["10.0.0.1"],"series":[[[1.0,null],[null,2.0]]]}"#,
        );
        let store = DirFeatureStore::new(dir.path());
        let set = store.load(32).unwrap().unwrap();
        assert_eq!(set.tensor[[0, 1]], 0.0);
        assert_eq!(set.tensor[[0, 2]], 0.0);
        assert_eq!(set.tensor[[0, 3]], 2.0);
    }

    #[test]
    fn rejects_misaligned_units() {
        let dir = tempfile::tempdir().unwrap();
        write_level(dir.path(), 32, r#"{"units":["a","b"],"series":[[[1.0]]]}"#);
        let store = DirFeatureStore::new(dir.path());
        assert!(store.load(32).is_err());
    }
}
