//! Standard-scaler artifact: the fitted transform exported alongside the labs
//! models. The set of columns it rescales is read from the artifact itself,
//! never hardcoded by callers.

use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use crate::features::FeatureRow;

/// `(x - mean) / scale` over a named subset of feature columns, fitted during
/// training. Columns outside `columns` pass through untouched.
#[derive(Debug, Deserialize)]
pub struct StandardScaler {
    columns: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(columns: Vec<String>, mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let scaler = Self {
            columns,
            mean,
            scale,
        };
        scaler.check()?;
        Ok(scaler)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("opening scaler artifact {}", path.display()))?;
        let scaler: Self = serde_json::from_reader(file)
            .with_context(|| format!("parsing scaler artifact {}", path.display()))?;
        scaler
            .check()
            .with_context(|| format!("scaler artifact {} is inconsistent", path.display()))?;
        Ok(scaler)
    }

    fn check(&self) -> Result<()> {
        if self.mean.len() != self.columns.len() || self.scale.len() != self.columns.len() {
            bail!(
                "scaler declares {} columns but {} means and {} scales",
                self.columns.len(),
                self.mean.len(),
                self.scale.len()
            );
        }
        for (column, &scale) in self.columns.iter().zip(&self.scale) {
            if !scale.is_finite() || scale == 0.0 {
                bail!("scaler column `{column}` has unusable scale {scale}");
            }
        }
        Ok(())
    }

    /// The fitted column names, as recorded in the artifact.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rescales the fitted columns in place. Errors if the row lacks one of
    /// them, which means the artifact and the active schema drifted apart.
    pub fn apply(&self, row: &mut FeatureRow) -> Result<()> {
        for ((column, &mean), &scale) in self.columns.iter().zip(&self.mean).zip(&self.scale) {
            let raw = row
                .get(column)
                .ok_or_else(|| anyhow!("scaler column `{column}` not present in feature row"))?;
            row.set(column, (raw - mean) / scale);
        }
        Ok(())
    }
}
