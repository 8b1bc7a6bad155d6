//! Classifier wrappers. The trained models are ONNX exports of the XGBoost
//! classifiers; [`OnnxClassifier`] runs them through a tract plan built once
//! at load. [`Classifier`] is the seam tests stub through.

use std::path::Path;

use anyhow::{anyhow, bail, Result};
use tract_onnx::prelude::*;

/// Class label plus the full probability distribution the model assigns.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: i64,
    pub probabilities: Vec<f32>,
}

pub trait Classifier: Send + Sync {
    fn predict(&self, features: &[f32]) -> Result<Prediction>;
}

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

pub struct OnnxClassifier {
    plan: Plan,
    n_features: usize,
}

impl OnnxClassifier {
    /// Builds the runnable plan with the input pinned to `[1, n_features]`.
    /// Any load failure is fatal to service construction.
    pub fn load(path: impl AsRef<Path>, n_features: usize) -> Result<Self> {
        let plan = tract_onnx::onnx()
            .model_for_path(path)?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(1, n_features)))?
            .into_optimized()?
            .into_runnable()?;
        Ok(Self { plan, n_features })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &[f32]) -> Result<Prediction> {
        if features.len() != self.n_features {
            bail!(
                "classifier expects {} features, got {}",
                self.n_features,
                features.len()
            );
        }
        let input = Tensor::from_shape(&[1, self.n_features], features)?;
        let outputs = self.plan.run(tvec!(input.into()))?;

        // XGBoost classifier exports carry two outputs: the decided label and
        // the per-class probabilities.
        if outputs.len() < 2 {
            bail!("model produced {} outputs, expected label and probabilities", outputs.len());
        }
        let label = *outputs[0]
            .to_array_view::<i64>()?
            .iter()
            .next()
            .ok_or_else(|| anyhow!("model produced an empty label tensor"))?;
        let probabilities: Vec<f32> = outputs[1].to_array_view::<f32>()?.iter().copied().collect();
        if probabilities.is_empty() {
            bail!("model produced an empty probability tensor");
        }

        Ok(Prediction {
            label,
            probabilities,
        })
    }
}
