//! The prediction service: four independently configured pipelines, loaded
//! once at startup from the artifact directory and shared read-only by every
//! request afterwards. Constructed explicitly in `main` and handed to the
//! handlers through `web::Data`; a load failure aborts startup before the
//! server binds.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use serde::Deserialize;

use crate::features::{assemble, FeatureRow};
use crate::inference::{Classifier, OnnxClassifier};
use crate::models::PredictionResponse;
use crate::scaler::StandardScaler;
use crate::schema::{self, Schema, ValidatedInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    BeforeDelivery,
    AtDelivery,
    WithLabs,
    WithoutLabs,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::BeforeDelivery,
        Variant::AtDelivery,
        Variant::WithLabs,
        Variant::WithoutLabs,
    ];

    pub fn schema(self) -> &'static Schema {
        match self {
            Variant::BeforeDelivery => &schema::BEFORE_DELIVERY,
            Variant::AtDelivery => &schema::AT_DELIVERY,
            Variant::WithLabs => &schema::WITH_LABS,
            Variant::WithoutLabs => &schema::WITHOUT_LABS,
        }
    }

    pub fn key(self) -> &'static str {
        self.schema().name
    }
}

/// Per-variant section of `manifest.json` in the artifact directory. The
/// `features` list records the column order the model was trained on and is
/// checked against the code schema at load.
#[derive(Debug, Deserialize)]
struct ManifestEntry {
    model: String,
    features: Vec<String>,
    #[serde(default)]
    scaler: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    before_delivery: ManifestEntry,
    at_delivery: ManifestEntry,
    with_labs: ManifestEntry,
    without_labs: ManifestEntry,
}

impl Manifest {
    fn entry(&self, variant: Variant) -> &ManifestEntry {
        match variant {
            Variant::BeforeDelivery => &self.before_delivery,
            Variant::AtDelivery => &self.at_delivery,
            Variant::WithLabs => &self.with_labs,
            Variant::WithoutLabs => &self.without_labs,
        }
    }
}

/// One variant's schema, classifier, and optional scaler.
pub struct Pipeline {
    schema: &'static Schema,
    classifier: Box<dyn Classifier>,
    scaler: Option<StandardScaler>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("schema", &self.schema.name)
            .field("scaler", &self.scaler)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Checks on construction that every column the scaler was fitted on is a
    /// declared schema field, so scaling can never silently skip a column.
    pub fn new(
        schema: &'static Schema,
        classifier: Box<dyn Classifier>,
        scaler: Option<StandardScaler>,
    ) -> Result<Self> {
        if let Some(scaler) = &scaler {
            for column in scaler.columns() {
                if !schema.contains(column) {
                    bail!(
                        "scaler for `{}` was fitted on column `{column}` which the schema does not declare",
                        schema.name
                    );
                }
            }
        }
        Ok(Self {
            schema,
            classifier,
            scaler,
        })
    }
}

#[derive(Debug)]
pub struct PredictionService {
    pipelines: HashMap<Variant, Pipeline>,
}

impl PredictionService {
    /// Requires a pipeline for every variant; the service never serves with a
    /// partially loaded model set.
    pub fn from_pipelines(pipelines: HashMap<Variant, Pipeline>) -> Result<Self> {
        for variant in Variant::ALL {
            if !pipelines.contains_key(&variant) {
                bail!("no pipeline configured for variant `{}`", variant.key());
            }
        }
        Ok(Self { pipelines })
    }

    /// Loads all four variants from `model_dir` per its `manifest.json`.
    /// Every failure here is fatal: a missing or corrupt artifact, a scaler
    /// fitted on unknown columns, or a trained feature order that disagrees
    /// with the code schema.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let manifest_path = model_dir.join("manifest.json");
        let manifest: Manifest = serde_json::from_reader(
            File::open(&manifest_path)
                .with_context(|| format!("opening {}", manifest_path.display()))?,
        )
        .with_context(|| format!("parsing {}", manifest_path.display()))?;

        let mut pipelines = HashMap::with_capacity(Variant::ALL.len());
        for variant in Variant::ALL {
            let entry = manifest.entry(variant);
            let schema = variant.schema();

            check_feature_order(schema, &entry.features)?;

            let model_path = model_dir.join(&entry.model);
            let classifier = OnnxClassifier::load(&model_path, schema.len())
                .with_context(|| format!("loading model {}", model_path.display()))?;
            let scaler = entry
                .scaler
                .as_ref()
                .map(|name| StandardScaler::load(model_dir.join(name)))
                .transpose()?;

            info!(
                "loaded `{}`: model {} ({} features{})",
                variant.key(),
                entry.model,
                schema.len(),
                if scaler.is_some() { ", with scaler" } else { "" }
            );
            pipelines.insert(variant, Pipeline::new(schema, Box::new(classifier), scaler)?);
        }
        Self::from_pipelines(pipelines)
    }

    /// Assembles the feature vector, applies the variant's scaler if it has
    /// one, and runs the classifier. Deterministic: identical validated input
    /// yields identical output.
    pub fn predict(&self, variant: Variant, input: &ValidatedInput) -> Result<PredictionResponse> {
        let pipeline = self
            .pipelines
            .get(&variant)
            .ok_or_else(|| anyhow!("no pipeline for variant `{}`", variant.key()))?;

        let vector = assemble(pipeline.schema, input)?;
        let vector = match &pipeline.scaler {
            Some(scaler) => {
                // Scaling addresses columns by name, so go through the row form.
                let mut row = FeatureRow::new(pipeline.schema, vector)?;
                scaler.apply(&mut row)?;
                row.into_vector()
            }
            None => vector,
        };

        let features: Vec<f32> = vector.iter().map(|&v| v as f32).collect();
        let prediction = pipeline.classifier.predict(&features)?;
        Ok(PredictionResponse {
            prediction: prediction.label,
            probability: vec![prediction.probabilities],
        })
    }
}

/// The trained feature order recorded in the artifact manifest must match the
/// schema's declared order exactly. A reorder would corrupt predictions
/// without any runtime error, so it is refused at load.
fn check_feature_order(schema: &Schema, trained: &[String]) -> Result<()> {
    let declared: Vec<&str> = schema.field_names().collect();
    let trained: Vec<&str> = trained.iter().map(String::as_str).collect();
    if declared != trained {
        bail!(
            "schema `{}` declares field order {:?} but the model was trained on {:?}",
            schema.name,
            declared,
            trained
        );
    }
    Ok(())
}
