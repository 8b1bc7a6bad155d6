//! Feature-vector assembly: validated field values into the fixed-order
//! numeric input the classifier was trained on.

use anyhow::{anyhow, bail, Result};

use crate::schema::{Schema, ValidatedInput};

/// Reads each schema field in declared order and casts to f64. Fails with a
/// data-integrity error if the produced length disagrees with the schema's
/// field count.
pub fn assemble(schema: &Schema, input: &ValidatedInput) -> Result<Vec<f64>> {
    let mut vector = Vec::with_capacity(schema.len());
    for field in schema.fields {
        let value = input
            .get(field.name)
            .ok_or_else(|| anyhow!("validated input is missing field `{}`", field.name))?;
        vector.push(value);
    }
    if vector.len() != schema.len() {
        bail!(
            "assembled {} values for schema `{}` which declares {} fields",
            vector.len(),
            schema.name,
            schema.len()
        );
    }
    Ok(vector)
}

/// A feature vector re-expressed as an ordered name → value row. The scaling
/// step addresses columns by name, not position, so the labs variants go
/// through this form between assembly and inference.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    names: Vec<&'static str>,
    values: Vec<f64>,
}

impl FeatureRow {
    /// Pairs a schema with an assembled vector. Rejects a length mismatch
    /// outright rather than truncating or padding.
    pub fn new(schema: &Schema, values: Vec<f64>) -> Result<Self> {
        if values.len() != schema.len() {
            bail!(
                "feature row for schema `{}` needs {} values, got {}",
                schema.name,
                schema.len(),
                values.len()
            );
        }
        Ok(Self {
            names: schema.field_names().collect(),
            values,
        })
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }

    /// Returns false if the row has no such column.
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        match self.names.iter().position(|n| *n == name) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }

    /// Recovers the vector in schema order.
    pub fn into_vector(self) -> Vec<f64> {
        self.values
    }
}
