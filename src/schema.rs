//! Field schemas for the four prediction endpoints and the generic
//! query-parameter validator.
//!
//! Field order inside each schema matches the column order the corresponding
//! model was trained on. Reordering a schema is load-bearing: the service
//! refuses to start if a schema disagrees with the trained feature order
//! recorded in the artifact manifest (see `service::PredictionService::load`).

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Exactly 0 or 1.
    Binary,
    /// Whole number; `max: None` means unbounded above.
    Integer { min: f64, max: Option<f64> },
    Float { min: f64, max: Option<f64> },
}

#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl Schema {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl DoubleEndedIterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

const fn binary(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Binary,
    }
}

const fn integer(name: &'static str, min: f64, max: Option<f64>) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Integer { min, max },
    }
}

const fn float(name: &'static str, min: f64, max: Option<f64>) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Float { min, max },
    }
}

pub static BEFORE_DELIVERY: Schema = Schema {
    name: "before_delivery",
    fields: &[
        binary("placenta_previa"),
        binary("indications_for_caesarean_1"),
        binary("placenta_localization_3"),
        binary("delivery_2_0"),
        integer("age", 0.0, None),
        float("gestational_age", 0.0, None),
        float("fibrinogen", 0.0, None),
    ],
};

pub static AT_DELIVERY: Schema = Schema {
    name: "at_delivery",
    fields: &[
        integer("bp_systolic", 0.0, None),
        integer("heart_rate", 0.0, None),
        float("hemoglobin", 0.0, None),
        float("hematocrit", 0.0, None),
        integer("thrombocytes", 0.0, None),
        float("prothrombin_index", 0.0, None),
    ],
};

pub static WITH_LABS: Schema = Schema {
    name: "with_labs",
    fields: &[
        integer("number_deliveries", 0.0, Some(7.0)),
        float("hemoglobin", 42.0, Some(143.0)),
        float("hematocrit", 12.6, Some(42.6)),
        float("aptt", 18.0, Some(58.0)),
        float("fibrinogen", 2.2, Some(8.0)),
    ],
};

pub static WITHOUT_LABS: Schema = Schema {
    name: "without_labs",
    fields: &[
        integer("age", 15.0, Some(48.0)),
        binary("cesarean_history"),
        integer("menarche", 10.0, Some(18.0)),
        binary("placenta_localization___2"),
        binary("caesarean_section_1_0"),
    ],
};

/// Coerced, range-checked field values keyed by field name. Only ever built
/// by [`validate`], so holding an instance implies every schema field passed.
#[derive(Debug, Clone)]
pub struct ValidatedInput(HashMap<&'static str, f64>);

impl ValidatedInput {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }
}

/// Per-field validation failures, in the shape the 400 response body expects:
/// field name to list of messages.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

impl ValidationErrors {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.0.keys().copied().collect()
    }
}

/// Validates raw query parameters against a schema. Pure: no side effects, no
/// state. All declared fields are mandatory; parameters not named by the
/// schema are ignored. Failures are collected per field rather than stopping
/// at the first one.
pub fn validate(
    schema: &Schema,
    params: &HashMap<String, String>,
) -> Result<ValidatedInput, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let mut values = HashMap::with_capacity(schema.len());

    for field in schema.fields {
        let raw = match params.get(field.name).map(|v| v.trim()) {
            Some(v) if !v.is_empty() => v,
            _ => {
                errors.push(field.name, "This field is required.");
                continue;
            }
        };

        match field.kind {
            FieldKind::Binary => match raw.parse::<i64>() {
                Ok(v @ (0 | 1)) => {
                    values.insert(field.name, v as f64);
                }
                Ok(_) | Err(_) => {
                    errors.push(
                        field.name,
                        format!("Select a valid choice. {raw} is not one of the available choices."),
                    );
                }
            },
            FieldKind::Integer { min, max } => match raw.parse::<i64>() {
                Ok(v) => {
                    if let Some(message) = range_violation(v as f64, min, max) {
                        errors.push(field.name, message);
                    } else {
                        values.insert(field.name, v as f64);
                    }
                }
                Err(_) => errors.push(field.name, "Enter a whole number."),
            },
            FieldKind::Float { min, max } => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => {
                    if let Some(message) = range_violation(v, min, max) {
                        errors.push(field.name, message);
                    } else {
                        values.insert(field.name, v);
                    }
                }
                Ok(_) | Err(_) => errors.push(field.name, "Enter a number."),
            },
        }
    }

    if errors.is_empty() {
        Ok(ValidatedInput(values))
    } else {
        Err(errors)
    }
}

fn range_violation(value: f64, min: f64, max: Option<f64>) -> Option<String> {
    if value < min {
        return Some(format!(
            "Ensure this value is greater than or equal to {min}."
        ));
    }
    if let Some(max) = max {
        if value > max {
            return Some(format!("Ensure this value is less than or equal to {max}."));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn valid_before_delivery() -> HashMap<String, String> {
        params(&[
            ("placenta_previa", "1"),
            ("indications_for_caesarean_1", "0"),
            ("placenta_localization_3", "1"),
            ("delivery_2_0", "0"),
            ("age", "30"),
            ("gestational_age", "34.5"),
            ("fibrinogen", "3.2"),
        ])
    }

    #[test]
    fn accepts_valid_before_delivery_input() {
        let input = validate(&BEFORE_DELIVERY, &valid_before_delivery()).unwrap();
        assert_eq!(input.get("age"), Some(30.0));
        assert_eq!(input.get("gestational_age"), Some(34.5));
        assert_eq!(input.get("placenta_previa"), Some(1.0));
    }

    #[test]
    fn missing_field_is_named_in_errors() {
        let mut p = valid_before_delivery();
        p.remove("fibrinogen");
        let errors = validate(&BEFORE_DELIVERY, &p).unwrap_err();
        assert!(errors.contains("fibrinogen"));
        assert_eq!(errors.field_names(), vec!["fibrinogen"]);
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut p = valid_before_delivery();
        p.insert("age".into(), "  ".into());
        let errors = validate(&BEFORE_DELIVERY, &p).unwrap_err();
        assert!(errors.contains("age"));
    }

    #[test]
    fn binary_field_rejects_values_outside_zero_one() {
        let mut p = valid_before_delivery();
        p.insert("placenta_previa".into(), "2".into());
        let errors = validate(&BEFORE_DELIVERY, &p).unwrap_err();
        assert!(errors.contains("placenta_previa"));
    }

    #[test]
    fn integer_field_rejects_fractional_value() {
        let mut p = valid_before_delivery();
        p.insert("age".into(), "30.5".into());
        let errors = validate(&BEFORE_DELIVERY, &p).unwrap_err();
        assert!(errors.contains("age"));
    }

    #[test]
    fn non_numeric_value_is_a_type_error() {
        let mut p = valid_before_delivery();
        p.insert("gestational_age".into(), "thirty".into());
        let errors = validate(&BEFORE_DELIVERY, &p).unwrap_err();
        assert!(errors.contains("gestational_age"));
    }

    #[test]
    fn negative_value_violates_lower_bound() {
        let mut p = valid_before_delivery();
        p.insert("fibrinogen".into(), "-0.1".into());
        let errors = validate(&BEFORE_DELIVERY, &p).unwrap_err();
        assert!(errors.contains("fibrinogen"));
    }

    #[test]
    fn with_labs_upper_boundary_is_inclusive() {
        let p = params(&[
            ("number_deliveries", "7"),
            ("hemoglobin", "100"),
            ("hematocrit", "30"),
            ("aptt", "25"),
            ("fibrinogen", "4.1"),
        ]);
        let input = validate(&WITH_LABS, &p).unwrap();
        assert_eq!(input.get("number_deliveries"), Some(7.0));
    }

    #[test]
    fn with_labs_above_upper_bound_is_rejected_naming_the_field() {
        let p = params(&[
            ("number_deliveries", "8"),
            ("hemoglobin", "100"),
            ("hematocrit", "30"),
            ("aptt", "25"),
            ("fibrinogen", "4.1"),
        ]);
        let errors = validate(&WITH_LABS, &p).unwrap_err();
        assert_eq!(errors.field_names(), vec!["number_deliveries"]);
    }

    #[test]
    fn failures_are_collected_across_fields() {
        let p = params(&[
            ("number_deliveries", "8"),
            ("hemoglobin", "10"),
            ("hematocrit", "30"),
            ("aptt", "25"),
        ]);
        let errors = validate(&WITH_LABS, &p).unwrap_err();
        assert!(errors.contains("number_deliveries"));
        assert!(errors.contains("hemoglobin"));
        assert!(errors.contains("fibrinogen"));
        assert!(!errors.contains("hematocrit"));
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        let mut p = valid_before_delivery();
        p.insert("debug".into(), "true".into());
        assert!(validate(&BEFORE_DELIVERY, &p).is_ok());
    }

    #[test]
    fn without_labs_accepts_boundary_ages() {
        for age in ["15", "48"] {
            let p = params(&[
                ("age", age),
                ("cesarean_history", "1"),
                ("menarche", "13"),
                ("placenta_localization___2", "0"),
                ("caesarean_section_1_0", "1"),
            ]);
            assert!(validate(&WITHOUT_LABS, &p).is_ok(), "age={age}");
        }
    }

    #[test]
    fn schemas_declare_expected_field_counts() {
        assert_eq!(BEFORE_DELIVERY.len(), 7);
        assert_eq!(AT_DELIVERY.len(), 6);
        assert_eq!(WITH_LABS.len(), 5);
        assert_eq!(WITHOUT_LABS.len(), 5);
    }
}
