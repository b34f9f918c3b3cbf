//! Projection of named patient inputs onto the model's feature order.

use std::collections::BTreeMap;

use crate::ForestError;
use crate::model::Model;

/// A single patient input as submitted: either already numeric or raw text.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// A numeric value.
    Number(f64),
    /// Unparsed text, e.g. a form field or CSV cell.
    Text(String),
    /// Any other JSON value (`null`, a boolean, an array or an object).
    /// Kept so the evaluator can name the feature it cannot use.
    #[serde(skip_serializing)]
    Unusable(serde::de::IgnoredAny),
}

impl FeatureValue {
    /// Interpret the value as a finite real number.
    ///
    /// Text is trimmed before parsing; empty text yields `None`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            FeatureValue::Number(v) => *v,
            FeatureValue::Text(raw) => raw.trim().parse::<f64>().ok()?,
            FeatureValue::Unusable(_) => return None,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Number(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Text(value)
    }
}

/// Named clinical covariates for one patient.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PatientFeatures {
    values: BTreeMap<String, FeatureValue>,
}

impl PatientFeatures {
    /// Create an empty feature set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a feature, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style [`PatientFeatures::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a feature by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    /// Return the number of supplied features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return `true` if no features are supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for PatientFeatures
where
    K: Into<String>,
    V: Into<FeatureValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Patient values ordered exactly as the model's feature names.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// Wrap a row that is already in model feature order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::FeatureCountMismatch`] | `values.len() != model.n_features()` |
    /// | [`ForestError::InvalidFeatureValue`] | a value is NaN or infinite |
    pub fn from_ordered(model: &Model, values: Vec<f64>) -> Result<Self, ForestError> {
        if values.len() != model.n_features() {
            return Err(ForestError::FeatureCountMismatch {
                expected: model.n_features(),
                got: values.len(),
            });
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForestError::InvalidFeatureValue {
                name: model.feature_names[pos].clone(),
            });
        }
        Ok(Self(values))
    }

    /// Return the ordered values.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Project `patient` onto `model`'s feature order.
///
/// Extra names in `patient` are ignored.
///
/// # Errors
///
/// Returns [`ForestError::InvalidFeatureValue`] for the first model feature
/// that is absent, empty, not a number, or non-finite.
pub fn build_feature_vector(
    model: &Model,
    patient: &PatientFeatures,
) -> Result<FeatureVector, ForestError> {
    model
        .feature_names
        .iter()
        .map(|name| {
            patient
                .get(name)
                .and_then(FeatureValue::as_f64)
                .ok_or_else(|| ForestError::InvalidFeatureValue { name: name.clone() })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(FeatureVector)
}
