//! Experimental design: factors, factor values and their annotations.
//!
//! [`ExperimentalDesign`] is a frozen lookup table over factors and factor
//! values; samples refer to factor values by [`FactorValueId`].

use core::fmt;
use std::collections::HashMap;

use exprmat_core::{ExprMatError, Named, Result};

use crate::sample::BioMaterial;

/// Category of factors that capture processing batches.
pub const BATCH_FACTOR_CATEGORY: &str = "block";
/// Name of factors that capture processing batches.
pub const BATCH_FACTOR_NAME: &str = "batch";
/// Characteristic value marking a factor value as excluded from analysis.
pub const EXCLUDE_VALUE: &str = "DE_Exclude";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactorId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactorValueId(pub u64);

impl fmt::Display for FactorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "factor#{}", self.0)
    }
}

impl fmt::Display for FactorValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "factor value#{}", self.0)
    }
}

/// Whether a factor's levels are labels or measured numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FactorType {
    Categorical,
    Continuous,
}

impl fmt::Display for FactorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactorType::Categorical => f.write_str("categorical"),
            FactorType::Continuous => f.write_str("continuous"),
        }
    }
}

/// An ontology-style annotation: a category and a value, each with an optional URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Characteristic {
    pub category: Option<String>,
    pub category_uri: Option<String>,
    pub value: Option<String>,
    pub value_uri: Option<String>,
}

impl Characteristic {
    /// A characteristic with only a value.
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// A characteristic with only a category.
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    pub fn with_value_uri(mut self, uri: impl Into<String>) -> Self {
        self.value_uri = Some(uri.into());
        self
    }
}

/// A measured value of a continuous factor, kept as submitted text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Measurement {
    pub value: Option<String>,
    pub unit: Option<String>,
}

impl Measurement {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            unit: None,
        }
    }

    /// The value parsed as a number. Unparseable or absent values give `None`.
    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_deref()?.trim().parse::<f64>().ok()
    }
}

/// A variable of the experimental design (treatment, genotype, batch, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExperimentalFactor {
    pub id: FactorId,
    pub name: String,
    pub category: Option<Characteristic>,
    pub factor_type: FactorType,
}

impl ExperimentalFactor {
    pub fn new(id: u64, name: impl Into<String>, factor_type: FactorType) -> Self {
        Self {
            id: FactorId(id),
            name: name.into(),
            category: None,
            factor_type,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(Characteristic::category(category));
        self
    }

    pub fn is_continuous(&self) -> bool {
        self.factor_type == FactorType::Continuous
    }

    /// Whether this factor records processing batches.
    ///
    /// Continuous factors never are. A categorised factor is a batch factor
    /// when its category is "block"; an uncategorised one when it is named
    /// "batch".
    pub fn is_batch(&self) -> bool {
        if self.is_continuous() {
            return false;
        }
        match self.category.as_ref().and_then(|c| c.category.as_deref()) {
            Some(category) => category.eq_ignore_ascii_case(BATCH_FACTOR_CATEGORY),
            None => self.name.eq_ignore_ascii_case(BATCH_FACTOR_NAME),
        }
    }

    /// The category label, if any.
    pub fn category_label(&self) -> Option<&str> {
        self.category.as_ref().and_then(|c| c.category.as_deref())
    }
}

impl Named for ExperimentalFactor {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

/// One level of a factor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactorValue {
    pub id: FactorValueId,
    pub factor: FactorId,
    pub value: Option<String>,
    pub measurement: Option<Measurement>,
    pub characteristics: Vec<Characteristic>,
    /// Explicit baseline flag; `None` leaves the decision to term matching.
    pub is_baseline: Option<bool>,
}

impl FactorValue {
    /// A categorical level with a text value.
    pub fn categorical(id: u64, factor: FactorId, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            id: FactorValueId(id),
            factor,
            characteristics: vec![Characteristic::value(value.clone())],
            value: Some(value),
            measurement: None,
            is_baseline: None,
        }
    }

    /// A continuous level holding a measurement.
    pub fn measured(id: u64, factor: FactorId, value: impl Into<String>) -> Self {
        Self {
            id: FactorValueId(id),
            factor,
            value: None,
            measurement: Some(Measurement::new(value)),
            characteristics: Vec::new(),
            is_baseline: None,
        }
    }

    pub fn with_baseline(mut self, is_baseline: bool) -> Self {
        self.is_baseline = Some(is_baseline);
        self
    }

    pub fn with_characteristic(mut self, characteristic: Characteristic) -> Self {
        self.characteristics.push(characteristic);
        self
    }

    pub fn is_measurement(&self) -> bool {
        self.measurement.is_some()
    }

    /// Whether this level is flagged for exclusion from analysis.
    pub fn is_excluded(&self) -> bool {
        self.characteristics
            .iter()
            .filter_map(|c| c.value.as_deref())
            .any(|v| v.eq_ignore_ascii_case(EXCLUDE_VALUE))
    }

    /// Human-readable value: the measurement, the value text, or the
    /// characteristic values joined with " | ".
    pub fn display_value(&self) -> String {
        if let Some(v) = self.measurement.as_ref().and_then(|m| m.value.clone()) {
            return v;
        }
        let from_characteristics: Vec<&str> = self
            .characteristics
            .iter()
            .filter_map(|c| c.value.as_deref())
            .collect();
        if !from_characteristics.is_empty() {
            return from_characteristics.join(" | ");
        }
        self.value.clone().unwrap_or_default()
    }
}

/// Frozen lookup table of factors and factor values.
#[derive(Debug, Clone, Default)]
pub struct ExperimentalDesign {
    factors: Vec<ExperimentalFactor>,
    factor_values: Vec<FactorValue>,
    factor_index: HashMap<FactorId, usize>,
    value_index: HashMap<FactorValueId, usize>,
}

impl ExperimentalDesign {
    /// Build a design. Every factor value must belong to a listed factor and
    /// ids must be unique.
    pub fn new(factors: Vec<ExperimentalFactor>, factor_values: Vec<FactorValue>) -> Result<Self> {
        let mut factor_index = HashMap::with_capacity(factors.len());
        for (i, f) in factors.iter().enumerate() {
            if factor_index.insert(f.id, i).is_some() {
                return Err(ExprMatError::InvalidInput(format!("duplicate {}", f.id)));
            }
        }
        let mut value_index = HashMap::with_capacity(factor_values.len());
        for (i, fv) in factor_values.iter().enumerate() {
            if !factor_index.contains_key(&fv.factor) {
                return Err(ExprMatError::InvalidInput(format!(
                    "{} refers to unknown {}",
                    fv.id, fv.factor
                )));
            }
            if value_index.insert(fv.id, i).is_some() {
                return Err(ExprMatError::InvalidInput(format!("duplicate {}", fv.id)));
            }
        }
        Ok(Self {
            factors,
            factor_values,
            factor_index,
            value_index,
        })
    }

    pub fn factors(&self) -> &[ExperimentalFactor] {
        &self.factors
    }

    pub fn factor(&self, id: FactorId) -> Option<&ExperimentalFactor> {
        self.factor_index.get(&id).map(|&i| &self.factors[i])
    }

    pub fn factor_value(&self, id: FactorValueId) -> Option<&FactorValue> {
        self.value_index.get(&id).map(|&i| &self.factor_values[i])
    }

    /// All levels of a factor, in declaration order.
    pub fn values_of(&self, factor: FactorId) -> impl Iterator<Item = &FactorValue> + '_ {
        self.factor_values.iter().filter(move |fv| fv.factor == factor)
    }

    /// The factor values assigned to a sample that this design knows about.
    pub fn values_for_sample<'a>(
        &'a self,
        sample: &'a BioMaterial,
    ) -> impl Iterator<Item = &'a FactorValue> + 'a {
        sample
            .factor_values
            .iter()
            .filter_map(move |&id| self.factor_value(id))
    }

    /// The sample's level for `factor`, if it has one.
    pub fn value_for_sample<'a>(&'a self, sample: &'a BioMaterial, factor: FactorId) -> Option<&'a FactorValue> {
        self.values_for_sample(sample).find(|fv| fv.factor == factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn design() -> ExperimentalDesign {
        let treatment = ExperimentalFactor::new(1, "treatment", FactorType::Categorical);
        let dose = ExperimentalFactor::new(2, "dose", FactorType::Continuous);
        ExperimentalDesign::new(
            vec![treatment, dose],
            vec![
                FactorValue::categorical(10, FactorId(1), "control"),
                FactorValue::categorical(11, FactorId(1), "drug"),
                FactorValue::measured(20, FactorId(2), "1.5"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup() {
        let d = design();
        assert_eq!(d.factor(FactorId(2)).unwrap().name, "dose");
        assert_eq!(d.factor_value(FactorValueId(11)).unwrap().display_value(), "drug");
        assert_eq!(d.values_of(FactorId(1)).count(), 2);
        assert!(d.factor(FactorId(9)).is_none());
    }

    #[test]
    fn test_sample_values() {
        let d = design();
        let s = BioMaterial::new(1, "s1").with_factor_values([FactorValueId(11), FactorValueId(20), FactorValueId(99)]);
        assert_eq!(d.values_for_sample(&s).count(), 2);
        assert_eq!(d.value_for_sample(&s, FactorId(2)).unwrap().id, FactorValueId(20));
    }

    #[test]
    fn test_rejects_dangling_value() {
        let result = ExperimentalDesign::new(
            vec![ExperimentalFactor::new(1, "f", FactorType::Categorical)],
            vec![FactorValue::categorical(1, FactorId(2), "x")],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let f = ExperimentalFactor::new(1, "f", FactorType::Categorical);
        assert!(ExperimentalDesign::new(vec![f.clone(), f], vec![]).is_err());
    }

    #[test]
    fn test_batch_detection() {
        assert!(ExperimentalFactor::new(1, "Batch", FactorType::Categorical).is_batch());
        assert!(ExperimentalFactor::new(1, "scan date", FactorType::Categorical)
            .with_category("block")
            .is_batch());
        assert!(!ExperimentalFactor::new(1, "batch", FactorType::Categorical)
            .with_category("treatment")
            .is_batch());
        assert!(!ExperimentalFactor::new(1, "batch", FactorType::Continuous).is_batch());
    }

    #[test]
    fn test_measurement_parsing() {
        assert_eq!(Measurement::new(" 2.5 ").as_f64(), Some(2.5));
        assert_eq!(Measurement::new("high").as_f64(), None);
        assert_eq!(Measurement::default().as_f64(), None);
    }

    #[test]
    fn test_exclusion_and_display() {
        let fv = FactorValue::categorical(1, FactorId(1), "x")
            .with_characteristic(Characteristic::value("de_exclude"));
        assert!(fv.is_excluded());
        assert_eq!(fv.display_value(), "x | de_exclude");
        let m = FactorValue::measured(2, FactorId(2), "3");
        assert!(m.is_measurement());
        assert_eq!(m.display_value(), "3");
    }
}
