//! Quantitation types: what a vector's values mean and how they are encoded.

use core::fmt;
use core::hash::{Hash, Hasher};
use std::sync::Arc;

use exprmat_core::{ExprMatError, Named, Result};

/// Primitive encoding of a vector payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveType {
    Double,
    Int,
    Long,
    Boolean,
    Char,
    String,
}

impl PrimitiveType {
    /// Size in bytes of one encoded element, or `None` for variable-width strings.
    pub fn width(&self) -> Option<usize> {
        match self {
            PrimitiveType::Double | PrimitiveType::Long => Some(8),
            PrimitiveType::Int => Some(4),
            PrimitiveType::Char => Some(2),
            PrimitiveType::Boolean => Some(1),
            PrimitiveType::String => None,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrimitiveType::Double => "double",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Char => "char",
            PrimitiveType::String => "string",
        };
        f.write_str(s)
    }
}

/// Whether values are measured quantities or category labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GeneralType {
    Quantitative,
    Categorical,
}

/// Semantic kind of a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StandardQuantitationType {
    Amount,
    Count,
    PresentAbsent,
    Ratio,
    Other,
}

/// Numeric scale of the stored values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScaleType {
    Linear,
    Log2,
    Log10,
    Ln,
    Count,
    Percent,
    Other,
}

impl ScaleType {
    pub fn is_log(&self) -> bool {
        matches!(self, ScaleType::Log2 | ScaleType::Log10 | ScaleType::Ln)
    }
}

/// A tag describing a vector's encoding, scale and role.
///
/// Identity is the `(id, name)` pair.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuantitationType {
    pub id: Option<u64>,
    pub name: String,
    pub description: Option<String>,
    pub representation: PrimitiveType,
    pub general_type: GeneralType,
    pub standard_type: StandardQuantitationType,
    pub scale: ScaleType,
    pub is_preferred: bool,
    pub is_masked_preferred: bool,
    pub is_ratio: bool,
    pub is_background: bool,
    pub is_background_subtracted: bool,
    pub is_normalized: bool,
    /// Value of cells a sparse vector leaves unspecified. Zero when unset.
    pub missing_count_value: Option<f64>,
}

impl QuantitationType {
    /// A quantitative, linear-scale amount with no role flags set.
    pub fn new(id: u64, name: impl Into<String>, representation: PrimitiveType) -> Self {
        let general_type = match representation {
            PrimitiveType::Boolean | PrimitiveType::Char | PrimitiveType::String => {
                GeneralType::Categorical
            }
            _ => GeneralType::Quantitative,
        };
        Self {
            id: Some(id),
            name: name.into(),
            description: None,
            representation,
            general_type,
            standard_type: StandardQuantitationType::Amount,
            scale: ScaleType::Linear,
            is_preferred: false,
            is_masked_preferred: false,
            is_ratio: false,
            is_background: false,
            is_background_subtracted: false,
            is_normalized: false,
            missing_count_value: None,
        }
    }

    pub fn preferred(mut self) -> Self {
        self.is_preferred = true;
        self
    }

    pub fn masked_preferred(mut self) -> Self {
        self.is_masked_preferred = true;
        self
    }

    pub fn ratio(mut self) -> Self {
        self.is_ratio = true;
        self.standard_type = StandardQuantitationType::Ratio;
        self
    }

    pub fn background(mut self) -> Self {
        self.is_background = true;
        self
    }

    pub fn background_subtracted(mut self) -> Self {
        self.is_background_subtracted = true;
        self
    }

    pub fn with_scale(mut self, scale: ScaleType) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_standard_type(mut self, standard_type: StandardQuantitationType) -> Self {
        self.standard_type = standard_type;
        self
    }

    /// Declare this a count type whose unspecified sparse cells hold `value`.
    pub fn with_missing_count_value(mut self, value: f64) -> Self {
        self.standard_type = StandardQuantitationType::Count;
        self.missing_count_value = Some(value);
        self
    }

    /// Whether this quantitation type records present/absent calls.
    pub fn is_present_absent(&self) -> bool {
        self.standard_type == StandardQuantitationType::PresentAbsent
    }

    /// Value of sparse cells that are not stored.
    pub fn implicit_value(&self) -> f64 {
        self.missing_count_value.unwrap_or(0.0)
    }
}

impl PartialEq for QuantitationType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.name == other.name
    }
}

impl Eq for QuantitationType {}

impl Hash for QuantitationType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.name.hash(state);
    }
}

impl Named for QuantitationType {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

impl fmt::Display for QuantitationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.representation)
    }
}

/// Strategy for collapsing several quantitation types into the one that
/// describes a multi-QT matrix.
pub trait QuantitationTypeMerger {
    fn merge(&self, types: &[Arc<QuantitationType>]) -> Result<QuantitationType>;
}

/// Merges quantitation types that agree on representation, general type,
/// standard type, scale and ratio flag. The merged type has no id, a name
/// joining the inputs, and keeps a flag only if every input has it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompatibleMerger;

impl QuantitationTypeMerger for CompatibleMerger {
    fn merge(&self, types: &[Arc<QuantitationType>]) -> Result<QuantitationType> {
        let first = types.first().ok_or_else(|| {
            ExprMatError::InvalidInput("no quantitation types to merge".into())
        })?;
        if types.len() == 1 {
            return Ok(first.as_ref().clone());
        }
        for qt in &types[1..] {
            let compatible = qt.representation == first.representation
                && qt.general_type == first.general_type
                && qt.standard_type == first.standard_type
                && qt.scale == first.scale
                && qt.is_ratio == first.is_ratio;
            if !compatible {
                return Err(ExprMatError::IllegalState(format!(
                    "quantitation types {first} and {qt} cannot be merged"
                )));
            }
        }
        let names: Vec<&str> = types.iter().map(|qt| qt.name.as_str()).collect();
        let mut merged = first.as_ref().clone();
        merged.id = None;
        merged.name = names.join(" + ");
        merged.description = Some(format!("Merged from {} quantitation types", types.len()));
        merged.is_preferred = types.iter().all(|qt| qt.is_preferred);
        merged.is_masked_preferred = types.iter().all(|qt| qt.is_masked_preferred);
        merged.is_background = types.iter().all(|qt| qt.is_background);
        merged.is_background_subtracted = types.iter().all(|qt| qt.is_background_subtracted);
        merged.is_normalized = types.iter().all(|qt| qt.is_normalized);
        Ok(merged)
    }
}
