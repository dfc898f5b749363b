//! Building the matrices an analysis needs from a raw vector collection.
//!
//! [`ExpressionDataMatrixBuilder`] picks, per sample dimension, which
//! quantitation types to load (see [`crate::resolution`]) and assembles the
//! preferred, processed, per-channel, intensity and present/absent matrices.
//! A matrix that cannot be built because no quantitation type fills its role
//! comes back as `Ok(None)`.

use std::collections::HashMap;
use std::sync::Arc;

use exprmat_core::{ExprMatError, Result, Summarizable};
use exprmat_model::{
    BioAssayDimension, BulkExpressionDataVector, DesignElement, PrimitiveType, QuantitationType,
    VectorKind,
};

use crate::arithmetic::{add_matrices, log_transform, scalar_divide, subtract_matrices};
use crate::dense::{BooleanMatrix, DoubleMatrix, IntMatrix, StringMatrix};
use crate::resolution::{DimensionRoles, QuantitationTypeResolver};
use crate::traits::ExpressionDataMatrix;

/// A dense bulk matrix of whichever cell type the vectors carry.
#[derive(Debug, Clone)]
pub enum AnyBulkMatrix {
    Double(DoubleMatrix),
    Int(IntMatrix),
    String(StringMatrix),
    Boolean(BooleanMatrix),
}

impl AnyBulkMatrix {
    /// Build the variant matching the representation of the first vector.
    pub fn from_vectors(vectors: &[BulkExpressionDataVector]) -> Result<Self> {
        let first = vectors
            .first()
            .ok_or_else(|| ExprMatError::InvalidInput("no vectors".into()))?;
        match first.quantitation_type.representation {
            PrimitiveType::Double => DoubleMatrix::from_vectors(vectors).map(Self::Double),
            PrimitiveType::Int => IntMatrix::from_vectors(vectors).map(Self::Int),
            PrimitiveType::String => StringMatrix::from_vectors(vectors).map(Self::String),
            PrimitiveType::Boolean => BooleanMatrix::from_vectors(vectors).map(Self::Boolean),
            other => Err(ExprMatError::InvalidInput(format!(
                "no matrix type for {other} data"
            ))),
        }
    }

    pub fn rows(&self) -> usize {
        match self {
            Self::Double(m) => m.rows(),
            Self::Int(m) => m.rows(),
            Self::String(m) => m.rows(),
            Self::Boolean(m) => m.rows(),
        }
    }

    pub fn columns(&self) -> usize {
        match self {
            Self::Double(m) => m.columns(),
            Self::Int(m) => m.columns(),
            Self::String(m) => m.columns(),
            Self::Boolean(m) => m.columns(),
        }
    }

    pub fn as_double(&self) -> Option<&DoubleMatrix> {
        match self {
            Self::Double(m) => Some(m),
            _ => None,
        }
    }
}

impl Summarizable for AnyBulkMatrix {
    fn summary(&self) -> String {
        match self {
            Self::Double(m) => m.summary(),
            Self::Int(m) => m.summary(),
            Self::String(m) => m.summary(),
            Self::Boolean(m) => m.summary(),
        }
    }
}

/// Assembles analysis matrices from one experiment's vectors.
#[derive(Debug, Clone)]
pub struct ExpressionDataMatrixBuilder {
    raw: Vec<BulkExpressionDataVector>,
    processed: Vec<BulkExpressionDataVector>,
    resolver: QuantitationTypeResolver,
}

impl ExpressionDataMatrixBuilder {
    pub fn new(vectors: Vec<BulkExpressionDataVector>) -> Result<Self> {
        if vectors.is_empty() {
            return Err(ExprMatError::InvalidInput("no vectors, no sample dimensions".into()));
        }
        let resolver = QuantitationTypeResolver::new(&vectors)?;
        let (processed, raw) = vectors
            .into_iter()
            .partition(|v| v.kind == VectorKind::Processed);
        Ok(Self {
            raw,
            processed,
            resolver,
        })
    }

    /// The resolved channel assignments.
    pub fn resolver(&self) -> &QuantitationTypeResolver {
        &self.resolver
    }

    pub fn bio_assay_dimensions(&self) -> &[Arc<BioAssayDimension>] {
        self.resolver.dimensions()
    }

    /// Per dimension, the first preferred or masked-preferred quantitation type.
    pub fn preferred_quantitation_types(&self) -> Vec<Arc<QuantitationType>> {
        self.resolver.preferred_quantitation_types()
    }

    /// Per dimension, the first present/absent quantitation type.
    pub fn missing_value_quantitation_types(&self) -> Vec<Arc<QuantitationType>> {
        self.resolver.missing_value_quantitation_types()
    }

    pub fn num_missing_values(&self, qt: &QuantitationType) -> Option<usize> {
        self.resolver.missing_value_count(qt)
    }

    pub fn is_any_missing(&self) -> bool {
        self.resolver.is_any_missing()
    }

    fn matrix(
        vectors: &[BulkExpressionDataVector],
        types: &[Arc<QuantitationType>],
    ) -> Result<Option<DoubleMatrix>> {
        if types.is_empty() {
            return Ok(None);
        }
        DoubleMatrix::from_vectors_with_quantitation_types(vectors, types).map(Some)
    }

    fn per_dimension(
        &self,
        pick: impl Fn(&DimensionRoles) -> Option<&Arc<QuantitationType>>,
    ) -> Vec<Arc<QuantitationType>> {
        self.resolver
            .dimensions()
            .iter()
            .filter_map(|d| self.resolver.dimension_roles(d).and_then(&pick).cloned())
            .collect()
    }

    /// The raw data of the preferred quantitation types.
    pub fn preferred_data(&self) -> Result<Option<DoubleMatrix>> {
        let types = self.preferred_quantitation_types();
        if types.is_empty() {
            log::warn!("no preferred quantitation type");
            return Ok(None);
        }
        Self::matrix(&self.raw, &types)
    }

    /// The processed data of the preferred quantitation types.
    pub fn processed_data(&self) -> Result<Option<DoubleMatrix>> {
        let types = self.preferred_quantitation_types();
        if types.is_empty() {
            log::warn!("no preferred quantitation type");
            return Ok(None);
        }
        if self.processed.is_empty() {
            return Ok(None);
        }
        Self::matrix(&self.processed, &types)
    }

    /// Rank-by-mean of each processed vector of a preferred quantitation type.
    pub fn ranks_by_mean(&self) -> HashMap<DesignElement, f64> {
        let types = self.preferred_quantitation_types();
        self.processed
            .iter()
            .filter(|v| types.contains(&v.quantitation_type))
            .filter_map(|v| v.rank_by_mean.map(|r| (v.design_element.clone(), r)))
            .collect()
    }

    /// Channel A signal. When a dimension's raw channel A was never
    /// submitted but can be rebuilt, the rebuilt matrix for that dimension
    /// is returned instead.
    pub fn signal_channel_a(&self) -> Result<Option<DoubleMatrix>> {
        let mut types = Vec::new();
        for dim in self.resolver.dimensions() {
            if self.resolver.needs_channel_a_reconstruction(dim) {
                return self.reconstructed_channel_a(dim);
            }
            if let Some(qt) = self.resolver.signal_channel_a(dim) {
                types.push(Arc::clone(qt));
            }
        }
        Self::matrix(&self.raw, &types)
    }

    /// Channel A rebuilt as background-subtracted signal plus background.
    fn reconstructed_channel_a(&self, dim: &BioAssayDimension) -> Result<Option<DoubleMatrix>> {
        let (Some(subtracted), Some(background)) = (
            self.resolver.background_subtracted_channel_a(dim),
            self.resolver.background_channel_a(dim),
        ) else {
            return Ok(None);
        };
        let mut signal = DoubleMatrix::from_vectors_with_quantitation_type(&self.raw, subtracted)?;
        let background = DoubleMatrix::from_vectors_with_quantitation_type(&self.raw, background)?;
        add_matrices(&mut signal, &background)?;
        Ok(Some(signal))
    }

    pub fn signal_channel_b(&self) -> Result<Option<DoubleMatrix>> {
        Self::matrix(&self.raw, &self.per_dimension(|r| r.signal_channel_b.as_ref()))
    }

    pub fn background_channel_a(&self) -> Result<Option<DoubleMatrix>> {
        Self::matrix(&self.raw, &self.per_dimension(|r| r.background_channel_a.as_ref()))
    }

    pub fn background_channel_b(&self) -> Result<Option<DoubleMatrix>> {
        Self::matrix(&self.raw, &self.per_dimension(|r| r.background_channel_b.as_ref()))
    }

    pub fn background_subtracted_channel_a(&self) -> Result<Option<DoubleMatrix>> {
        Self::matrix(
            &self.raw,
            &self.per_dimension(|r| r.background_subtracted_channel_a.as_ref()),
        )
    }

    /// Intensity. For two-color data this is the mean of the log2
    /// background-subtracted signals of both channels, or the one channel
    /// available; for anything else it is the preferred data.
    pub fn intensity(&self) -> Result<Option<DoubleMatrix>> {
        if !self.is_two_color() {
            return self.preferred_data();
        }
        let mut signal_a = self.signal_channel_a()?;
        let mut signal_b = self.signal_channel_b()?;
        if signal_a.is_none() && signal_b.is_none() {
            log::warn!("no signal for either channel");
            return Ok(None);
        }
        let background_a = self.background_channel_a()?;
        let background_b = self.background_channel_b()?;

        for (signal, background) in [(&mut signal_a, &background_a), (&mut signal_b, &background_b)] {
            if let Some(s) = signal.as_mut() {
                if let Some(b) = background {
                    subtract_matrices(s, b)?;
                }
                log_transform(s)?;
            }
        }

        match (signal_a, signal_b) {
            (Some(mut a), Some(b)) => {
                add_matrices(&mut a, &b)?;
                scalar_divide(&mut a, 2.0)?;
                Ok(Some(a))
            }
            (a, b) => Ok(a.or(b)),
        }
    }

    /// Present/absent calls, when any dimension has them.
    pub fn missing_value_data(&self) -> Result<Option<BooleanMatrix>> {
        let types = self.missing_value_quantitation_types();
        if types.is_empty() {
            return Ok(None);
        }
        BooleanMatrix::from_vectors_with_quantitation_types(&self.raw, &types).map(Some)
    }

    /// Whether the data are two-color ratios: some vector on a two-color or
    /// dual-mode platform carries a preferred (or masked preferred) ratio.
    pub fn is_two_color(&self) -> bool {
        self.raw.iter().chain(&self.processed).any(|v| {
            let two_color = v
                .design_element
                .platform
                .as_ref()
                .is_some_and(|p| p.technology.is_two_color());
            let qt = &v.quantitation_type;
            two_color && (qt.is_preferred || qt.is_masked_preferred) && qt.is_ratio
        })
    }
}
