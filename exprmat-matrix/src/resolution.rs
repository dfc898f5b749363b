//! Per-dimension choice of the quantitation types feeding each channel.
//!
//! When a dimension carries several candidates for one role, the first one
//! seen is kept unless a later one has strictly fewer missing values. Missing
//! values are counted over every vector before any role is assigned, so the
//! outcome depends only on the order of the input vectors.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use exprmat_core::Result;
use exprmat_model::{BioAssayDimension, BulkExpressionDataVector, QuantitationType};

use crate::channel::{channel_role_for_name, classify_channel, ChannelRole};

/// The quantitation types chosen for one dimension.
#[derive(Debug, Clone, Default)]
pub struct DimensionRoles {
    pub preferred: Option<Arc<QuantitationType>>,
    pub signal_channel_a: Option<Arc<QuantitationType>>,
    pub signal_channel_b: Option<Arc<QuantitationType>>,
    pub background_channel_a: Option<Arc<QuantitationType>>,
    pub background_channel_b: Option<Arc<QuantitationType>>,
    pub background_subtracted_channel_a: Option<Arc<QuantitationType>>,
    pub present_absent: Option<Arc<QuantitationType>>,
}

impl DimensionRoles {
    fn slot(&mut self, role: ChannelRole) -> Option<&mut Option<Arc<QuantitationType>>> {
        match role {
            ChannelRole::SignalChannelA => Some(&mut self.signal_channel_a),
            ChannelRole::SignalChannelB => Some(&mut self.signal_channel_b),
            ChannelRole::BackgroundChannelA => Some(&mut self.background_channel_a),
            ChannelRole::BackgroundChannelB => Some(&mut self.background_channel_b),
            ChannelRole::BackgroundSubtractedChannelA => {
                Some(&mut self.background_subtracted_channel_a)
            }
            _ => None,
        }
    }

    fn role_of(&self, qt: &QuantitationType) -> Option<ChannelRole> {
        let is = |slot: &Option<Arc<QuantitationType>>| slot.as_deref() == Some(qt);
        if is(&self.preferred) {
            Some(ChannelRole::Preferred)
        } else if is(&self.signal_channel_a) {
            Some(ChannelRole::SignalChannelA)
        } else if is(&self.signal_channel_b) {
            Some(ChannelRole::SignalChannelB)
        } else if is(&self.background_channel_a) {
            Some(ChannelRole::BackgroundChannelA)
        } else if is(&self.background_channel_b) {
            Some(ChannelRole::BackgroundChannelB)
        } else if is(&self.background_subtracted_channel_a) {
            Some(ChannelRole::BackgroundSubtractedChannelA)
        } else if is(&self.present_absent) {
            Some(ChannelRole::PresentAbsent)
        } else {
            None
        }
    }
}

/// Channel assignments for every dimension of a vector collection.
#[derive(Debug, Clone)]
pub struct QuantitationTypeResolver {
    dimensions: Vec<Arc<BioAssayDimension>>,
    roles: Vec<DimensionRoles>,
    preferred_or_masked: Vec<Option<Arc<QuantitationType>>>,
    missing: HashMap<Arc<QuantitationType>, usize>,
    any_missing: bool,
}

fn count_missing(vectors: &[BulkExpressionDataVector]) -> Result<Vec<usize>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        vectors
            .par_iter()
            .map(|v| v.decode().map(|a| a.missing_count()))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        vectors
            .iter()
            .map(|v| v.decode().map(|a| a.missing_count()))
            .collect()
    }
}

impl QuantitationTypeResolver {
    pub fn new(vectors: &[BulkExpressionDataVector]) -> Result<Self> {
        let counts = count_missing(vectors)?;
        let mut missing: HashMap<Arc<QuantitationType>, usize> = HashMap::new();
        for (v, n) in vectors.iter().zip(counts) {
            *missing.entry(Arc::clone(&v.quantitation_type)).or_insert(0) += n;
        }
        let any_missing = missing.values().any(|&n| n > 0);

        let mut dimensions: Vec<Arc<BioAssayDimension>> = Vec::new();
        for v in vectors {
            if !dimensions.contains(&v.dimension) {
                dimensions.push(Arc::clone(&v.dimension));
            }
        }

        let mut roles = Vec::with_capacity(dimensions.len());
        let mut preferred_or_masked = Vec::with_capacity(dimensions.len());
        for dim in &dimensions {
            let in_dim: Vec<&BulkExpressionDataVector> =
                vectors.iter().filter(|v| &v.dimension == dim).collect();
            roles.push(Self::resolve_dimension(dim, in_dim.iter().copied(), &missing));
            preferred_or_masked.push(
                in_dim
                    .iter()
                    .map(|v| &v.quantitation_type)
                    .find(|qt| qt.is_preferred || qt.is_masked_preferred)
                    .cloned(),
            );
        }

        Ok(Self {
            dimensions,
            roles,
            preferred_or_masked,
            missing,
            any_missing,
        })
    }

    fn resolve_dimension<'v>(
        dim: &BioAssayDimension,
        vectors: impl Iterator<Item = &'v BulkExpressionDataVector>,
        missing: &HashMap<Arc<QuantitationType>, usize>,
    ) -> DimensionRoles {
        let mut result = DimensionRoles::default();
        let mut checked: HashSet<&Arc<QuantitationType>> = HashSet::new();
        let count = |qt: &Arc<QuantitationType>| missing.get(qt).copied().unwrap_or(0);

        for v in vectors {
            let qt = &v.quantitation_type;
            if !checked.insert(qt) {
                continue;
            }
            if qt.is_preferred && result.preferred.is_none() {
                log::info!("dimension {}: preferred={}", dim.id, qt);
                result.preferred = Some(Arc::clone(qt));
            } else if let Some(role) = channel_role_for_name(&qt.name) {
                if let Some(slot) = result.slot(role) {
                    match slot.as_ref().map(count) {
                        Some(current) if count(qt) < current => {
                            log::info!("dimension {}: better {:?}={}", dim.id, role, qt);
                            *slot = Some(Arc::clone(qt));
                        }
                        Some(_) => {}
                        None => {
                            log::info!("dimension {}: {:?}={}", dim.id, role, qt);
                            *slot = Some(Arc::clone(qt));
                        }
                    }
                }
            }
            if qt.is_present_absent() && result.present_absent.is_none() {
                result.present_absent = Some(Arc::clone(qt));
            }
        }
        result
    }

    /// Dimensions in the order their first vector appears.
    pub fn dimensions(&self) -> &[Arc<BioAssayDimension>] {
        &self.dimensions
    }

    fn roles(&self, dim: &BioAssayDimension) -> Option<&DimensionRoles> {
        self.dimensions
            .iter()
            .position(|d| d.as_ref() == dim)
            .map(|i| &self.roles[i])
    }

    /// All assignments for a dimension.
    pub fn dimension_roles(&self, dim: &BioAssayDimension) -> Option<&DimensionRoles> {
        self.roles(dim)
    }

    /// Total missing values of a quantitation type across every vector.
    pub fn missing_value_count(&self, qt: &QuantitationType) -> Option<usize> {
        self.missing.get(qt).copied()
    }

    pub fn is_any_missing(&self) -> bool {
        self.any_missing
    }

    /// The role `qt` was assigned for `dim`, if any.
    pub fn role_for(&self, dim: &BioAssayDimension, qt: &QuantitationType) -> Option<ChannelRole> {
        self.roles(dim)?.role_of(qt)
    }

    pub fn preferred(&self, dim: &BioAssayDimension) -> Option<&Arc<QuantitationType>> {
        self.roles(dim)?.preferred.as_ref()
    }

    pub fn signal_channel_a(&self, dim: &BioAssayDimension) -> Option<&Arc<QuantitationType>> {
        self.roles(dim)?.signal_channel_a.as_ref()
    }

    pub fn signal_channel_b(&self, dim: &BioAssayDimension) -> Option<&Arc<QuantitationType>> {
        self.roles(dim)?.signal_channel_b.as_ref()
    }

    pub fn background_channel_a(&self, dim: &BioAssayDimension) -> Option<&Arc<QuantitationType>> {
        self.roles(dim)?.background_channel_a.as_ref()
    }

    pub fn background_channel_b(&self, dim: &BioAssayDimension) -> Option<&Arc<QuantitationType>> {
        self.roles(dim)?.background_channel_b.as_ref()
    }

    pub fn background_subtracted_channel_a(
        &self,
        dim: &BioAssayDimension,
    ) -> Option<&Arc<QuantitationType>> {
        self.roles(dim)?.background_subtracted_channel_a.as_ref()
    }

    pub fn present_absent(&self, dim: &BioAssayDimension) -> Option<&Arc<QuantitationType>> {
        self.roles(dim)?.present_absent.as_ref()
    }

    /// Whether channel A must be rebuilt from its background-subtracted
    /// values plus background: the raw channel A signal is absent while
    /// channel B, background A and background-subtracted A are present.
    pub fn needs_channel_a_reconstruction(&self, dim: &BioAssayDimension) -> bool {
        let Some(r) = self.roles(dim) else {
            return false;
        };
        if r.signal_channel_a.is_some() && r.signal_channel_b.is_some() {
            return false;
        }
        if r.signal_channel_a.is_none()
            && r.signal_channel_b.is_some()
            && r.background_subtracted_channel_a.is_some()
            && r.background_channel_a.is_some()
        {
            log::info!("dimension {}: rebuilding channel A from background", dim.id);
            return true;
        }
        log::warn!(
            "dimension {}: no signal for both channels (A={:?}, B={:?}, background A={:?}, background-subtracted A={:?})",
            dim.id,
            r.signal_channel_a.as_ref().map(|q| q.name.as_str()),
            r.signal_channel_b.as_ref().map(|q| q.name.as_str()),
            r.background_channel_a.as_ref().map(|q| q.name.as_str()),
            r.background_subtracted_channel_a.as_ref().map(|q| q.name.as_str()),
        );
        false
    }

    /// Per dimension, the first quantitation type flagged preferred or
    /// masked preferred.
    pub fn preferred_quantitation_types(&self) -> Vec<Arc<QuantitationType>> {
        self.preferred_or_masked.iter().flatten().cloned().collect()
    }

    /// Per dimension, the first present/absent quantitation type.
    pub fn missing_value_quantitation_types(&self) -> Vec<Arc<QuantitationType>> {
        self.roles
            .iter()
            .filter_map(|r| r.present_absent.clone())
            .collect()
    }
}

/// The quantitation types worth loading: preferred, masked preferred, channel
/// signals and backgrounds, background-subtracted channel A and
/// present/absent calls. Order is kept; duplicates are dropped.
pub fn useful_quantitation_types(types: &[Arc<QuantitationType>]) -> Vec<Arc<QuantitationType>> {
    let mut seen = HashSet::new();
    types
        .iter()
        .filter(|qt| {
            let role = classify_channel(qt);
            if role == ChannelRole::Other {
                return false;
            }
            log::debug!("useful {:?}={}", role, qt);
            seen.insert(Arc::clone(qt))
        })
        .cloned()
        .collect()
}
