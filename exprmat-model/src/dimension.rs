//! Sample dimensions (ordered assay lists) and single-cell cell dimensions.

use core::hash::{Hash, Hasher};
use core::ops::Range;
use std::collections::HashSet;

use exprmat_core::{ExprMatError, Result};

use crate::sample::{BioAssay, BioMaterial};

/// An ordered list of assays defining the column layout of one platform run.
///
/// Vector payloads of this dimension hold one value per assay, in this order.
/// Dimensions are identified by id.
#[derive(Debug, Clone)]
pub struct BioAssayDimension {
    pub id: u64,
    pub name: Option<String>,
    pub assays: Vec<BioAssay>,
}

impl BioAssayDimension {
    pub fn new(id: u64, assays: Vec<BioAssay>) -> Self {
        Self {
            id,
            name: None,
            assays,
        }
    }

    /// Number of assays.
    pub fn len(&self) -> usize {
        self.assays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assays.is_empty()
    }

    /// Samples in assay order. Replicate assays repeat their sample.
    pub fn samples(&self) -> impl Iterator<Item = &BioMaterial> + '_ {
        self.assays.iter().map(|a| &a.sample)
    }

    /// The set of distinct samples.
    pub fn sample_set(&self) -> HashSet<&BioMaterial> {
        self.samples().collect()
    }

    /// Position of an assay in this dimension.
    pub fn position_of(&self, assay: &BioAssay) -> Option<usize> {
        self.assays.iter().position(|a| a == assay)
    }

    /// A dimension restricted to the assays of the given samples, in the order
    /// the samples are given. Samples absent from this dimension are skipped.
    pub fn subset(&self, samples: &[BioMaterial]) -> BioAssayDimension {
        let assays = samples
            .iter()
            .flat_map(|s| self.assays.iter().filter(move |a| &a.sample == s))
            .cloned()
            .collect();
        BioAssayDimension {
            id: self.id,
            name: self.name.clone(),
            assays,
        }
    }
}

impl PartialEq for BioAssayDimension {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BioAssayDimension {}

impl Hash for BioAssayDimension {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The single-cell analogue of [`BioAssayDimension`]: an ordered list of
/// cells grouped into contiguous per-assay ranges.
///
/// `assay_offsets[i]` is the first cell of `assays[i]`; offsets are
/// non-decreasing, start at zero and stay below the cell count, so the assay
/// owning a cell is found with a binary search.
#[derive(Debug, Clone)]
pub struct SingleCellDimension {
    pub id: u64,
    cell_ids: Vec<String>,
    assays: Vec<BioAssay>,
    assay_offsets: Vec<usize>,
}

impl SingleCellDimension {
    /// Create a cell dimension, validating the offset layout.
    pub fn new(
        id: u64,
        cell_ids: Vec<String>,
        assays: Vec<BioAssay>,
        assay_offsets: Vec<usize>,
    ) -> Result<Self> {
        if assays.len() != assay_offsets.len() {
            return Err(ExprMatError::InvalidInput(format!(
                "{} assays but {} offsets",
                assays.len(),
                assay_offsets.len()
            )));
        }
        if let Some(&first) = assay_offsets.first() {
            if first != 0 {
                return Err(ExprMatError::InvalidInput(format!(
                    "first assay offset must be 0, got {first}"
                )));
            }
        } else if !cell_ids.is_empty() {
            return Err(ExprMatError::InvalidInput(
                "cells present but no assays to own them".into(),
            ));
        }
        for w in assay_offsets.windows(2) {
            if w[1] < w[0] {
                return Err(ExprMatError::InvalidInput(format!(
                    "assay offsets must be non-decreasing ({} after {})",
                    w[1], w[0]
                )));
            }
        }
        if let Some(&last) = assay_offsets.last() {
            if last > cell_ids.len() {
                return Err(ExprMatError::InvalidInput(format!(
                    "assay offset {last} beyond {} cells",
                    cell_ids.len()
                )));
            }
        }
        Ok(Self {
            id,
            cell_ids,
            assays,
            assay_offsets,
        })
    }

    /// Number of cells.
    pub fn number_of_cells(&self) -> usize {
        self.cell_ids.len()
    }

    pub fn cell_ids(&self) -> &[String] {
        &self.cell_ids
    }

    pub fn assays(&self) -> &[BioAssay] {
        &self.assays
    }

    /// Index of a cell by its identifier.
    pub fn cell_index(&self, cell_id: &str) -> Option<usize> {
        self.cell_ids.iter().position(|c| c == cell_id)
    }

    /// The assay owning cell `cell`.
    pub fn assay_for_cell(&self, cell: usize) -> Option<&BioAssay> {
        if cell >= self.cell_ids.len() {
            return None;
        }
        // number of offsets <= cell, minus one, is the owning assay
        let i = self.assay_offsets.partition_point(|&o| o <= cell);
        i.checked_sub(1).map(|i| &self.assays[i])
    }

    /// The cells belonging to assay number `assay`.
    pub fn cell_range(&self, assay: usize) -> Option<Range<usize>> {
        let start = *self.assay_offsets.get(assay)?;
        let end = self
            .assay_offsets
            .get(assay + 1)
            .copied()
            .unwrap_or(self.cell_ids.len());
        Some(start..end)
    }
}

impl PartialEq for SingleCellDimension {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SingleCellDimension {}

impl Hash for SingleCellDimension {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
