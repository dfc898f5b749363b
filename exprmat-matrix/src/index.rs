//! Row and column index builders.
//!
//! Both indices are built incrementally by a builder and then frozen into a
//! read-only table: a vector of keys plus a hash map from key to position.
//!
//! - [`RowIndex`]: design element ↔ row, a bijection onto `0..rows`
//! - [`ColumnIndex`]: sample ↔ column, with every assay of a sample sharing
//!   the sample's column, across any number of sample dimensions

use std::collections::{BTreeMap, HashMap};

use exprmat_core::{ExprMatError, Result};
use exprmat_model::{BioAssay, BioAssayDimension, BioMaterial, DesignElement};

/// Sort design elements into row order: by name, then id, missing values last.
pub fn sort_design_elements(elements: &mut [DesignElement]) {
    elements.sort();
}

/// Incremental row assignment with double-booking checks.
///
/// Rows may be assigned out of order; only assigned rows are stored until
/// [`freeze`](Self::freeze) checks that they form `0..len`.
#[derive(Debug, Default)]
pub struct RowIndexBuilder {
    slots: BTreeMap<usize, DesignElement>,
    index: HashMap<DesignElement, usize>,
}

impl RowIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: BTreeMap::new(),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Assign `element` to the row after the highest assigned one and return
    /// that row.
    pub fn assign(&mut self, element: DesignElement) -> Result<usize> {
        let row = match self.slots.last_key_value() {
            None => 0,
            Some((&last, _)) => last.checked_add(1).ok_or_else(|| {
                ExprMatError::IllegalState("no row left after the highest assigned row".into())
            })?,
        };
        self.assign_at(row, element)?;
        Ok(row)
    }

    /// Assign `element` to a specific row.
    ///
    /// Fails if the row is already taken or the element already has a row.
    pub fn assign_at(&mut self, row: usize, element: DesignElement) -> Result<()> {
        if let Some(&existing) = self.index.get(&element) {
            return Err(ExprMatError::IllegalState(format!(
                "{element} is already associated with row {existing}"
            )));
        }
        if let Some(taken) = self.slots.get(&row) {
            return Err(ExprMatError::IllegalState(format!(
                "row {row} is already associated with {taken}"
            )));
        }
        self.index.insert(element.clone(), row);
        self.slots.insert(row, element);
        Ok(())
    }

    pub fn contains(&self, element: &DesignElement) -> bool {
        self.index.contains_key(element)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Freeze into a [`RowIndex`]. Every row below the highest assigned one
    /// must be filled.
    pub fn freeze(self) -> Result<RowIndex> {
        let mut elements = Vec::with_capacity(self.slots.len());
        for (expected, (row, e)) in self.slots.into_iter().enumerate() {
            if row != expected {
                return Err(ExprMatError::IllegalState(format!(
                    "row {expected} was never assigned a design element"
                )));
            }
            elements.push(e);
        }
        Ok(RowIndex {
            elements,
            index: self.index,
        })
    }
}

/// Frozen design element ↔ row table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowIndex {
    elements: Vec<DesignElement>,
    index: HashMap<DesignElement, usize>,
}

impl RowIndex {
    /// Sort `elements` into row order and index them.
    pub fn from_elements(elements: impl IntoIterator<Item = DesignElement>) -> Result<Self> {
        let mut elements: Vec<DesignElement> = elements.into_iter().collect();
        sort_design_elements(&mut elements);
        Self::from_ordered(elements)
    }

    /// Index `elements` in the order given.
    pub fn from_ordered(elements: impl IntoIterator<Item = DesignElement>) -> Result<Self> {
        let mut builder = RowIndexBuilder::new();
        for e in elements {
            builder.assign(e)?;
        }
        builder.freeze()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&DesignElement> {
        self.elements.get(row)
    }

    pub fn index_of(&self, element: &DesignElement) -> Option<usize> {
        self.index.get(element).copied()
    }

    pub fn elements(&self) -> &[DesignElement] {
        &self.elements
    }
}

/// Incremental sample → column assignment.
#[derive(Debug, Default)]
pub struct ColumnIndexBuilder {
    samples: Vec<BioMaterial>,
    assays: Vec<Vec<BioAssay>>,
    sample_index: HashMap<BioMaterial, usize>,
    assay_index: HashMap<BioAssay, usize>,
}

impl ColumnIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every assay of a dimension, in dimension order.
    pub fn add_dimension(&mut self, dimension: &BioAssayDimension) -> Result<()> {
        for assay in &dimension.assays {
            self.add_assay(assay)?;
        }
        Ok(())
    }

    /// Map an assay to its sample's column, opening a new column the first
    /// time the sample is seen. Returns the column.
    pub fn add_assay(&mut self, assay: &BioAssay) -> Result<usize> {
        let column = match self.sample_index.get(&assay.sample) {
            Some(&c) => c,
            None => {
                let c = self.samples.len();
                self.samples.push(assay.sample.clone());
                self.assays.push(Vec::new());
                self.sample_index.insert(assay.sample.clone(), c);
                c
            }
        };
        match self.assay_index.get(assay) {
            Some(&existing) if existing != column => Err(ExprMatError::IllegalState(format!(
                "assay {assay} is already associated with column {existing}"
            ))),
            Some(_) => Ok(column),
            None => {
                self.assay_index.insert(assay.clone(), column);
                self.assays[column].push(assay.clone());
                Ok(column)
            }
        }
    }

    /// Open a column for `sample` backed by `assays`. The sample must not
    /// have a column yet.
    pub fn add_sample_group(&mut self, sample: &BioMaterial, assays: &[BioAssay]) -> Result<usize> {
        if let Some(&existing) = self.sample_index.get(sample) {
            return Err(ExprMatError::IllegalState(format!(
                "sample {sample} is already associated with column {existing}"
            )));
        }
        let column = self.samples.len();
        self.samples.push(sample.clone());
        self.assays.push(Vec::new());
        self.sample_index.insert(sample.clone(), column);
        for assay in assays {
            self.add_assay(assay)?;
        }
        Ok(column)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn build(self) -> ColumnIndex {
        ColumnIndex {
            samples: self.samples,
            assays: self.assays,
            sample_index: self.sample_index,
            assay_index: self.assay_index,
        }
    }
}

/// Frozen sample ↔ column table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnIndex {
    samples: Vec<BioMaterial>,
    assays: Vec<Vec<BioAssay>>,
    sample_index: HashMap<BioMaterial, usize>,
    assay_index: HashMap<BioAssay, usize>,
}

impl ColumnIndex {
    /// Merge dimensions into one column space, walking them in the order given.
    pub fn from_dimensions<'a>(
        dimensions: impl IntoIterator<Item = &'a BioAssayDimension>,
    ) -> Result<Self> {
        let mut builder = ColumnIndexBuilder::new();
        for d in dimensions {
            builder.add_dimension(d)?;
        }
        Ok(builder.build())
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample(&self, column: usize) -> Option<&BioMaterial> {
        self.samples.get(column)
    }

    pub fn samples(&self) -> &[BioMaterial] {
        &self.samples
    }

    /// Assays sharing a column, in the order they were added.
    pub fn assays(&self, column: usize) -> Option<&[BioAssay]> {
        self.assays.get(column).map(Vec::as_slice)
    }

    pub fn index_of_sample(&self, sample: &BioMaterial) -> Option<usize> {
        self.sample_index.get(sample).copied()
    }

    pub fn index_of_assay(&self, assay: &BioAssay) -> Option<usize> {
        self.assay_index.get(assay).copied()
    }
}
