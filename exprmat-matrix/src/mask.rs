//! Read-only masking over any matrix.
//!
//! A [`MaskedMatrix`] answers reads from the wrapped matrix except where a
//! mask applies, in which case it returns the masked value. Row, column and
//! element masks compose as a union; an element mask may be given as
//! coordinates, as a row-major bit grid, or both.

use std::collections::HashSet;

use exprmat_core::{BitVec, ExprMatError, Result};
use exprmat_model::DesignElement;

use crate::traits::ExpressionDataMatrix;

#[derive(Debug, Clone)]
pub struct MaskedMatrix<M: ExpressionDataMatrix> {
    inner: M,
    masked_value: M::Value,
    row_mask: BitVec,
    column_mask: BitVec,
    element_coordinates: HashSet<(usize, usize)>,
    element_grid: Option<BitVec>,
    inverted: bool,
}

impl<M: ExpressionDataMatrix> MaskedMatrix<M> {
    /// Wrap `inner` with nothing masked.
    pub fn new(inner: M, masked_value: M::Value) -> Self {
        let row_mask = BitVec::zeros(inner.rows());
        let column_mask = BitVec::zeros(inner.columns());
        Self {
            inner,
            masked_value,
            row_mask,
            column_mask,
            element_coordinates: HashSet::new(),
            element_grid: None,
            inverted: false,
        }
    }

    pub fn with_masked_value(mut self, masked_value: M::Value) -> Self {
        self.masked_value = masked_value;
        self
    }

    pub fn masked_value(&self) -> &M::Value {
        &self.masked_value
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn into_inner(self) -> M {
        self.inner
    }

    pub fn mask_row(&mut self, row: usize) -> Result<()> {
        self.row_mask.set(row, true)
    }

    /// Mask the row of a design element. Returns `false` when the element is
    /// not a row of the wrapped matrix.
    pub fn mask_design_element(&mut self, element: &DesignElement) -> Result<bool> {
        match self.inner.row_index(element) {
            Some(row) => self.mask_row(row).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn mask_column(&mut self, column: usize) -> Result<()> {
        self.column_mask.set(column, true)
    }

    pub fn mask_element(&mut self, row: usize, column: usize) -> Result<()> {
        ExprMatError::check_index(row, self.inner.rows())?;
        ExprMatError::check_index(column, self.inner.columns())?;
        self.element_coordinates.insert((row, column));
        Ok(())
    }

    /// Mask elements with a row-major grid of `rows × columns` bits.
    pub fn mask_grid(&mut self, grid: BitVec) -> Result<()> {
        let expected = self.inner.rows() * self.inner.columns();
        if grid.len() != expected {
            return Err(ExprMatError::InvalidInput(format!(
                "mask grid has {} bits for {} cells",
                grid.len(),
                expected
            )));
        }
        self.element_grid = Some(grid);
        Ok(())
    }

    fn covered(&self, row: usize, column: usize) -> bool {
        self.row_mask.get(row)
            || self.column_mask.get(column)
            || self.element_coordinates.contains(&(row, column))
            || self
                .element_grid
                .as_ref()
                .is_some_and(|g| g.get(row * self.inner.columns() + column))
    }

    /// Whether a read of `(row, column)` returns the masked value.
    pub fn is_masked(&self, row: usize, column: usize) -> bool {
        self.covered(row, column) != self.inverted
    }

    /// A view reading through the complement of this mask.
    pub fn inverted(&self) -> MaskedMatrix<&M> {
        MaskedMatrix {
            inner: &self.inner,
            masked_value: self.masked_value.clone(),
            row_mask: self.row_mask.clone(),
            column_mask: self.column_mask.clone(),
            element_coordinates: self.element_coordinates.clone(),
            element_grid: self.element_grid.clone(),
            inverted: !self.inverted,
        }
    }

    /// Row-major grid of the cells covered by any mask, before inversion.
    fn coverage(&self) -> BitVec {
        let columns = self.inner.columns();
        let mut cells: Vec<bool> = match &self.element_grid {
            Some(grid) => (0..grid.len()).map(|i| grid.get(i)).collect(),
            None => vec![false; self.inner.rows() * columns],
        };
        for r in self.row_mask.iter_ones() {
            cells[r * columns..(r + 1) * columns].fill(true);
        }
        for c in self.column_mask.iter_ones() {
            cells.iter_mut().skip(c).step_by(columns).for_each(|b| *b = true);
        }
        for &(r, c) in &self.element_coordinates {
            cells[r * columns + c] = true;
        }
        BitVec::build(&cells)
    }

    /// Number of cells currently masked.
    pub fn masked_count(&self) -> usize {
        let covered = self.coverage().count_ones();
        if self.inverted {
            self.inner.rows() * self.inner.columns() - covered
        } else {
            covered
        }
    }
}

impl<M: ExpressionDataMatrix> ExpressionDataMatrix for MaskedMatrix<M> {
    type Value = M::Value;

    fn rows(&self) -> usize {
        self.inner.rows()
    }

    fn columns(&self) -> usize {
        self.inner.columns()
    }

    fn get(&self, row: usize, column: usize) -> Result<M::Value> {
        let value = self.inner.get(row, column)?;
        if self.is_masked(row, column) {
            Ok(self.masked_value.clone())
        } else {
            Ok(value)
        }
    }

    fn row(&self, row: usize) -> Result<Vec<M::Value>> {
        let mut values = self.inner.row(row)?;
        for (c, v) in values.iter_mut().enumerate() {
            if self.is_masked(row, c) {
                *v = self.masked_value.clone();
            }
        }
        Ok(values)
    }

    fn column(&self, column: usize) -> Result<Vec<M::Value>> {
        let mut values = self.inner.column(column)?;
        for (r, v) in values.iter_mut().enumerate() {
            if self.is_masked(r, column) {
                *v = self.masked_value.clone();
            }
        }
        Ok(values)
    }

    fn design_element(&self, row: usize) -> Result<&DesignElement> {
        self.inner.design_element(row)
    }

    fn row_index(&self, element: &DesignElement) -> Option<usize> {
        self.inner.row_index(element)
    }

    fn has_missing_values(&self) -> bool {
        self.inner.has_missing_values() || self.masked_count() > 0
    }
}
