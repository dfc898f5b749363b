//! The matrix contracts shared by dense, sparse and masked representations.

use std::sync::Arc;

use exprmat_core::Result;
use exprmat_model::{BioAssay, BioAssayDimension, BioMaterial, DesignElement, QuantitationType};

use crate::layout::AssayLayout;

/// A design-element × column matrix with random access.
///
/// Positional access outside the matrix is an error; key lookups that find
/// nothing return `None`.
pub trait ExpressionDataMatrix {
    type Value: Clone;

    /// Number of rows (design elements).
    fn rows(&self) -> usize;

    /// Number of columns (samples or cells).
    fn columns(&self) -> usize;

    /// The value at `(row, column)`.
    fn get(&self, row: usize, column: usize) -> Result<Self::Value>;

    /// A freshly allocated copy of one row.
    fn row(&self, row: usize) -> Result<Vec<Self::Value>> {
        exprmat_core::ExprMatError::check_index(row, self.rows())?;
        (0..self.columns()).map(|c| self.get(row, c)).collect()
    }

    /// A freshly allocated copy of one column.
    fn column(&self, column: usize) -> Result<Vec<Self::Value>> {
        exprmat_core::ExprMatError::check_index(column, self.columns())?;
        (0..self.rows()).map(|r| self.get(r, column)).collect()
    }

    /// The design element of a row.
    fn design_element(&self, row: usize) -> Result<&DesignElement>;

    /// The row of a design element.
    fn row_index(&self, element: &DesignElement) -> Option<usize>;

    /// Whether any cell holds the missing-value marker.
    fn has_missing_values(&self) -> bool;
}

impl<M: ExpressionDataMatrix + ?Sized> ExpressionDataMatrix for &M {
    type Value = M::Value;

    fn rows(&self) -> usize {
        (**self).rows()
    }

    fn columns(&self) -> usize {
        (**self).columns()
    }

    fn get(&self, row: usize, column: usize) -> Result<Self::Value> {
        (**self).get(row, column)
    }

    fn row(&self, row: usize) -> Result<Vec<Self::Value>> {
        (**self).row(row)
    }

    fn column(&self, column: usize) -> Result<Vec<Self::Value>> {
        (**self).column(column)
    }

    fn design_element(&self, row: usize) -> Result<&DesignElement> {
        (**self).design_element(row)
    }

    fn row_index(&self, element: &DesignElement) -> Option<usize> {
        (**self).row_index(element)
    }

    fn has_missing_values(&self) -> bool {
        (**self).has_missing_values()
    }
}

/// A matrix whose columns are samples backed by sample dimensions.
pub trait BulkExpressionDataMatrix: ExpressionDataMatrix {
    /// Row, column and quantitation-type bookkeeping.
    fn layout(&self) -> &AssayLayout;

    fn column_index_for_sample(&self, sample: &BioMaterial) -> Option<usize> {
        self.layout().column_index().index_of_sample(sample)
    }

    fn column_index_for_assay(&self, assay: &BioAssay) -> Option<usize> {
        self.layout().column_index().index_of_assay(assay)
    }

    fn sample_for_column(&self, column: usize) -> Option<&BioMaterial> {
        self.layout().column_index().sample(column)
    }

    fn assays_for_column(&self, column: usize) -> Option<&[BioAssay]> {
        self.layout().column_index().assays(column)
    }

    /// The dimension covering every sample of the matrix.
    fn bio_assay_dimension(&self) -> Result<&Arc<BioAssayDimension>> {
        self.layout().bio_assay_dimension()
    }

    fn quantitation_types(&self) -> &[Arc<QuantitationType>] {
        self.layout().quantitation_types()
    }
}
