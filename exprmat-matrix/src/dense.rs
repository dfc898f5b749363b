//! Dense bulk expression matrices.
//!
//! [`BulkMatrix`] stores a row-major dense array (design elements × samples)
//! addressed through an [`AssayLayout`]. The cell type picks the variant:
//!
//! - [`DoubleMatrix`]: `f64`, NaN marks missing cells
//! - [`IntMatrix`], [`StringMatrix`], [`BooleanMatrix`]: `Option<_>`, `None` marks missing cells
//!
//! Cells that no vector provides (a sample absent from a row's dimension)
//! hold the missing value.

use std::sync::Arc;

use exprmat_core::{ExprMatError, Result, Summarizable};
use exprmat_model::{
    BioAssay, BioMaterial, BulkExpressionDataVector, DesignElement, QuantitationType,
};

use crate::layout::{AssayLayout, Selection};
use crate::traits::{BulkExpressionDataMatrix, ExpressionDataMatrix};
use crate::value::CellValue;

/// A dense, row-major bulk matrix.
#[derive(Debug, Clone)]
pub struct BulkMatrix<T: CellValue> {
    layout: AssayLayout,
    data: Vec<T>,
    has_missing: bool,
    number_of_cells: Option<Vec<i32>>,
}

pub type DoubleMatrix = BulkMatrix<f64>;
pub type IntMatrix = BulkMatrix<Option<i32>>;
pub type StringMatrix = BulkMatrix<Option<String>>;
pub type BooleanMatrix = BulkMatrix<Option<bool>>;

impl<T: CellValue> BulkMatrix<T> {
    /// Build from every vector given. Vectors may carry several quantitation
    /// types and dimensions; no design element may appear twice.
    pub fn from_vectors(vectors: &[BulkExpressionDataVector]) -> Result<Self> {
        Self::from_selection(AssayLayout::select_all(vectors)?)
    }

    /// Build from the vectors of one quantitation type.
    pub fn from_vectors_with_quantitation_type(
        vectors: &[BulkExpressionDataVector],
        quantitation_type: &QuantitationType,
    ) -> Result<Self> {
        Self::from_selection(AssayLayout::select_quantitation_type(vectors, quantitation_type)?)
    }

    /// Build from the vectors of several quantitation types, stacked in the
    /// order given.
    pub fn from_vectors_with_quantitation_types(
        vectors: &[BulkExpressionDataVector],
        quantitation_types: &[Arc<QuantitationType>],
    ) -> Result<Self> {
        Self::from_selection(AssayLayout::select_quantitation_types(vectors, quantitation_types)?)
    }

    /// Fill a matrix from a selection.
    pub fn from_selection(selection: Selection<'_>) -> Result<Self> {
        let Selection { layout, vectors } = selection;
        let n_cols = layout.columns();
        let mut data = vec![T::missing(); layout.rows() * n_cols];
        let mut number_of_cells: Option<Vec<i32>> = None;

        for (row, v) in vectors.iter().enumerate() {
            let representation = v.quantitation_type.representation;
            if !T::accepts(representation) {
                return Err(ExprMatError::TypeMismatch {
                    expected: T::TYPE_NAME.into(),
                    found: representation.to_string(),
                });
            }
            let values = T::from_array(v.decode()?)?;
            if values.len() != v.dimension.len() {
                return Err(ExprMatError::InvalidInput(format!(
                    "vector for {} has {} values but its dimension has {} assays",
                    v.design_element,
                    values.len(),
                    v.dimension.len()
                )));
            }
            if let Some(cells) = &v.number_of_cells {
                if cells.len() != values.len() {
                    return Err(ExprMatError::InvalidInput(format!(
                        "vector for {} has {} cell counts for {} values",
                        v.design_element,
                        cells.len(),
                        values.len()
                    )));
                }
            }
            for (j, (assay, value)) in v.dimension.assays.iter().zip(values).enumerate() {
                let col = layout.column_index().index_of_assay(assay).ok_or_else(|| {
                    ExprMatError::IllegalState(format!("{assay} has no column"))
                })?;
                data[row * n_cols + col] = value;
                if let Some(cells) = &v.number_of_cells {
                    let counts = number_of_cells.get_or_insert_with(|| vec![0; data.len()]);
                    counts[row * n_cols + col] = cells[j];
                }
            }
        }

        let has_missing = data.iter().any(CellValue::is_missing);
        Ok(Self {
            layout,
            data,
            has_missing,
            number_of_cells,
        })
    }

    /// Wrap already-aligned row-major data.
    pub fn from_layout(layout: AssayLayout, data: Vec<T>) -> Result<Self> {
        let expected = layout.rows() * layout.columns();
        if data.len() != expected {
            return Err(ExprMatError::InvalidInput(format!(
                "{} values for a {}x{} layout",
                data.len(),
                layout.rows(),
                layout.columns()
            )));
        }
        let has_missing = data.iter().any(CellValue::is_missing);
        Ok(Self {
            layout,
            data,
            has_missing,
            number_of_cells: None,
        })
    }

    /// (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        (self.layout.rows(), self.layout.columns())
    }

    fn offset(&self, row: usize, column: usize) -> Result<usize> {
        ExprMatError::check_index(row, self.layout.rows())?;
        ExprMatError::check_index(column, self.layout.columns())?;
        Ok(row * self.layout.columns() + column)
    }

    /// The value for a design element and sample, if both are present.
    pub fn get_by_keys(&self, element: &DesignElement, sample: &BioMaterial) -> Option<T> {
        let row = self.layout.row_index().index_of(element)?;
        let col = self.layout.column_index().index_of_sample(sample)?;
        Some(self.data[row * self.layout.columns() + col].clone())
    }

    /// The value for a design element and assay, if both are present.
    pub fn get_by_assay(&self, element: &DesignElement, assay: &BioAssay) -> Option<T> {
        let row = self.layout.row_index().index_of(element)?;
        let col = self.layout.column_index().index_of_assay(assay)?;
        Some(self.data[row * self.layout.columns() + col].clone())
    }

    /// Set one cell.
    pub fn set(&mut self, row: usize, column: usize, value: T) -> Result<()> {
        let i = self.offset(row, column)?;
        let was_missing = self.data[i].is_missing();
        let now_missing = value.is_missing();
        self.data[i] = value;
        if now_missing {
            self.has_missing = true;
        } else if was_missing {
            self.has_missing = self.data.iter().any(CellValue::is_missing);
        }
        Ok(())
    }

    /// Set the cell of a design element and sample.
    pub fn set_by_keys(&mut self, element: &DesignElement, sample: &BioMaterial, value: T) -> Result<()> {
        let row = self.layout.row_index().index_of(element).ok_or_else(|| {
            ExprMatError::InvalidInput(format!("{element} is not a row of this matrix"))
        })?;
        let col = self.layout.column_index().index_of_sample(sample).ok_or_else(|| {
            ExprMatError::InvalidInput(format!("{sample} is not a column of this matrix"))
        })?;
        self.set(row, col, value)
    }

    /// A borrowed view of one row.
    pub fn row_slice(&self, row: usize) -> Result<&[T]> {
        ExprMatError::check_index(row, self.layout.rows())?;
        let start = row * self.layout.columns();
        Ok(&self.data[start..start + self.layout.columns()])
    }

    pub fn row_by_element(&self, element: &DesignElement) -> Option<Vec<T>> {
        let row = self.layout.row_index().index_of(element)?;
        self.row_slice(row).ok().map(<[T]>::to_vec)
    }

    pub fn column_by_sample(&self, sample: &BioMaterial) -> Option<Vec<T>> {
        let col = self.layout.column_index().index_of_sample(sample)?;
        self.column(col).ok()
    }

    pub fn column_by_assay(&self, assay: &BioAssay) -> Option<Vec<T>> {
        let col = self.layout.column_index().index_of_assay(assay)?;
        self.column(col).ok()
    }

    /// Cells aggregated into one value, when the source vectors carried counts.
    pub fn number_of_cells(&self, row: usize, column: usize) -> Result<Option<i32>> {
        let i = self.offset(row, column)?;
        Ok(self.number_of_cells.as_ref().map(|c| c[i]))
    }

    /// The flat row-major data.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// A matrix over the given design elements, in the order given.
    pub fn slice_rows(&self, elements: &[DesignElement]) -> Result<Self> {
        let (layout, source_rows) = self.layout.slice_rows(elements)?;
        let n_cols = self.layout.columns();
        let mut data = Vec::with_capacity(source_rows.len() * n_cols);
        for &r in &source_rows {
            data.extend_from_slice(&self.data[r * n_cols..(r + 1) * n_cols]);
        }
        let number_of_cells = self.number_of_cells.as_ref().map(|counts| {
            source_rows
                .iter()
                .flat_map(|&r| counts[r * n_cols..(r + 1) * n_cols].iter().copied())
                .collect()
        });
        let has_missing = data.iter().any(CellValue::is_missing);
        Ok(Self {
            layout,
            data,
            has_missing,
            number_of_cells,
        })
    }

    /// A matrix over the given samples, with columns in the order given.
    pub fn slice_columns(&self, samples: &[BioMaterial]) -> Result<Self> {
        let layout = self.layout.slice_columns(samples)?;
        let n_cols = self.layout.columns();
        let source_cols: Vec<usize> = samples
            .iter()
            .map(|s| {
                self.layout.column_index().index_of_sample(s).ok_or_else(|| {
                    ExprMatError::InvalidInput(format!("{s} is not a column of this matrix"))
                })
            })
            .collect::<Result<_>>()?;

        let mut data = Vec::with_capacity(self.layout.rows() * source_cols.len());
        for r in 0..self.layout.rows() {
            for &c in &source_cols {
                data.push(self.data[r * n_cols + c].clone());
            }
        }
        let number_of_cells = self.number_of_cells.as_ref().map(|counts| {
            (0..self.layout.rows())
                .flat_map(|r| source_cols.iter().map(move |&c| counts[r * n_cols + c]))
                .collect()
        });
        let has_missing = data.iter().any(CellValue::is_missing);
        Ok(Self {
            layout,
            data,
            has_missing,
            number_of_cells,
        })
    }

    /// Convert back to one vector per row, each over its own dimension.
    pub fn to_vectors(&self) -> Result<Vec<BulkExpressionDataVector>> {
        let n_cols = self.layout.columns();
        let mut out = Vec::with_capacity(self.layout.rows());
        for row in 0..self.layout.rows() {
            let (element, qt, dim) = match (
                self.layout.row_index().get(row),
                self.layout.row_quantitation_type(row),
                self.layout.row_dimension(row),
            ) {
                (Some(e), Some(q), Some(d)) => (e, q, d),
                _ => return Err(ExprMatError::IllegalState(format!("row {row} is incomplete"))),
            };
            let cols = dim
                .assays
                .iter()
                .map(|a| {
                    self.layout.column_index().index_of_assay(a).ok_or_else(|| {
                        ExprMatError::IllegalState(format!("{a} has no column"))
                    })
                })
                .collect::<Result<Vec<usize>>>()?;
            let values: Vec<T> = cols.iter().map(|&c| self.data[row * n_cols + c].clone()).collect();
            let mut v = BulkExpressionDataVector::new(
                element.clone(),
                Arc::clone(qt),
                Arc::clone(dim),
                T::encode(&values, qt.representation)?,
            );
            v.experiment_id = self.layout.experiment_id();
            if let Some(counts) = &self.number_of_cells {
                v.number_of_cells = Some(cols.iter().map(|&c| counts[row * n_cols + c]).collect());
            }
            out.push(v);
        }
        Ok(out)
    }
}

impl BulkMatrix<f64> {
    /// Mean of each row over its non-missing cells, ranked ascending and
    /// divided by the number of rows. Rows with no values rank as NaN.
    pub fn ranks_by_mean(&self) -> Vec<f64> {
        let n_cols = self.layout.columns();
        let means: Vec<f64> = (0..self.layout.rows())
            .map(|r| {
                let row = &self.data[r * n_cols..(r + 1) * n_cols];
                let (sum, n) = row
                    .iter()
                    .filter(|x| !x.is_nan())
                    .fold((0.0, 0usize), |(s, n), &x| (s + x, n + 1));
                if n == 0 {
                    f64::NAN
                } else {
                    sum / n as f64
                }
            })
            .collect();

        let mut order: Vec<usize> = (0..means.len()).filter(|&i| !means[i].is_nan()).collect();
        order.sort_by(|&a, &b| means[a].total_cmp(&means[b]));
        let n = means.len() as f64;
        let mut ranks = vec![f64::NAN; means.len()];
        for (rank, &i) in order.iter().enumerate() {
            ranks[i] = (rank + 1) as f64 / n;
        }
        ranks
    }
}

impl<T: CellValue> ExpressionDataMatrix for BulkMatrix<T> {
    type Value = T;

    fn rows(&self) -> usize {
        self.layout.rows()
    }

    fn columns(&self) -> usize {
        self.layout.columns()
    }

    fn get(&self, row: usize, column: usize) -> Result<T> {
        let i = self.offset(row, column)?;
        Ok(self.data[i].clone())
    }

    fn row(&self, row: usize) -> Result<Vec<T>> {
        self.row_slice(row).map(<[T]>::to_vec)
    }

    fn column(&self, column: usize) -> Result<Vec<T>> {
        ExprMatError::check_index(column, self.layout.columns())?;
        let n_cols = self.layout.columns();
        Ok((0..self.layout.rows())
            .map(|r| self.data[r * n_cols + column].clone())
            .collect())
    }

    fn design_element(&self, row: usize) -> Result<&DesignElement> {
        self.layout
            .row_index()
            .get(row)
            .ok_or(ExprMatError::IndexOutOfBounds {
                index: row,
                len: self.layout.rows(),
            })
    }

    fn row_index(&self, element: &DesignElement) -> Option<usize> {
        self.layout.row_index().index_of(element)
    }

    fn has_missing_values(&self) -> bool {
        self.has_missing
    }
}

impl<T: CellValue> BulkExpressionDataMatrix for BulkMatrix<T> {
    fn layout(&self) -> &AssayLayout {
        &self.layout
    }
}

impl<T: CellValue> Summarizable for BulkMatrix<T> {
    fn summary(&self) -> String {
        format!(
            "BulkMatrix<{}>: {} rows \u{00d7} {} columns, {} quantitation type(s)",
            T::TYPE_NAME,
            self.layout.rows(),
            self.layout.columns(),
            self.layout.quantitation_types().len()
        )
    }
}
