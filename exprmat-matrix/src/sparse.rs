//! Compressed sparse row (CSR) matrices for single-cell data.
//!
//! [`SingleCellMatrix`] keeps one row per design element and one column per
//! cell of a [`SingleCellDimension`]. Each row stores the ascending column
//! indices of its specified cells with matching values; every other cell
//! reads as the matrix's default value, taken from the quantitation type's
//! declared missing-count value (zero when none is declared).

use std::fmt::Debug;
use std::sync::Arc;

use exprmat_core::{ExprMatError, Result, Summarizable};
use exprmat_model::{
    BioAssay, DataArray, DesignElement, PrimitiveType, QuantitationType, SingleCellDimension,
    SingleCellExpressionDataVector,
};

use crate::index::{RowIndex, RowIndexBuilder};
use crate::traits::ExpressionDataMatrix;

/// A value storable in a sparse single-cell matrix.
pub trait SparseValue: Copy + PartialEq + Debug + Send + Sync + 'static {
    const TYPE_NAME: &'static str;

    fn accepts(representation: PrimitiveType) -> bool;

    fn from_array(array: DataArray) -> Result<Vec<Self>>;

    /// Convert a quantitation type's implicit value. Fails when the value
    /// has no exact counterpart in `Self`.
    fn from_implicit(value: f64) -> Result<Self>;

    fn is_missing(&self) -> bool;
}

impl SparseValue for f64 {
    const TYPE_NAME: &'static str = "double";

    fn accepts(representation: PrimitiveType) -> bool {
        representation == PrimitiveType::Double
    }

    fn from_array(array: DataArray) -> Result<Vec<Self>> {
        match array {
            DataArray::Double(v) => Ok(v),
            other => Err(ExprMatError::TypeMismatch {
                expected: Self::TYPE_NAME.into(),
                found: other.representation().to_string(),
            }),
        }
    }

    fn from_implicit(value: f64) -> Result<Self> {
        Ok(value)
    }

    fn is_missing(&self) -> bool {
        self.is_nan()
    }
}

impl SparseValue for i32 {
    const TYPE_NAME: &'static str = "int";

    fn accepts(representation: PrimitiveType) -> bool {
        representation == PrimitiveType::Int
    }

    fn from_array(array: DataArray) -> Result<Vec<Self>> {
        match array {
            DataArray::Int(v) => Ok(v),
            other => Err(ExprMatError::TypeMismatch {
                expected: Self::TYPE_NAME.into(),
                found: other.representation().to_string(),
            }),
        }
    }

    fn from_implicit(value: f64) -> Result<Self> {
        if !value.is_finite()
            || value.fract() != 0.0
            || value < f64::from(i32::MIN)
            || value > f64::from(i32::MAX)
        {
            return Err(ExprMatError::InvalidInput(format!(
                "implicit value {value} is not representable as an int"
            )));
        }
        Ok(value as i32)
    }

    fn is_missing(&self) -> bool {
        false
    }
}

/// A design element × cell matrix in CSR layout.
#[derive(Debug, Clone)]
pub struct SingleCellMatrix<T: SparseValue> {
    experiment_id: Option<u64>,
    rows: RowIndex,
    quantitation_type: Arc<QuantitationType>,
    dimension: Arc<SingleCellDimension>,
    data: Vec<T>,
    indices: Vec<u32>,
    indptr: Vec<usize>,
    default_value: T,
}

pub type SingleCellDoubleMatrix = SingleCellMatrix<f64>;
pub type SingleCellIntMatrix = SingleCellMatrix<i32>;

impl<T: SparseValue> SingleCellMatrix<T> {
    /// Build from single-cell vectors sharing one quantitation type, one cell
    /// dimension and one experiment.
    pub fn from_vectors(vectors: &[SingleCellExpressionDataVector]) -> Result<Self> {
        let first = vectors
            .first()
            .ok_or_else(|| ExprMatError::InvalidInput("no vectors".into()))?;
        let quantitation_type = Arc::clone(&first.quantitation_type);
        let dimension = Arc::clone(&first.dimension);
        let experiment_id = first.experiment_id;
        for v in &vectors[1..] {
            if v.quantitation_type != quantitation_type {
                return Err(ExprMatError::InvalidInput(format!(
                    "vectors carry more than one quantitation type ({} and {})",
                    quantitation_type, v.quantitation_type
                )));
            }
            if v.dimension != dimension {
                return Err(ExprMatError::InvalidInput(format!(
                    "vectors span more than one cell dimension ({} and {})",
                    dimension.id, v.dimension.id
                )));
            }
            if v.experiment_id != experiment_id {
                return Err(ExprMatError::InvalidInput(
                    "vectors span more than one experiment".into(),
                ));
            }
        }
        if !T::accepts(quantitation_type.representation) {
            return Err(ExprMatError::TypeMismatch {
                expected: T::TYPE_NAME.into(),
                found: quantitation_type.representation.to_string(),
            });
        }

        let mut sorted: Vec<&SingleCellExpressionDataVector> = vectors.iter().collect();
        sorted.sort_by(|a, b| a.design_element.cmp(&b.design_element));

        let n_cells = dimension.number_of_cells();
        let mut rows = RowIndexBuilder::with_capacity(sorted.len());
        let mut data = Vec::new();
        let mut indices = Vec::new();
        let mut indptr = Vec::with_capacity(sorted.len() + 1);
        indptr.push(0);

        for v in sorted {
            rows.assign(v.design_element.clone())?;
            let values = T::from_array(v.decode()?)?;
            if values.len() != v.data_indices.len() {
                return Err(ExprMatError::InvalidInput(format!(
                    "vector for {} has {} values but {} cell indices",
                    v.design_element,
                    values.len(),
                    v.data_indices.len()
                )));
            }
            if let Some(w) = v.data_indices.windows(2).find(|w| w[1] <= w[0]) {
                return Err(ExprMatError::InvalidInput(format!(
                    "cell indices of {} are not strictly increasing ({} after {})",
                    v.design_element, w[1], w[0]
                )));
            }
            if let Some(&last) = v.data_indices.last() {
                if last as usize >= n_cells {
                    return Err(ExprMatError::InvalidInput(format!(
                        "cell index {last} of {} beyond {n_cells} cells",
                        v.design_element
                    )));
                }
            }
            data.extend(values);
            indices.extend_from_slice(&v.data_indices);
            indptr.push(indices.len());
        }

        let default_value = T::from_implicit(quantitation_type.implicit_value())?;
        log::debug!(
            "built {}x{} single-cell matrix with {} stored values",
            indptr.len() - 1,
            n_cells,
            data.len()
        );
        Ok(Self {
            experiment_id,
            rows: rows.freeze()?,
            quantitation_type,
            dimension,
            data,
            indices,
            indptr,
            default_value,
        })
    }

    pub fn experiment_id(&self) -> Option<u64> {
        self.experiment_id
    }

    pub fn quantitation_type(&self) -> &Arc<QuantitationType> {
        &self.quantitation_type
    }

    pub fn cell_dimension(&self) -> &Arc<SingleCellDimension> {
        &self.dimension
    }

    /// Value of cells a row does not store.
    pub fn default_value(&self) -> T {
        self.default_value
    }

    /// (rows, cells).
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.dimension.number_of_cells())
    }

    /// Number of stored values.
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn row_nnz(&self, row: usize) -> Result<usize> {
        ExprMatError::check_index(row, self.rows.len())?;
        Ok(self.indptr[row + 1] - self.indptr[row])
    }

    /// Fraction of cells that are stored.
    pub fn density(&self) -> f64 {
        let (r, c) = self.shape();
        let total = r * c;
        if total == 0 {
            0.0
        } else {
            self.nnz() as f64 / total as f64
        }
    }

    /// The stored `(cell, value)` pairs of one row, in ascending cell order.
    pub fn row_entries(&self, row: usize) -> Result<impl Iterator<Item = (usize, T)> + '_> {
        ExprMatError::check_index(row, self.rows.len())?;
        let range = self.indptr[row]..self.indptr[row + 1];
        Ok(self.indices[range.clone()]
            .iter()
            .zip(&self.data[range])
            .map(|(&c, &v)| (c as usize, v)))
    }

    /// The assay a cell column belongs to.
    pub fn assay_for_column(&self, column: usize) -> Result<&BioAssay> {
        ExprMatError::check_index(column, self.dimension.number_of_cells())?;
        self.dimension.assay_for_cell(column).ok_or_else(|| {
            ExprMatError::IllegalState(format!("cell {column} belongs to no assay"))
        })
    }

    /// The identifier of a cell column.
    pub fn cell_id(&self, column: usize) -> Option<&str> {
        self.dimension.cell_ids().get(column).map(String::as_str)
    }

    /// The value for a design element and cell identifier, if both are present.
    pub fn get_by_keys(&self, element: &DesignElement, cell_id: &str) -> Option<T> {
        let row = self.rows.index_of(element)?;
        let column = self.dimension.cell_index(cell_id)?;
        self.get(row, column).ok()
    }

    /// The CSR arrays: `(data, indices, indptr)`, where
    /// `indptr[i]..indptr[i + 1]` spans the entries of row `i`.
    pub fn to_csr(&self) -> (&[T], &[u32], &[usize]) {
        (&self.data, &self.indices, &self.indptr)
    }
}

impl<T: SparseValue> ExpressionDataMatrix for SingleCellMatrix<T> {
    type Value = T;

    fn rows(&self) -> usize {
        self.rows.len()
    }

    fn columns(&self) -> usize {
        self.dimension.number_of_cells()
    }

    fn get(&self, row: usize, column: usize) -> Result<T> {
        ExprMatError::check_index(row, self.rows.len())?;
        ExprMatError::check_index(column, self.dimension.number_of_cells())?;
        let (start, end) = (self.indptr[row], self.indptr[row + 1]);
        match self.indices[start..end].binary_search(&(column as u32)) {
            Ok(i) => Ok(self.data[start + i]),
            Err(_) => Ok(self.default_value),
        }
    }

    fn row(&self, row: usize) -> Result<Vec<T>> {
        let mut dense = vec![self.default_value; self.dimension.number_of_cells()];
        for (c, v) in self.row_entries(row)? {
            dense[c] = v;
        }
        Ok(dense)
    }

    fn design_element(&self, row: usize) -> Result<&DesignElement> {
        self.rows.get(row).ok_or(ExprMatError::IndexOutOfBounds {
            index: row,
            len: self.rows.len(),
        })
    }

    fn row_index(&self, element: &DesignElement) -> Option<usize> {
        self.rows.index_of(element)
    }

    fn has_missing_values(&self) -> bool {
        self.data.iter().any(SparseValue::is_missing)
            || (self.nnz() < self.rows.len() * self.dimension.number_of_cells()
                && self.default_value.is_missing())
    }
}

impl<T: SparseValue> Summarizable for SingleCellMatrix<T> {
    fn summary(&self) -> String {
        let (r, c) = self.shape();
        format!(
            "SingleCellMatrix<{}>: {r}\u{00d7}{c}, {} stored ({:.2}% density)",
            T::TYPE_NAME,
            self.nnz(),
            self.density() * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{cell_dimension, element, sparse_double_vector};
    use exprmat_model::QuantitationType;

    fn count_qt(default: Option<f64>) -> Arc<QuantitationType> {
        let qt = QuantitationType::new(7, "counts", PrimitiveType::Double);
        Arc::new(match default {
            Some(d) => qt.with_missing_count_value(d),
            None => qt,
        })
    }

    fn sample_matrix() -> SingleCellDoubleMatrix {
        let dim = cell_dimension(1, &[3, 2]);
        let qt = count_qt(None);
        let vectors = vec![
            sparse_double_vector(2, &qt, &dim, &[5.0], &[4]),
            sparse_double_vector(1, &qt, &dim, &[1.0, 2.0], &[0, 3]),
        ];
        SingleCellMatrix::from_vectors(&vectors).unwrap()
    }

    #[test]
    fn test_construction_sorts_rows() {
        let m = sample_matrix();
        assert_eq!(m.shape(), (2, 5));
        assert_eq!(m.design_element(0).unwrap(), &element(1));
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.row_nnz(1).unwrap(), 1);
        let (data, indices, indptr) = m.to_csr();
        assert_eq!(data, &[1.0, 2.0, 5.0]);
        assert_eq!(indices, &[0, 3, 4]);
        assert_eq!(indptr, &[0, 2, 3]);
    }

    #[test]
    fn test_get_stored_and_default() {
        let m = sample_matrix();
        assert_eq!(m.get(0, 3).unwrap(), 2.0);
        assert_eq!(m.get(0, 1).unwrap(), 0.0);
        assert_eq!(m.get(1, 4).unwrap(), 5.0);
        assert!(m.get(2, 0).is_err());
        assert!(m.get(0, 5).is_err());
    }

    #[test]
    fn test_declared_default_value() {
        let dim = cell_dimension(1, &[4]);
        let qt = count_qt(Some(-1.0));
        let m = SingleCellDoubleMatrix::from_vectors(&[sparse_double_vector(1, &qt, &dim, &[3.0], &[2])])
            .unwrap();
        assert_eq!(m.default_value(), -1.0);
        assert_eq!(m.row(0).unwrap(), vec![-1.0, -1.0, 3.0, -1.0]);
    }

    #[test]
    fn test_row_and_column() {
        let m = sample_matrix();
        assert_eq!(m.row(0).unwrap(), vec![1.0, 0.0, 0.0, 2.0, 0.0]);
        assert_eq!(m.column(4).unwrap(), vec![0.0, 5.0]);
        let entries: Vec<_> = m.row_entries(0).unwrap().collect();
        assert_eq!(entries, vec![(0, 1.0), (3, 2.0)]);
    }

    #[test]
    fn test_assay_for_column() {
        let m = sample_matrix();
        assert_eq!(m.assay_for_column(2).unwrap().id, 100);
        assert_eq!(m.assay_for_column(3).unwrap().id, 101);
        assert!(m.assay_for_column(5).is_err());
        assert_eq!(m.cell_id(4), Some("c4"));
    }

    #[test]
    fn test_get_by_keys() {
        let m = sample_matrix();
        assert_eq!(m.get_by_keys(&element(1), "c3"), Some(2.0));
        assert_eq!(m.get_by_keys(&element(1), "c1"), Some(0.0));
        assert_eq!(m.get_by_keys(&element(1), "nope"), None);
        assert_eq!(m.get_by_keys(&element(9), "c0"), None);
    }

    #[test]
    fn test_rejects_two_quantitation_types() {
        let dim = cell_dimension(1, &[3]);
        let a = count_qt(None);
        let b = Arc::new(QuantitationType::new(8, "other", PrimitiveType::Double));
        let vectors = vec![
            sparse_double_vector(1, &a, &dim, &[1.0], &[0]),
            sparse_double_vector(2, &b, &dim, &[1.0], &[0]),
        ];
        assert!(matches!(
            SingleCellDoubleMatrix::from_vectors(&vectors),
            Err(ExprMatError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_two_dimensions() {
        let qt = count_qt(None);
        let vectors = vec![
            sparse_double_vector(1, &qt, &cell_dimension(1, &[3]), &[1.0], &[0]),
            sparse_double_vector(2, &qt, &cell_dimension(2, &[3]), &[1.0], &[0]),
        ];
        assert!(SingleCellDoubleMatrix::from_vectors(&vectors).is_err());
    }

    #[test]
    fn test_rejects_unsorted_indices() {
        let dim = cell_dimension(1, &[5]);
        let qt = count_qt(None);
        let v = sparse_double_vector(1, &qt, &dim, &[1.0, 2.0], &[3, 1]);
        assert!(matches!(
            SingleCellDoubleMatrix::from_vectors(&[v]),
            Err(ExprMatError::InvalidInput(_))
        ));
        let dup = sparse_double_vector(1, &qt, &dim, &[1.0, 2.0], &[2, 2]);
        assert!(SingleCellDoubleMatrix::from_vectors(&[dup]).is_err());
    }

    #[test]
    fn test_rejects_index_beyond_cells() {
        let dim = cell_dimension(1, &[2]);
        let qt = count_qt(None);
        let v = sparse_double_vector(1, &qt, &dim, &[1.0], &[2]);
        assert!(SingleCellDoubleMatrix::from_vectors(&[v]).is_err());
    }

    #[test]
    fn test_rejects_value_index_mismatch() {
        let dim = cell_dimension(1, &[4]);
        let qt = count_qt(None);
        let v = sparse_double_vector(1, &qt, &dim, &[1.0, 2.0], &[1]);
        assert!(SingleCellDoubleMatrix::from_vectors(&[v]).is_err());
    }

    #[test]
    fn test_rejects_duplicate_rows() {
        let dim = cell_dimension(1, &[4]);
        let qt = count_qt(None);
        let vectors = vec![
            sparse_double_vector(1, &qt, &dim, &[1.0], &[1]),
            sparse_double_vector(1, &qt, &dim, &[2.0], &[2]),
        ];
        assert!(matches!(
            SingleCellDoubleMatrix::from_vectors(&vectors),
            Err(ExprMatError::IllegalState(_))
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let dim = cell_dimension(1, &[2]);
        let qt = count_qt(None);
        let v = sparse_double_vector(1, &qt, &dim, &[1.0], &[0]);
        assert!(matches!(
            SingleCellIntMatrix::from_vectors(&[v]),
            Err(ExprMatError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_int_matrix() {
        let dim = cell_dimension(1, &[3]);
        let qt = Arc::new(
            QuantitationType::new(3, "umi", PrimitiveType::Int).with_missing_count_value(0.0),
        );
        let v = SingleCellExpressionDataVector::new(
            element(1),
            qt,
            dim,
            DataArray::Int(vec![4, 9]).encode(),
            vec![0, 2],
        );
        let m = SingleCellIntMatrix::from_vectors(&[v]).unwrap();
        assert_eq!(m.row(0).unwrap(), vec![4, 0, 9]);
        assert!(!m.has_missing_values());
    }

    #[test]
    fn test_int_implicit_value_must_be_exact() {
        assert_eq!(<i32 as SparseValue>::from_implicit(-3.0).unwrap(), -3);
        assert_eq!(<i32 as SparseValue>::from_implicit(f64::from(i32::MAX)).unwrap(), i32::MAX);
        for bad in [f64::NAN, f64::INFINITY, 0.5, 3.0e9, -3.0e9] {
            assert!(matches!(
                <i32 as SparseValue>::from_implicit(bad),
                Err(ExprMatError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_int_matrix_rejects_unrepresentable_default() {
        let dim = cell_dimension(1, &[3]);
        let qt = Arc::new(
            QuantitationType::new(3, "umi", PrimitiveType::Int).with_missing_count_value(f64::NAN),
        );
        let v = SingleCellExpressionDataVector::new(
            element(1),
            qt,
            dim,
            DataArray::Int(vec![4]).encode(),
            vec![0],
        );
        assert!(matches!(
            SingleCellIntMatrix::from_vectors(&[v]),
            Err(ExprMatError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_summary() {
        let m = sample_matrix();
        assert_eq!(m.summary(), "SingleCellMatrix<double>: 2\u{00d7}5, 3 stored (30.00% density)");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeSet;

        proptest! {
            #[test]
            fn unstored_cells_read_as_default(
                rows in proptest::collection::vec(proptest::collection::btree_set(0u32..40, 0..15), 1..8),
                default in -5.0f64..5.0,
            ) {
                let dim = cell_dimension(1, &[20, 20]);
                let qt = count_qt(Some(default));
                let vectors: Vec<_> = rows
                    .iter()
                    .enumerate()
                    .map(|(i, cells)| {
                        let idx: Vec<u32> = cells.iter().copied().collect();
                        let vals: Vec<f64> = idx.iter().map(|&c| 100.0 + c as f64).collect();
                        sparse_double_vector(i as u64, &qt, &dim, &vals, &idx)
                    })
                    .collect();
                let m = SingleCellDoubleMatrix::from_vectors(&vectors).unwrap();
                for (r, cells) in rows.iter().enumerate() {
                    let cells: &BTreeSet<u32> = cells;
                    for c in 0..40u32 {
                        let got = m.get(r, c as usize).unwrap();
                        if cells.contains(&c) {
                            prop_assert_eq!(got, 100.0 + c as f64);
                        } else {
                            prop_assert_eq!(got, default);
                        }
                    }
                }
                let (_, indices, indptr) = m.to_csr();
                for r in 0..m.rows() {
                    let row = &indices[indptr[r]..indptr[r + 1]];
                    prop_assert!(row.windows(2).all(|w| w[0] < w[1]));
                }
            }
        }
    }
}
