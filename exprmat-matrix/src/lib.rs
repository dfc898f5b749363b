//! Expression-data matrix alignment and indexing.
//!
//! This crate turns per-design-element measurement vectors into aligned
//! design-element × sample (or × cell) matrices:
//!
//! - **Indexes**: [`RowIndex`] and [`ColumnIndex`], built once and frozen
//! - **Alignment**: [`AssayLayout`] merges several sample dimensions into one column space
//! - **Dense matrices**: [`BulkMatrix`] with double, int, string and boolean cells
//! - **Sparse matrices**: [`SingleCellMatrix`] in compressed sparse row form
//! - **Masking**: [`MaskedMatrix`] over any matrix
//! - **Channels**: [`classify_channel`] and [`QuantitationTypeResolver`] for two-color data
//! - **Building**: [`ExpressionDataMatrixBuilder`] and the [`arithmetic`] combinators
//! - **Column order**: [`order_by_experimental_design`] and [`baseline`] selection
//! - **Export**: [`write_design_matrix`]
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use exprmat_core::Summarizable;
//! use exprmat_matrix::{DoubleMatrix, ExpressionDataMatrix};
//! use exprmat_model::{
//!     BioAssay, BioAssayDimension, BioMaterial, BulkExpressionDataVector, DataArray,
//!     DesignElement, PrimitiveType, QuantitationType,
//! };
//!
//! let liver = BioMaterial::new(1, "liver");
//! let dim = Arc::new(BioAssayDimension::new(1, vec![
//!     BioAssay::new(1, "run1", liver.clone()),
//!     BioAssay::new(2, "run2", BioMaterial::new(2, "brain")),
//! ]));
//! let qt = Arc::new(QuantitationType::new(1, "VALUE", PrimitiveType::Double).preferred());
//! let probe = DesignElement::new(1, "probe_1");
//! let v = BulkExpressionDataVector::from_array(
//!     probe.clone(), qt, dim, &DataArray::Double(vec![1.5, f64::NAN]),
//! ).unwrap();
//!
//! let matrix = DoubleMatrix::from_vectors(&[v]).unwrap();
//! assert_eq!(matrix.shape(), (1, 2));
//! assert_eq!(matrix.get_by_keys(&probe, &liver), Some(1.5));
//! assert!(matrix.has_missing_values());
//! assert_eq!(
//!     matrix.summary(),
//!     "BulkMatrix<double>: 1 rows \u{00d7} 2 columns, 1 quantitation type(s)"
//! );
//! ```

pub mod arithmetic;
pub mod baseline;
pub mod builder;
pub mod channel;
pub mod dense;
pub mod design_writer;
pub mod index;
pub mod layout;
pub mod mask;
pub mod resolution;
pub mod sort;
pub mod sparse;
pub mod traits;
pub mod value;

#[cfg(test)]
mod testing;

pub use arithmetic::{add_matrices, log_transform, mask_matrix, scalar_divide, subtract_matrices};
pub use baseline::{baseline_for, baseline_levels, is_baseline_condition};
pub use builder::{AnyBulkMatrix, ExpressionDataMatrixBuilder};
pub use channel::{classify_channel, ChannelRole};
pub use dense::{BooleanMatrix, BulkMatrix, DoubleMatrix, IntMatrix, StringMatrix};
pub use design_writer::{write_design_matrix, write_design_matrix_file};
pub use index::{sort_design_elements, ColumnIndex, ColumnIndexBuilder, RowIndex, RowIndexBuilder};
pub use layout::{AssayLayout, Selection};
pub use mask::MaskedMatrix;
pub use resolution::{useful_quantitation_types, DimensionRoles, QuantitationTypeResolver};
pub use sort::{order_by_experimental_design, order_by_name, order_matrix_columns, DegradedOrdering, SortOptions};
pub use sparse::{SingleCellDoubleMatrix, SingleCellIntMatrix, SingleCellMatrix, SparseValue};
pub use traits::{BulkExpressionDataMatrix, ExpressionDataMatrix};
pub use value::CellValue;
