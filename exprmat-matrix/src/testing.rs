//! Shared fixtures for unit tests.

use std::sync::Arc;

use exprmat_model::{
    BioAssay, BioAssayDimension, BioMaterial, BulkExpressionDataVector, DataArray, DesignElement,
    PrimitiveType, QuantitationType, SingleCellDimension, SingleCellExpressionDataVector,
};

pub(crate) fn sample(id: u64) -> BioMaterial {
    BioMaterial::new(id, format!("s{id}"))
}

pub(crate) fn assay(id: u64, sample_id: u64) -> BioAssay {
    BioAssay::new(id, format!("a{id}"), sample(sample_id))
}

/// A dimension from `(assay id, sample id)` pairs.
pub(crate) fn dimension(id: u64, pairs: &[(u64, u64)]) -> BioAssayDimension {
    BioAssayDimension::new(id, pairs.iter().map(|&(a, s)| assay(a, s)).collect())
}

pub(crate) fn shared_dimension(id: u64, pairs: &[(u64, u64)]) -> Arc<BioAssayDimension> {
    Arc::new(dimension(id, pairs))
}

/// Zero-padded names keep name order equal to id order.
pub(crate) fn element(id: u64) -> DesignElement {
    DesignElement::new(id, format!("g{id:03}"))
}

pub(crate) fn double_qt(id: u64, name: &str) -> Arc<QuantitationType> {
    Arc::new(QuantitationType::new(id, name, PrimitiveType::Double))
}

pub(crate) fn double_vector(
    element_id: u64,
    qt: &Arc<QuantitationType>,
    dim: &Arc<BioAssayDimension>,
    values: &[f64],
) -> BulkExpressionDataVector {
    BulkExpressionDataVector::new(
        element(element_id),
        Arc::clone(qt),
        Arc::clone(dim),
        exprmat_model::codec::encode_doubles(values),
    )
}

pub(crate) fn int_vector(
    element_id: u64,
    qt: &Arc<QuantitationType>,
    dim: &Arc<BioAssayDimension>,
    values: &[i32],
) -> BulkExpressionDataVector {
    BulkExpressionDataVector::new(
        element(element_id),
        Arc::clone(qt),
        Arc::clone(dim),
        DataArray::Int(values.to_vec()).encode(),
    )
}

/// A cell dimension with one assay per entry of `cells_per_assay`. Cells are
/// named `c0`, `c1`, ... and assay `i` (id `100 + i`) profiles sample `i + 1`.
pub(crate) fn cell_dimension(id: u64, cells_per_assay: &[usize]) -> Arc<SingleCellDimension> {
    let total: usize = cells_per_assay.iter().sum();
    let mut offsets = Vec::with_capacity(cells_per_assay.len());
    let mut start = 0;
    for &n in cells_per_assay {
        offsets.push(start);
        start += n;
    }
    let assays = (0..cells_per_assay.len() as u64)
        .map(|i| assay(100 + i, i + 1))
        .collect();
    let cells = (0..total).map(|c| format!("c{c}")).collect();
    match SingleCellDimension::new(id, cells, assays, offsets) {
        Ok(d) => Arc::new(d),
        Err(e) => panic!("bad test dimension: {e}"),
    }
}

pub(crate) fn sparse_double_vector(
    element_id: u64,
    qt: &Arc<QuantitationType>,
    dim: &Arc<SingleCellDimension>,
    values: &[f64],
    indices: &[u32],
) -> SingleCellExpressionDataVector {
    SingleCellExpressionDataVector::new(
        element(element_id),
        Arc::clone(qt),
        Arc::clone(dim),
        exprmat_model::codec::encode_doubles(values),
        indices.to_vec(),
    )
}
