//! Measurement vectors: one design element's values under one quantitation type.

use std::sync::Arc;

use exprmat_core::{ExprMatError, Result};

use crate::codec::DataArray;
use crate::dimension::{BioAssayDimension, SingleCellDimension};
use crate::element::DesignElement;
use crate::quantitation::QuantitationType;

/// Whether a vector holds submitted raw data or processed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VectorKind {
    Raw,
    Processed,
}

/// A bulk vector: one value per assay of its dimension, in dimension order.
#[derive(Debug, Clone)]
pub struct BulkExpressionDataVector {
    pub experiment_id: Option<u64>,
    pub design_element: DesignElement,
    pub quantitation_type: Arc<QuantitationType>,
    pub dimension: Arc<BioAssayDimension>,
    pub kind: VectorKind,
    pub data: Vec<u8>,
    /// Cells aggregated into each value, for pseudo-bulk data.
    pub number_of_cells: Option<Vec<i32>>,
    pub rank_by_mean: Option<f64>,
}

impl BulkExpressionDataVector {
    /// A raw vector with an already-encoded payload.
    pub fn new(
        design_element: DesignElement,
        quantitation_type: Arc<QuantitationType>,
        dimension: Arc<BioAssayDimension>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            experiment_id: None,
            design_element,
            quantitation_type,
            dimension,
            kind: VectorKind::Raw,
            data,
            number_of_cells: None,
            rank_by_mean: None,
        }
    }

    /// A raw vector encoding `values` with the representation of `quantitation_type`.
    pub fn from_array(
        design_element: DesignElement,
        quantitation_type: Arc<QuantitationType>,
        dimension: Arc<BioAssayDimension>,
        values: &DataArray,
    ) -> Result<Self> {
        if values.representation() != quantitation_type.representation {
            return Err(ExprMatError::TypeMismatch {
                expected: quantitation_type.representation.to_string(),
                found: values.representation().to_string(),
            });
        }
        Ok(Self::new(design_element, quantitation_type, dimension, values.encode()))
    }

    pub fn with_experiment(mut self, experiment_id: u64) -> Self {
        self.experiment_id = Some(experiment_id);
        self
    }

    pub fn processed(mut self) -> Self {
        self.kind = VectorKind::Processed;
        self
    }

    /// Decode the payload with the quantitation type's representation.
    pub fn decode(&self) -> Result<DataArray> {
        DataArray::decode(&self.data, self.quantitation_type.representation)
    }

    /// Decode as doubles; text payloads fail with a type mismatch.
    pub fn data_as_doubles(&self) -> Result<Vec<f64>> {
        let arr = self.decode()?;
        arr.to_doubles().ok_or_else(|| ExprMatError::TypeMismatch {
            expected: "numeric".into(),
            found: arr.representation().to_string(),
        })
    }
}

/// A single-cell vector: the non-zero cells of one design element, as
/// parallel value and cell-index arrays.
#[derive(Debug, Clone)]
pub struct SingleCellExpressionDataVector {
    pub experiment_id: Option<u64>,
    pub design_element: DesignElement,
    pub quantitation_type: Arc<QuantitationType>,
    pub dimension: Arc<SingleCellDimension>,
    pub data: Vec<u8>,
    pub data_indices: Vec<u32>,
}

impl SingleCellExpressionDataVector {
    pub fn new(
        design_element: DesignElement,
        quantitation_type: Arc<QuantitationType>,
        dimension: Arc<SingleCellDimension>,
        data: Vec<u8>,
        data_indices: Vec<u32>,
    ) -> Self {
        Self {
            experiment_id: None,
            design_element,
            quantitation_type,
            dimension,
            data,
            data_indices,
        }
    }

    pub fn with_experiment(mut self, experiment_id: u64) -> Self {
        self.experiment_id = Some(experiment_id);
        self
    }

    pub fn decode(&self) -> Result<DataArray> {
        DataArray::decode(&self.data, self.quantitation_type.representation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantitation::PrimitiveType;
    use crate::sample::{BioAssay, BioMaterial};

    fn dimension() -> Arc<BioAssayDimension> {
        Arc::new(BioAssayDimension::new(
            1,
            vec![
                BioAssay::new(1, "a1", BioMaterial::new(1, "s1")),
                BioAssay::new(2, "a2", BioMaterial::new(2, "s2")),
            ],
        ))
    }

    #[test]
    fn test_from_array_roundtrip() {
        let qt = Arc::new(QuantitationType::new(1, "COUNT", PrimitiveType::Int));
        let v = BulkExpressionDataVector::from_array(
            DesignElement::new(1, "g1"),
            qt,
            dimension(),
            &DataArray::Int(vec![4, 9]),
        )
        .unwrap();
        assert_eq!(v.decode().unwrap(), DataArray::Int(vec![4, 9]));
        assert_eq!(v.data_as_doubles().unwrap(), vec![4.0, 9.0]);
        assert_eq!(v.kind, VectorKind::Raw);
    }

    #[test]
    fn test_from_array_type_mismatch() {
        let qt = Arc::new(QuantitationType::new(1, "VALUE", PrimitiveType::Double));
        let result = BulkExpressionDataVector::from_array(
            DesignElement::new(1, "g1"),
            qt,
            dimension(),
            &DataArray::Int(vec![4, 9]),
        );
        assert!(matches!(result, Err(ExprMatError::TypeMismatch { .. })));
    }

    #[test]
    fn test_text_has_no_doubles() {
        let qt = Arc::new(QuantitationType::new(1, "CALL", PrimitiveType::String));
        let v = BulkExpressionDataVector::from_array(
            DesignElement::new(1, "g1"),
            qt,
            dimension(),
            &DataArray::String(vec!["P".into(), "A".into()]),
        )
        .unwrap()
        .with_experiment(3)
        .processed();
        assert!(v.data_as_doubles().is_err());
        assert_eq!(v.experiment_id, Some(3));
        assert_eq!(v.kind, VectorKind::Processed);
    }
}
