//! Domain graph consumed by the exprmat matrix engine.
//!
//! - **Row keys**: [`DesignElement`] and its [`Platform`]
//! - **Columns**: [`BioMaterial`] samples, [`BioAssay`] runs, [`BioAssayDimension`]
//!   and the single-cell [`SingleCellDimension`]
//! - **Quantitation types**: [`QuantitationType`] with representation, scale and role flags
//! - **Vectors**: [`BulkExpressionDataVector`] and [`SingleCellExpressionDataVector`]
//! - **Payloads**: the big-endian [`codec`] and its decoded [`DataArray`]
//! - **Experimental design**: factors, factor values and [`ExperimentalDesign`]
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use exprmat_model::{
//!     BioAssay, BioAssayDimension, BioMaterial, BulkExpressionDataVector, DataArray,
//!     DesignElement, PrimitiveType, QuantitationType,
//! };
//!
//! let dim = Arc::new(BioAssayDimension::new(1, vec![
//!     BioAssay::new(1, "run1", BioMaterial::new(1, "liver")),
//!     BioAssay::new(2, "run2", BioMaterial::new(2, "brain")),
//! ]));
//! let qt = Arc::new(QuantitationType::new(1, "VALUE", PrimitiveType::Double).preferred());
//! let v = BulkExpressionDataVector::from_array(
//!     DesignElement::new(1, "probe_1"), qt, dim, &DataArray::Double(vec![1.5, 2.5]),
//! ).unwrap();
//!
//! assert_eq!(v.data_as_doubles().unwrap(), vec![1.5, 2.5]);
//! ```

pub mod codec;
pub mod design;
pub mod dimension;
pub mod element;
pub mod quantitation;
pub mod sample;
pub mod vector;

pub use codec::DataArray;
pub use design::{
    Characteristic, ExperimentalDesign, ExperimentalFactor, FactorId, FactorType, FactorValue,
    FactorValueId, Measurement,
};
pub use dimension::{BioAssayDimension, SingleCellDimension};
pub use element::{DesignElement, Platform, TechnologyType};
pub use quantitation::{
    CompatibleMerger, GeneralType, PrimitiveType, QuantitationType, QuantitationTypeMerger,
    ScaleType, StandardQuantitationType,
};
pub use sample::{BioAssay, BioMaterial};
pub use vector::{BulkExpressionDataVector, SingleCellExpressionDataVector, VectorKind};
