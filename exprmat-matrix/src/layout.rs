//! Multi-assay alignment: the row/column bookkeeping behind bulk matrices.
//!
//! An [`AssayLayout`] is built from a selection of bulk vectors. Rows are the
//! vectors' design elements in sorted order; each row remembers the
//! quantitation type and sample dimension of the vector it came from, so a
//! single layout can stack vectors from several platforms (dimensions) and
//! several quantitation types. Columns are the union of the samples of every
//! dimension involved.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use exprmat_core::{ExprMatError, Result};
use exprmat_model::{
    BioAssay, BioAssayDimension, BioMaterial, BulkExpressionDataVector, DesignElement,
    QuantitationType, QuantitationTypeMerger,
};

use crate::index::{ColumnIndex, ColumnIndexBuilder, RowIndex, RowIndexBuilder};

/// Vectors chosen for a matrix, in row order, with their layout.
#[derive(Debug)]
pub struct Selection<'v> {
    pub layout: AssayLayout,
    /// `vectors[row]` fills row `row`.
    pub vectors: Vec<&'v BulkExpressionDataVector>,
}

/// Row, column, quantitation-type and dimension bookkeeping of a bulk matrix.
#[derive(Debug, Clone)]
pub struct AssayLayout {
    experiment_id: Option<u64>,
    rows: RowIndex,
    row_quantitation_types: Vec<Arc<QuantitationType>>,
    row_dimensions: Vec<Arc<BioAssayDimension>>,
    quantitation_types: Vec<Arc<QuantitationType>>,
    dimensions: Vec<Arc<BioAssayDimension>>,
    columns: ColumnIndex,
}

fn sorted_refs<'v>(
    vectors: impl IntoIterator<Item = &'v BulkExpressionDataVector>,
) -> Vec<&'v BulkExpressionDataVector> {
    let mut refs: Vec<_> = vectors.into_iter().collect();
    refs.sort_by(|a, b| a.design_element.cmp(&b.design_element));
    refs
}

fn push_unique<T: PartialEq>(list: &mut Vec<Arc<T>>, item: &Arc<T>) {
    if !list.iter().any(|x| x == item) {
        list.push(Arc::clone(item));
    }
}

impl AssayLayout {
    /// Select every vector. Vectors may carry different quantitation types
    /// as long as no design element appears twice.
    pub fn select_all(vectors: &[BulkExpressionDataVector]) -> Result<Selection<'_>> {
        Self::from_rows(sorted_refs(vectors))
    }

    /// Select the vectors of one quantitation type.
    pub fn select_quantitation_type<'v>(
        vectors: &'v [BulkExpressionDataVector],
        quantitation_type: &QuantitationType,
    ) -> Result<Selection<'v>> {
        let refs = sorted_refs(
            vectors
                .iter()
                .filter(|v| v.quantitation_type.as_ref() == quantitation_type),
        );
        if refs.is_empty() {
            return Err(ExprMatError::InvalidInput(format!(
                "no vectors for quantitation type {quantitation_type}"
            )));
        }
        Self::from_rows(refs)
    }

    /// Select the vectors of several quantitation types. Rows are grouped by
    /// quantitation type in the order given, sorted within each group.
    pub fn select_quantitation_types<'v>(
        vectors: &'v [BulkExpressionDataVector],
        quantitation_types: &[Arc<QuantitationType>],
    ) -> Result<Selection<'v>> {
        let mut refs = Vec::new();
        for qt in quantitation_types {
            refs.extend(sorted_refs(
                vectors.iter().filter(|v| &v.quantitation_type == qt),
            ));
        }
        if refs.is_empty() {
            return Err(ExprMatError::InvalidInput(
                "no vectors for the requested quantitation types".into(),
            ));
        }
        Self::from_rows(refs)
    }

    fn from_rows<'v>(selected: Vec<&'v BulkExpressionDataVector>) -> Result<Selection<'v>> {
        if selected.is_empty() {
            return Err(ExprMatError::InvalidInput("no vectors".into()));
        }

        let experiments: HashSet<u64> = selected.iter().filter_map(|v| v.experiment_id).collect();
        if experiments.len() > 1 {
            return Err(ExprMatError::InvalidInput(format!(
                "vectors span {} experiments",
                experiments.len()
            )));
        }

        let mut rows = RowIndexBuilder::with_capacity(selected.len());
        let mut row_quantitation_types = Vec::with_capacity(selected.len());
        let mut row_dimensions = Vec::with_capacity(selected.len());
        let mut quantitation_types = Vec::new();
        let mut dimensions = Vec::new();
        for v in &selected {
            rows.assign(v.design_element.clone())?;
            row_quantitation_types.push(Arc::clone(&v.quantitation_type));
            row_dimensions.push(Arc::clone(&v.dimension));
            push_unique(&mut quantitation_types, &v.quantitation_type);
            push_unique(&mut dimensions, &v.dimension);
        }

        let columns = ColumnIndex::from_dimensions(dimensions.iter().map(Arc::as_ref))?;
        log::debug!(
            "aligned {} rows over {} columns from {} dimension(s)",
            selected.len(),
            columns.len(),
            dimensions.len()
        );

        Ok(Selection {
            layout: AssayLayout {
                experiment_id: experiments.into_iter().next(),
                rows: rows.freeze()?,
                row_quantitation_types,
                row_dimensions,
                quantitation_types,
                dimensions,
                columns,
            },
            vectors: selected,
        })
    }

    pub fn experiment_id(&self) -> Option<u64> {
        self.experiment_id
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> usize {
        self.columns.len()
    }

    pub fn row_index(&self) -> &RowIndex {
        &self.rows
    }

    pub fn column_index(&self) -> &ColumnIndex {
        &self.columns
    }

    /// Distinct quantitation types, in first-seen row order.
    pub fn quantitation_types(&self) -> &[Arc<QuantitationType>] {
        &self.quantitation_types
    }

    /// Distinct dimensions, in first-seen row order.
    pub fn dimensions(&self) -> &[Arc<BioAssayDimension>] {
        &self.dimensions
    }

    pub fn row_quantitation_type(&self, row: usize) -> Option<&Arc<QuantitationType>> {
        self.row_quantitation_types.get(row)
    }

    pub fn row_dimension(&self, row: usize) -> Option<&Arc<BioAssayDimension>> {
        self.row_dimensions.get(row)
    }

    pub fn dimension_for_element(&self, element: &DesignElement) -> Option<&Arc<BioAssayDimension>> {
        self.rows.index_of(element).and_then(|r| self.row_dimension(r))
    }

    /// The single quantitation type of this layout.
    pub fn quantitation_type(&self) -> Result<&Arc<QuantitationType>> {
        match self.quantitation_types.as_slice() {
            [qt] => Ok(qt),
            [] => Err(ExprMatError::IllegalState("no quantitation types".into())),
            many => Err(ExprMatError::IllegalState(format!(
                "{} quantitation types and no merge strategy",
                many.len()
            ))),
        }
    }

    /// The quantitation type describing the layout, merging when there are several.
    pub fn merged_quantitation_type(
        &self,
        merger: &dyn QuantitationTypeMerger,
    ) -> Result<QuantitationType> {
        match self.quantitation_types.as_slice() {
            [qt] => Ok(qt.as_ref().clone()),
            many => merger.merge(many),
        }
    }

    /// The dimension whose samples are a superset of every sample in the
    /// layout; the largest if several qualify.
    pub fn best_bio_assay_dimension(&self) -> Option<&Arc<BioAssayDimension>> {
        if self.dimensions.len() == 1 {
            return self.dimensions.first();
        }
        let all: HashSet<&BioMaterial> = self.dimensions.iter().flat_map(|d| d.samples()).collect();
        let mut best: Option<&Arc<BioAssayDimension>> = None;
        for d in &self.dimensions {
            let samples = d.sample_set();
            if !all.iter().all(|s| samples.contains(s)) {
                continue;
            }
            if best.map_or(true, |b| d.len() > b.len()) {
                best = Some(d);
            }
        }
        best
    }

    /// Like [`best_bio_assay_dimension`](Self::best_bio_assay_dimension) but
    /// fails when no dimension covers every sample.
    pub fn bio_assay_dimension(&self) -> Result<&Arc<BioAssayDimension>> {
        self.best_bio_assay_dimension().ok_or_else(|| {
            ExprMatError::IllegalState(format!(
                "none of {} dimensions covers every sample; the data might need to be matched or merged",
                self.dimensions.len()
            ))
        })
    }

    /// Number of columns the row of `element` has data for.
    pub fn columns_for_element(&self, element: &DesignElement) -> Option<usize> {
        let dim = self.dimension_for_element(element)?;
        let used: HashSet<usize> = dim
            .samples()
            .filter_map(|s| self.columns.index_of_sample(s))
            .collect();
        Some(used.len())
    }

    /// The assay behind a column that is backed by exactly one assay.
    pub fn assay_for_column(&self, column: usize) -> Result<&BioAssay> {
        ExprMatError::check_index(column, self.columns())?;
        match self.columns.assays(column).unwrap_or_default() {
            [assay] => Ok(assay),
            many => Err(ExprMatError::IllegalState(format!(
                "column {column} is backed by {} assays",
                many.len()
            ))),
        }
    }

    /// A layout over a subset of rows, in the order given. Returns the
    /// layout and the source row of every new row.
    pub fn slice_rows(&self, elements: &[DesignElement]) -> Result<(AssayLayout, Vec<usize>)> {
        let mut rows = RowIndexBuilder::with_capacity(elements.len());
        let mut source_rows = Vec::with_capacity(elements.len());
        let mut row_quantitation_types = Vec::with_capacity(elements.len());
        let mut row_dimensions = Vec::with_capacity(elements.len());
        for e in elements {
            let source = self.rows.index_of(e).ok_or_else(|| {
                ExprMatError::InvalidInput(format!("{e} is not a row of this matrix"))
            })?;
            rows.assign(e.clone())?;
            source_rows.push(source);
            row_quantitation_types.push(Arc::clone(&self.row_quantitation_types[source]));
            row_dimensions.push(Arc::clone(&self.row_dimensions[source]));
        }

        let mut quantitation_types = Vec::new();
        for qt in &row_quantitation_types {
            push_unique(&mut quantitation_types, qt);
        }
        if quantitation_types.is_empty() {
            quantitation_types = self.quantitation_types.clone();
        }

        let layout = AssayLayout {
            experiment_id: self.experiment_id,
            rows: rows.freeze()?,
            row_quantitation_types,
            row_dimensions,
            quantitation_types,
            dimensions: self.dimensions.clone(),
            columns: self.columns.clone(),
        };
        Ok((layout, source_rows))
    }

    /// A layout over a subset of samples, with columns in the order given.
    /// Dimensions are narrowed to the assays of those samples.
    pub fn slice_columns(&self, samples: &[BioMaterial]) -> Result<AssayLayout> {
        for s in samples {
            if self.columns.index_of_sample(s).is_none() {
                return Err(ExprMatError::InvalidInput(format!(
                    "{s} is not a column of this matrix"
                )));
            }
        }

        let dimensions: Vec<Arc<BioAssayDimension>> = self
            .dimensions
            .iter()
            .map(|d| Arc::new(d.subset(samples)))
            .collect();
        let by_id: HashMap<u64, &Arc<BioAssayDimension>> =
            dimensions.iter().map(|d| (d.id, d)).collect();

        let mut builder = ColumnIndexBuilder::new();
        for s in samples {
            let assays: Vec<BioAssay> = dimensions
                .iter()
                .flat_map(|d| d.assays.iter().filter(|a| &a.sample == s))
                .cloned()
                .collect();
            builder.add_sample_group(s, &assays)?;
        }

        let row_dimensions = self
            .row_dimensions
            .iter()
            .map(|d| {
                by_id.get(&d.id).map(|&nd| Arc::clone(nd)).ok_or_else(|| {
                    ExprMatError::IllegalState(format!("dimension {} vanished while slicing", d.id))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AssayLayout {
            experiment_id: self.experiment_id,
            rows: self.rows.clone(),
            row_quantitation_types: self.row_quantitation_types.clone(),
            row_dimensions,
            quantitation_types: self.quantitation_types.clone(),
            dimensions,
            columns: builder.build(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{double_qt, double_vector, sample, shared_dimension};
    use exprmat_model::CompatibleMerger;

    fn two_platforms() -> Vec<BulkExpressionDataVector> {
        // samples 1..=5 on platform 1, 3..=7 on platform 2
        let d1 = shared_dimension(1, &[(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)]);
        let d2 = shared_dimension(2, &[(13, 3), (14, 4), (15, 5), (16, 6), (17, 7)]);
        let qt = double_qt(1, "VALUE");
        vec![
            double_vector(1, &qt, &d1, &[1.0; 5]),
            double_vector(2, &qt, &d1, &[2.0; 5]),
            double_vector(3, &qt, &d2, &[3.0; 5]),
        ]
    }

    #[test]
    fn test_select_all_sorts_rows() {
        let qt = double_qt(1, "VALUE");
        let d = shared_dimension(1, &[(1, 1)]);
        let vectors = vec![
            double_vector(3, &qt, &d, &[1.0]),
            double_vector(1, &qt, &d, &[1.0]),
            double_vector(2, &qt, &d, &[1.0]),
        ];
        let sel = AssayLayout::select_all(&vectors).unwrap();
        let ids: Vec<_> = sel.vectors.iter().map(|v| v.design_element.id.unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(sel.layout.rows(), 3);
    }

    #[test]
    fn test_column_merge_across_platforms() {
        let vectors = two_platforms();
        let layout = AssayLayout::select_all(&vectors).unwrap().layout;
        assert_eq!(layout.columns(), 7);
        assert_eq!(layout.dimensions().len(), 2);
        let c = layout.column_index();
        for s in 3..=5 {
            let col = c.index_of_sample(&sample(s)).unwrap();
            assert_eq!(c.assays(col).unwrap().len(), 2);
        }
    }

    #[test]
    fn test_no_covering_dimension() {
        let vectors = two_platforms();
        let layout = AssayLayout::select_all(&vectors).unwrap().layout;
        assert!(layout.best_bio_assay_dimension().is_none());
        let err = layout.bio_assay_dimension().unwrap_err();
        assert!(matches!(err, ExprMatError::IllegalState(_)));
    }

    #[test]
    fn test_covering_dimension_is_largest_superset() {
        let big = shared_dimension(1, &[(1, 1), (2, 2), (3, 3)]);
        let small = shared_dimension(2, &[(12, 2), (13, 3)]);
        let qt = double_qt(1, "VALUE");
        let vectors = vec![
            double_vector(1, &qt, &small, &[1.0, 2.0]),
            double_vector(2, &qt, &big, &[1.0, 2.0, 3.0]),
        ];
        let layout = AssayLayout::select_all(&vectors).unwrap().layout;
        assert_eq!(layout.bio_assay_dimension().unwrap().id, 1);
        assert_eq!(layout.columns(), 3);
        assert_eq!(layout.columns_for_element(&crate::testing::element(1)), Some(2));
    }

    #[test]
    fn test_duplicate_element_is_illegal_state() {
        let d = shared_dimension(1, &[(1, 1)]);
        let a = double_qt(1, "A");
        let b = double_qt(2, "B");
        let vectors = vec![double_vector(1, &a, &d, &[1.0]), double_vector(1, &b, &d, &[2.0])];
        let err = AssayLayout::select_all(&vectors).unwrap_err();
        assert!(matches!(err, ExprMatError::IllegalState(_)));
    }

    #[test]
    fn test_empty_selection() {
        let err = AssayLayout::select_all(&[]).unwrap_err();
        assert!(matches!(err, ExprMatError::InvalidInput(_)));
        let vectors = two_platforms();
        let missing = double_qt(9, "NOPE");
        assert!(AssayLayout::select_quantitation_type(&vectors, &missing).is_err());
    }

    #[test]
    fn test_mixed_experiments_rejected() {
        let d = shared_dimension(1, &[(1, 1)]);
        let qt = double_qt(1, "VALUE");
        let vectors = vec![
            double_vector(1, &qt, &d, &[1.0]).with_experiment(1),
            double_vector(2, &qt, &d, &[1.0]).with_experiment(2),
        ];
        assert!(matches!(
            AssayLayout::select_all(&vectors),
            Err(ExprMatError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_same_rows_for_each_quantitation_type() {
        let d = shared_dimension(1, &[(1, 1), (2, 2)]);
        let a = double_qt(1, "A");
        let b = double_qt(2, "B");
        let vectors = vec![
            double_vector(2, &a, &d, &[1.0, 1.0]),
            double_vector(1, &b, &d, &[1.0, 1.0]),
            double_vector(1, &a, &d, &[1.0, 1.0]),
            double_vector(2, &b, &d, &[1.0, 1.0]),
        ];
        let la = AssayLayout::select_quantitation_type(&vectors, &a).unwrap().layout;
        let lb = AssayLayout::select_quantitation_type(&vectors, &b).unwrap().layout;
        assert_eq!(la.row_index(), lb.row_index());
    }

    #[test]
    fn test_quantitation_type_merge() {
        let d1 = shared_dimension(1, &[(1, 1)]);
        let d2 = shared_dimension(2, &[(2, 2)]);
        let a = double_qt(1, "A");
        let b = double_qt(2, "B");
        let vectors = vec![double_vector(1, &a, &d1, &[1.0]), double_vector(2, &b, &d2, &[1.0])];
        let sel = AssayLayout::select_quantitation_types(&vectors, &[b.clone(), a.clone()]).unwrap();
        // grouped by quantitation type in the order requested
        assert_eq!(sel.vectors[0].quantitation_type, b);
        let layout = sel.layout;
        assert!(layout.quantitation_type().is_err());
        let merged = layout.merged_quantitation_type(&CompatibleMerger).unwrap();
        assert_eq!(merged.name, "B + A");
    }

    #[test]
    fn test_assay_for_column() {
        let d = shared_dimension(1, &[(1, 1), (2, 1), (3, 2)]);
        let qt = double_qt(1, "VALUE");
        let vectors = vec![double_vector(1, &qt, &d, &[1.0, 2.0, 3.0])];
        let layout = AssayLayout::select_all(&vectors).unwrap().layout;
        assert!(matches!(layout.assay_for_column(0), Err(ExprMatError::IllegalState(_))));
        assert_eq!(layout.assay_for_column(1).unwrap().id, 3);
        assert!(matches!(
            layout.assay_for_column(2),
            Err(ExprMatError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_slice_columns_reorders() {
        let vectors = two_platforms();
        let layout = AssayLayout::select_all(&vectors).unwrap().layout;
        let sliced = layout.slice_columns(&[sample(7), sample(1), sample(4)]).unwrap();
        assert_eq!(sliced.columns(), 3);
        assert_eq!(sliced.column_index().sample(0).unwrap().id, 7);
        assert_eq!(sliced.column_index().assays(2).unwrap().len(), 2);
        assert_eq!(sliced.row_dimension(0).unwrap().len(), 2);
        assert!(layout.slice_columns(&[sample(99)]).is_err());
    }

    #[test]
    fn test_slice_rows() {
        let vectors = two_platforms();
        let layout = AssayLayout::select_all(&vectors).unwrap().layout;
        let (sliced, source) = layout
            .slice_rows(&[crate::testing::element(3), crate::testing::element(1)])
            .unwrap();
        assert_eq!(source, vec![2, 0]);
        assert_eq!(sliced.rows(), 2);
        assert_eq!(sliced.columns(), 7);
        assert!(layout.slice_rows(&[crate::testing::element(42)]).is_err());
    }
}
