//! Ordering samples (matrix columns) by experimental design.
//!
//! Samples are grouped by the simplest factor first and each group is then
//! ordered recursively by the remaining factors. A continuous factor orders
//! its whole partition by measured value and ends the recursion. Batch
//! factors are applied last.
//!
//! When a partition cannot be rebuilt consistently (for instance a sample
//! carrying two values of one factor) that partition keeps its input order,
//! an error is logged and the overall result comes back as
//! [`DegradedOrdering`].

use std::cmp::Ordering;
use std::collections::HashSet;

use exprmat_core::Result;
use exprmat_model::{BioMaterial, ExperimentalDesign, ExperimentalFactor, FactorId, FactorValueId};

use crate::baseline::{baseline_for, is_baseline_condition};
use crate::dense::BulkMatrix;
use crate::traits::BulkExpressionDataMatrix;
use crate::value::CellValue;

/// Per-call sort settings.
#[derive(Debug, Clone, Default)]
pub struct SortOptions {
    /// Factors to sort by. `None` derives them from the samples.
    pub factors: Option<Vec<FactorId>>,
    /// A factor applied before every other.
    pub primary_factor: Option<FactorId>,
    /// Factor values to treat as the baseline of their factor.
    pub forced_baselines: Vec<FactorValueId>,
}

impl SortOptions {
    pub fn with_factors(mut self, factors: impl IntoIterator<Item = FactorId>) -> Self {
        self.factors = Some(factors.into_iter().collect());
        self
    }

    pub fn with_primary_factor(mut self, factor: FactorId) -> Self {
        self.primary_factor = Some(factor);
        self
    }

    pub fn with_forced_baseline(mut self, value: FactorValueId) -> Self {
        self.forced_baselines.push(value);
        self
    }
}

/// An ordering in which some partitions could not be sorted and were left
/// in their input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradedOrdering {
    /// The full permutation, with unsorted partitions as given.
    pub samples: Vec<BioMaterial>,
    /// Factors whose partitions failed, one entry per failure.
    pub failed_factors: Vec<FactorId>,
}

impl DegradedOrdering {
    /// The permutation, degraded or not.
    pub fn into_samples(self) -> Vec<BioMaterial> {
        self.samples
    }
}

/// Order samples by name, then id.
pub fn order_by_name(samples: &mut [BioMaterial]) {
    samples.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
}

struct Sorter<'d> {
    design: &'d ExperimentalDesign,
    forced: &'d [FactorValueId],
    failed: Vec<FactorId>,
}

/// Distinct values of `factor` used by `samples`, optionally ignoring
/// excluded values.
fn used_value_count(
    design: &ExperimentalDesign,
    factor: FactorId,
    samples: &[BioMaterial],
    skip_excluded: bool,
) -> usize {
    samples
        .iter()
        .flat_map(|s| design.values_for_sample(s))
        .filter(|fv| fv.factor == factor && !(skip_excluded && fv.is_excluded()))
        .map(|fv| fv.id)
        .collect::<HashSet<_>>()
        .len()
}

/// Factors with at least two distinct non-excluded values among `samples`,
/// in order of first use.
fn derive_factors<'d>(design: &'d ExperimentalDesign, samples: &[BioMaterial]) -> Vec<&'d ExperimentalFactor> {
    let mut seen = HashSet::new();
    let mut factors = Vec::new();
    for fv in samples.iter().flat_map(|s| design.values_for_sample(s)) {
        if fv.is_excluded() || !seen.insert(fv.factor) {
            continue;
        }
        if let Some(f) = design.factor(fv.factor) {
            if used_value_count(design, f.id, samples, true) >= 2 {
                factors.push(f);
            }
        }
    }
    factors
}

/// Sort factors from simplest to most complex: the primary factor, then
/// factors that actually split the samples, continuous before categorical,
/// batch last, then by number of used values and id.
fn order_factors<'d>(
    design: &ExperimentalDesign,
    mut factors: Vec<&'d ExperimentalFactor>,
    samples: &[BioMaterial],
    primary: Option<FactorId>,
) -> Vec<&'d ExperimentalFactor> {
    factors.sort_by_cached_key(|f| {
        let used = used_value_count(design, f.id, samples, false);
        (
            primary != Some(f.id),
            used < 2,
            !f.is_continuous(),
            f.is_batch(),
            used,
            f.id,
        )
    });
    factors
}

fn compare_measurements(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl<'d> Sorter<'d> {
    fn order(&mut self, samples: Vec<BioMaterial>, factors: &[&ExperimentalFactor]) -> Vec<BioMaterial> {
        let Some((&factor, rest)) = factors.split_first() else {
            return samples;
        };
        if samples.len() <= 1 {
            return samples;
        }
        if factor.is_continuous() {
            return self.order_continuous(samples, factor);
        }
        let Some(chunks) = self.chunk_categorical(&samples, factor) else {
            return samples;
        };
        let mut result = Vec::with_capacity(samples.len());
        for chunk in chunks {
            result.extend(self.order(chunk, rest));
        }
        result
    }

    fn order_continuous(&self, mut samples: Vec<BioMaterial>, factor: &ExperimentalFactor) -> Vec<BioMaterial> {
        let measured = |s: &BioMaterial| {
            self.design
                .value_for_sample(s, factor.id)
                .and_then(|fv| fv.measurement.as_ref())
                .and_then(|m| m.as_f64())
        };
        samples.sort_by(|a, b| compare_measurements(measured(a), measured(b)).then(a.id.cmp(&b.id)));
        samples
    }

    /// Split `samples` into one chunk per value of `factor`, baseline first,
    /// each ordered by sample id, followed by the samples without a value.
    fn chunk_categorical(
        &mut self,
        samples: &[BioMaterial],
        factor: &ExperimentalFactor,
    ) -> Option<Vec<Vec<BioMaterial>>> {
        let baseline = baseline_for(self.design, factor, samples, self.forced).map(|fv| fv.id);
        let mut values: Vec<_> = self.design.values_of(factor.id).collect();
        values.sort_by_key(|fv| {
            if Some(fv.id) == baseline {
                0
            } else if is_baseline_condition(fv) {
                1
            } else {
                2
            }
        });

        let mut chunks = Vec::new();
        let mut placed = 0;
        for fv in values {
            let mut chunk: Vec<BioMaterial> = samples
                .iter()
                .filter(|s| s.factor_values.contains(&fv.id))
                .cloned()
                .collect();
            if chunk.is_empty() {
                continue;
            }
            chunk.sort_by_key(|s| s.id);
            placed += chunk.len();
            chunks.push(chunk);
        }
        let mut leftovers: Vec<BioMaterial> = samples
            .iter()
            .filter(|s| self.design.value_for_sample(s, factor.id).is_none())
            .cloned()
            .collect();
        if !leftovers.is_empty() {
            leftovers.sort_by_key(|s| s.id);
            placed += leftovers.len();
            chunks.push(leftovers);
        }

        if placed != samples.len() {
            log::error!(
                "could not order by factor {}: {} samples became {} after partitioning; check the design for completeness",
                factor.name,
                samples.len(),
                placed
            );
            self.failed.push(factor.id);
            return None;
        }
        log::debug!("{} chunks for {} from {} samples", chunks.len(), factor.name, samples.len());
        Some(chunks)
    }
}

/// Order samples by their experimental design.
///
/// Returns the permutation, or a [`DegradedOrdering`] carrying it when some
/// partition had to be left unsorted. With no usable factor the samples are
/// ordered by name.
pub fn order_by_experimental_design(
    samples: &[BioMaterial],
    design: &ExperimentalDesign,
    options: &SortOptions,
) -> std::result::Result<Vec<BioMaterial>, DegradedOrdering> {
    if samples.len() <= 1 {
        return Ok(samples.to_vec());
    }
    let mut factors: Vec<&ExperimentalFactor> = match &options.factors {
        Some(ids) => ids.iter().filter_map(|&id| design.factor(id)).collect(),
        None => derive_factors(design, samples),
    };
    if let Some(primary) = options.primary_factor.and_then(|id| design.factor(id)) {
        if !factors.iter().any(|f| f.id == primary.id) {
            factors.push(primary);
        }
    }
    if factors.is_empty() {
        log::warn!("no experimental design, sorting by sample name");
        let mut ordered = samples.to_vec();
        order_by_name(&mut ordered);
        return Ok(ordered);
    }
    let factors = order_factors(design, factors, samples, options.primary_factor);

    let mut sorter = Sorter {
        design,
        forced: &options.forced_baselines,
        failed: Vec::new(),
    };
    let ordered = sorter.order(samples.to_vec(), &factors);
    if sorter.failed.is_empty() {
        Ok(ordered)
    } else {
        Err(DegradedOrdering {
            samples: ordered,
            failed_factors: sorter.failed,
        })
    }
}

/// Reorder the columns of a dense matrix by experimental design. A degraded
/// ordering is still applied.
pub fn order_matrix_columns<T: CellValue>(
    matrix: &BulkMatrix<T>,
    design: &ExperimentalDesign,
    options: &SortOptions,
) -> Result<BulkMatrix<T>> {
    let samples = matrix.layout().column_index().samples().to_vec();
    let ordered = order_by_experimental_design(&samples, design, options)
        .unwrap_or_else(DegradedOrdering::into_samples);
    matrix.slice_columns(&ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::DoubleMatrix;
    use crate::testing::{double_qt, double_vector};
    use crate::traits::ExpressionDataMatrix;
    use exprmat_model::{BioAssay, BioAssayDimension, Characteristic, FactorType, FactorValue};
    use std::sync::Arc;

    const TREATMENT: FactorId = FactorId(1);
    const GENOTYPE: FactorId = FactorId(2);
    const BATCH: FactorId = FactorId(3);
    const DOSE: FactorId = FactorId(4);

    fn design() -> ExperimentalDesign {
        ExperimentalDesign::new(
            vec![
                ExperimentalFactor::new(1, "treatment", FactorType::Categorical),
                ExperimentalFactor::new(2, "genotype", FactorType::Categorical),
                ExperimentalFactor::new(3, "batch", FactorType::Categorical),
                ExperimentalFactor::new(4, "dose", FactorType::Continuous),
            ],
            vec![
                FactorValue::categorical(10, TREATMENT, "drug"),
                FactorValue::categorical(11, TREATMENT, "control"),
                FactorValue::categorical(20, GENOTYPE, "ko"),
                FactorValue::categorical(21, GENOTYPE, "wild type"),
                FactorValue::categorical(22, GENOTYPE, "het"),
                FactorValue::categorical(23, GENOTYPE, "excluded")
                    .with_characteristic(Characteristic::value("DE_Exclude")),
                FactorValue::categorical(30, BATCH, "b1"),
                FactorValue::categorical(31, BATCH, "b2"),
                FactorValue::measured(40, DOSE, "10"),
                FactorValue::measured(41, DOSE, "1"),
                FactorValue::measured(42, DOSE, "5"),
                FactorValue::measured(43, DOSE, "unknown"),
            ],
        )
        .unwrap()
    }

    fn sample(id: u64, values: &[u64]) -> BioMaterial {
        BioMaterial::new(id, format!("s{id:02}")).with_factor_values(values.iter().map(|&v| FactorValueId(v)))
    }

    fn ids(samples: &[BioMaterial]) -> Vec<u64> {
        samples.iter().map(|s| s.id).collect()
    }

    #[test]
    fn test_single_and_empty() {
        let d = design();
        assert!(order_by_experimental_design(&[], &d, &SortOptions::default()).unwrap().is_empty());
        let one = vec![sample(1, &[10])];
        assert_eq!(order_by_experimental_design(&one, &d, &SortOptions::default()).unwrap(), one);
    }

    #[test]
    fn test_no_factors_sorts_by_name() {
        let d = design();
        let s = vec![
            BioMaterial::new(1, "zeta"),
            BioMaterial::new(2, "alpha"),
            BioMaterial::new(3, "mid"),
        ];
        let ordered = order_by_experimental_design(&s, &d, &SortOptions::default()).unwrap();
        assert_eq!(ids(&ordered), vec![2, 3, 1]);
    }

    #[test]
    fn test_constant_factor_is_ignored() {
        let d = design();
        let s = vec![sample(3, &[10]), sample(1, &[10]), sample(2, &[10])];
        let ordered = order_by_experimental_design(&s, &d, &SortOptions::default()).unwrap();
        assert_eq!(ids(&ordered), vec![1, 2, 3]);
        assert_eq!(ordered[0].name, "s01");
    }

    #[test]
    fn test_two_level_factor_makes_two_blocks() {
        let d = design();
        let s = vec![
            sample(6, &[10]),
            sample(1, &[11]),
            sample(4, &[10]),
            sample(3, &[11]),
            sample(2, &[10]),
            sample(5, &[11]),
        ];
        let ordered = order_by_experimental_design(&s, &d, &SortOptions::default()).unwrap();
        // control is the baseline and comes first
        assert_eq!(ids(&ordered), vec![1, 3, 5, 2, 4, 6]);
    }

    #[test]
    fn test_nested_factors_simplest_first() {
        let d = design();
        let s = vec![
            sample(1, &[10, 20]),
            sample(2, &[11, 22]),
            sample(3, &[10, 21]),
            sample(4, &[11, 20]),
            sample(5, &[10, 22]),
            sample(6, &[11, 21]),
        ];
        let ordered = order_by_experimental_design(&s, &d, &SortOptions::default()).unwrap();
        // treatment (2 levels) splits first; genotype orders within, wild type first
        assert_eq!(ids(&ordered), vec![6, 4, 2, 3, 1, 5]);
    }

    #[test]
    fn test_batch_factor_applied_last() {
        let d = design();
        let s = vec![
            sample(1, &[30, 10]),
            sample(2, &[31, 11]),
            sample(3, &[30, 11]),
            sample(4, &[31, 10]),
        ];
        let ordered = order_by_experimental_design(&s, &d, &SortOptions::default()).unwrap();
        assert_eq!(ids(&ordered), vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_primary_factor_goes_first() {
        let d = design();
        let s = vec![
            sample(1, &[30, 10]),
            sample(2, &[31, 11]),
            sample(3, &[30, 11]),
            sample(4, &[31, 10]),
        ];
        let options = SortOptions::default().with_primary_factor(BATCH);
        let ordered = order_by_experimental_design(&s, &d, &options).unwrap();
        assert_eq!(ids(&ordered), vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_forced_baseline() {
        let d = design();
        let s = vec![sample(1, &[11]), sample(2, &[10])];
        let options = SortOptions::default().with_forced_baseline(FactorValueId(10));
        let ordered = order_by_experimental_design(&s, &d, &options).unwrap();
        assert_eq!(ids(&ordered), vec![2, 1]);
    }

    #[test]
    fn test_continuous_factor_orders_everything() {
        let d = design();
        let s = vec![
            sample(1, &[40, 10]),
            sample(2, &[43, 11]),
            sample(3, &[41, 11]),
            sample(4, &[42, 10]),
        ];
        let ordered = order_by_experimental_design(&s, &d, &SortOptions::default()).unwrap();
        // 1, 5, 10, then the unparseable value; treatment is not applied
        assert_eq!(ids(&ordered), vec![3, 4, 1, 2]);
    }

    #[test]
    fn test_excluded_values_do_not_create_factors() {
        let d = design();
        let s = vec![sample(2, &[20]), sample(1, &[23])];
        let ordered = order_by_experimental_design(&s, &d, &SortOptions::default()).unwrap();
        assert_eq!(ids(&ordered), vec![1, 2]);
    }

    #[test]
    fn test_samples_without_value_go_last() {
        let d = design();
        let s = vec![sample(1, &[]), sample(2, &[10]), sample(3, &[11])];
        let options = SortOptions::default().with_factors([TREATMENT]);
        let ordered = order_by_experimental_design(&s, &d, &options).unwrap();
        assert_eq!(ids(&ordered), vec![3, 2, 1]);
    }

    #[test]
    fn test_inconsistent_partition_degrades() {
        let _ = env_logger::builder().is_test(true).try_init();
        let d = design();
        // sample 2 carries both treatment values
        let s = vec![sample(3, &[10]), sample(2, &[10, 11]), sample(1, &[11])];
        let err = order_by_experimental_design(&s, &d, &SortOptions::default()).unwrap_err();
        assert_eq!(err.failed_factors, vec![TREATMENT]);
        assert_eq!(ids(&err.samples), vec![3, 2, 1]);
    }

    #[test]
    fn test_order_matrix_columns() {
        let d = design();
        let dim = Arc::new(BioAssayDimension::new(
            1,
            vec![
                BioAssay::new(1, "a1", sample(1, &[10])),
                BioAssay::new(2, "a2", sample(2, &[11])),
            ],
        ));
        let m = DoubleMatrix::from_vectors(&[double_vector(1, &double_qt(1, "VALUE"), &dim, &[1.0, 2.0])])
            .unwrap();
        let sorted = order_matrix_columns(&m, &d, &SortOptions::default()).unwrap();
        assert_eq!(sorted.row(0).unwrap(), vec![2.0, 1.0]);
        assert_eq!(sorted.sample_for_column(0).map(|s| s.id), Some(2));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn categorical_sort_is_a_grouped_permutation(levels in proptest::collection::vec(0u64..2, 2..12)) {
                let d = design();
                let s: Vec<BioMaterial> = levels
                    .iter()
                    .enumerate()
                    .map(|(i, &l)| sample(i as u64 + 1, &[10 + l]))
                    .collect();
                let ordered = order_by_experimental_design(&s, &d, &SortOptions::default()).unwrap();
                let mut got = ids(&ordered);
                got.sort_unstable();
                prop_assert_eq!(got, ids(&s));
                let blocks = ordered
                    .windows(2)
                    .filter(|w| w[0].factor_values != w[1].factor_values)
                    .count();
                prop_assert!(blocks <= 1);
                for w in ordered.windows(2) {
                    if w[0].factor_values == w[1].factor_values {
                        prop_assert!(w[0].id < w[1].id);
                    }
                }
            }

            #[test]
            fn continuous_sort_is_non_decreasing(doses in proptest::collection::vec(0usize..3, 2..10)) {
                let d = design();
                let fv = [40u64, 41, 42];
                let s: Vec<BioMaterial> = doses
                    .iter()
                    .enumerate()
                    .map(|(i, &k)| sample(i as u64 + 1, &[fv[k], 10 + (i as u64 % 2)]))
                    .collect();
                let ordered = order_by_experimental_design(&s, &d, &SortOptions::default()).unwrap();
                let value = |b: &BioMaterial| {
                    d.value_for_sample(b, DOSE).and_then(|fv| fv.measurement.as_ref()?.as_f64())
                };
                for w in ordered.windows(2) {
                    prop_assert!(value(&w[0]) <= value(&w[1]));
                }
            }
        }
    }
}
