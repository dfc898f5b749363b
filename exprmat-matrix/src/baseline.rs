//! Baseline (reference level) selection for experimental factors.

use std::collections::{HashMap, HashSet};

use exprmat_model::{
    BioMaterial, ExperimentalDesign, ExperimentalFactor, FactorId, FactorValue, FactorValueId,
};

/// Value texts and ontology URIs recognised as control conditions, lowercase.
pub const CONTROL_GROUP_TERMS: &[&str] = &[
    "control group",
    "control",
    "untreated",
    "baseline",
    "control_group",
    "wild_type",
    "wild type",
    "reference",
    "http://purl.obolibrary.org/obo/obi_0100046",
    "http://mged.sourceforge.net/ontologies/mgedontology.owl#wild_type",
    "http://purl.org/nbirn/birnlex/ontology/birnlex-investigation.owl#birnlex_2201",
    "http://ontology.neuinfo.org/nif/digitalentities/nif-investigation.owl#birnlex_2201",
    "http://www.ebi.ac.uk/efo/efo_0001461",
    "http://www.ebi.ac.uk/efo/efo_0005168",
];

fn is_control_term(text: Option<&str>) -> bool {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => CONTROL_GROUP_TERMS.contains(&t.to_lowercase().as_str()),
        _ => false,
    }
}

/// Whether a factor value denotes a control condition.
///
/// An explicit baseline flag decides outright. Otherwise measurements are
/// never baselines, and categorical values are matched against
/// [`CONTROL_GROUP_TERMS`] through their characteristics' value URIs and
/// values, or through the plain value text when there are no characteristics.
pub fn is_baseline_condition(value: &FactorValue) -> bool {
    if let Some(flag) = value.is_baseline {
        return flag;
    }
    if value.is_measurement() {
        return false;
    }
    if value.characteristics.is_empty() {
        return is_control_term(value.value.as_deref());
    }
    value.characteristics.iter().any(|c| {
        is_control_term(c.value_uri.as_deref()) || is_control_term(c.value.as_deref())
    })
}

fn used_values(samples: &[BioMaterial]) -> HashSet<FactorValueId> {
    samples
        .iter()
        .flat_map(|s| s.factor_values.iter().copied())
        .collect()
}

/// The baseline level of `factor` for `samples`.
///
/// A value listed in `forced` wins. Otherwise the first value (in
/// declaration order) that is a baseline condition and is used by the
/// samples; failing that, the first used value, chosen arbitrarily. Returns
/// `None` when no sample has a value for the factor.
pub fn baseline_for<'d>(
    design: &'d ExperimentalDesign,
    factor: &ExperimentalFactor,
    samples: &[BioMaterial],
    forced: &[FactorValueId],
) -> Option<&'d FactorValue> {
    if let Some(fv) = design.values_of(factor.id).find(|fv| forced.contains(&fv.id)) {
        log::debug!("forced baseline for {}: {}", factor.name, fv.display_value());
        return Some(fv);
    }
    let used = used_values(samples);
    let mut candidates = design
        .values_of(factor.id)
        .filter(|fv| used.contains(&fv.id))
        .peekable();
    let first = *candidates.peek()?;
    if let Some(fv) = candidates.find(|fv| is_baseline_condition(fv)) {
        return Some(fv);
    }
    if !factor.is_batch() {
        log::warn!(
            "no baseline condition for {}; using {} arbitrarily",
            factor.name,
            first.display_value()
        );
    }
    Some(first)
}

/// For each factor, the first factor value that is a baseline condition.
///
/// A second candidate for the same factor is logged and ignored. For
/// continuous factors the smallest parseable measurement is taken instead.
/// When `samples` is given, only values used by those samples count.
pub fn baseline_levels<'d>(
    design: &'d ExperimentalDesign,
    factors: &[FactorId],
    samples: Option<&[BioMaterial]>,
) -> HashMap<FactorId, &'d FactorValue> {
    let used = samples.map(used_values);
    let is_used = |fv: &FactorValue| used.as_ref().map_or(true, |u| u.contains(&fv.id));
    let mut result = HashMap::new();
    for &id in factors {
        let Some(factor) = design.factor(id) else {
            log::warn!("{id} is not part of the design");
            continue;
        };
        if factor.is_continuous() {
            let lowest = design
                .values_of(id)
                .filter(|fv| is_used(fv))
                .filter_map(|fv| fv.measurement.as_ref()?.as_f64().map(|v| (v, fv)))
                .min_by(|a, b| a.0.total_cmp(&b.0));
            match lowest {
                Some((_, fv)) => {
                    result.insert(id, fv);
                }
                None => log::warn!("no values for continuous factor {}", factor.name),
            }
            continue;
        }
        for fv in design.values_of(id).filter(|fv| is_used(fv)) {
            if !is_baseline_condition(fv) {
                continue;
            }
            if result.contains_key(&id) {
                log::warn!(
                    "a second potential baseline was found for {}: {}",
                    factor.name,
                    fv.display_value()
                );
                continue;
            }
            result.insert(id, fv);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use exprmat_model::{Characteristic, FactorType};

    fn design() -> ExperimentalDesign {
        ExperimentalDesign::new(
            vec![
                ExperimentalFactor::new(1, "treatment", FactorType::Categorical),
                ExperimentalFactor::new(2, "batch", FactorType::Categorical),
                ExperimentalFactor::new(3, "dose", FactorType::Continuous),
            ],
            vec![
                FactorValue::categorical(10, FactorId(1), "drug"),
                FactorValue::categorical(11, FactorId(1), "Control"),
                FactorValue::categorical(12, FactorId(1), "untreated"),
                FactorValue::categorical(20, FactorId(2), "b1"),
                FactorValue::categorical(21, FactorId(2), "b2"),
                FactorValue::measured(30, FactorId(3), "5.0"),
                FactorValue::measured(31, FactorId(3), "0.5"),
                FactorValue::measured(32, FactorId(3), "n/a"),
            ],
        )
        .unwrap()
    }

    fn samples(values: &[&[u64]]) -> Vec<BioMaterial> {
        values
            .iter()
            .enumerate()
            .map(|(i, fvs)| {
                BioMaterial::new(i as u64 + 1, format!("s{}", i + 1))
                    .with_factor_values(fvs.iter().map(|&v| FactorValueId(v)))
            })
            .collect()
    }

    #[test]
    fn test_control_terms() {
        let d = FactorId(1);
        assert!(is_baseline_condition(&FactorValue::categorical(1, d, "Wild Type")));
        assert!(!is_baseline_condition(&FactorValue::categorical(1, d, "mutant")));
        let by_uri = FactorValue::categorical(1, d, "PBS")
            .with_characteristic(Characteristic::value("PBS").with_value_uri(
                "http://purl.obolibrary.org/obo/OBI_0100046",
            ));
        assert!(is_baseline_condition(&by_uri));
    }

    #[test]
    fn test_explicit_flag_wins() {
        let d = FactorId(1);
        assert!(is_baseline_condition(&FactorValue::categorical(1, d, "mutant").with_baseline(true)));
        assert!(!is_baseline_condition(&FactorValue::categorical(1, d, "control").with_baseline(false)));
        assert!(!is_baseline_condition(&FactorValue::measured(1, d, "0")));
    }

    #[test]
    fn test_plain_value_without_characteristics() {
        let mut fv = FactorValue::categorical(1, FactorId(1), "control");
        fv.characteristics.clear();
        assert!(is_baseline_condition(&fv));
    }

    #[test]
    fn test_baseline_for_prefers_forced_then_condition() {
        let d = design();
        let treatment = d.factor(FactorId(1)).unwrap();
        let s = samples(&[&[10], &[11], &[12]]);
        assert_eq!(baseline_for(&d, treatment, &s, &[]).unwrap().id, FactorValueId(11));
        assert_eq!(
            baseline_for(&d, treatment, &s, &[FactorValueId(10)]).unwrap().id,
            FactorValueId(10)
        );
    }

    #[test]
    fn test_baseline_for_only_considers_used_values() {
        let d = design();
        let treatment = d.factor(FactorId(1)).unwrap();
        let s = samples(&[&[10], &[12]]);
        assert_eq!(baseline_for(&d, treatment, &s, &[]).unwrap().id, FactorValueId(12));
    }

    #[test]
    fn test_baseline_for_falls_back_to_first_used() {
        let _ = env_logger::builder().is_test(true).try_init();
        let d = design();
        let batch = d.factor(FactorId(2)).unwrap();
        let s = samples(&[&[21], &[20]]);
        assert_eq!(baseline_for(&d, batch, &s, &[]).unwrap().id, FactorValueId(20));
        assert!(baseline_for(&d, batch, &samples(&[&[10]]), &[]).is_none());
    }

    #[test]
    fn test_baseline_levels() {
        let d = design();
        let levels = baseline_levels(&d, &[FactorId(1), FactorId(2), FactorId(3), FactorId(9)], None);
        // "Control" is declared before "untreated", so it wins.
        assert_eq!(levels[&FactorId(1)].id, FactorValueId(11));
        assert!(!levels.contains_key(&FactorId(2)));
        assert_eq!(levels[&FactorId(3)].id, FactorValueId(31));
        assert!(!levels.contains_key(&FactorId(9)));
    }

    #[test]
    fn test_baseline_levels_restricted_to_samples() {
        let d = design();
        let s = samples(&[&[10, 30], &[12, 30]]);
        let levels = baseline_levels(&d, &[FactorId(1), FactorId(3)], Some(&s));
        assert_eq!(levels[&FactorId(1)].id, FactorValueId(12));
        assert_eq!(levels[&FactorId(3)].id, FactorValueId(30));
    }
}
