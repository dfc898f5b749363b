//! Tab-delimited export of an experimental design.
//!
//! ```text
//! #$treatment : Category=treatment Type=categorical
//! #$dose : Category=unspecified Type=continuous
//! Bioassay	ExternalID	treatment	dose
//! s1	GSM1	control	0.5
//! ```
//!
//! One `#$` line per factor, a header naming the factor columns in the order
//! given, then one line per sample. A sample without a value for a factor
//! gets an empty cell.
//!
//! A factor line has exactly one `:` and, after it, exactly two
//! whitespace-free `key=value` tokens. Factor names lose their colons and
//! category labels their whitespace, colons and `=` signs; a factor without a
//! category is written with [`MISSING_CATEGORY`].

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use exprmat_core::{ExprMatError, Named, Result};
use exprmat_model::{BioMaterial, ExperimentalDesign, ExperimentalFactor, FactorId};

/// Prefix of factor description lines.
pub const FACTOR_LINE_PREFIX: &str = "#$";

/// Category written for factors that have none.
pub const MISSING_CATEGORY: &str = "unspecified";

/// Fields are unquoted, so embedded tabs and line breaks become spaces.
fn clean(field: &str) -> String {
    field.replace(['\t', '\n', '\r'], " ")
}

/// The name of an entity as a field. Unnamed entities give an empty field.
fn name_field<N: Named>(entity: &N) -> String {
    clean(entity.name().unwrap_or_default())
}

/// Factor names sit left of the factor line's only colon, and the header
/// must repeat them verbatim.
fn factor_name(factor: &ExperimentalFactor) -> String {
    name_field(factor).replace(':', "_")
}

fn category_token(factor: &ExperimentalFactor) -> String {
    let words: Vec<&str> = factor
        .category_label()
        .unwrap_or_default()
        .split_whitespace()
        .collect();
    if words.is_empty() {
        return MISSING_CATEGORY.to_string();
    }
    words.join("_").replace([':', '='], "_")
}

fn factor_line(factor: &ExperimentalFactor) -> String {
    format!(
        "{FACTOR_LINE_PREFIX}{} : Category={} Type={}",
        factor_name(factor),
        category_token(factor),
        factor.factor_type
    )
}

/// Write the design of `samples` over `factors`, in the order given.
pub fn write_design_matrix<W: Write>(
    writer: W,
    design: &ExperimentalDesign,
    samples: &[BioMaterial],
    factors: &[FactorId],
) -> Result<()> {
    let factors: Vec<&ExperimentalFactor> = factors
        .iter()
        .map(|&id| {
            design
                .factor(id)
                .ok_or_else(|| ExprMatError::InvalidInput(format!("{id} is not part of the design")))
        })
        .collect::<Result<_>>()?;

    let mut out = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .has_headers(false)
        .from_writer(writer);

    for factor in &factors {
        out.write_record([factor_line(factor)])?;
    }

    let mut header = vec!["Bioassay".to_string(), "ExternalID".to_string()];
    header.extend(factors.iter().map(|f| factor_name(f)));
    out.write_record(&header)?;

    for sample in samples {
        let mut record = Vec::with_capacity(header.len());
        record.push(name_field(sample));
        record.push(clean(sample.external_accession.as_deref().unwrap_or_default()));
        for factor in &factors {
            let cell = design
                .value_for_sample(sample, factor.id)
                .map(|fv| clean(&fv.display_value()))
                .unwrap_or_default();
            record.push(cell);
        }
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

/// Write the design to a file at `path`.
pub fn write_design_matrix_file(
    path: impl AsRef<Path>,
    design: &ExperimentalDesign,
    samples: &[BioMaterial],
    factors: &[FactorId],
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| {
        ExprMatError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;
    log::debug!("writing design of {} samples to {}", samples.len(), path.display());
    write_design_matrix(file, design, samples, factors)
}
