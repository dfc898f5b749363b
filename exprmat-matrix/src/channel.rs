//! Quantitation-type role classification for two-color microarray data.
//!
//! This is a name-matching heuristic over legacy platform naming conventions
//! (GenePix, Agilent, Stanford Microarray Database and similar exports). It
//! decides which quantitation types feed the channel matrices; it is not a
//! validation of what a quantitation type actually measures. Matching order
//! is significant: background patterns are tried before signal patterns,
//! channel A before channel B.

use std::sync::OnceLock;

use regex::RegexSet;

use exprmat_model::QuantitationType;

/// The role a quantitation type plays for one sample dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    Preferred,
    MaskedPreferred,
    BackgroundChannelA,
    BackgroundChannelB,
    SignalChannelA,
    SignalChannelB,
    /// Channel A with its background already subtracted (GenePix `CH1D_MEAN`).
    BackgroundSubtractedChannelA,
    PresentAbsent,
    /// Not used by matrix building.
    Other,
}

/// Name of the background-subtracted channel A type. Only used to rebuild
/// channel A when the raw signal was never submitted.
pub const BACKGROUND_SUBTRACTED_CHANNEL_A: &str = "CH1D_MEAN";

struct NamePatterns {
    exact: &'static [&'static str],
    full: RegexSet,
    lowercase: RegexSet,
    uppercase: RegexSet,
}

impl NamePatterns {
    fn new(
        exact: &'static [&'static str],
        full: &[&str],
        lowercase: &[&str],
        uppercase: &[&str],
    ) -> Self {
        Self {
            exact,
            full: anchored(full),
            lowercase: anchored(lowercase),
            uppercase: anchored(uppercase),
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.exact.contains(&name)
            || self.full.is_match(name)
            || self.lowercase.is_match(&name.to_lowercase())
            || self.uppercase.is_match(&name.to_uppercase())
    }
}

/// Compile patterns that must match the whole name.
fn anchored(patterns: &[&str]) -> RegexSet {
    let wrapped: Vec<String> = patterns.iter().map(|p| format!("^(?:{p})$")).collect();
    RegexSet::new(wrapped).unwrap_or_else(|e| {
        log::error!("invalid channel pattern: {e}");
        RegexSet::empty()
    })
}

fn signal_a() -> &'static NamePatterns {
    static P: OnceLock<NamePatterns> = OnceLock::new();
    P.get_or_init(|| {
        NamePatterns::new(
            &[
                "RAW_DATA",
                "SIGNAL_CHANNEL 1MEDIAN",
                "G_MEAN",
                "Ch1SigMedian",
                "ch1.Intensity",
                "CH1_SIG_MEAN",
                "CH1_ Median",
                "CH1Mean",
                "CH1_SIGNAL",
                "\"log2(532), gN\"",
                "gProcessedSignal",
            ],
            &[r"CH1(I)?_MEDIAN", r"CH1(I)?_MEAN"],
            &[r"f532[\s_\.](mean|median)", r"ch1_smtm"],
            &[r"\w{2}\d{3}_CY3", r"NORM(.*)CH1"],
        )
    })
}

fn signal_b() -> &'static NamePatterns {
    static P: OnceLock<NamePatterns> = OnceLock::new();
    P.get_or_init(|| {
        NamePatterns::new(
            &[
                "RAW_CONTROL",
                "SIGNAL_CHANNEL 2MEDIAN",
                "R_MEAN",
                "Ch2SigMedian",
                "ch2.Intensity",
                "CH2_SIG_MEAN",
                "CH2_ Median",
                "CH2Mean",
                "CH2_SIGNAL",
                "\"log2(635), gN\"",
                "rProcessedSignal",
            ],
            &[r"CH2(I)?_MEDIAN", r"CH2(I)?_MEAN"],
            &[r"f635[\s_\.](mean|median)", r"ch2_smtm"],
            &[r"\w{2}\d{3}_CY5", r"NORM(.*)CH2"],
        )
    })
}

fn background_a() -> &'static NamePatterns {
    static P: OnceLock<NamePatterns> = OnceLock::new();
    P.get_or_init(|| {
        NamePatterns::new(
            &["gBGMeanSignal", "gBGMedianSignal", "Ch1BkgMedian", "CH1_BKG_MEAN"],
            &[r"CH1(I)?_BKD_(MEDIAN|MEAN)", r"CH1B_(MEDIAN|MEAN)"],
            &[r"b532[\s_\.](mean|median)"],
            &[],
        )
    })
}

fn background_b() -> &'static NamePatterns {
    static P: OnceLock<NamePatterns> = OnceLock::new();
    P.get_or_init(|| {
        NamePatterns::new(
            &["rBGMeanSignal", "rBGMedianSignal", "Ch2BkgMedian", "CH2_BKG_MEAN"],
            &[r"CH2(I)?_BKD_(MEDIAN|MEAN)", r"CH2B_(MEDIAN|MEAN)"],
            &[r"b635[\s_\.](mean|median)"],
            &[],
        )
    })
}

pub fn is_signal_channel_a(name: &str) -> bool {
    signal_a().matches(name)
}

pub fn is_signal_channel_b(name: &str) -> bool {
    signal_b().matches(name)
}

pub fn is_background_channel_a(name: &str) -> bool {
    background_a().matches(name)
}

pub fn is_background_channel_b(name: &str) -> bool {
    background_b().matches(name)
}

/// The channel role implied by a quantitation type name alone.
pub fn channel_role_for_name(name: &str) -> Option<ChannelRole> {
    if is_background_channel_a(name) {
        Some(ChannelRole::BackgroundChannelA)
    } else if is_background_channel_b(name) {
        Some(ChannelRole::BackgroundChannelB)
    } else if is_signal_channel_a(name) {
        Some(ChannelRole::SignalChannelA)
    } else if is_signal_channel_b(name) {
        Some(ChannelRole::SignalChannelB)
    } else if name == BACKGROUND_SUBTRACTED_CHANNEL_A {
        Some(ChannelRole::BackgroundSubtractedChannelA)
    } else {
        None
    }
}

/// Classify a quantitation type: the preferred flags first, then the name,
/// then the present/absent standard type.
pub fn classify_channel(qt: &QuantitationType) -> ChannelRole {
    if qt.is_preferred {
        ChannelRole::Preferred
    } else if qt.is_masked_preferred {
        ChannelRole::MaskedPreferred
    } else if let Some(role) = channel_role_for_name(&qt.name) {
        role
    } else if qt.is_present_absent() {
        ChannelRole::PresentAbsent
    } else {
        ChannelRole::Other
    }
}
