//! Design elements (matrix row keys) and the platforms they belong to.

use core::cmp::Ordering;
use core::fmt;

use exprmat_core::Named;

/// Measurement technology of a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TechnologyType {
    OneColor,
    TwoColor,
    DualMode,
    Sequencing,
    Other,
}

impl TechnologyType {
    /// Whether the platform can produce two-channel (ratio) data.
    pub fn is_two_color(&self) -> bool {
        matches!(self, TechnologyType::TwoColor | TechnologyType::DualMode)
    }
}

/// A measurement platform (array design or sequencing annotation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Platform {
    pub id: u64,
    pub short_name: String,
    pub technology: TechnologyType,
}

impl Platform {
    pub fn new(id: u64, short_name: impl Into<String>, technology: TechnologyType) -> Self {
        Self {
            id,
            short_name: short_name.into(),
            technology,
        }
    }
}

/// A probe or feature on a platform; the row key of every matrix.
///
/// Ordering is by name, then id, with missing names and ids sorting last.
/// Matrices sort their rows with this ordering so that row numbers do not
/// depend on the order vectors arrive in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DesignElement {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub platform: Option<Platform>,
}

impl DesignElement {
    /// A design element with both a name and an id and no platform.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: Some(name.into()),
            platform: None,
        }
    }

    /// Attach the platform this element belongs to.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }
}

fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Ord for DesignElement {
    fn cmp(&self, other: &Self) -> Ordering {
        nulls_last(&self.name, &other.name)
            .then_with(|| nulls_last(&self.id, &other.id))
            .then_with(|| nulls_last(&self.platform, &other.platform))
    }
}

impl PartialOrd for DesignElement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Named for DesignElement {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for DesignElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, self.id) {
            (Some(name), Some(id)) => write!(f, "{name} (id={id})"),
            (Some(name), None) => write!(f, "{name}"),
            (None, Some(id)) => write!(f, "id={id}"),
            (None, None) => write!(f, "<unnamed design element>"),
        }
    }
}
