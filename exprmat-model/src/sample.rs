//! Samples (biomaterials) and the assays that measure them.
//!
//! Both types are identified by their numeric id: two values with the same id
//! are the same entity, whatever their other fields say.

use core::fmt;
use core::hash::{Hash, Hasher};

use exprmat_core::Named;

use crate::design::FactorValueId;
use crate::element::Platform;

/// The biological material measured by one or more assays.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BioMaterial {
    pub id: u64,
    pub name: String,
    pub external_accession: Option<String>,
    /// Factor values assigned to this sample by the experimental design.
    pub factor_values: Vec<FactorValueId>,
}

impl BioMaterial {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            external_accession: None,
            factor_values: Vec::new(),
        }
    }

    /// Attach factor values.
    pub fn with_factor_values(mut self, values: impl IntoIterator<Item = FactorValueId>) -> Self {
        self.factor_values.extend(values);
        self
    }

    /// Attach an external accession.
    pub fn with_accession(mut self, accession: impl Into<String>) -> Self {
        self.external_accession = Some(accession.into());
        self
    }
}

impl PartialEq for BioMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BioMaterial {}

impl Hash for BioMaterial {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Named for BioMaterial {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

impl fmt::Display for BioMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id={})", self.name, self.id)
    }
}

/// One measurement run on one sample using one platform.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BioAssay {
    pub id: u64,
    pub name: String,
    pub sample: BioMaterial,
    pub platform: Option<Platform>,
}

impl BioAssay {
    pub fn new(id: u64, name: impl Into<String>, sample: BioMaterial) -> Self {
        Self {
            id,
            name: name.into(),
            sample,
            platform: None,
        }
    }

    /// Attach the platform used by this assay.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }
}

impl PartialEq for BioAssay {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BioAssay {}

impl Hash for BioAssay {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Named for BioAssay {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

impl fmt::Display for BioAssay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id={}, sample={})", self.name, self.id, self.sample.name)
    }
}
