use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{AgeBracket, FollowUpError, Region, STANDARD_RULE_REVISION, prelude::*};

/// How long a completed certificate stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize)]
#[serde(into = "u16")]
pub enum ValidityPeriod {
    #[display(fmt = "2 years")]
    TwoYears,
    #[display(fmt = "3 years")]
    ThreeYears,
    #[display(fmt = "5 years")]
    FiveYears,
}

impl ValidityPeriod {
    pub const fn years(self) -> u16 {
        match self {
            Self::TwoYears => 2,
            Self::ThreeYears => 3,
            Self::FiveYears => 5,
        }
    }
}

impl From<ValidityPeriod> for u16 {
    fn from(period: ValidityPeriod) -> Self {
        period.years()
    }
}

/// Which rule a recognized region falls under, in resolution priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    #[display(fmt = "3 years")]
    ThreeYear,
    #[display(fmt = "2 years")]
    TwoYear,
    #[display(fmt = "2 years under 55, otherwise 3 years")]
    AgeConditional,
    #[display(fmt = "5 years")]
    FiveYear,
    #[display(fmt = "3 years (default)")]
    Default,
}

impl RuleKind {
    /// The validity period this rule yields. `None` only for the
    /// age-conditional rule when no bracket is known.
    pub const fn period(self, age: Option<AgeBracket>) -> Option<ValidityPeriod> {
        match (self, age) {
            (Self::ThreeYear | Self::Default, _) => Some(ValidityPeriod::ThreeYears),
            (Self::TwoYear, _) => Some(ValidityPeriod::TwoYears),
            (Self::FiveYear, _) => Some(ValidityPeriod::FiveYears),
            (Self::AgeConditional, Some(AgeBracket::Under55)) => Some(ValidityPeriod::TwoYears),
            (Self::AgeConditional, Some(AgeBracket::FiftyFiveOrOlder)) => Some(ValidityPeriod::ThreeYears),
            (Self::AgeConditional, None) => None,
        }
    }
}

/// Error type for loading a rule table.
#[derive(Debug, thiserror::Error)]
pub enum RuleTableError {
    /// The rule file could not be read.
    #[error("Failed to read rule table {}: {source}", path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rule file is not valid TOML for a rule table.
    #[error("Invalid rule table: {0}")]
    Toml(#[from] toml::de::Error),

    /// A categorized region is missing from the recognized set.
    #[error("Region {region} is listed under {category} but is not a recognized region")]
    Unrecognized { region: Region, category: &'static str },
}

/// On-disk shape of a rule table, before validation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleTableFile {
    revision:        u32,
    regions:         Option<BTreeSet<Region>>,
    #[serde(default)]
    three_year:      BTreeSet<Region>,
    #[serde(default)]
    two_year:        BTreeSet<Region>,
    age_conditional: Option<Region>,
    five_year:       Option<Region>,
}

/// Region-to-validity mapping for one revision of the renewal rules.
///
/// Regions are resolved in priority order: the 3-year set, the 2-year set,
/// the age-conditional region, the 5-year region, and finally a 3-year
/// default for any other recognized region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RuleTableFile")]
pub struct RuleTable {
    revision:        u32,
    regions:         BTreeSet<Region>,
    three_year:      BTreeSet<Region>,
    two_year:        BTreeSet<Region>,
    #[serde(skip_serializing_if = "Option::is_none")]
    age_conditional: Option<Region>,
    #[serde(skip_serializing_if = "Option::is_none")]
    five_year:       Option<Region>,
}

static STANDARD: LazyLock<RuleTable> = LazyLock::new(|| {
    use Region::{AK, AR, CA, CO, DC, DE, FL, GA, ID, IL, KS, KY, LA, MN, MS, MT, ND, NJ, NM, NV, NY, OK, UT, WA, WV, WY};

    RuleTable {
        revision:        STANDARD_RULE_REVISION,
        regions:         Region::ALL.iter().copied().collect(),
        three_year:      [AK, AR, CA, CO, FL, GA, ID, IL, KS, LA, MN, MT, NM, NV, NY, OK, UT, WA, WV, WY]
            .into_iter()
            .collect(),
        two_year:        [DC, DE, KY, MS].into_iter().collect(),
        age_conditional: Some(ND),
        five_year:       Some(NJ),
    }
});

impl TryFrom<RuleTableFile> for RuleTable {
    type Error = RuleTableError;

    fn try_from(file: RuleTableFile) -> Result<Self, Self::Error> {
        let table = Self {
            revision:        file.revision,
            regions:         file
                .regions
                .unwrap_or_else(|| Region::ALL.iter().copied().collect()),
            three_year:      file.three_year,
            two_year:        file.two_year,
            age_conditional: file.age_conditional,
            five_year:       file.five_year,
        };
        table.validate()?;
        Ok(table)
    }
}

impl RuleTable {
    /// The built-in rule table, pinned to revision `STANDARD_RULE_REVISION`.
    pub fn standard() -> &'static Self {
        &STANDARD
    }

    /// Parses and validates a TOML rule table.
    ///
    /// # Errors
    /// Returns `RuleTableError::Toml` for malformed input and
    /// `RuleTableError::Unrecognized` if a category names a region outside
    /// the recognized set.
    pub fn from_toml_str(s: &str) -> Result<Self, RuleTableError> {
        let file: RuleTableFile = toml::from_str(s)?;
        file.try_into()
    }

    /// Reads a TOML rule table from disk.
    ///
    /// # Errors
    /// Returns `RuleTableError::Io` if the file cannot be read, otherwise as
    /// [`RuleTable::from_toml_str`].
    pub fn from_path(path: &Path) -> Result<Self, RuleTableError> {
        let contents = fs::read_to_string(path).map_err(|source| RuleTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_toml_str(&contents)?;
        debug!(
            path = %path.display(),
            revision = table.revision,
            regions = table.regions.len(),
            "loaded rule table"
        );
        Ok(table)
    }

    /// Serializes the table back to TOML.
    ///
    /// # Errors
    /// Returns the serializer's error; a validated table always serializes.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    fn validate(&self) -> Result<(), RuleTableError> {
        let categorized = self
            .three_year
            .iter()
            .map(|region| (*region, "three_year"))
            .chain(self.two_year.iter().map(|region| (*region, "two_year")))
            .chain(self.age_conditional.map(|region| (region, "age_conditional")))
            .chain(self.five_year.map(|region| (region, "five_year")));

        for (region, category) in categorized {
            if !self.regions.contains(&region) {
                return Err(RuleTableError::Unrecognized { region, category });
            }
        }
        Ok(())
    }

    pub const fn revision(&self) -> u32 {
        self.revision
    }

    pub fn recognizes(&self, region: Region) -> bool {
        self.regions.contains(&region)
    }

    /// The rule a region falls under, or `None` if the table does not
    /// recognize it.
    pub fn kind(&self, region: Region) -> Option<RuleKind> {
        if !self.recognizes(region) {
            return None;
        }

        let kind = if self.three_year.contains(&region) {
            RuleKind::ThreeYear
        } else if self.two_year.contains(&region) {
            RuleKind::TwoYear
        } else if self.age_conditional == Some(region) {
            RuleKind::AgeConditional
        } else if self.five_year == Some(region) {
            RuleKind::FiveYear
        } else {
            RuleKind::Default
        };
        Some(kind)
    }

    /// Resolves the validity period for a region.
    ///
    /// # Errors
    /// Returns `FollowUpError::InvalidRegion` if the table does not recognize
    /// the region and `FollowUpError::MissingAgeBracket` if the region is
    /// age-conditional and no bracket was given.
    pub fn validity(&self, region: Region, age: Option<AgeBracket>) -> Result<ValidityPeriod, FollowUpError> {
        let kind = self
            .kind(region)
            .ok_or_else(|| FollowUpError::InvalidRegion(region.code().to_owned()))?;
        let period = kind
            .period(age)
            .ok_or(FollowUpError::MissingAgeBracket(region))?;
        trace!(%region, ?kind, years = period.years(), "resolved validity rule");
        Ok(period)
    }

    /// Recognized regions sorted by full name, as presented in a region picker.
    pub fn regions(&self) -> Vec<(Region, RuleKind)> {
        let mut listed: Vec<(Region, RuleKind)> = self
            .regions
            .iter()
            .filter_map(|region| self.kind(*region).map(|kind| (*region, kind)))
            .collect();
        listed.sort_by_key(|(region, _)| region.name());
        listed
    }
}
