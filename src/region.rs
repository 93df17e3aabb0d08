use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{AGE_BRACKET_THRESHOLD, prelude::*};

macro_rules! regions {
    ($($code:ident => $name:literal),+ $(,)?) => {
        /// A US jurisdiction (50 states plus the District of Columbia),
        /// identified by its two-letter postal code.
        #[allow(clippy::upper_case_acronyms)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Region {
            $($code,)+
        }

        impl Region {
            /// Every region, in code order
            pub const ALL: &'static [Self] = &[$(Self::$code),+];

            /// Two-letter postal code
            pub const fn code(self) -> &'static str {
                match self {
                    $(Self::$code => stringify!($code),)+
                }
            }

            /// Full region name, as shown in the region dropdown
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$code => $name,)+
                }
            }
        }
    };
}

regions! {
    AK => "Alaska",
    AL => "Alabama",
    AR => "Arkansas",
    AZ => "Arizona",
    CA => "California",
    CO => "Colorado",
    CT => "Connecticut",
    DC => "District of Columbia",
    DE => "Delaware",
    FL => "Florida",
    GA => "Georgia",
    HI => "Hawaii",
    IA => "Iowa",
    ID => "Idaho",
    IL => "Illinois",
    IN => "Indiana",
    KS => "Kansas",
    KY => "Kentucky",
    LA => "Louisiana",
    MA => "Massachusetts",
    MD => "Maryland",
    ME => "Maine",
    MI => "Michigan",
    MN => "Minnesota",
    MO => "Missouri",
    MS => "Mississippi",
    MT => "Montana",
    NC => "North Carolina",
    ND => "North Dakota",
    NE => "Nebraska",
    NH => "New Hampshire",
    NJ => "New Jersey",
    NM => "New Mexico",
    NV => "Nevada",
    NY => "New York",
    OH => "Ohio",
    OK => "Oklahoma",
    OR => "Oregon",
    PA => "Pennsylvania",
    RI => "Rhode Island",
    SC => "South Carolina",
    SD => "South Dakota",
    TN => "Tennessee",
    TX => "Texas",
    UT => "Utah",
    VA => "Virginia",
    VT => "Vermont",
    WA => "Washington",
    WI => "Wisconsin",
    WV => "West Virginia",
    WY => "Wyoming",
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when text names no known region.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown region: {0}")]
pub struct UnknownRegion(pub String);

impl FromStr for Region {
    type Err = UnknownRegion;

    /// Accepts a postal code or a full name, ignoring case and surrounding
    /// whitespace ("ca", "CA", "california").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|region| {
                region.code().eq_ignore_ascii_case(trimmed) || region.name().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| UnknownRegion(trimmed.to_owned()))
    }
}

impl Serialize for Region {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Region {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Driver age bracket, consulted only for the age-conditional region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum AgeBracket {
    #[display(fmt = "under 55")]
    #[serde(rename = "under-55")]
    Under55,
    #[display(fmt = "55 or older")]
    #[serde(rename = "55-plus")]
    FiftyFiveOrOlder,
}

/// Error returned when text names no age bracket.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown age bracket: {0} (expected under-55 or 55-plus)")]
pub struct UnknownAgeBracket(pub String);

impl FromStr for AgeBracket {
    type Err = UnknownAgeBracket;

    /// Accepts a bracket name or a whole age in years ("40", "under-55").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(years) = s.trim().parse::<u8>() {
            return Ok(Self::from_age(years));
        }
        match s.trim().to_ascii_lowercase().as_str() {
            "under-55" | "under55" | "under 55" | "<55" => Ok(Self::Under55),
            "55-plus" | "55+" | "55 or older" | "over-55" | ">=55" => Ok(Self::FiftyFiveOrOlder),
            other => Err(UnknownAgeBracket(other.to_owned())),
        }
    }
}

impl AgeBracket {
    /// Buckets an age in whole years
    pub const fn from_age(years: u8) -> Self {
        if years < AGE_BRACKET_THRESHOLD {
            Self::Under55
        } else {
            Self::FiftyFiveOrOlder
        }
    }
}
