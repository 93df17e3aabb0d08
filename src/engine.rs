use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    AgeBracket, CalendarDate, FOLLOW_UP_LEAD_MONTHS, NOTICE_PREFIX, ParseError, Region, RuleKind,
    RuleTable, ValidityPeriod,
};

/// Error type for follow-up computation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FollowUpError {
    /// An input date is unparseable or not a real calendar date.
    #[error("Invalid {field}: {source}")]
    InvalidDate {
        field:  &'static str,
        #[source]
        source: ParseError,
    },

    /// The region is unknown or not recognized by the active rule table.
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// The age bracket text names no bracket.
    #[error("Invalid age bracket: {0} (expected under-55 or 55-plus)")]
    InvalidAgeBracket(String),

    /// The region's rule depends on age and no bracket was given.
    #[error("An age bracket is required for {name} ({0})", name = .0.name())]
    MissingAgeBracket(Region),

    /// Date arithmetic left the supported year range.
    #[error("Date out of range: {0}")]
    DateOutOfRange(#[source] ParseError),
}

/// Validated inputs for one follow-up computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FollowUpRequest {
    pub completed_on:   CalendarDate,
    pub policy_renewal: CalendarDate,
    pub region:         Region,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age:            Option<AgeBracket>,
}

impl FollowUpRequest {
    /// Parses raw form fields, in field order, against a rule table.
    ///
    /// # Errors
    /// Returns the first invalid field's error: `InvalidDate` for either
    /// date, `InvalidRegion` for the region, `InvalidAgeBracket` for the age.
    /// Age text is only read for the table's age-conditional region.
    pub fn parse(
        table: &RuleTable,
        completed_on: &str,
        policy_renewal: &str,
        region: &str,
        age: Option<&str>,
    ) -> Result<Self, FollowUpError> {
        let completed_on = parse_date("completion date", completed_on)?;
        let policy_renewal = parse_date("policy renewal date", policy_renewal)?;
        let region = table.parse_region(region)?;
        let age = table.parse_age(region, age)?;

        Ok(Self {
            completed_on,
            policy_renewal,
            region,
            age,
        })
    }
}

/// Parses one date field, naming the field in the error.
///
/// # Errors
/// Returns `FollowUpError::InvalidDate` if the text is not a calendar date.
pub fn parse_date(field: &'static str, text: &str) -> Result<CalendarDate, FollowUpError> {
    text.parse()
        .map_err(|source| FollowUpError::InvalidDate { field, source })
}

/// The computed reminder for one certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FollowUp {
    pub region:              Region,
    pub validity:            ValidityPeriod,
    pub certificate_expires: CalendarDate,
    /// First policy renewal strictly after the certificate expires
    pub next_renewal:        CalendarDate,
    pub follow_up_on:        CalendarDate,
}

impl FollowUp {
    /// The copyable notice sentence.
    pub fn notice(&self) -> String {
        format!("{NOTICE_PREFIX}{}.", self.certificate_expires)
    }
}

impl fmt::Display for FollowUp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Certificate expires {}", self.certificate_expires)?;
        write!(f, "Disc Follow-Up Date: {}", self.follow_up_on)
    }
}

impl RuleTable {
    /// Resolves region text (code or full name) against this table.
    ///
    /// # Errors
    /// Returns `FollowUpError::InvalidRegion` if the text names no region or
    /// the region is outside this table's recognized set.
    pub fn parse_region(&self, text: &str) -> Result<Region, FollowUpError> {
        let region = text
            .parse::<Region>()
            .map_err(|_| FollowUpError::InvalidRegion(text.trim().to_owned()))?;
        if !self.recognizes(region) {
            return Err(FollowUpError::InvalidRegion(region.code().to_owned()));
        }
        Ok(region)
    }

    /// Reads age text (a bracket name or a whole age) for a region. Regions
    /// whose rule does not depend on age ignore the text entirely.
    ///
    /// # Errors
    /// Returns `FollowUpError::InvalidAgeBracket` if the region is age
    /// conditional and the text names no bracket.
    pub fn parse_age(&self, region: Region, text: Option<&str>) -> Result<Option<AgeBracket>, FollowUpError> {
        if self.kind(region) != Some(RuleKind::AgeConditional) {
            return Ok(None);
        }
        text.map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| {
                text.parse::<AgeBracket>()
                    .map_err(|_| FollowUpError::InvalidAgeBracket(text.to_owned()))
            })
            .transpose()
    }

    /// Computes the certificate expiration and follow-up date.
    ///
    /// # Errors
    /// Returns `InvalidRegion` or `MissingAgeBracket` from rule resolution,
    /// or `DateOutOfRange` if the dates would pass year 9999.
    pub fn follow_up(&self, request: &FollowUpRequest) -> Result<FollowUp, FollowUpError> {
        let validity = self.validity(request.region, request.age)?;

        let certificate_expires = request
            .completed_on
            .add_years(validity.years())
            .map_err(FollowUpError::DateOutOfRange)?;
        let next_renewal = request
            .policy_renewal
            .next_anniversary_after(certificate_expires)
            .map_err(FollowUpError::DateOutOfRange)?;
        let follow_up_on = next_renewal
            .sub_months(FOLLOW_UP_LEAD_MONTHS)
            .map_err(FollowUpError::DateOutOfRange)?;

        Ok(FollowUp {
            region: request.region,
            validity,
            certificate_expires,
            next_renewal,
            follow_up_on,
        })
    }

    /// Parses raw form fields and computes the follow-up. Nothing is computed
    /// unless every field is valid.
    ///
    /// # Errors
    /// As [`FollowUpRequest::parse`] and [`RuleTable::follow_up`].
    pub fn follow_up_from_text(
        &self,
        completed_on: &str,
        policy_renewal: &str,
        region: &str,
        age: Option<&str>,
    ) -> Result<FollowUp, FollowUpError> {
        let request = FollowUpRequest::parse(self, completed_on, policy_renewal, region, age)?;
        self.follow_up(&request)
    }
}

/// Computes a follow-up against the built-in rule table.
///
/// # Errors
/// As [`RuleTable::follow_up`].
pub fn follow_up(request: &FollowUpRequest) -> Result<FollowUp, FollowUpError> {
    RuleTable::standard().follow_up(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Month, Year};

    fn date(year: u16, month: u8, day: u8) -> CalendarDate {
        CalendarDate::from_ymd(year, month, day).unwrap()
    }

    fn request(completed_on: CalendarDate, policy_renewal: CalendarDate, region: Region) -> FollowUpRequest {
        FollowUpRequest {
            completed_on,
            policy_renewal,
            region,
            age: None,
        }
    }

    #[test]
    fn test_three_year_region_renewal_same_year() {
        let result = follow_up(&request(date(2024, 1, 15), date(2024, 6, 10), Region::CA)).unwrap();
        assert_eq!(result.validity, ValidityPeriod::ThreeYears);
        assert_eq!(result.certificate_expires, date(2027, 1, 15));
        assert_eq!(result.next_renewal, date(2027, 6, 10));
        assert_eq!(result.follow_up_on, date(2027, 3, 10));
    }

    #[test]
    fn test_two_year_region_renewal_next_year() {
        let result = follow_up(&request(date(2024, 1, 15), date(2023, 1, 10), Region::DC)).unwrap();
        assert_eq!(result.validity, ValidityPeriod::TwoYears);
        assert_eq!(result.certificate_expires, date(2026, 1, 15));
        assert_eq!(result.next_renewal, date(2027, 1, 10));
        assert_eq!(result.follow_up_on, date(2026, 10, 10));
    }

    #[test]
    fn test_age_conditional_under_55() {
        let mut req = request(date(2024, 3, 1), date(2024, 9, 1), Region::ND);
        req.age = Some(AgeBracket::Under55);
        let result = follow_up(&req).unwrap();
        assert_eq!(result.validity, ValidityPeriod::TwoYears);
        assert_eq!(result.certificate_expires, date(2026, 3, 1));
    }

    #[test]
    fn test_age_conditional_older() {
        let mut req = request(date(2024, 3, 1), date(2024, 9, 1), Region::ND);
        req.age = Some(AgeBracket::FiftyFiveOrOlder);
        let result = follow_up(&req).unwrap();
        assert_eq!(result.validity, ValidityPeriod::ThreeYears);
        assert_eq!(result.certificate_expires, date(2027, 3, 1));
    }

    #[test]
    fn test_age_conditional_requires_bracket() {
        let result = follow_up(&request(date(2024, 3, 1), date(2024, 9, 1), Region::ND));
        assert_eq!(result, Err(FollowUpError::MissingAgeBracket(Region::ND)));
        assert_eq!(
            result.unwrap_err().to_string(),
            "An age bracket is required for North Dakota (ND)"
        );
    }

    #[test]
    fn test_five_year_region() {
        let result = follow_up(&request(date(2024, 1, 15), date(2024, 6, 10), Region::NJ)).unwrap();
        assert_eq!(result.certificate_expires, date(2029, 1, 15));
        assert_eq!(result.follow_up_on, date(2029, 3, 10));
    }

    #[test]
    fn test_renewal_on_expiration_day_moves_to_next_year() {
        let result = follow_up(&request(date(2024, 5, 20), date(2019, 5, 20), Region::CA)).unwrap();
        assert_eq!(result.certificate_expires, date(2027, 5, 20));
        assert_eq!(result.next_renewal, date(2028, 5, 20));
        assert_eq!(result.follow_up_on, date(2028, 2, 20));
    }

    #[test]
    fn test_leap_day_completion() {
        let result = follow_up(&request(date(2024, 2, 29), date(2024, 12, 1), Region::CA)).unwrap();
        assert_eq!(result.certificate_expires, date(2027, 2, 28));
        assert_eq!(result.next_renewal, date(2027, 12, 1));
    }

    #[test]
    fn test_leap_day_renewal() {
        let result = follow_up(&request(date(2024, 1, 15), date(2024, 2, 29), Region::CA)).unwrap();
        assert_eq!(result.certificate_expires, date(2027, 1, 15));
        assert_eq!(result.next_renewal, date(2027, 2, 28));
        assert_eq!(result.follow_up_on, date(2026, 11, 28));
    }

    #[test]
    fn test_follow_up_clamps_to_short_month() {
        let result = follow_up(&request(date(2024, 1, 15), date(2024, 5, 31), Region::CA)).unwrap();
        assert_eq!(result.next_renewal, date(2027, 5, 31));
        assert_eq!(result.follow_up_on, date(2027, 2, 28));
    }

    #[test]
    fn test_out_of_range() {
        let result = follow_up(&request(date(9998, 1, 1), date(2024, 6, 1), Region::CA));
        assert!(matches!(result, Err(FollowUpError::DateOutOfRange(_))));
    }

    #[test]
    fn test_notice_and_summary() {
        let result = follow_up(&request(date(2024, 1, 15), date(2024, 6, 10), Region::CA)).unwrap();
        assert_eq!(
            result.notice(),
            "Please follow-up for a new accident prevention course certificate. \
             The current certificate expires 01/15/2027."
        );
        assert_eq!(
            result.to_string(),
            "Certificate expires 01/15/2027\nDisc Follow-Up Date: 03/10/2027"
        );
    }

    #[test]
    fn test_from_text() {
        let table = RuleTable::standard();
        let result = table
            .follow_up_from_text("1/15/2024", "06/10/2024", "California", None)
            .unwrap();
        assert_eq!(result.follow_up_on, date(2027, 3, 10));

        let result = table
            .follow_up_from_text("3/1/2024", "9/1/2024", "nd", Some("under-55"))
            .unwrap();
        assert_eq!(result.certificate_expires, date(2026, 3, 1));
    }

    #[test]
    fn test_from_text_invalid_date() {
        let result = RuleTable::standard().follow_up_from_text("13/40/2024", "06/10/2024", "CA", None);
        assert!(matches!(
            result,
            Err(FollowUpError::InvalidDate {
                field: "completion date",
                source: ParseError::InvalidMonth(13)
            })
        ));

        let result = RuleTable::standard().follow_up_from_text("01/15/2024", "", "CA", None);
        assert!(matches!(
            result,
            Err(FollowUpError::InvalidDate {
                field: "policy renewal date",
                source: ParseError::EmptyInput
            })
        ));
    }

    #[test]
    fn test_from_text_invalid_region_and_age() {
        let table = RuleTable::standard();
        assert_eq!(
            table.follow_up_from_text("01/15/2024", "06/10/2024", "Puerto Rico", None),
            Err(FollowUpError::InvalidRegion("Puerto Rico".to_owned()))
        );
        assert_eq!(
            table.follow_up_from_text("01/15/2024", "06/10/2024", "ND", Some("elderly")),
            Err(FollowUpError::InvalidAgeBracket("elderly".to_owned()))
        );
        // Blank age text counts as no bracket
        assert_eq!(
            table.follow_up_from_text("01/15/2024", "06/10/2024", "ND", Some("  ")),
            Err(FollowUpError::MissingAgeBracket(Region::ND))
        );
    }

    #[test]
    fn test_from_text_numeric_age() {
        let table = RuleTable::standard();
        let result = table
            .follow_up_from_text("3/1/2024", "9/1/2024", "ND", Some("40"))
            .unwrap();
        assert_eq!(result.certificate_expires, date(2026, 3, 1));

        let result = table
            .follow_up_from_text("3/1/2024", "9/1/2024", "ND", Some("55"))
            .unwrap();
        assert_eq!(result.certificate_expires, date(2027, 3, 1));
    }

    #[test]
    fn test_age_ignored_outside_age_conditional_region() {
        let table = RuleTable::standard();
        assert_eq!(table.parse_age(Region::CA, Some("bogus")), Ok(None));
        assert_eq!(table.parse_age(Region::ND, Some(" 55+ ")), Ok(Some(AgeBracket::FiftyFiveOrOlder)));

        let result = table
            .follow_up_from_text("01/15/2024", "06/10/2024", "CA", Some("bogus"))
            .unwrap();
        assert_eq!(result.follow_up_on, date(2027, 3, 10));
    }

    #[test]
    fn test_parse_date_names_field() {
        assert_eq!(parse_date("completion date", "1/15/2024"), Ok(date(2024, 1, 15)));
        assert_eq!(
            parse_date("completion date", "2/30/2024").unwrap_err().to_string(),
            format!("Invalid completion date: {}", ParseError::InvalidDay { month: 2, day: 30, year: 2024 })
        );
    }

    #[test]
    fn test_parse_region_against_narrowed_table() {
        let table = RuleTable::from_toml_str("revision = 1\nregions = [\"CA\"]").unwrap();
        assert_eq!(table.parse_region("ca"), Ok(Region::CA));
        assert_eq!(
            table.parse_region("Texas"),
            Err(FollowUpError::InvalidRegion("TX".to_owned()))
        );
    }

    #[test]
    fn test_renewal_is_earliest_anniversary_after_expiration() {
        let table = RuleTable::standard();
        let policies = [
            date(2023, 1, 1),
            date(2022, 2, 28),
            date(2024, 2, 29),
            date(2021, 7, 4),
            date(2020, 12, 31),
        ];
        let regions = [Region::CA, Region::DC, Region::NJ, Region::TX];

        for region in regions {
            for policy in policies {
                for month in 1..=12 {
                    for day in [1, 15, 28, 29, 30, 31] {
                        let Ok(completed) = CalendarDate::from_ymd(2024, month, day) else {
                            continue;
                        };
                        let result = table.follow_up(&request(completed, policy, region)).unwrap();

                        assert!(result.next_renewal > result.certificate_expires);
                        assert_eq!(result.next_renewal.month(), policy.month());

                        let previous_year = Year::new(result.next_renewal.year().get() - 1).unwrap();
                        let previous =
                            CalendarDate::clamped(previous_year, policy.month(), policy.day().get()).unwrap();
                        assert!(
                            previous <= result.certificate_expires,
                            "{region} {completed} {policy}: {previous} already follows {}",
                            result.certificate_expires
                        );

                        assert_eq!(result.follow_up_on, result.next_renewal.sub_months(3).unwrap());
                    }
                }
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let req = request(date(2024, 8, 31), date(2023, 11, 30), Region::KY);
        let first = follow_up(&req).unwrap();
        let second = follow_up(&req).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.notice(), second.notice());
    }

    #[test]
    fn test_request_serde() {
        let req = FollowUpRequest {
            completed_on:   date(2024, 3, 1),
            policy_renewal: date(2024, 9, 1),
            region:         Region::ND,
            age:            Some(AgeBracket::Under55),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"completed_on":"03/01/2024","policy_renewal":"09/01/2024","region":"ND","age":"under-55"}"#
        );
        let parsed: FollowUpRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, req);

        let parsed: FollowUpRequest =
            serde_json::from_str(r#"{"completed_on":"2024-01-15","policy_renewal":"6/10/2024","region":"California"}"#)
                .unwrap();
        assert_eq!(parsed.age, None);
        assert_eq!(parsed.region, Region::CA);
    }

    #[test]
    fn test_follow_up_serializes_years() {
        let result = follow_up(&request(date(2024, 1, 15), date(2024, 6, 10), Region::CA)).unwrap();
        let value = serde_json::to_value(result).unwrap();
        assert_eq!(value["validity"], 3);
        assert_eq!(value["follow_up_on"], "03/10/2027");
        assert_eq!(value["region"], "CA");
    }

    #[test]
    fn test_follow_up_lands_on_leap_day() {
        // Renewal 05/30/2028 minus three months is Feb 30, clamped to the leap day
        let result = follow_up(&request(date(2024, 6, 1), date(2024, 5, 30), Region::CO)).unwrap();
        assert_eq!(result.next_renewal, date(2028, 5, 30));
        assert_eq!(result.follow_up_on.month(), Month::new(2).unwrap());
        assert_eq!(result.follow_up_on, date(2028, 2, 29));
    }
}
