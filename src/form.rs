use std::io::{self, BufRead, Write};

use disc_follow_up::{
    parse_date, CalendarDate, FollowUp, FollowUpError, FollowUpRequest, Region, RuleKind, RuleTable,
};
use tracing::debug;

const COMPLETION_LABEL: &str = "Certificate Completion Date";
const RENEWAL_LABEL: &str = "Policy Expiration Date";
const REGION_LABEL: &str = "State";
const AGE_LABEL: &str = "Driver age or bracket (under-55 / 55-plus)";

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("input closed before the form was complete")]
    Closed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Line-oriented stand-in for the calculator form. Each field is asked for
/// until it is valid; no result is produced until every field is.
pub struct Form<'a, R, W> {
    table:  &'a RuleTable,
    input:  R,
    output: W,
    today:  CalendarDate,
}

impl<'a, R: BufRead, W: Write> Form<'a, R, W> {
    pub const fn new(table: &'a RuleTable, input: R, output: W, today: CalendarDate) -> Self {
        Self {
            table,
            input,
            output,
            today,
        }
    }

    pub fn run(mut self) -> Result<FollowUp, FormError> {
        loop {
            let request = self.collect()?;
            match self.table.follow_up(&request) {
                Ok(follow_up) => return Ok(follow_up),
                Err(err) => {
                    debug!(error = %err, "form inputs rejected");
                    writeln!(self.output, "{err}. Please start over.")?;
                },
            }
        }
    }

    fn collect(&mut self) -> Result<FollowUpRequest, FormError> {
        let today = self.today.to_string();
        let completed_on = self.ask(COMPLETION_LABEL, Some(&today), |text| parse_date("completion date", text))?;
        let policy_renewal = self.ask(RENEWAL_LABEL, Some(&today), |text| parse_date("policy renewal date", text))?;

        let table = self.table;
        let region: Region = self.ask(REGION_LABEL, None, |text| table.parse_region(text))?;

        let age = if table.kind(region) == Some(RuleKind::AgeConditional) {
            Some(self.ask(AGE_LABEL, None, |text| {
                table
                    .parse_age(region, Some(text))?
                    .ok_or(FollowUpError::MissingAgeBracket(region))
            })?)
        } else {
            None
        };

        Ok(FollowUpRequest {
            completed_on,
            policy_renewal,
            region,
            age,
        })
    }

    fn ask<T>(
        &mut self,
        label: &str,
        default: Option<&str>,
        parse: impl Fn(&str) -> Result<T, FollowUpError>,
    ) -> Result<T, FormError> {
        loop {
            match default {
                Some(default) => write!(self.output, "{label} [{default}]: ")?,
                None => write!(self.output, "{label}: ")?,
            }
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(FormError::Closed);
            }

            let answer = match line.trim() {
                "" => default.unwrap_or_default(),
                answer => answer,
            };
            match parse(answer) {
                Ok(value) => return Ok(value),
                Err(err) => writeln!(self.output, "{err}")?,
            }
        }
    }
}
