use std::borrow::Cow;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::Parser;
use disc_follow_up::{CalendarDate, FollowUp, Region, RuleKind, RuleTable};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod cli;
mod form;

use cli::{Cli, Commands};
use form::Form;

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    follow_up: &'a FollowUp,
    notice:    String,
}

#[derive(Serialize)]
struct RegionEntry {
    code: Region,
    name: &'static str,
    rule: RuleKind,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let table = load_rules(cli.rules.as_deref())?;
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Calc {
            completed,
            renewal,
            region,
            age,
            notice_only,
        } => {
            let follow_up = table
                .follow_up_from_text(&completed, &renewal, &region, age.as_deref())
                .context("cannot compute follow-up date")?;
            info!(region = %follow_up.region, follow_up_on = %follow_up.follow_up_on, "computed follow-up");

            if notice_only {
                writeln!(stdout, "{}", follow_up.notice())?;
            } else {
                print_follow_up(&mut stdout, &follow_up, cli.json)?;
            }
        },
        Commands::Regions { toml: true } => {
            let rendered = table.to_toml_string().context("cannot render rule table")?;
            write!(stdout, "{rendered}")?;
        },
        Commands::Regions { toml: false } => print_regions(&mut stdout, &table, cli.json)?,
        Commands::Form => {
            let today = today()?;
            let stdin = io::stdin().lock();
            // Prompts go to stderr so `--json` leaves stdout parseable
            let follow_up = if cli.json {
                Form::new(&table, stdin, io::stderr().lock(), today).run()?
            } else {
                let follow_up = Form::new(&table, stdin, &mut stdout, today).run()?;
                writeln!(stdout)?;
                follow_up
            };
            print_follow_up(&mut stdout, &follow_up, cli.json)?;
        },
    }

    Ok(())
}

fn load_rules(path: Option<&Path>) -> Result<Cow<'static, RuleTable>> {
    match path {
        Some(path) => {
            let table = RuleTable::from_path(path)
                .with_context(|| format!("cannot load rules from {}", path.display()))?;
            Ok(Cow::Owned(table))
        },
        None => {
            debug!(revision = RuleTable::standard().revision(), "using built-in rule table");
            Ok(Cow::Borrowed(RuleTable::standard()))
        },
    }
}

fn today() -> Result<CalendarDate> {
    let now = chrono::Local::now().date_naive();
    let year = u16::try_from(now.year()).context("current year out of range")?;
    let month = u8::try_from(now.month()).context("current month out of range")?;
    let day = u8::try_from(now.day()).context("current day out of range")?;
    CalendarDate::from_ymd(year, month, day).context("current date out of range")
}

fn print_follow_up(out: &mut impl Write, follow_up: &FollowUp, json: bool) -> Result<()> {
    if json {
        let report = Report {
            follow_up,
            notice: follow_up.notice(),
        };
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        writeln!(out, "{follow_up}")?;
        writeln!(out)?;
        writeln!(out, "{}", follow_up.notice())?;
    }
    Ok(())
}

fn print_regions(out: &mut impl Write, table: &RuleTable, json: bool) -> Result<()> {
    let entries: Vec<RegionEntry> = table
        .regions()
        .into_iter()
        .map(|(code, rule)| RegionEntry {
            code,
            name: code.name(),
            rule,
        })
        .collect();

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&entries)?)?;
    } else {
        for entry in &entries {
            writeln!(out, "{:<22} {}  {}", entry.name, entry.code, entry.rule)?;
        }
    }
    Ok(())
}
