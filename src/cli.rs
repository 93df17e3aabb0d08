use std::path::PathBuf;

use clap::{Parser, Subcommand};
use disc_follow_up::RULES_ENV_VAR;

#[derive(Parser, Debug)]
#[command(
    name = "disc-follow-up",
    version,
    about = "Disc follow-up date calculator for accident prevention course certificates"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        global = true,
        env = RULES_ENV_VAR,
        help = "TOML rule table to use instead of the built-in one"
    )]
    pub rules: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the follow-up date for one certificate
    Calc {
        #[arg(long, help = "Certificate completion date (M/D/YYYY)")]
        completed: String,
        #[arg(long, help = "Policy renewal date (M/D/YYYY)")]
        renewal: String,
        #[arg(long, help = "Region code or full name")]
        region: String,
        #[arg(long, help = "Age bracket for age-conditional regions (under-55 or 55-plus)")]
        age: Option<String>,
        #[arg(long, default_value_t = false, help = "Print only the notice sentence")]
        notice_only: bool,
    },
    /// List recognized regions and their validity rule
    Regions {
        #[arg(long, default_value_t = false, help = "Print the active rule table as TOML")]
        toml: bool,
    },
    /// Fill in the calculator interactively
    Form,
}
