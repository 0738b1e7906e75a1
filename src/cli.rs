//! CLI - Command Line Interface for zipindustry
//!
//! Every lookup is scriptable. All output is JSON-parseable with `--json`
//! (and by default when stdout is not a terminal).
//!
//! # Examples
//!
//! ```bash
//! # Which county does a ZIP fall in?
//! zipindustry county 22031
//!
//! # Top sectors by employees, then drill into one
//! zipindustry top 22031 --metric employees
//! zipindustry drill 22031 54 --limit 5
//!
//! # Two-level tree below manufacturing
//! zipindustry tree 48201 --root 31-33 --depth 2
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::models::{Metric, ZipCode};
use crate::taxonomy;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network or upstream API error
    NetworkError = 3,
    /// ZIP not found
    ZipNotFound = 4,
    /// No statistics or children for the request
    NoData = 5,
    /// Missing or rejected credential
    AuthError = 6,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// zipindustry - Top industries for the county behind a ZIP code
#[derive(Parser, Debug)]
#[command(
    name = "zipindustry",
    version,
    about = "Top industries for the county behind a U.S. ZIP code",
    long_about = "Resolves a ZIP code to its county and ranks the county's industries \
                  by employees, establishments, or payroll using Census County \
                  Business Patterns, drilling down through NAICS codes.",
    after_help = "EXAMPLES:\n\
                  zipindustry county 22031                 Resolve ZIP to county\n\
                  zipindustry top 22031 -m payroll         Top sectors by payroll\n\
                  zipindustry drill 22031 54               Subsectors of 54\n\
                  zipindustry tree 22031 --depth 2         Two-level tree\n\
                  zipindustry children 31-33               Taxonomy only"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }

    /// Log filter directive for the verbosity level
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a ZIP code to its county
    #[command(visible_alias = "c")]
    County(CountyCmd),

    /// Rank a county's sectors
    #[command(visible_alias = "t")]
    Top(TopCmd),

    /// Rank the children of an industry code
    #[command(visible_alias = "d")]
    Drill(DrillCmd),

    /// Expand several levels of drill-down at once
    Tree(TreeCmd),

    /// List child codes of an industry (no statistics)
    #[command(visible_alias = "ch")]
    Children(ChildrenCmd),
}

// =============================================================================
// Shared Arguments
// =============================================================================

/// Ranking metric on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricArg {
    /// Number of paid employees
    #[value(alias = "emp")]
    Employees,
    /// Number of establishments
    #[value(alias = "estab")]
    Establishments,
    /// Annual payroll
    #[value(alias = "pay")]
    Payroll,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Employees => Metric::Employees,
            MetricArg::Establishments => Metric::Establishments,
            MetricArg::Payroll => Metric::Payroll,
        }
    }
}

impl fmt::Display for MetricArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Metric::from(*self).fmt(f)
    }
}

/// Ranking options shared by `top`, `drill`, and `tree`
#[derive(Args, Debug, Clone)]
pub struct RankArgs {
    /// Metric to rank by (default from config, else employees)
    #[arg(long, short = 'm', value_enum)]
    pub metric: Option<MetricArg>,

    /// Maximum rows per level, 0 for all (default from config, else 10)
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

// =============================================================================
// Commands
// =============================================================================

/// Resolve a ZIP code to its county
#[derive(Args, Debug)]
pub struct CountyCmd {
    /// ZIP code (e.g., 22031 or 22031-4412)
    #[arg(required = true)]
    pub zip: String,
}

/// Rank a county's sectors
#[derive(Args, Debug)]
pub struct TopCmd {
    /// ZIP code
    #[arg(required = true)]
    pub zip: String,

    #[command(flatten)]
    pub rank: RankArgs,
}

/// Rank the children of an industry code within a county
#[derive(Args, Debug)]
pub struct DrillCmd {
    /// ZIP code
    #[arg(required = true)]
    pub zip: String,

    /// Parent NAICS code (e.g., 54, 31-33, 5415)
    #[arg(required = true)]
    pub code: String,

    #[command(flatten)]
    pub rank: RankArgs,
}

/// Expand several levels of drill-down at once
#[derive(Args, Debug)]
pub struct TreeCmd {
    /// ZIP code
    #[arg(required = true)]
    pub zip: String,

    /// Start below this code instead of at the sector level
    #[arg(long, short = 'r')]
    pub root: Option<String>,

    /// Levels to expand (1 = flat ranking)
    #[arg(long, short = 'D', default_value = "2")]
    pub depth: usize,

    #[command(flatten)]
    pub rank: RankArgs,
}

/// List child codes of an industry
#[derive(Args, Debug)]
pub struct ChildrenCmd {
    /// Parent NAICS code
    #[arg(required = true)]
    pub code: String,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data: wrapped JSON, or its plain-text rendering
    pub fn print<T: Serialize + fmt::Display>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            let text = data.to_string();
            if text.ends_with('\n') {
                print!("{}", text);
            } else {
                println!("{}", text);
            }
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Input Validation
// =============================================================================

pub fn validate_zip(zip: &str) -> Result<ZipCode, String> {
    ZipCode::parse(zip).map_err(|e| e.to_string())
}

/// Validate a NAICS code (2-6 digits or a ranged sector like 31-33)
pub fn validate_code(code: &str) -> Result<&str, &'static str> {
    let code = code.trim();
    if taxonomy::is_valid_code(code) {
        Ok(code)
    } else {
        Err("Invalid NAICS code (expected 2-6 digits or a sector range like 31-33)")
    }
}

// =============================================================================
// Tests
// =============================================================================
