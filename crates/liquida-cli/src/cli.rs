use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use liquida_ai::{DEFAULT_API_BASE, ModelVariant};
use liquida_core::limits::DEFAULT_EMPLOYER_PERCENT;

#[derive(Parser)]
#[command(name = "liquida")]
#[command(about = "Settlement calculations for labor lawsuits, extracted from court documents")]
#[command(version)]
pub struct Cli {
    /// History file (defaults to <data dir>/liquida/history.json).
    #[arg(long, env = "LIQUIDA_HISTORY", global = true)]
    pub history: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send documents to the model and record each result in history.
    Process(ProcessArgs),
    /// List, show or clear processed documents.
    #[command(subcommand)]
    History(HistoryCommand),
    /// Adjust a stored result; derived totals are recomputed.
    #[command(after_help = "\
Edits are applied in this order: --add-item, --add-month, --set,
--remove-month, --remove-item. Paths for --set:
  claimant, respondent, case_number, filing_date, liquidation_date,
  period_start, period_end, observation,
  withholding_tax, income_tax, severance_fund, fee_percent, employer_percent,
  items.N.{description,nature,nominal,corrected,interest},
  items.N.months.M.{competence,base,quantity,unit,index,nominal,corrected,interest}

Example:
  liquida edit 3f2a --set items.0.months.1.index=1,0345 --set fee_percent=15")]
    Edit(EditArgs),
    /// Write PDF and/or XLSX reports for one entry or the whole history.
    Export(ExportArgs),
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModelArg {
    Flash,
    Pro,
}

impl From<ModelArg> for ModelVariant {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Flash => ModelVariant::Flash,
            ModelArg::Pro => ModelVariant::Pro,
        }
    }
}

#[derive(Args)]
pub struct ProcessArgs {
    /// Documents to process (PDF, PNG, JPEG or WEBP, up to 10 MB each).
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Free-text calculation instructions passed to the model.
    #[arg(long, short = 'i', default_value = "")]
    pub instructions: String,

    /// Employer social-security percentage.
    #[arg(long, default_value_t = DEFAULT_EMPLOYER_PERCENT)]
    pub employer_percent: f64,

    #[arg(long, value_enum, env = "LIQUIDA_MODEL", default_value = "flash")]
    pub model: ModelArg,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, env = "LIQUIDA_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Retries on rate-limit errors before giving up.
    #[arg(long, env = "LIQUIDA_MAX_RETRIES", default_value_t = 5)]
    pub max_retries: u32,

    /// Per-request timeout in seconds.
    #[arg(long, env = "LIQUIDA_TIMEOUT_SECS", default_value_t = 300)]
    pub timeout_secs: u64,

    /// Print the result card of every processed document.
    #[arg(long)]
    pub show: bool,
}

#[derive(Subcommand)]
pub enum HistoryCommand {
    /// One line per entry, most recent first.
    List,
    /// Full result card for an entry (id or unique id prefix).
    Show { id: String },
    /// Delete every entry.
    Clear {
        /// Confirm deletion.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
pub struct EditArgs {
    /// Entry id or unique id prefix.
    pub id: String,

    /// Assign a field: PATH=VALUE.
    #[arg(long = "set", value_name = "PATH=VALUE")]
    pub assignments: Vec<String>,

    /// Append a new line item (repeatable).
    #[arg(long, action = clap::ArgAction::Count)]
    pub add_item: u8,

    /// Remove the line item at this index.
    #[arg(long, value_name = "N")]
    pub remove_item: Vec<usize>,

    /// Append a blank monthly row to the item at this index.
    #[arg(long, value_name = "N")]
    pub add_month: Vec<usize>,

    /// Remove monthly row M of item N.
    #[arg(long, value_name = "N.M")]
    pub remove_month: Vec<String>,

    /// Show the edited result without saving it.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Entry id or unique id prefix.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub id: Option<String>,

    /// Export the consolidated history instead of one entry.
    #[arg(long)]
    pub all: bool,

    /// Write the PDF report (default: both formats).
    #[arg(long)]
    pub pdf: bool,

    /// Write the XLSX workbook (default: both formats).
    #[arg(long)]
    pub xlsx: bool,

    /// Output directory.
    #[arg(long, short = 'o', default_value = ".")]
    pub out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_edit_flags() {
        let cli = Cli::try_parse_from([
            "liquida",
            "edit",
            "3f2a",
            "--set",
            "fee_percent=10",
            "--add-item",
            "--add-item",
            "--remove-month",
            "0.1",
        ])
        .unwrap();
        let Commands::Edit(args) = cli.command else {
            panic!("expected edit");
        };
        assert_eq!(args.assignments, vec!["fee_percent=10"]);
        assert_eq!(args.add_item, 2);
        assert_eq!(args.remove_month, vec!["0.1"]);
    }

    #[test]
    fn export_needs_id_or_all() {
        assert!(Cli::try_parse_from(["liquida", "export"]).is_err());
        assert!(Cli::try_parse_from(["liquida", "export", "--all"]).is_ok());
        assert!(Cli::try_parse_from(["liquida", "export", "abc", "--all"]).is_err());
    }
}
