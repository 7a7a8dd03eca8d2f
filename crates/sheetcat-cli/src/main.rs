mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sheetcat",
    version,
    about = "Reconstruct product catalogs from supplier spreadsheets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract product records (and their images) from an xlsx file
    Extract {
        /// Path to the .xlsx workbook
        input_file: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write the extraction as JSON to a file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,

        /// Save bound images into this directory and point records at them
        #[arg(long, value_name = "DIR")]
        images_dir: Option<PathBuf>,

        /// JSON file with extraction options
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Custom JSON rule table (default: built-in)
        #[arg(short, long, value_name = "FILE")]
        rules: Option<PathBuf>,

        /// External image extractor to try after the archive reader
        #[arg(long, value_name = "PROGRAM")]
        external_extractor: Option<String>,

        /// Argument for the external extractor; {input} and {output_dir} are substituted
        #[arg(long = "external-arg", value_name = "ARG", allow_hyphen_values = true)]
        external_args: Vec<String>,

        /// Seconds before the external extractor is killed
        #[arg(long, value_name = "SECS")]
        external_timeout: Option<u64>,
    },
    /// Inspect and validate rule tables
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
}

#[derive(Subcommand)]
enum RulesAction {
    /// Summarize the built-in rule table
    Show,
    /// Print the built-in rule table as JSON (a starting point for custom tables)
    Dump,
    /// Validate a custom rule table
    Validate {
        /// Path to JSON rule file
        file: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            input_file,
            output,
            out,
            images_dir,
            config,
            rules,
            external_extractor,
            external_args,
            external_timeout,
        } => commands::extract::run(commands::extract::ExtractArgs {
            input_file,
            output_format: output,
            out,
            images_dir,
            config,
            rules,
            external_extractor,
            external_args,
            external_timeout,
        }),
        Commands::Rules { action } => match action {
            RulesAction::Show => commands::rules::show(),
            RulesAction::Dump => commands::rules::dump(),
            RulesAction::Validate { file } => commands::rules::validate(&file),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
