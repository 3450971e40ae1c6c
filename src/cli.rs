//! Command-line interface implementation for Ritual.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, CommandFactory, Parser};
use std::path::PathBuf;

/// Command-line arguments structure for Ritual.
#[derive(Parser, Debug)]
#[command(author, version, about = "Ritual: manifest-driven project generator", long_about = None)]
pub struct Args {
    /// Path to the recipe directory containing ritual.yaml
    #[arg(value_name = "RECIPE")]
    pub recipe: PathBuf,

    /// Directory where the generated project will be created
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Generate into an existing output directory.
    /// Protected files that already exist are still left untouched.
    #[arg(short, long)]
    pub force: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Read preloaded answers (JSON or YAML) from this file
    #[arg(short, long, value_name = "FILE")]
    pub answers: Option<PathBuf>,

    /// Read preloaded answers (JSON or YAML) from stdin
    #[arg(short, long)]
    pub stdin: bool,

    /// Never prompt; unanswered questions take their defaults
    #[arg(long)]
    pub non_interactive: bool,

    /// Run the recipe's migrations after generation in the given direction
    #[arg(long, value_name = "DIRECTION", value_parser = ["up", "down"])]
    pub migrate: Option<String>,

    /// Record migrations as skipped without executing them
    #[arg(long, requires = "migrate")]
    pub dry_run: bool,

    /// Shell command receiving each SQL statement on stdin, e.g. 'psql "$DATABASE_URL"'
    #[arg(long, value_name = "CMD", requires = "migrate")]
    pub sql_command: Option<String>,

    /// Shared template library used by `_shared:` sources (default: <RECIPE>/../_shared)
    #[arg(long, value_name = "DIR")]
    pub shared_root: Option<PathBuf>,
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
