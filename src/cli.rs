//! Command-line interface implementation for makeproject.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, CommandFactory, Parser};
use std::path::PathBuf;

use crate::prompt::ConflictPolicy;

/// Command-line arguments structure for makeproject.
#[derive(Parser, Debug)]
#[command(author, version, about = "makeproject: build project folders from YAML structure documents", long_about = None)]
pub struct Args {
    /// Path to the structure document, or a project template name with --named
    #[arg(value_name = "STRUCTURE", required_unless_present = "print_default")]
    pub structure: Option<String>,

    /// Directory the project folder is created in
    #[arg(value_name = "OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Treat STRUCTURE as the name of a project template in the library
    #[arg(short, long)]
    pub named: bool,

    /// Project title, available as {mp:title}
    #[arg(short, long, default_value = "")]
    pub title: String,

    /// Project description, available as {mp:description}
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Configuration file (JSON or YAML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Folder holding project templates, overrides the configuration
    #[arg(long, value_name = "DIR")]
    pub project_templates: Option<PathBuf>,

    /// Folder holding file templates, overrides the configuration
    #[arg(long, value_name = "DIR")]
    pub file_templates: Option<PathBuf>,

    /// File with code run before every code placeholder, overrides the configuration
    #[arg(long, value_name = "FILE")]
    pub preamble: Option<PathBuf>,

    /// Print the project tree instead of writing it
    #[arg(short, long)]
    pub preview: bool,

    /// How to handle paths that already exist.
    #[arg(long, value_enum, default_value_t = ConflictPolicy::Ask)]
    pub on_conflict: ConflictPolicy,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the example structure document and exit
    #[arg(long)]
    pub print_default: bool,
}

/// Parses command line arguments and returns the Args structure.
///
/// # Returns
/// * `Args` - Parsed command line arguments
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
