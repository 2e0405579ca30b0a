use crate::utils::parser::parse_supercell;
use clap::{Args, Parser, Subcommand};
use prlstructure::core::models::lattice::SupercellMatrix;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Phases Research Lab",
    version,
    about = "PRLStructure CLI - Generate symmetry-distinct endmember, dilute and SQS structures for CALPHAD sublattice models.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the sublattices of a structure as found from its symmetry.
    Sublattice(SublatticeArgs),
    /// Generate every endmember of a sublattice model from a prototype structure.
    Endmembers(EndmembersArgs),
    /// Generate endmembers and their single-site substitutions.
    Dilute(DiluteArgs),
    /// Decorate abstract SQS from a database with the species of a sublattice model.
    Sqs(SqsArgs),
}

/// Arguments for the `sublattice` subcommand.
#[derive(Args, Debug)]
pub struct SublatticeArgs {
    /// Path to the input structure (POSCAR, or JSON by `.json` extension).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Symmetry tolerance in Angstrom (default 0.01).
    #[arg(long, value_name = "FLOAT")]
    pub symprec: Option<f64>,

    /// Tell apart symmetry orbits that share a Wyckoff letter.
    #[arg(long)]
    pub use_equivalent_atom: bool,

    /// Merge sublattices into one, e.g. `--merge a,b`. Can be used multiple times.
    #[arg(short, long = "merge", value_name = "LABELS")]
    pub merge: Vec<String>,

    /// Print the result as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Arguments shared by the commands that substitute a prototype structure.
#[derive(Args, Debug)]
pub struct GenerationArgs {
    // --- Core Arguments ---
    /// Path to the input prototype structure (POSCAR, or JSON by `.json` extension).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Directory that receives the generated structures and `metadata.json`.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    /// Path to the configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    // --- Overrides ---
    /// Override the phase name recorded in the metadata.
    #[arg(short, long, value_name = "NAME")]
    pub phase_name: Option<String>,

    /// Override the symmetry tolerance.
    #[arg(long, value_name = "FLOAT")]
    pub symprec: Option<f64>,

    /// Tell apart symmetry orbits that share a Wyckoff letter.
    #[arg(long)]
    pub use_equivalent_atom: bool,

    /// Override the CSV table of elemental densities (`element,density`).
    #[arg(long, value_name = "PATH")]
    pub density_table: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S symprec=0.001
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `endmembers` subcommand.
#[derive(Args, Debug)]
pub struct EndmembersArgs {
    #[command(flatten)]
    pub common: GenerationArgs,
}

/// Arguments for the `dilute` subcommand.
#[derive(Args, Debug)]
pub struct DiluteArgs {
    #[command(flatten)]
    pub common: GenerationArgs,

    /// Override the supercell that hosts each substitution, e.g. `2x2x2`.
    #[arg(long, value_name = "AxBxC", value_parser = parse_supercell)]
    pub supercell: Option<SupercellMatrix>,
}

/// Arguments for the `sqs` subcommand.
#[derive(Args, Debug)]
pub struct SqsArgs {
    // --- Core Arguments ---
    /// Path to the SQS database (JSON array of abstract SQS records).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub database: PathBuf,

    /// Directory that receives the generated structures and `metadata.json`.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    /// Path to the configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    // --- Overrides ---
    /// Override the structure prototype to search for.
    #[arg(long, value_name = "NAME")]
    pub prototype: Option<String>,

    /// Keep the database lattice instead of scaling it to the species densities.
    #[arg(long)]
    pub no_scale_volume: bool,

    /// Skip candidates that cannot be made concrete instead of failing.
    #[arg(long)]
    pub skip_on_failure: bool,

    /// Override the CSV table of elemental densities (`element,density`).
    #[arg(long, value_name = "PATH")]
    pub density_table: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S sqs.prototype=L12
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
