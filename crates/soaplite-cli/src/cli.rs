use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "SOAPLite Developers",
    version,
    about = "SOAPLite CLI - Compute SOAP descriptors for molecules and crystals with the precompiled SOAPLite modules.",
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

    /// Set the number of threads used to process frames in parallel.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute SOAP descriptors for every frame of an extended XYZ file.
    Compute(ComputeArgs),
    /// Write the periodic supercell used for each frame of an extended XYZ file.
    Supercell(SupercellArgs),
    /// Show which native SOAPLite modules can be found.
    Modules(ModulesArgs),
}

/// Arguments for the `compute` subcommand.
#[derive(Args, Debug)]
pub struct ComputeArgs {
    // --- Core Arguments ---
    /// Path to the input structure file (extended XYZ, one or more frames).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output CSV file. Several frames produce `NAME_1.csv`, `NAME_2.csv`, ...
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Radial basis coefficient file (TOML with `alphas` and `betas`).
    #[arg(short, long, value_name = "PATH")]
    pub basis: Option<PathBuf>,

    /// Directory containing the compiled `libsoapPy*` modules.
    #[arg(long, value_name = "DIR")]
    pub library_dir: Option<PathBuf>,

    // --- Descriptor Overrides ---
    /// Override the cutoff radius in Angstrom.
    #[arg(short = 'r', long, value_name = "FLOAT")]
    pub cutoff: Option<f64>,

    /// Override the number of radial basis functions.
    #[arg(short = 'n', long, value_name = "INT")]
    pub n_max: Option<usize>,

    /// Override the maximum angular degree.
    #[arg(short = 'l', long, value_name = "INT")]
    pub l_max: Option<usize>,

    /// Only compute same-species terms.
    #[arg(long)]
    pub no_cross_species: bool,

    /// Fix the species list, as symbols or atomic numbers (e.g. `H,O` or `1,8`).
    #[arg(short, long, value_name = "LIST", value_delimiter = ',')]
    pub species: Vec<String>,

    /// Evaluate descriptors at the points in this CSV file (`x,y,z` per line)
    /// instead of at the atoms.
    #[arg(long, value_name = "PATH")]
    pub centers: Option<PathBuf>,

    #[command(flatten)]
    pub periodicity: Periodicity,
}

/// Mutually exclusive flags overriding the periodicity taken from the input file.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct Periodicity {
    /// Treat every frame as periodic (frames without a lattice fail).
    #[arg(long)]
    pub periodic: bool,
    /// Treat every frame as a finite cluster, ignoring any lattice.
    #[arg(long)]
    pub non_periodic: bool,
}

/// Arguments for the `supercell` subcommand.
#[derive(Args, Debug)]
pub struct SupercellArgs {
    /// Path to the input structure file (extended XYZ).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output extended XYZ file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Cutoff radius in Angstrom the supercell must accommodate.
    #[arg(short = 'r', long, value_name = "FLOAT")]
    pub cutoff: Option<f64>,
}

/// Arguments for the `modules` subcommand.
#[derive(Args, Debug)]
pub struct ModulesArgs {
    /// Directory containing the compiled `libsoapPy*` modules.
    #[arg(long, value_name = "DIR")]
    pub library_dir: Option<PathBuf>,

    /// Also load each module and check that it exports the `soap` entry point.
    #[arg(long)]
    pub load: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_arguments_parse_species_lists_and_flags() {
        let cli = Cli::parse_from([
            "soaplite",
            "-vv",
            "compute",
            "-i",
            "in.xyz",
            "-o",
            "out.csv",
            "--species",
            "H,8",
            "--no-cross-species",
            "--periodic",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Compute(args) = cli.command else {
            panic!("expected compute command");
        };
        assert_eq!(args.species, vec!["H".to_string(), "8".to_string()]);
        assert!(args.no_cross_species);
        assert!(args.periodicity.periodic);
        assert!(!args.periodicity.non_periodic);
        assert_eq!(args.config, None);
    }

    #[test]
    fn periodicity_flags_are_mutually_exclusive() {
        let result = Cli::try_parse_from([
            "soaplite",
            "compute",
            "-i",
            "in.xyz",
            "-o",
            "out.csv",
            "--periodic",
            "--non-periodic",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["soaplite", "-q", "-v", "modules"]);
        assert!(result.is_err());
    }
}
