use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "esmpack",
    about = "Create, inspect and extract esm-archive bundles.",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(visible_alias = "c", about = "Bundle files into a new archive")]
    Create(CreateArgs),

    #[command(visible_alias = "x", about = "Extract entries from an archive")]
    Extract(ExtractArgs),

    #[command(visible_aliases = ["l", "ls"], about = "List entries in an archive")]
    List(ListArgs),

    #[command(about = "Show archive or entry metadata")]
    Info(InfoArgs),

    #[command(visible_alias = "t", about = "Check archive structure and checksum")]
    Validate(ValidateArgs),
}

#[derive(Debug, clap::Args)]
#[command(after_help = "\
\x1b[1m\x1b[4mExamples:\x1b[0m
  esmpack create app.esma index.js styles.css
  esmpack create -r app.esma dist/
  esmpack create -r -f -j 4 app.esma dist/ public/")]
pub struct CreateArgs {
    /// Output archive path
    pub archive: PathBuf,

    /// Recurse into directories
    #[arg(short = 'r', long)]
    pub recursive: bool,

    /// Include hidden files
    #[arg(short = 'a', long = "all")]
    pub include_hidden: bool,

    /// Suppress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Overwrite existing archive
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Read files sequentially
    #[arg(long)]
    pub serial: bool,

    /// Number of files read at once (default: CPU count)
    #[arg(short = 'j', long = "jobs")]
    pub jobs: Option<usize>,

    /// Files and directories to bundle
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct ExtractArgs {
    /// Path to the archive to extract
    pub archive: PathBuf,

    /// Output directory (defaults to current directory)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Suppress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Specific entries to extract (extracts all if none specified)
    pub names: Vec<String>,
}

#[derive(Debug, clap::Args)]
pub struct ListArgs {
    /// Path to the archive
    pub archive: PathBuf,

    /// Show detailed information (media type, modification time)
    #[arg(short = 'l', long)]
    pub long: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args)]
pub struct InfoArgs {
    /// Path to the archive
    pub archive: PathBuf,

    /// Optional entry name to show info for
    pub name: Option<String>,
}

#[derive(Debug, clap::Args)]
pub struct ValidateArgs {
    /// Path to the archive
    pub archive: PathBuf,

    /// Suppress output
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn aliases() {
        let cli = Cli::try_parse_from(["esmpack", "ls", "-l", "app.esma"]).unwrap();
        assert!(matches!(cli.command, Commands::List(ListArgs { long: true, .. })));

        let cli = Cli::try_parse_from(["esmpack", "x", "app.esma", "-o", "out", "a.js"]).unwrap();
        match cli.command {
            Commands::Extract(args) => {
                assert_eq!(args.output, Some(PathBuf::from("out")));
                assert_eq!(args.names, ["a.js"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn create_requires_paths() {
        assert!(Cli::try_parse_from(["esmpack", "create", "app.esma"]).is_err());
    }
}
