use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full Collect / Transcode / Rewrite-Trees / Rewrite-Commits
    /// pipeline over a commit/tree input stream.
    Run {
        /// Path to the newline-delimited commit/tree record stream.
        #[clap(long)]
        input: PathBuf,

        /// Path to a TOML config file; defaults are used for any field
        /// it doesn't set, and any flag below overrides both.
        #[clap(long)]
        config: Option<PathBuf>,

        #[clap(long)]
        source_root: Option<PathBuf>,

        #[clap(long)]
        output_root: Option<PathBuf>,

        #[clap(long)]
        binary_staging_root: Option<PathBuf>,

        #[clap(long)]
        no_binary_staging: bool,

        #[clap(long)]
        max_commits: Option<usize>,
    },

    #[clap(subcommand)]
    Config(ConfigCommands),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration after merging the file and
    /// any overrides.
    Show {
        #[clap(long)]
        config: Option<PathBuf>,
    },
}
