use clap::{Args, Parser, Subcommand};
use dirstat::Filter;
use std::path::PathBuf;

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "dirstat")]
#[command(about = "Disk usage rollups by directory, group, user and file type", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Comma-separated group ids to include (default: all)
    #[arg(long, default_value = "")]
    pub gids: String,
    /// Comma-separated user ids to include (default: all)
    #[arg(long, default_value = "")]
    pub uids: String,
    /// Comma-separated file types to include, eg. regular,symlink (default: all)
    #[arg(long, default_value = "")]
    pub types: String,
}

impl FilterArgs {
    pub fn to_filter(&self) -> dirstat::Result<Filter> {
        Filter::parse(&self.gids, &self.uids, &self.types)
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Walk a directory, writing one observation per entry to stats files
    /// `walk.0` .. `walk.<N-1>` in the output directory
    Walk {
        dir: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Number of stats files to spread the observations over
        #[arg(short = 'j', long, default_value_t = 1)]
        parallel_jobs: usize,
    },
    /// Aggregate stats files into a new store
    Build {
        /// Where to create the store (default: store_path from config)
        #[arg(short, long)]
        store: Option<PathBuf>,
        /// Highest directory to roll usage up to (default: scan_root from config)
        #[arg(short, long)]
        root: Option<String>,
        #[arg(required = true)]
        stats_files: Vec<PathBuf>,
    },
    /// Show usage of a directory and of its immediate children
    Info {
        #[arg(short, long)]
        store: Option<PathBuf>,
        dir: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show where matching files are nested beneath a directory
    Where {
        #[arg(short, long)]
        store: Option<PathBuf>,
        dir: String,
        /// How many levels of branch points to descend (default: default_depth from config)
        #[arg(short, long)]
        depth: Option<usize>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print configuration values
    PrintConfig,
}
