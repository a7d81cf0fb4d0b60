mod cli;
mod logging;
mod reporter;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, FilterArgs};
use colored::*;
use dirstat::ingest::stats_file::StatsFanOut;
use dirstat::ingest::walk::Walker;
use dirstat::{AppConfig, BuildEngine, DirCountSize, Tree};
use dotenv::dotenv;
use reporter::CliReporter;
use tracing::{error, info};

fn main() -> Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match dirstat::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let outcome = match args.command {
        Some(Commands::Walk {
            dir,
            output,
            parallel_jobs,
        }) => run_walk(&config, &dir, &output, parallel_jobs),
        Some(Commands::Build {
            store,
            root,
            stats_files,
        }) => run_build(&config, store, root, &stats_files),
        Some(Commands::Info { store, dir, filter }) => run_info(&config, store, &dir, &filter),
        Some(Commands::Where {
            store,
            dir,
            depth,
            filter,
        }) => run_where(&config, store, &dir, depth, &filter),
        Some(Commands::PrintConfig) => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        None => {
            print_help(&mut io::stdout())?;
            Ok(())
        }
    };

    if let Err(err) = outcome {
        if let Some(dirstat::Error::NotFound(dir)) = err.downcast_ref::<dirstat::Error>() {
            eprintln!("{} {}", "Directory not found in store:".red(), dir);
            process::exit(2);
        }
        error!("Error: {:#}", err);
        process::exit(1);
    }

    Ok(())
}

fn run_walk(config: &AppConfig, dir: &Path, output: &Path, jobs: usize) -> Result<()> {
    let walker = Walker::new(dir, &config.ignore_patterns)
        .with_context(|| format!("cannot walk {}", dir.display()))?;
    let mut writer = StatsFanOut::create(output, jobs)
        .with_context(|| format!("cannot create stats files in {}", output.display()))?;

    info!("Walking {}...", walker.root().display());
    let start = Instant::now();
    for obs in walker.observations() {
        writer.write(&obs?)?;
    }
    let (paths, written) = writer.finish()?;

    info!(
        "Walk: {}, {} observations written to {} files in {}",
        format!("{:.2}s", start.elapsed().as_secs_f64()).green(),
        format!("{}", written).cyan(),
        paths.len(),
        output.display(),
    );
    Ok(())
}

fn run_build(
    config: &AppConfig,
    store: Option<PathBuf>,
    root: Option<String>,
    stats_files: &[PathBuf],
) -> Result<()> {
    let mut engine = BuildEngine::new(config.clone());
    if let Some(store) = store {
        engine = engine.with_store_path(store);
    }
    if let Some(root) = root {
        engine = engine.with_root(&root);
    }

    let reporter = CliReporter::new();
    let result = engine.build(stats_files, &reporter)?;

    println!();
    info!(
        "Aggregate: {}, Write: {}",
        format!("{:.2}s", result.ingest_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.summary.duration.as_secs_f64()).green(),
    );
    info!(
        "{} observations, {} directories, {} group/user/type combinations stored in {}",
        format!("{}", result.summary.observations).cyan(),
        format!("{}", result.summary.dirs).cyan(),
        format!("{}", result.summary.combinations).cyan(),
        engine.store_path().display(),
    );
    Ok(())
}

fn open_tree(config: &AppConfig, store: Option<PathBuf>) -> Result<Tree> {
    let path = store.unwrap_or_else(|| PathBuf::from(&config.store_path));
    Tree::open(&path).with_context(|| format!("cannot open store {}", path.display()))
}

fn run_info(config: &AppConfig, store: Option<PathBuf>, dir: &str, filter: &FilterArgs) -> Result<()> {
    let tree = open_tree(config, store)?;
    let filter = filter.to_filter()?;

    let mut info = tree.dir_info(dir, &filter)?;
    info.children.sort_by(|a, b| b.size.cmp(&a.size));

    print_row(&info.current, 0);
    for child in &info.children {
        print_row(child, 2);
    }
    Ok(())
}

fn run_where(
    config: &AppConfig,
    store: Option<PathBuf>,
    dir: &str,
    depth: Option<usize>,
    filter: &FilterArgs,
) -> Result<()> {
    let tree = open_tree(config, store)?;
    let filter = filter.to_filter()?;
    let depth = depth.unwrap_or(config.default_depth);

    for dcs in tree.where_(dir, &filter, depth)? {
        print_row(&dcs, 0);
    }
    Ok(())
}

fn print_help(out: &mut impl Write) -> io::Result<()> {
    Cli::command().write_long_help(out)?;
    out.flush()
}

fn print_row(dcs: &DirCountSize, indent: usize) {
    println!(
        "{:indent$}{:>10}  {:>12}  {}",
        "",
        format_size(dcs.size).green(),
        format!("{} files", dcs.count).cyan(),
        dcs.dir,
        indent = indent,
    );
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
