mod config;
mod ensemble;
mod error;
mod partitioner;
mod store;
mod ui;

use clap::{ArgAction, Parser};
use config::RunConfig;
use std::fs;
use std::path::{Path, PathBuf};
use store::DirFeatureStore;
use ui::output;

/// netsift ranks anomalous hosts by evidence accumulation clustering over
/// multi-granularity traffic features
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding per-granularity feature documents (level_<width>.json)
    #[arg(short = 'd', long, value_parser)]
    data_dir: String,

    /// Optional JSON run configuration
    #[arg(short = 'c', long, value_parser)]
    config: Option<String>,

    /// Directory to write artifacts (ranked table, member records)
    #[arg(short = 'o', long, value_parser)]
    output_dir: Option<String>,

    /// Base partitioner strategy to run
    #[arg(short = 'p', long, value_parser)]
    strategy: Option<String>,

    /// Center cluster count k
    #[arg(short = 'k', long, value_parser)]
    clusters: Option<usize>,

    /// How many ranked rows to print
    #[arg(short = 't', long, default_value_t = 20, value_parser)]
    top: usize,

    /// Display output as formatted JSON
    #[arg(short = 'j', long, action = ArgAction::SetTrue)]
    json: bool,
}

fn build_config(args: &Args) -> Result<RunConfig, error::EacError> {
    let mut config = match args.config.as_deref() {
        Some(path) => RunConfig::from_file(Path::new(path))?,
        None => RunConfig::default(),
    };
    if let Some(strategy) = &args.strategy {
        config.strategy = strategy.clone();
    }
    if let Some(k) = args.clusters {
        config.base_clusters = k;
    }
    config.validate()?;
    Ok(config)
}

fn main() {
    simple_logger::init_with_env().unwrap();

    let args = Args::parse();
    let out;

    if let Some(out_dir) = args.output_dir.as_deref() {
        log::info!("Output directory {out_dir}");
        let _ = fs::create_dir_all(out_dir);
        out = Some(PathBuf::from(out_dir));
    } else {
        log::warn!("No output directory specified; nothing will be persisted.");
        out = None;
    }

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Bad configuration: {e}");
            log::error!("Known strategies: {}", partitioner::known_strategies().join(", "));
            std::process::exit(1);
        }
    };

    let store = DirFeatureStore::new(&args.data_dir);
    let outcome = match ensemble::core::run(&config, &store, out.as_deref()) {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("Run failed: {e}");
            std::process::exit(1);
        }
    };

    // ---- Output ----
    if args.json {
        let json = output::data_as_json(&outcome);
        if let Some(dir) = out.as_deref() {
            let _ = output::data_to_file(json.unwrap(), &dir.join("ranked_hosts.json"));
        } else {
            println!("{}", json.unwrap());
        }
    } else {
        output::print_results(&outcome, args.top);
    }
    if let Some(dir) = out.as_deref() {
        if let Err(e) = output::save_ranked_table(&outcome, dir) {
            log::error!("Could not persist ranked table: {e}");
        }
    }
}
