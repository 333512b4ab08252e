use a2a_knn::pipeline::{AllToAllPipeline, PipelineOutcome};
use a2a_knn::storage::JsonFileStore;
use a2a_knn::KnnConfig;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Default)]
struct Args {
    store: Option<PathBuf>,
    config: Option<PathBuf>,
    memory_ratio: Option<f64>,
    batch_size: Option<usize>,
    threads: Option<usize>,
    sequential: bool,
    k: Option<usize>,
    store_distances: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = parse_args()?;
    let store_path = args
        .store
        .clone()
        .ok_or("missing store path (see --help)")?;
    let config = build_config(&args)?;

    let mut store = JsonFileStore::open(&store_path);
    let pipeline = AllToAllPipeline::new(config)?;

    let start = Instant::now();
    match pipeline.run(&mut store)? {
        PipelineOutcome::AlreadyPresent => {
            tracing::info!(path = %store_path.display(), "Nothing to do");
        }
        PipelineOutcome::Computed {
            num_points,
            k,
            batch_size,
            num_batches,
        } => {
            tracing::info!(
                num_points,
                k,
                batch_size,
                num_batches,
                seconds = start.elapsed().as_secs_f64(),
                "Computed all-to-all neighbors"
            );
        }
    }
    Ok(())
}

fn build_config(args: &Args) -> Result<KnnConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => KnnConfig::from_json_file(path)?,
        None => KnnConfig::default(),
    };
    if let Some(ratio) = args.memory_ratio {
        config = config.with_memory_ratio(ratio);
    }
    if let Some(batch_size) = args.batch_size {
        config = config.with_batch_size(batch_size);
    }
    if args.sequential {
        config = config.sequential();
    } else if args.threads.is_some() {
        config = config.parallel(args.threads);
    }
    if let Some(k) = args.k {
        config = config.with_num_neighbors(k);
    }
    if args.store_distances {
        config = config.with_distances();
    }
    config.validate()?;
    Ok(config)
}

fn parse_args() -> Result<Args, Box<dyn Error>> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);

    while let Some(flag) = it.next() {
        match flag.as_str() {
            "--config" => {
                let v = required_value(&flag, it.next())?;
                args.config = Some(PathBuf::from(v));
            }
            "--memory-ratio" => {
                let v = required_value(&flag, it.next())?;
                args.memory_ratio = Some(v.parse()?);
            }
            "--batch-size" => {
                let v = required_value(&flag, it.next())?;
                args.batch_size = Some(v.parse()?);
            }
            "--threads" => {
                let v = required_value(&flag, it.next())?;
                args.threads = Some(v.parse()?);
            }
            "--k" => {
                let v = required_value(&flag, it.next())?;
                args.k = Some(v.parse()?);
            }
            "--sequential" => args.sequential = true,
            "--store-distances" => args.store_distances = true,
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown argument: {other}").into());
            }
            _ => {
                if args.store.is_some() {
                    return Err(format!("unexpected argument: {flag}").into());
                }
                args.store = Some(PathBuf::from(flag));
            }
        }
    }

    Ok(args)
}

fn required_value(flag: &str, value: Option<String>) -> Result<String, Box<dyn Error>> {
    value.ok_or_else(|| format!("missing value for {flag}").into())
}

fn print_help() {
    println!(
        "a2a-knn\n\
        Exact all-to-all K nearest neighbors over the train and test datasets\n\
        of a JSON store. Writes the table as `all_to_all_neighbors` unless it\n\
        already exists.\n\n\
        Usage:\n\
          a2a-knn <store.json> [options]\n\n\
        Options:\n\
          --config FILE         JSON configuration file\n\
          --memory-ratio F      fraction of available memory for batch sizing (default 0.1)\n\
          --batch-size N        fixed batch size, bypassing the memory planner\n\
          --threads N           worker count (default: number of CPUs)\n\
          --sequential          run batches on one thread\n\
          --k N                 neighbors per point (default: columns of `neighbors`)\n\
          --store-distances     also write `all_to_all_neighbors_distances`\n\
          -h, --help            show this help\n\n\
        Logging is controlled by RUST_LOG (default: info)."
    );
}
