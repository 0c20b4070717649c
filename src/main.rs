use clap::{Parser, Subcommand};
use picsizer::config::{self, DEFAULT_CONFIG_FILE};
use picsizer::resolver::{Origin, Resolver};
use picsizer::{server, warm};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "picsizer")]
#[command(about = "On-demand image resizing server with a disk cache")]
#[command(long_about = "\
On-demand image resizing server with a disk cache

Requests name a format and an original:

  GET /<format>/<path/to/original.jpg>

The original is read from server.base_dir, converted with the [format.<format>]
profile, stored under server.cache_dir/<format>/<path> and served. Later
requests for the same URL are served straight from the cache. Anything that
cannot be served answers 404 with a 1x1 transparent GIF.

Run 'picsizer gen-config' to print a documented picsizer.toml.")]
#[command(version = env!("PICSIZER_VERSION"))]
struct Cli {
    /// Configuration file
    #[arg(long, short, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Log at debug level (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve images over HTTP
    Serve,
    /// Validate the configuration and list the formats
    Check,
    /// Pre-generate every artifact under base_dir
    Warm {
        /// Only warm these formats (repeatable); default is all
        #[arg(long = "format", short = 'f')]
        formats: Vec<String>,
    },
    /// Print a stock picsizer.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Serve => {
            let config = config::load_config(&cli.config)?;
            let resolver = Arc::new(Resolver::from_config(&config)?);
            info!(
                formats = resolver.registry().len(),
                base_dir = %config.server.base_dir.display(),
                cache_dir = %config.server.cache_dir.display(),
                "configuration loaded"
            );
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(resolver, &config.server.listen_on()))?;
        }
        Command::Check => {
            let config = config::load_config(&cli.config)?;
            let registry = config.registry()?;
            println!("==> {} is valid", cli.config.display());
            println!("Listen:    {}", config.server.listen_on());
            println!("Originals: {}", config.server.base_dir.display());
            println!("Cache:     {}", config.server.cache_dir.display());
            println!("Formats:");
            for profile in registry.profiles() {
                println!(
                    "  /{:<12} {} {}x{}",
                    profile.name, profile.operation, profile.width, profile.height
                );
            }
        }
        Command::Warm { formats } => {
            let config = config::load_config(&cli.config)?;
            let resolver = Resolver::from_config(&config)?;
            let registry = resolver.registry();
            let profiles = if formats.is_empty() {
                registry.profiles()
            } else {
                formats
                    .iter()
                    .map(|slug| {
                        registry
                            .lookup(slug)
                            .ok_or_else(|| format!("unknown format '{slug}'"))
                    })
                    .collect::<Result<Vec<_>, _>>()?
            };

            init_thread_pool(&config.processing);
            println!(
                "==> Warming {} format(s) from {}",
                profiles.len(),
                config.server.base_dir.display()
            );
            let report = warm::warm(&resolver, &profiles, |key, outcome| match outcome {
                Ok(Origin::Generated) => println!("    {key}"),
                Ok(Origin::Cached) => {}
                Err(e) => println!("    {key} FAILED: {e}"),
            });
            println!("Cache: {}", report.stats);
            if !report.failures.is_empty() {
                return Err(format!("{} artifact(s) failed", report.failures.len()).into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the config can only lower it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
