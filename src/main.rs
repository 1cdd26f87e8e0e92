use std::path::{Path, PathBuf};

use clap::Parser;
use tokentally::{
    AppState,
    analysis::{AnalysisOptions, AnalysisResult, analyze_with},
    config::{self, AppConfig},
    export::ExportFormat,
    ingest, observability, routes,
    summary::render_summary,
};

/// CLI arguments for tokentally
#[derive(Parser, Debug)]
#[command(version, about = "Token usage analyzer for API billing statements", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./tokentally.toml if it exists,
    /// otherwise built-in defaults are used)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Analyze a statement file and print a per-key, per-day summary
    Analyze {
        /// Statement file (.xlsx, .xlsm, .xls, .ods or .csv)
        file: PathBuf,
        /// Bundle to analyze (overrides analysis.target_bundle_name)
        #[arg(short, long)]
        bundle: Option<String>,
        /// Worksheet to read (defaults to the first sheet)
        #[arg(short, long)]
        sheet: Option<String>,
        /// Also write a CSV export to this path
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
        /// Also write an XLSX export to this path
        #[arg(long, value_name = "PATH")]
        xlsx: Option<PathBuf>,
        /// Print the analysis result as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Initialize a new configuration file
    Init {
        /// Path to create the config file (defaults to ./tokentally.toml)
        #[arg(short, long)]
        output: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        None | Some(Command::Serve) => run_server(args.config.as_deref()).await,
        Some(Command::Analyze {
            file,
            bundle,
            sheet,
            csv,
            xlsx,
            json,
        }) => {
            let code = run_analyze(
                args.config.as_deref(),
                AnalyzeArgs {
                    file,
                    bundle,
                    sheet,
                    csv,
                    xlsx,
                    json,
                },
            );
            std::process::exit(code);
        }
        Some(Command::Init { output, force }) => run_init(output, force),
    }
}

/// Resolve the config file to load, if any.
///
/// An explicit path must exist. Without one, `tokentally.toml` in the
/// working directory is used when present.
fn resolve_config_path(explicit_path: Option<&str>) -> Result<Option<PathBuf>, String> {
    if let Some(path) = explicit_path {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(format!("Config file not found: {}", path.display()));
        }
        return Ok(Some(path));
    }

    let cwd_config = PathBuf::from(config::DEFAULT_CONFIG_FILE);
    if cwd_config.exists() {
        return Ok(Some(cwd_config));
    }

    Ok(None)
}

/// Load configuration or exit with a message on stderr.
fn load_config(explicit_path: Option<&str>) -> AppConfig {
    let config_path = match resolve_config_path(explicit_path) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let Some(config_path) = config_path else {
        return AppConfig::default();
    };

    match AppConfig::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!(
                "Failed to load config from {}: {}",
                config_path.display(),
                e
            );
            std::process::exit(1);
        }
    }
}

fn init_tracing_or_exit(config: &AppConfig) {
    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run_server(explicit_config_path: Option<&str>) {
    let config = load_config(explicit_config_path);
    init_tracing_or_exit(&config);

    tracing::info!(
        bundle = %config.analysis.target_bundle_name,
        body_limit_bytes = config.server.body_limit_bytes,
        "Starting tokentally"
    );

    let bind_addr = config.server.bind_addr();
    let app = routes::build_app(AppState::new(config));

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %bind_addr, error = %e, "Failed to bind to address");
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on http://{}", bind_addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

struct AnalyzeArgs {
    file: PathBuf,
    bundle: Option<String>,
    sheet: Option<String>,
    csv: Option<PathBuf>,
    xlsx: Option<PathBuf>,
    json: bool,
}

/// Run a one-shot analysis. Returns the process exit code: 0 on success,
/// 1 when the file cannot be read or an export cannot be written, 2 when the
/// analysis itself fails.
fn run_analyze(explicit_config_path: Option<&str>, args: AnalyzeArgs) -> i32 {
    let config = load_config(explicit_config_path);
    init_tracing_or_exit(&config);

    let sheet = args.sheet.or_else(|| config.analysis.sheet.clone());
    let table = match ingest::read_path(&args.file, sheet.as_deref()) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let mut options = AnalysisOptions::from(&config.analysis);
    if let Some(bundle) = args.bundle {
        options.target_bundle = bundle;
    }

    let result = analyze_with(&table, &options);

    if args.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize result: {}", e);
                return 1;
            }
        }
    }

    let report = match &result {
        AnalysisResult::Success(report) => report,
        AnalysisResult::Failure(failure) => {
            if !args.json {
                eprintln!("{}", failure.error);
            }
            return 2;
        }
    };

    if !args.json {
        print!("{}", render_summary(report));
    }

    let exports = [
        (args.csv, ExportFormat::Csv),
        (args.xlsx, ExportFormat::Xlsx),
    ];
    for (path, format) in exports {
        let Some(path) = path else { continue };
        if let Err(e) = write_export(&result, &config, format, &path) {
            eprintln!("Failed to write {}: {}", path.display(), e);
            return 1;
        }
        eprintln!("Wrote {}", path.display());
    }

    0
}

fn write_export(
    result: &AnalysisResult,
    config: &AppConfig,
    format: ExportFormat,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = format.export(result, &config.export)?;
    std::fs::write(path, data)?;
    Ok(())
}

/// Create a default configuration file.
fn run_init(output: Option<String>, force: bool) {
    let output_path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILE));

    if output_path.exists() && !force {
        eprintln!(
            "Config file already exists: {}\nUse --force to overwrite.",
            output_path.display()
        );
        std::process::exit(1);
    }

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create directory {}: {}", parent.display(), e);
        std::process::exit(1);
    }

    if let Err(e) = std::fs::write(&output_path, config::default_config_toml()) {
        eprintln!("Failed to write config file: {}", e);
        std::process::exit(1);
    }

    println!("Created config file: {}", output_path.display());
    println!();
    println!("To start the server, run:");
    println!("  tokentally serve --config {}", output_path.display());
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
