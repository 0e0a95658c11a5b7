use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vectorize_mcp::client::{VectorizeApi, VectorizeClient};
use vectorize_mcp::config::{find_config_file, load_config};
use vectorize_mcp::mcp::server::McpServer;
use vectorize_mcp::mcp::{catalog, ToolRegistry, ToolSettings};

/// Vectorize MCP - retrieval, extraction and deep research tools for MCP clients
#[derive(Parser, Debug)]
#[command(name = "vectorize-mcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server for Vectorize retrieval, extraction and deep research", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server (default)
    Serve {
        /// Run in HTTP mode instead of stdio
        #[arg(long)]
        http: bool,

        /// Port for HTTP mode
        #[arg(long, short, default_value_t = 3000)]
        port: u16,

        /// Host to bind to for HTTP mode
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Print the tool catalog as JSON
    #[command(alias = "ls")]
    Tools,

    /// Call a single tool and print the result envelope
    Call {
        /// Tool name (retrieve, extract, deep-research)
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(long, short, default_value = "{}")]
        args: String,
    },
}

/// Print all available environment variables
fn print_env_vars() {
    println!("Vectorize MCP - Environment Variables");
    println!();
    println!("Required:");
    println!("  VECTORIZE_ORG_ID               Vectorize organization ID");
    println!("  VECTORIZE_TOKEN                Vectorize access token");
    println!();
    println!("Optional:");
    println!("  VECTORIZE_PIPELINE_ID          Default pipeline for retrieve and deep-research");
    println!("  VECTORIZE_API_URL              API base URL (default: https://api.vectorize.io/v1)");
    println!("  VECTORIZE_POLL_INTERVAL_MS     Delay between job status polls (default: 1000)");
    println!("  VECTORIZE_POLL_TIMEOUT_SECS    Maximum time to wait for a job, 0 = no limit (default: 300)");
    println!("  VECTORIZE_POLL_MAX_ATTEMPTS    Maximum number of status polls per job");
    println!("  VECTORIZE_CHUNK_SIZE           Chunk size for extractions (default: 512)");
    println!("  VECTORIZE_UPLOAD_FILE_NAME     Name given to uploaded files (default: My File)");
    println!("  VECTORIZE_REQUEST_TIMEOUT_SECS HTTP request timeout (default: 30)");
    println!();
    println!("Other Settings:");
    println!("  RUST_LOG                       Rust logging level (e.g., debug, info, warn, error)");
    println!();
    println!("Example:");
    println!("  export VECTORIZE_ORG_ID=\"your-org-id\"");
    println!("  export VECTORIZE_TOKEN=\"your-token\"");
    println!("  export VECTORIZE_PIPELINE_ID=\"your-pipeline-id\"");
}

/// Initialize tracing on stderr; stdout carries the stdio transport
fn init_tracing(verbose: u8, quiet: bool, json: bool) {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if quiet { "error" } else { log_level };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("vectorize_mcp={}", env_filter)),
    );

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Cancel `token` when Ctrl-C is received
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C, cancelling in-flight tool calls");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show environment variables and exit if requested
    if cli.env {
        print_env_vars();
        return Ok(());
    }

    init_tracing(cli.verbose, cli.quiet, cli.log_json);

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }
    let config = load_config(config_path.as_deref())?;

    let command = cli.command.unwrap_or(Commands::Serve {
        http: false,
        port: 3000,
        host: "127.0.0.1".to_string(),
    });

    match command {
        Commands::Tools => {
            let tools = catalog(config.default_pipeline_id().is_some());
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }

        Commands::Serve { http, port, host } => {
            // Missing credentials stop the process before anything is served
            let config = config.validate()?;
            let server = McpServer::new(&config)?;
            let shutdown = server.shutdown_token();
            cancel_on_ctrl_c(shutdown.clone());

            if http {
                let addr = format!("{}:{}", host, port);
                let (bound_addr, handle) = server.run_http(&addr).await?;
                tracing::info!("MCP server listening on {}", bound_addr);

                tokio::select! {
                    result = handle => {
                        result.map_err(|e| anyhow::anyhow!("Server task failed: {}", e))?;
                    }
                    _ = shutdown.cancelled() => {}
                }
            } else {
                tokio::select! {
                    result = server.run() => result?,
                    _ = shutdown.cancelled() => {}
                }
            }
        }

        Commands::Call { tool, args } => {
            let config = config.validate()?;
            let args: serde_json::Value =
                serde_json::from_str(&args).context("--args must be a JSON object")?;

            let client =
                VectorizeClient::new(&config.api_url, &config.token, config.request_timeout())?;
            let api: Arc<dyn VectorizeApi> = Arc::new(client);
            let registry = ToolRegistry::new(api, ToolSettings::from_config(&config));

            let cancel = CancellationToken::new();
            cancel_on_ctrl_c(cancel.clone());

            let result = registry.call(&tool, args, &cancel).await;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if result.is_error {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_version() {
        let version = env!("CARGO_PKG_VERSION");
        assert!(!version.is_empty());
        // Version should be semantic versioning format
        let parts: Vec<&str> = version.split('.').collect();
        assert!(parts.len() >= 2);
        assert!(parts[0].parse::<u32>().is_ok());
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["vectorize-mcp"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert!(!cli.log_json);
        assert!(cli.config.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["vectorize-mcp", "-v"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["vectorize-mcp", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_config_flag() {
        let cli = Cli::parse_from(["vectorize-mcp", "--config", "/path/to/config.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
    }

    #[test]
    fn test_cli_serve_command() {
        let cli = Cli::parse_from(["vectorize-mcp", "serve"]);
        match &cli.command {
            Some(Commands::Serve { http, port, host }) => {
                assert!(!*http);
                assert_eq!(*port, 3000);
                assert_eq!(host, "127.0.0.1");
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_serve_http_mode() {
        let cli = Cli::parse_from(["vectorize-mcp", "serve", "--http", "--port", "8080"]);
        match &cli.command {
            Some(Commands::Serve { http, port, .. }) => {
                assert!(*http);
                assert_eq!(*port, 8080);
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_tools_alias() {
        let cli = Cli::parse_from(["vectorize-mcp", "ls"]);
        assert!(matches!(cli.command, Some(Commands::Tools)));
    }

    #[test]
    fn test_cli_call_command() {
        let cli = Cli::parse_from([
            "vectorize-mcp",
            "call",
            "retrieve",
            "--args",
            r#"{"question":"q"}"#,
        ]);
        match &cli.command {
            Some(Commands::Call { tool, args }) => {
                assert_eq!(tool, "retrieve");
                assert_eq!(args, r#"{"question":"q"}"#);
            }
            _ => panic!("Expected Call command"),
        }
    }

    #[test]
    fn test_cli_call_default_args() {
        let cli = Cli::parse_from(["vectorize-mcp", "call", "extract"]);
        match &cli.command {
            Some(Commands::Call { args, .. }) => assert_eq!(args, "{}"),
            _ => panic!("Expected Call command"),
        }
    }
}
