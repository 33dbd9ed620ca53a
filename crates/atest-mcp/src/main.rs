//! atest MCP Server
//!
//! A Model Context Protocol server that exposes the api-testing runner to
//! agents.
//!
//! # Usage
//!
//! ```bash
//! atest-mcp server --runner-address localhost:7070 [--port 7845] [--mode http|stdio|sse]
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Control log verbosity (default: `atest_mcp=info`)
//! - `ATEST_RUNNER_ADDRESS`: Runner address when `--runner-address` is not given
//! - `ATEST_MCP_MODE`: Transport when `--mode` is not given
//!
//! Logs go to stderr so stdout stays free for the stdio transport.

use atest_mcp::config::{DEFAULT_DOCS_BASE_URL, DEFAULT_PORT};
use atest_mcp::{AtestMcpServer, ServerConfig, TransportMode};
use clap::{Parser, Subcommand};

/// MCP server for the api-testing runner
#[derive(Parser)]
#[command(name = "atest-mcp")]
#[command(about = "MCP server for the api-testing runner")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run server
    Server(ServerArgs),
}

#[derive(clap::Args)]
struct ServerArgs {
    /// The port to run server
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// The address of the runner
    #[arg(long, env = "ATEST_RUNNER_ADDRESS")]
    runner_address: String,

    /// Transport to serve MCP on
    #[arg(long, value_enum, env = "ATEST_MCP_MODE", default_value_t = TransportMode::Http)]
    mode: TransportMode,

    /// Base URL that file: resources are fetched from
    #[arg(long, default_value = DEFAULT_DOCS_BASE_URL)]
    docs_base_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging to stderr (stdout is reserved for the stdio transport)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("atest_mcp=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => {
            let config = ServerConfig::new(args.runner_address)
                .with_port(args.port)
                .with_mode(args.mode)
                .with_docs_base_url(args.docs_base_url);

            tracing::info!(
                mode = %config.mode,
                port = config.port,
                runner = %config.runner_address,
                "Starting atest-mcp server"
            );

            let mut server = AtestMcpServer::connect(config);
            server.initialize()?;
            server.run().await?;
        }
    }

    Ok(())
}
