//! GLV MCP server — entry point.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use glv_mcp::config::{ConfigOverrides, ServerContext};
use glv_mcp::protocol::ProtocolHandler;
use glv_mcp::tools::ToolRegistry;
use glv_mcp::transport::StdioTransport;

#[derive(Parser)]
#[command(
    name = "glv-mcp",
    about = "MCP server for the GLV toolbox — image reading, vision Q&A, and document extraction",
    version
)]
struct Cli {
    /// API base URL (overrides GLM_BASE_URL).
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Vision model name (overrides GLM_VISION_MODEL).
    #[arg(long, global = true)]
    model: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve,

    /// Print server capabilities and tools as JSON.
    Info,

    /// Report the effective endpoint, model, and whether a credential is configured.
    Check,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   glv-mcp completions bash > ~/.local/share/bash-completion/completions/glv-mcp
    ///   glv-mcp completions zsh > ~/.zfunc/_glv-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Launch interactive REPL mode.
    Repl,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let overrides = ConfigOverrides {
        base_url: cli.base_url,
        vision_model: cli.model,
    };
    let context = ServerContext::from_env(overrides);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let config = context.api_config();
            tracing::info!("GLV MCP server v{}", env!("CARGO_PKG_VERSION"));
            tracing::info!("Endpoint: {} (model {})", config.base_url, config.vision_model);
            if config.has_credential() {
                tracing::info!("Credential: configured");
            } else {
                tracing::warn!(
                    "{} is not set; vision_query and process_file will fail until it is",
                    glv::config::API_KEY_ENV
                );
            }

            let transport = StdioTransport::new(ProtocolHandler::new(context));
            transport.run().await?;
        }

        Commands::Info => {
            let capabilities = glv_mcp::types::InitializeResult::default_result();
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Check => {
            let config = context.api_config();
            println!("Endpoint:   {}", config.base_url);
            println!("Model:      {}", config.vision_model);
            if config.has_credential() {
                println!("Credential: configured ({})", glv::config::API_KEY_ENV);
            } else {
                println!("Credential: missing (set {})", glv::config::API_KEY_ENV);
                std::process::exit(1);
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "glv-mcp", &mut std::io::stdout());
        }

        Commands::Repl => {
            let runtime = tokio::runtime::Handle::current();
            tokio::task::spawn_blocking(move || glv_mcp::repl::run(context, runtime)).await??;
        }
    }

    Ok(())
}
