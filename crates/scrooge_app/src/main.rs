use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use tracing::{error, info, warn};

use scrooge_chain::{DeployedContract, HttpProvider, deploy_token};
use scrooge_core::config::ENV_LOG_DIR;
use scrooge_core::logging;
use scrooge_core::{DeployConfig, DeployError, load_dotenv};

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Deployment run
// ---------------------------------------------------------------------------

/// Resolve configuration, connect to the node and deploy.
///
/// Configuration is resolved before the provider exists, so a bad value
/// never reaches the network.
async fn run<F, W>(lookup: F, out: &mut W) -> Result<DeployedContract, DeployError>
where
    F: Fn(&str) -> Option<String>,
    W: Write,
{
    let config = DeployConfig::from_lookup(lookup)?;
    let provider = HttpProvider::new(config.rpc_url.clone(), config.rpc_timeout)
        .map_err(|e| DeployError::Environment(e.to_string()))?;
    info!(rpc_url = provider.url(), "using node");

    deploy_token(&config, &provider, out).await
}

fn exit_code(result: &Result<DeployedContract, DeployError>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(category = e.category().as_str(), "{e}");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    // .env first so it can set RUST_LOG and DEPLOY_LOG_DIR.
    let dotenv = load_dotenv();

    let log_dir = std::env::var(ENV_LOG_DIR).ok().filter(|d| !d.is_empty());
    let log_dir = log_dir.as_deref().map(Path::new);
    let _log_guard = match logging::init_logging_with_fallback(log_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e:#}");
            None
        }
    };

    info!("scrooge-deploy v{VERSION}");
    match dotenv {
        Ok(Some(path)) => info!(path = %path.display(), ".env loaded"),
        Ok(None) => info!("no .env file found, using process environment only"),
        Err(e) => warn!("{e}; continuing with process environment only"),
    }

    let mut stdout = std::io::stdout();
    let result = run(|key| std::env::var(key).ok(), &mut stdout).await;
    exit_code(&result)
}
