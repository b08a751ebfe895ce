use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::U256;
use tracing::debug;

use crate::error_handler::DeployError;

// ---------------------------------------------------------------------------
// Environment variable names and defaults
// ---------------------------------------------------------------------------

pub const ENV_TOKEN_NAME: &str = "TOKEN_NAME";
pub const ENV_TOKEN_SYMBOL: &str = "TOKEN_SYMBOL";
pub const ENV_INITIAL_SUPPLY: &str = "INITIAL_SUPPLY";
pub const ENV_RPC_URL: &str = "RPC_URL";
pub const ENV_RPC_TIMEOUT_SECS: &str = "RPC_TIMEOUT_SECS";
pub const ENV_ARTIFACTS_DIR: &str = "ARTIFACTS_DIR";
pub const ENV_CONFIRMATION_POLL_MS: &str = "CONFIRMATION_POLL_MS";
pub const ENV_LOG_DIR: &str = "DEPLOY_LOG_DIR";

pub const DEFAULT_TOKEN_NAME: &str = "MyToken";
pub const DEFAULT_TOKEN_SYMBOL: &str = "MTK";
pub const DEFAULT_INITIAL_SUPPLY: &str = "1000000";
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";
pub const DEFAULT_CONFIRMATION_POLL_MS: u64 = 1000;

/// Populate the process environment from a `.env` file in the working
/// directory (or any parent). Variables already set in the environment are
/// left untouched. Returns the path of the file that was loaded, `None` when
/// there is no file, and an error when a file exists but cannot be read or
/// parsed.
///
/// Runs before logging is initialized so `.env` can carry `RUST_LOG`.
pub fn load_dotenv() -> Result<Option<PathBuf>, DeployError> {
    dotenv_outcome(dotenvy::dotenv())
}

fn dotenv_outcome(
    result: Result<PathBuf, dotenvy::Error>,
) -> Result<Option<PathBuf>, DeployError> {
    match result {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(DeployError::Config(format!(".env could not be loaded: {e}"))),
    }
}

/// Read `key` through `lookup`, treating an empty value the same as unset.
fn var_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

fn positive_u64<F>(lookup: &F, key: &str, default: u64) -> Result<u64, DeployError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = var_or(lookup, key, &default.to_string());
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(DeployError::Config(format!("{key} must be greater than zero"))),
        Ok(n) => Ok(n),
        Err(_) => Err(DeployError::Config(format!(
            "{key} is not a positive integer: {raw}"
        ))),
    }
}

/// Parse an initial supply from its string form.
///
/// Accepts a non-negative integer literal: decimal, or `0x`/`0o`/`0b`
/// prefixed. Surrounding whitespace is ignored. Digit separators (`_`) and a
/// prefix with no digits are rejected even though `U256::from_str` allows
/// them.
pub fn parse_supply(raw: &str) -> Result<U256, DeployError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DeployError::Config(format!(
            "{ENV_INITIAL_SUPPLY} is blank"
        )));
    }
    if trimmed.starts_with('-') {
        return Err(DeployError::Config(format!(
            "{ENV_INITIAL_SUPPLY} must not be negative: {trimmed}"
        )));
    }
    let not_a_literal = || {
        DeployError::Config(format!(
            "{ENV_INITIAL_SUPPLY} is not an integer literal: {trimmed}"
        ))
    };
    if trimmed.contains('_') {
        return Err(not_a_literal());
    }
    let lower = trimmed.to_ascii_lowercase();
    let digits = ["0x", "0o", "0b"]
        .iter()
        .find_map(|prefix| lower.strip_prefix(prefix))
        .unwrap_or(&lower);
    if digits.is_empty() {
        return Err(not_a_literal());
    }
    U256::from_str(trimmed).map_err(|e| {
        DeployError::Config(format!(
            "{ENV_INITIAL_SUPPLY} is not an integer literal: {trimmed} ({e})"
        ))
    })
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// TokenConfig
// ---------------------------------------------------------------------------

/// Constructor arguments for the token contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub initial_supply: U256,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_TOKEN_NAME.into(),
            symbol: DEFAULT_TOKEN_SYMBOL.into(),
            initial_supply: U256::from(1_000_000u64),
        }
    }
}

impl TokenConfig {
    /// Resolve through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DeployError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = var_or(&lookup, ENV_TOKEN_NAME, DEFAULT_TOKEN_NAME);
        let symbol = var_or(&lookup, ENV_TOKEN_SYMBOL, DEFAULT_TOKEN_SYMBOL);
        let initial_supply =
            parse_supply(&var_or(&lookup, ENV_INITIAL_SUPPLY, DEFAULT_INITIAL_SUPPLY))?;
        Ok(Self {
            name,
            symbol,
            initial_supply,
        })
    }
}

// ---------------------------------------------------------------------------
// DeployConfig
// ---------------------------------------------------------------------------

/// Everything a deployment run reads from its environment.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub token: TokenConfig,
    pub rpc_url: String,
    pub rpc_timeout: Duration,
    pub artifacts_dir: PathBuf,
    pub poll_interval: Duration,
}

impl DeployConfig {
    /// Resolve through an arbitrary variable lookup. Token settings are
    /// resolved first so a bad supply is reported before anything else.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DeployError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = TokenConfig::from_lookup(&lookup)?;

        let rpc_url = var_or(&lookup, ENV_RPC_URL, DEFAULT_RPC_URL);
        if !validate_url(&rpc_url) {
            return Err(DeployError::Config(format!("invalid {ENV_RPC_URL}: {rpc_url}")));
        }

        let rpc_timeout = Duration::from_secs(positive_u64(
            &lookup,
            ENV_RPC_TIMEOUT_SECS,
            DEFAULT_RPC_TIMEOUT_SECS,
        )?);
        let poll_interval = Duration::from_millis(positive_u64(
            &lookup,
            ENV_CONFIRMATION_POLL_MS,
            DEFAULT_CONFIRMATION_POLL_MS,
        )?);
        let artifacts_dir =
            PathBuf::from(var_or(&lookup, ENV_ARTIFACTS_DIR, DEFAULT_ARTIFACTS_DIR));

        debug!(
            %rpc_url,
            artifacts_dir = %artifacts_dir.display(),
            poll_ms = poll_interval.as_millis() as u64,
            "deploy configuration resolved"
        );

        Ok(Self {
            token,
            rpc_url,
            rpc_timeout,
            artifacts_dir,
            poll_interval,
        })
    }
}
