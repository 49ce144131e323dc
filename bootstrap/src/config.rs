//! Environment configuration
//!
//! Every spawn parameter and endpoint comes from environment variables,
//! optionally loaded from an env file first (`.env.regtest` by default).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use shared::{
    ChainHeightTarget, DEFAULT_BLOCK_BATCH, RetryBudget, SharedError, Stage, stage_debug, stage_info,
};

use crate::error::{BootstrapError, BootstrapResult};
use crate::services::{OutputMode, SystemCommandRunner};
use crate::traits::ProcessSpec;

/// Logical name of the node daemon process
pub const DAEMON_PROCESS: &str = "daemon";
/// Logical name of the API server process
pub const API_SERVER_PROCESS: &str = "apiServer";

/// RPC credentials shared by the daemon, the control binary and the height query
#[derive(Clone, PartialEq, Eq)]
pub struct RpcCredentials {
    pub user: String,
    pub password: String,
}

impl RpcCredentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for RpcCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcCredentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Node daemon launch settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub binary: PathBuf,
    pub network: String,
    pub rpc_port: u16,
    pub grpc_host: String,
    pub grpc_port: u16,
    pub mining_address: String,
}

impl DaemonConfig {
    pub fn args(&self, credentials: &RpcCredentials) -> Vec<String> {
        vec![
            format!("--{}", self.network),
            format!("--rpclisten=:{}", self.rpc_port),
            format!("--grpclisten={}:{}", self.grpc_host, self.grpc_port),
            format!("--rpcuser={}", credentials.user),
            format!("--rpcpass={}", credentials.password),
            format!("--miningaddr={}", self.mining_address),
            "--addrindex".to_string(),
            "--txindex".to_string(),
        ]
    }
}

/// API server launch settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiServerConfig {
    pub command: PathBuf,
    pub args: Vec<String>,
    pub ready_url: Url,
}

/// Height query endpoint settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcEndpointConfig {
    pub url: Url,
    /// PEM certificate to trust for the daemon's TLS listener
    pub cert_path: Option<PathBuf>,
    pub insecure_tls: bool,
    pub timeout: Duration,
}

/// Retry budget of every waiting stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageBudgets {
    pub api: RetryBudget,
    pub daemon: RetryBudget,
    pub height: RetryBudget,
}

impl StageBudgets {
    pub fn validate(&self) -> BootstrapResult<()> {
        self.api.validate(Stage::ApiReadiness)?;
        self.daemon.validate(Stage::DaemonReadiness)?;
        self.height.validate(Stage::ChainPriming)?;
        Ok(())
    }
}

impl Default for StageBudgets {
    fn default() -> Self {
        Self {
            api: RetryBudget::API_READINESS,
            daemon: RetryBudget::DAEMON_READINESS,
            height: RetryBudget::CHAIN_HEIGHT,
        }
    }
}

/// Complete bootstrap configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub credentials: RpcCredentials,
    pub daemon: DaemonConfig,
    pub api_server: ApiServerConfig,
    pub control_binary: PathBuf,
    /// Upper bound on one control binary invocation
    pub control_timeout: Duration,
    pub rpc: RpcEndpointConfig,
    pub budgets: StageBudgets,
    pub target: ChainHeightTarget,
    pub batch_size: u32,
    pub output_mode: OutputMode,
}

impl BootstrapConfig {
    pub const DEFAULT_ENV_FILE: &'static str = ".env.regtest";

    /// Load `env_file` (if it exists) into the process environment, then read it
    pub fn load(env_file: Option<&Path>) -> BootstrapResult<Self> {
        if let Some(path) = env_file {
            load_env_file(path)?;
        }
        Self::from_env()
    }

    pub fn from_env() -> BootstrapResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> BootstrapResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let var_or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let bin_dir = PathBuf::from(var_or("BCHD_BIN_DIRECTORY", "bin"));
        let credentials = RpcCredentials::new(var_or("RPC_USER", "alice"), var_or("RPC_PASS", "password"));

        let rpc_port = parse_port("PORT", &var_or("PORT", "18334"))?;
        let daemon = DaemonConfig {
            binary: var("DAEMON_BIN").map(PathBuf::from).unwrap_or_else(|| bin_dir.join("bchd")),
            network: var_or("NETWORK", "regtest"),
            rpc_port,
            grpc_host: var_or("HOST_IP", "127.0.0.1"),
            grpc_port: parse_port("GRPC_PORT", &var_or("GRPC_PORT", "18335"))?,
            mining_address: var("ADDRESS").ok_or_else(|| SharedError::missing("ADDRESS"))?,
        };

        let api_server = ApiServerConfig {
            command: PathBuf::from(var_or("API_SERVER_CMD", "npx")),
            args: var_or("API_SERVER_ARGS", "ts-node ./generated/serve/index.ts")
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            ready_url: parse_url("API_READY_URL", &var_or("API_READY_URL", "http://localhost:3000/api-doc/"))?,
        };

        let host = var_or("HOST", "localhost");
        let rpc_url = match var("RPC_URL") {
            Some(url) => parse_url("RPC_URL", &url)?,
            None => parse_url("RPC_URL", &format!("https://{host}:{rpc_port}"))?,
        };
        let rpc = RpcEndpointConfig {
            url: rpc_url,
            cert_path: var("RPC_CERT").map(|cert| bin_dir.join(cert)),
            insecure_tls: parse_flag("RPC_INSECURE_TLS", var("RPC_INSECURE_TLS").as_deref())?,
            timeout: Duration::from_secs(5),
        };

        let control_timeout = match var("CONTROL_TIMEOUT_MS") {
            Some(ms) => Duration::from_millis(parse_millis("CONTROL_TIMEOUT_MS", &ms)?),
            None => SystemCommandRunner::DEFAULT_TIMEOUT,
        };

        let output_mode = match var("PROCESS_OUTPUT") {
            Some(mode) => mode.parse()?,
            None => OutputMode::default(),
        };

        let config = Self {
            credentials,
            daemon,
            api_server,
            control_binary: var("CONTROL_BIN").map(PathBuf::from).unwrap_or_else(|| bin_dir.join("bchctl")),
            control_timeout,
            rpc,
            budgets: StageBudgets::default(),
            target: ChainHeightTarget::default(),
            batch_size: DEFAULT_BLOCK_BATCH,
            output_mode,
        };
        config.budgets.validate()?;
        Ok(config)
    }

    /// Override stage budgets (fluent API)
    pub fn with_budgets(mut self, budgets: StageBudgets) -> Self {
        self.budgets = budgets;
        self
    }

    /// Override the minimum chain height (fluent API)
    pub fn with_target(mut self, target: ChainHeightTarget) -> Self {
        self.target = target;
        self
    }

    /// Override the number of blocks per generation round (fluent API)
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn daemon_spec(&self) -> ProcessSpec {
        ProcessSpec::new(
            DAEMON_PROCESS,
            self.daemon.binary.clone(),
            self.daemon.args(&self.credentials),
        )
    }

    pub fn api_server_spec(&self) -> ProcessSpec {
        ProcessSpec::new(
            API_SERVER_PROCESS,
            self.api_server.command.clone(),
            self.api_server.args.clone(),
        )
    }
}

/// Load an env file into the process environment; a missing file is fine
///
/// Variables already set in the environment win over the file.
pub fn load_env_file(path: &Path) -> BootstrapResult<bool> {
    match dotenv::from_path(path) {
        Ok(()) => {
            stage_info!(Stage::Launch, "📄 Loaded environment from {}", path.display());
            Ok(true)
        }
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            stage_debug!(Stage::Launch, "No env file at {}, using process environment", path.display());
            Ok(false)
        }
        Err(e) => Err(BootstrapError::config(format!(
            "failed to load {}: {}",
            path.display(),
            e
        ))),
    }
}

fn parse_port(field: &str, value: &str) -> BootstrapResult<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| SharedError::invalid(field, value).into())
}

fn parse_millis(field: &str, value: &str) -> BootstrapResult<u64> {
    match value.trim().parse() {
        Ok(ms) if ms > 0 => Ok(ms),
        _ => Err(SharedError::invalid(field, value).into()),
    }
}

fn parse_url(field: &str, value: &str) -> BootstrapResult<Url> {
    Url::parse(value.trim()).map_err(|_| SharedError::invalid(field, value).into())
}

fn parse_flag(field: &str, value: Option<&str>) -> BootstrapResult<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no") => Ok(false),
        Some(v) => Err(SharedError::invalid(field, v).into()),
    }
}
