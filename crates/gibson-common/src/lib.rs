use serde::Deserialize;

pub const DEFAULT_DNS: &str = "unix:///var/run/gibson.sock";
pub const DEFAULT_OPERATOR: &str = "GET foo";
pub const DEFAULT_PRE: &str = "SET 0 foo bar";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub bench: BenchConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse a YAML document; missing sections and fields take their defaults.
    pub fn from_yaml(data: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(data)
    }
}

/// Benchmark parameters. Every field can be overridden from the command line.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BenchConfig {
    /// Connection string: `unix:///path`, `tcp://host:port` or `host:port`.
    pub dns: String,
    /// Number of concurrent clients (one connection each).
    pub clients: usize,
    /// Requests sent by every client.
    pub requests: u64,
    /// Per-request socket timeout in milliseconds, 0 disables it.
    pub timeout_ms: u64,
    /// Operation under test, e.g. `GET foo`.
    pub operator: String,
    /// `;`-separated operations executed once before the clock starts.
    pub pre: Option<String>,
    /// Key written by every client before its request loop.
    pub key: Option<String>,
    /// Value paired with `key`.
    pub value: Option<String>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            dns: DEFAULT_DNS.to_string(),
            clients: 50,
            requests: 10_000,
            timeout_ms: 0,
            operator: DEFAULT_OPERATOR.to_string(),
            pre: None,
            key: None,
            value: None,
        }
    }
}

impl BenchConfig {
    /// The prelude list to run. The default prelude only applies when no
    /// per-client setup pair was given.
    pub fn prelude(&self) -> &str {
        match (&self.pre, &self.key) {
            (Some(pre), _) => pre,
            (None, Some(_)) => "",
            (None, None) => DEFAULT_PRE,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.clients == 0 {
            return Err("clients must be > 0".to_string());
        }
        if self.dns.trim().is_empty() {
            return Err("dns must not be empty".to_string());
        }
        if self.key.is_some() && self.pre.is_some() {
            return Err("pre and key/value are mutually exclusive".to_string());
        }
        if self.key.is_some() != self.value.is_some() {
            return Err("key and value must be given together".to_string());
        }
        Ok(())
    }
}

pub const DEFAULT_METRICS_PORT: u16 = 9090;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: DEFAULT_METRICS_PORT,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of the human readable format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}
