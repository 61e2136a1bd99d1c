use std::path::PathBuf;

use clap::Parser;
use gibson_common::Config;

#[derive(Parser, Debug, Default)]
#[command(name = "gibson-bench")]
#[command(about = "Gibson benchmark utility.")]
#[command(version)]
pub struct Cli {
    /// The connection string, default is unix:///var/run/gibson.sock.
    #[arg(short, long)]
    pub dns: Option<String>,

    /// The number of concurrent clients to use, default is 50.
    #[arg(short, long)]
    pub clients: Option<usize>,

    /// The number of requests to send per client, default is 10000.
    #[arg(short, long)]
    pub requests: Option<u64>,

    /// Socket timeout in milliseconds, default is 0 (no timeout).
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Operations to execute before the benchmark, separated by ";", default is "SET 0 foo bar".
    #[arg(short, long, conflicts_with_all = ["key", "value"])]
    pub pre: Option<String>,

    /// The operator to benchmark, default is "GET foo".
    #[arg(short, long)]
    pub operator: Option<String>,

    /// Key every client sets before its request loop (replaces --pre).
    #[arg(short, long, requires = "value")]
    pub key: Option<String>,

    /// Value paired with --key.
    #[arg(short = 'v', long, requires = "key")]
    pub value: Option<String>,

    /// YAML file providing defaults for every option.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Serve live counters on this port under /metrics.
    #[arg(long)]
    pub metrics_port: Option<u16>,
}

impl Cli {
    /// Overlay command line values on top of `config`.
    pub fn apply(&self, config: &mut Config) {
        let bench = &mut config.bench;
        if let Some(dns) = &self.dns {
            bench.dns = dns.clone();
        }
        if let Some(clients) = self.clients {
            bench.clients = clients;
        }
        if let Some(requests) = self.requests {
            bench.requests = requests;
        }
        if let Some(timeout) = self.timeout {
            bench.timeout_ms = timeout;
        }
        if let Some(operator) = &self.operator {
            bench.operator = operator.clone();
        }
        if let Some(pre) = &self.pre {
            bench.pre = Some(pre.clone());
            bench.key = None;
            bench.value = None;
        }
        if let (Some(key), Some(value)) = (&self.key, &self.value) {
            bench.key = Some(key.clone());
            bench.value = Some(value.clone());
            bench.pre = None;
        }
        if let Some(port) = self.metrics_port {
            config.metrics.enabled = true;
            config.metrics.port = port;
        }
    }
}
