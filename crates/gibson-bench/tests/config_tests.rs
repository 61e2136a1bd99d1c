use clap::Parser;
use gibson_bench::cli::Cli;
use gibson_common::{BenchConfig, Config, DEFAULT_DNS, DEFAULT_METRICS_PORT, DEFAULT_PRE};

#[test]
fn yaml_fills_missing_fields_with_defaults() {
    let yaml = r#"
bench:
  dns: "tcp://127.0.0.1:10128"
  clients: 8
metrics:
  enabled: true
  port: 9100
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.bench.dns, "tcp://127.0.0.1:10128");
    assert_eq!(config.bench.clients, 8);
    assert_eq!(config.bench.requests, 10_000);
    assert_eq!(config.bench.timeout_ms, 0);
    assert_eq!(config.bench.operator, "GET foo");
    assert!(config.metrics.enabled);
    assert_eq!(config.metrics.port, 9100);
    assert_eq!(config.logging.level, "warn");
    assert!(!config.logging.json);
}

#[test]
fn empty_yaml_is_the_default_config() {
    let config = Config::from_yaml("{}").unwrap();
    assert_eq!(config.bench.dns, DEFAULT_DNS);
    assert_eq!(config.bench.clients, 50);
    assert_eq!(config.bench.prelude(), DEFAULT_PRE);
}

#[test]
fn prelude_selection() {
    let mut bench = BenchConfig::default();
    assert_eq!(bench.prelude(), DEFAULT_PRE);

    bench.pre = Some(String::new());
    assert_eq!(bench.prelude(), "");

    bench.pre = None;
    bench.key = Some("k".to_string());
    bench.value = Some("v".to_string());
    assert_eq!(bench.prelude(), "");
}

#[test]
fn validation_rules() {
    assert!(BenchConfig::default().validate().is_ok());

    let zero_clients = BenchConfig {
        clients: 0,
        ..BenchConfig::default()
    };
    assert!(zero_clients.validate().is_err());

    let empty_dns = BenchConfig {
        dns: "  ".to_string(),
        ..BenchConfig::default()
    };
    assert!(empty_dns.validate().is_err());

    let key_only = BenchConfig {
        key: Some("k".to_string()),
        ..BenchConfig::default()
    };
    assert!(key_only.validate().is_err());

    let both = BenchConfig {
        pre: Some("PING".to_string()),
        key: Some("k".to_string()),
        value: Some("v".to_string()),
        ..BenchConfig::default()
    };
    assert!(both.validate().is_err());
}

#[test]
fn cli_overrides_config_values() {
    let cli = Cli::try_parse_from([
        "gibson-bench",
        "-d",
        "tcp://10.0.0.2:10128",
        "-c",
        "4",
        "-r",
        "100",
        "-t",
        "250",
        "-o",
        "PING",
        "--metrics-port",
        "9200",
    ])
    .unwrap();

    let mut config = Config::default();
    cli.apply(&mut config);

    assert_eq!(config.bench.dns, "tcp://10.0.0.2:10128");
    assert_eq!(config.bench.clients, 4);
    assert_eq!(config.bench.requests, 100);
    assert_eq!(config.bench.timeout_ms, 250);
    assert_eq!(config.bench.operator, "PING");
    assert!(config.metrics.enabled);
    assert_eq!(config.metrics.port, 9200);
}

#[test]
fn cli_leaves_unset_values_alone() {
    let cli = Cli::try_parse_from(["gibson-bench"]).unwrap();
    let mut config = Config::default();
    config.bench.clients = 12;
    cli.apply(&mut config);

    assert_eq!(config.bench.clients, 12);
    assert!(!config.metrics.enabled);
}

#[test]
fn cli_key_value_replaces_configured_prelude() {
    let cli = Cli::try_parse_from(["gibson-bench", "-k", "foo", "-v", "bar"]).unwrap();
    let mut config = Config::default();
    config.bench.pre = Some("SET 0 x y".to_string());
    cli.apply(&mut config);

    assert_eq!(config.bench.pre, None);
    assert_eq!(config.bench.key.as_deref(), Some("foo"));
    assert!(config.bench.validate().is_ok());
}

#[test]
fn cli_pre_conflicts_with_key() {
    let parsed = Cli::try_parse_from(["gibson-bench", "-p", "PING", "-k", "foo", "-v", "bar"]);
    assert!(parsed.is_err());
}

#[test]
fn cli_key_requires_value() {
    assert!(Cli::try_parse_from(["gibson-bench", "-k", "foo"]).is_err());
}

#[test]
fn malformed_yaml_is_rejected() {
    assert!(Config::from_yaml("bench: [1, 2").is_err());
    assert!(Config::from_yaml("bench:\n  clients: many\n").is_err());
}

#[test]
fn enabled_metrics_without_port_use_the_default_port() {
    let config = Config::from_yaml("metrics:\n  enabled: true\n").unwrap();
    assert!(config.metrics.enabled);
    assert_eq!(config.metrics.port, DEFAULT_METRICS_PORT);
    assert_ne!(config.metrics.port, 0);
}
