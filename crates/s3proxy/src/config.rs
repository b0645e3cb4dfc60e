//! Configuration loading and validation for the proxy.
//!
//! Sources, lowest priority first: compiled-in defaults, `S3PROXY_*`
//! environment variables, command-line flags. The process exits with a clear
//! error message if the merged result is invalid.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

/// File name of the TLS certificate chain inside the certificate directory.
pub const CERT_FILE: &str = "s3proxy.crt";

/// File name of the TLS private key inside the certificate directory.
pub const KEY_FILE: &str = "s3proxy.key";

/// Command-line flags. Every flag left unset falls through to the
/// environment and then to the defaults.
#[derive(Debug, Default, Parser)]
#[command(name = "s3proxy", version, about = "Transparent encrypting S3 proxy")]
pub struct Cli {
    /// Serve plaintext HTTP instead of HTTPS.
    #[arg(long)]
    pub no_tls: bool,

    /// IPv4 address to listen on.
    #[arg(long)]
    pub ip: Option<String>,

    /// AWS region of the upstream S3 endpoint.
    #[arg(long)]
    pub region: Option<String>,

    /// Directory holding s3proxy.crt and s3proxy.key.
    #[arg(long = "cert")]
    pub cert_dir: Option<String>,

    /// Log verbosity: -1 debug, 0 info, 1 warn, 2 error.
    #[arg(long, allow_negative_numbers = true)]
    pub level: Option<i8>,

    /// Forward multipart upload requests instead of blocking them.
    #[arg(long)]
    pub allow_multipart: bool,
}

/// Validated proxy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// IPv4 literal the listener binds to.
    #[serde(default = "default_ip")]
    pub ip: String,

    /// TCP port the listener binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// AWS region of the upstream S3 endpoint.
    #[serde(default = "default_region")]
    pub region: String,

    /// Directory holding the TLS certificate and private key.
    #[serde(default = "default_cert_dir")]
    pub cert_dir: String,

    /// Serve plaintext HTTP.
    #[serde(default)]
    pub no_tls: bool,

    /// Forward multipart upload requests instead of blocking them.
    #[serde(default)]
    pub allow_multipart: bool,

    /// Log verbosity: -1 debug, 0 info, 1 warn, 2 error.
    #[serde(default)]
    pub level: i8,

    /// gRPC endpoint of the keyservice holding the KEK.
    #[serde(default = "default_keyservice_endpoint")]
    pub keyservice_endpoint: String,

    /// Optional OTLP endpoint for span export.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_ip() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    4433
}
fn default_region() -> String {
    "eu-west-1".into()
}
fn default_cert_dir() -> String {
    "/etc/s3proxy/certs".into()
}
fn default_keyservice_endpoint() -> String {
    "http://key-service.kube-system:9000".into()
}

impl Config {
    /// Merge environment variables and `cli` over the defaults, then validate.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or the merged result is invalid.
    pub fn load(cli: &Cli) -> Result<Self> {
        Self::load_with_env(cli, config::Environment::with_prefix("S3PROXY"))
    }

    fn load_with_env(cli: &Cli, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder().add_source(env);

        if cli.no_tls {
            builder = builder.set_override("no_tls", true)?;
        }
        if cli.allow_multipart {
            builder = builder.set_override("allow_multipart", true)?;
        }
        if let Some(ip) = &cli.ip {
            builder = builder.set_override("ip", ip.as_str())?;
        }
        if let Some(region) = &cli.region {
            builder = builder.set_override("region", region.as_str())?;
        }
        if let Some(cert_dir) = &cli.cert_dir {
            builder = builder.set_override("cert_dir", cert_dir.as_str())?;
        }
        if let Some(level) = cli.level {
            builder = builder.set_override("level", i64::from(level))?;
        }

        let c: Config = builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        self.ip
            .parse::<Ipv4Addr>()
            .with_context(|| format!("--ip must be a valid IPv4 address, got {:?}", self.ip))?;

        if !(-1..=2).contains(&self.level) {
            anyhow::bail!("--level must be between -1 and 2, got {}", self.level);
        }
        if self.region.trim().is_empty() {
            anyhow::bail!("--region is required and must not be empty");
        }
        if !self.no_tls && self.cert_dir.trim().is_empty() {
            anyhow::bail!("--cert is required unless --no-tls is set");
        }
        if self.keyservice_endpoint.trim().is_empty() {
            anyhow::bail!("S3PROXY_KEYSERVICE_ENDPOINT must not be empty");
        }
        Ok(())
    }

    /// Socket address of the listener.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: Ipv4Addr = self.ip.parse().context("invalid listen IP")?;
        Ok((ip, self.port).into())
    }

    /// Path of the PEM-encoded certificate chain.
    pub fn cert_path(&self) -> PathBuf {
        PathBuf::from(&self.cert_dir).join(CERT_FILE)
    }

    /// Path of the PEM-encoded private key.
    pub fn key_path(&self) -> PathBuf {
        PathBuf::from(&self.cert_dir).join(KEY_FILE)
    }

    /// `tracing` filter directive for the configured verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.level {
            i8::MIN..=-1 => "debug",
            0 => "info",
            1 => "warn",
            _ => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            ip: default_ip(),
            port: default_port(),
            region: default_region(),
            cert_dir: default_cert_dir(),
            no_tls: false,
            allow_multipart: false,
            level: 0,
            keyservice_endpoint: default_keyservice_endpoint(),
            otlp_endpoint: None,
        }
    }

    fn empty_env() -> config::Environment {
        config::Environment::with_prefix("S3PROXY_TEST_UNSET")
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_ip(), "0.0.0.0");
        assert_eq!(default_port(), 4433);
        assert_eq!(default_region(), "eu-west-1");
        assert_eq!(default_cert_dir(), "/etc/s3proxy/certs");
    }

    #[test]
    fn no_flags_yields_defaults() {
        let cfg = Config::load_with_env(&Cli::default(), empty_env()).unwrap();
        assert_eq!(cfg.port, 4433);
        assert_eq!(cfg.region, "eu-west-1");
        assert!(!cfg.no_tls);
        assert!(!cfg.allow_multipart);
        assert_eq!(cfg.level, 0);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "s3proxy",
            "--no-tls",
            "--ip",
            "127.0.0.1",
            "--region",
            "us-east-2",
            "--cert",
            "/tmp/certs",
            "--level",
            "-1",
            "--allow-multipart",
        ]);
        let cfg = Config::load_with_env(&cli, empty_env()).unwrap();
        assert!(cfg.no_tls);
        assert!(cfg.allow_multipart);
        assert_eq!(cfg.ip, "127.0.0.1");
        assert_eq!(cfg.region, "us-east-2");
        assert_eq!(cfg.level, -1);
        assert_eq!(cfg.log_filter(), "debug");
        assert_eq!(cfg.cert_path(), PathBuf::from("/tmp/certs/s3proxy.crt"));
        assert_eq!(cfg.key_path(), PathBuf::from("/tmp/certs/s3proxy.key"));
    }

    #[test]
    fn validate_rejects_non_ipv4() {
        let mut cfg = valid();
        cfg.ip = "::1".into();
        assert!(cfg.validate().is_err());
        cfg.ip = "localhost".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_level() {
        let mut cfg = valid();
        cfg.level = 3;
        assert!(cfg.validate().is_err());
        cfg.level = -2;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_cert_dir_allowed_without_tls() {
        let mut cfg = valid();
        cfg.cert_dir = "".into();
        assert!(cfg.validate().is_err());
        cfg.no_tls = true;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn level_maps_to_filter() {
        let mut cfg = valid();
        for (level, filter) in [(-1, "debug"), (0, "info"), (1, "warn"), (2, "error")] {
            cfg.level = level;
            assert_eq!(cfg.log_filter(), filter);
        }
    }

    #[test]
    fn socket_addr_uses_port() {
        let addr = valid().socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:4433");
    }
}
