//! Configuration module
//!
//! Typed access to the proxy's environment variables, plus discovery of
//! the address the proxy advertises in its Via and Record-Route.

use anyhow::{Context, Result};
use std::env;
use std::net::IpAddr;

/// Typed configuration keys
///
/// An enum instead of string literals keeps the variable names in one
/// place and lets tests drive configuration through a getter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    /// UDP port the listener binds and the proxy advertises
    SipPort,
    /// Path of the append-only proxy log
    ProxyLog,
    /// Path of the call diary
    CallDiary,
}

impl ConfigKey {
    /// Get the environment variable name for this key
    pub fn env_var(&self) -> &'static str {
        match self {
            ConfigKey::SipPort => "SIP_PORT",
            ConfigKey::ProxyLog => "PROXY_LOG",
            ConfigKey::CallDiary => "CALL_DIARY",
        }
    }

    /// Get the default value for this key
    pub fn default_value(&self) -> &'static str {
        match self {
            ConfigKey::SipPort => "5060",
            ConfigKey::ProxyLog => "proxy.log",
            ConfigKey::CallDiary => "phoneCallDiary.txt",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub sip_port: u16,
    pub proxy_log: String,
    pub call_diary: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env if present, ignore if missing
        Self::from_getter(|key| env::var(key.env_var()).ok())
    }

    /// Parse config from a custom getter function (for testing)
    pub fn from_getter<F>(get: F) -> Result<Self>
    where
        F: Fn(ConfigKey) -> Option<String>,
    {
        let value = |key: ConfigKey| get(key).unwrap_or_else(|| key.default_value().to_string());

        Ok(Config {
            sip_port: value(ConfigKey::SipPort)
                .parse()
                .context("SIP_PORT must be a valid port number")?,
            proxy_log: value(ConfigKey::ProxyLog),
            call_diary: value(ConfigKey::CallDiary),
        })
    }
}

/// The address user agents can reach this host at.
///
/// A connected UDP socket never transmits; the OS just selects the
/// outbound interface for the route. When that yields loopback (or
/// nothing), the host has no routable address of its own and the fallback
/// given on the command line is used instead.
pub fn advertised_ip(fallback: Option<&str>) -> Result<IpAddr> {
    let discovered = std::net::UdpSocket::bind("0.0.0.0:0")
        .and_then(|probe| {
            probe.connect("8.8.8.8:5060")?;
            probe.local_addr()
        })
        .map(|addr| addr.ip())
        .ok();

    match discovered {
        Some(ip) if !ip.is_loopback() && !ip.is_unspecified() => Ok(ip),
        _ => {
            let raw = fallback.context(
                "local address resolves to loopback; pass the proxy address as the first argument",
            )?;
            raw.parse()
                .with_context(|| format!("fallback address '{}' is not a valid IP", raw))
        }
    }
}
