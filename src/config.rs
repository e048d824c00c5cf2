//! Run-time configuration from the command line and environment.
//!
//! [`App::from_cli`](crate::App::from_cli) parses these flags; every flag
//! can also be supplied through the environment variable shown.
//!
//! ```text
//! demo --port 3000 --rate-limit 10 --log gantry=debug
//! GANTRY_PORT=3000 GANTRY_RATE_LIMIT=10 RUST_LOG=debug demo
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;

use crate::rate_limit::RateLimit;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug, Parser)]
#[command(about = "gantry HTTP application", long_about = None)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "GANTRY_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(short, long, env = "GANTRY_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Largest accepted request body, in bytes. Larger bodies get 413.
    #[arg(long, env = "GANTRY_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Requests per second allowed from one client IP. Unset or `0` disables
    /// rate limiting; clients over the limit get 429.
    #[arg(long, env = "GANTRY_RATE_LIMIT")]
    pub rate_limit: Option<u32>,

    /// Requests a client may send at once. Defaults to `--rate-limit`.
    #[arg(long, env = "GANTRY_RATE_LIMIT_BURST", requires = "rate_limit")]
    pub rate_limit_burst: Option<u32>,

    /// Log filter directive, e.g. `info` or `gantry=debug,hyper=warn`.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log: String,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn rate_limit(&self) -> Option<RateLimit> {
        let per_second = self.rate_limit.filter(|&n| n > 0)?;
        let burst = self.rate_limit_burst.unwrap_or(per_second).max(1);
        Some(RateLimit { per_second, burst })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            rate_limit: None,
            rate_limit_burst: None,
            log: "info".to_owned(),
        }
    }
}
