// Command-line configuration and logging setup

use crate::dataset::DEFAULT_LABEL_FIELD;
use crate::server::DEFAULT_MAX_SESSIONS;
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(name = "obesity-dash")]
#[command(about = "Serve an interactive dashboard over the obesity survey dataset", long_about = None)]
pub struct Args {
    #[arg(short = 'd', long = "data", default_value = "obesitydataset.csv", help = "Path to the survey CSV file")]
    pub data: PathBuf,

    #[arg(long = "host", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST), help = "Address to listen on")]
    pub host: IpAddr,

    #[arg(short = 'p', long = "port", default_value_t = 8050, help = "Port to listen on")]
    pub port: u16,

    #[arg(long = "label-field", default_value = DEFAULT_LABEL_FIELD, help = "Column holding the obesity level")]
    pub label_field: String,

    #[arg(long = "max-sessions", default_value_t = DEFAULT_MAX_SESSIONS, help = "Live sessions kept before the oldest is dropped")]
    pub max_sessions: usize,

    #[arg(short = 'v', long = "verbose", help = "Log at debug level unless RUST_LOG is set")]
    pub verbose: bool,
}

impl Args {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is `info`, or `debug` with
/// `verbose`. `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let result = match format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_current_span(true)
            .try_init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter()).try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))
}
