use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

pub mod commands;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
    Table,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pretty => "pretty",
            OutputFormat::Json => "json",
            OutputFormat::Table => "table",
        }
    }

    /// Whether stdout is meant for another program rather than a person
    pub fn is_machine_readable(&self) -> bool {
        !matches!(self, OutputFormat::Pretty)
    }
}

const VERBOSE_FILTER: &str = "vaultfill=debug,vaultfill_cli=debug,vaultfill_core=debug,\
                              vaultfill_detectors=debug,vaultfill_browser=debug";
// Library crates stay at `warn` so their failures still surface
const DEFAULT_FILTER: &str = "warn,vaultfill=info,vaultfill_cli=info";

/// Log to stderr so stdout only carries command output
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::new(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
