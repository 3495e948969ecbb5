use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use vaultfill_browser::{DEFAULT_DEBUGGING_PORT, PasswordOptions};
use vaultfill_cli::{OutputFormat, init_logging};
use vaultfill_cli::commands::{self, watch::WatchOptions};

#[derive(Parser)]
#[command(name = "vaultfill")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Detect login forms and fill credentials into web pages",
    long_about = "Vaultfill finds login forms in web pages, including forms without a <form> \
                  element and forms inside shadow DOM, and fills credentials so that the \
                  page's own scripts notice the new values."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    format: OutputFormat,

    /// Settings file (JSON)
    #[arg(long, global = true, env = "VAULTFILL_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Find login forms in a page snapshot
    Detect {
        /// Path to the page snapshot (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Fill credentials into the first login form of a page snapshot
    Fill {
        /// Path to the page snapshot (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Username or email to fill
        #[arg(short, long)]
        username: Option<String>,

        /// Password to fill
        #[arg(short, long, env = "VAULTFILL_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Fill a generated password into the first empty password field
        /// (username and password are ignored)
        #[arg(short, long)]
        generate: bool,

        /// Write the filled snapshot to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate random passwords
    Generate {
        /// Password length (clamped to 8..=32)
        #[arg(short, long, default_value_t = 16)]
        length: usize,

        /// Leave out uppercase letters
        #[arg(long)]
        no_uppercase: bool,

        /// Leave out lowercase letters
        #[arg(long)]
        no_lowercase: bool,

        /// Leave out digits
        #[arg(long)]
        no_digits: bool,

        /// Leave out symbols
        #[arg(long)]
        no_symbols: bool,

        /// Number of passwords
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },

    /// Launch Chrome and watch its page for login forms
    Watch {
        /// Starting URL
        #[arg(long)]
        url: Option<String>,

        /// Path to the Chrome binary
        #[arg(long)]
        chrome_path: Option<PathBuf>,

        /// Remote debugging port
        #[arg(long, default_value_t = DEFAULT_DEBUGGING_PORT)]
        port: u16,

        /// Named persistent profile (a temporary profile is used otherwise)
        #[arg(long)]
        profile: Option<String>,

        /// Run Chrome without a window
        #[arg(long)]
        headless: bool,

        /// Quiet period after page mutations before a scan (overrides settings)
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Polling scan interval (overrides settings)
        #[arg(long)]
        poll_ms: Option<u64>,

        /// Username to fill when a login form appears
        #[arg(short, long)]
        username: Option<String>,

        /// Password to fill when a login form appears
        #[arg(short, long, env = "VAULTFILL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Generate shell completion scripts
    #[command(after_help = "SUPPORTED SHELLS:
    bash, zsh, fish, powershell, elvish

INSTALLATION:
    Bash:
        vaultfill completion --shell bash > ~/.vaultfill-completion.bash
        echo 'source ~/.vaultfill-completion.bash' >> ~/.bashrc

    Zsh:
        vaultfill completion --shell zsh > ~/.zfunc/_vaultfill
        echo 'fpath=(~/.zfunc $fpath)' >> ~/.zshrc

    Fish:
        vaultfill completion --shell fish > ~/.config/fish/completions/vaultfill.fish

    PowerShell:
        vaultfill completion --shell powershell >> $PROFILE")]
    Completion {
        /// Target shell
        #[arg(long, value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let format = cli.format;
    tracing::debug!("Output format: {}", format.as_str());

    match cli.command {
        Commands::Detect { file } => {
            let settings = commands::load_settings(cli.config.as_deref())?;
            commands::detect::execute(&file, &settings, format)
        }
        Commands::Fill {
            file,
            username,
            password,
            generate,
            output,
        } => {
            let settings = commands::load_settings(cli.config.as_deref())?;
            commands::fill::execute(
                &file,
                username.as_deref(),
                password.as_deref(),
                generate,
                output.as_deref(),
                &settings,
                format,
            )
        }
        Commands::Generate {
            length,
            no_uppercase,
            no_lowercase,
            no_digits,
            no_symbols,
            count,
        } => {
            let options = PasswordOptions {
                length,
                uppercase: !no_uppercase,
                lowercase: !no_lowercase,
                digits: !no_digits,
                symbols: !no_symbols,
            };
            commands::generate::execute(options, count, format)
        }
        Commands::Watch {
            url,
            chrome_path,
            port,
            profile,
            headless,
            debounce_ms,
            poll_ms,
            username,
            password,
        } => {
            let mut settings = commands::load_settings(cli.config.as_deref())?;
            if let Some(ms) = debounce_ms {
                settings.debounce_ms = ms;
            }
            if let Some(ms) = poll_ms {
                settings.poll_interval_ms = ms;
            }

            let options = WatchOptions {
                url,
                chrome_path,
                port,
                profile,
                headless,
                username,
                password,
            };
            commands::watch::execute(options, settings, format)
        }
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            commands::completion::execute(shell, &mut cmd)
        }
    }
}
