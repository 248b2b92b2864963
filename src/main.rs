// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use subremote::app_config::{self, Config};
use subremote::session::{SessionDriver, SessionEvent, SessionObserver, SessionStatus, TranslationRequest};
use subremote::{ApiClient, SessionError};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a subtitle file on the service and follow the job live
    Translate(TranslateArgs),

    /// List subtitle files available on the service
    Files,

    /// List models installed on the service
    Models,

    /// Print the service's guide text
    Readme,

    /// Browse a folder of the media mount
    Tree {
        /// Folder relative to the media mount
        #[arg(value_name = "PATH", default_value = "")]
        path: String,
    },

    /// Exchange the service password for a bearer token and print it
    Login {
        /// Service password
        #[arg(long, env = "SUBREMOTE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Generate shell completions for subremote
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Subtitle file path on the service host
    #[arg(value_name = "FILE")]
    file: String,

    /// Target language code (e.g., 'ja', 'es', 'fr')
    #[arg(short = 't', long)]
    lang: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Extra context for the model (show name, tone, ...)
    #[arg(short = 'x', long)]
    context: Option<String>,

    /// Translate only the first few lines (count from the config)
    #[arg(long)]
    test: bool,

    /// Show timer-driven progress while the service is silent
    #[arg(long)]
    fake_progress: bool,
}

/// subremote - follow remote subtitle translations live
#[derive(Parser, Debug)]
#[command(name = "subremote")]
#[command(version)]
#[command(about = "Client for a remote subtitle translation service")]
#[command(long_about = "subremote talks to a subtitle translation service: it lists files and models,
starts translation jobs and follows their progress over a live event stream.

EXAMPLES:
    subremote files                                  # List subtitle files on the service
    subremote models                                 # List installed models
    subremote translate /mnt/media/show.en.srt -t ja # Translate to Japanese
    subremote translate show.srt -m gemma2:9b --test # Quick test run on a few lines
    subremote login --password ...                   # Print a bearer token
    subremote completions bash > subremote.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the config file doesn't
    exist, a default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: PathBuf,

    /// Service API base URL (overrides the config)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token (overrides the config)
    #[arg(long, env = "SUBREMOTE_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI color for log level
    fn decoration_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, color) = Self::decoration_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color, now, emoji, record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Renders session changes on a progress bar
struct ProgressRenderer {
    bar: ProgressBar,
}

impl SessionObserver for ProgressRenderer {
    fn notify(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::ProgressChanged(percent) => self.bar.set_position(u64::from(*percent)),
            SessionEvent::LogAppended(line) => self.bar.println(line),
            SessionEvent::OutputReady(output_file) => self.bar.set_message(format!("→ {}", output_file)),
            SessionEvent::StatusChanged(status) => {
                if status.is_terminal() {
                    self.bar.finish();
                }
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "subremote", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Translate(args) => run_translate(&config, args).await,
        Commands::Files => {
            let client = ApiClient::new(&config.api)?;
            for file in client.list_files().await? {
                println!("{}", file.relative);
            }
            Ok(())
        },
        Commands::Models => {
            let client = ApiClient::new(&config.api)?;
            let models = match client.list_models().await {
                Ok(models) => models,
                Err(e) => {
                    warn!("Could not list models ({}), showing defaults", e);
                    config.defaults.fallback_models.clone()
                },
            };
            for model in models {
                println!("{}", model);
            }
            Ok(())
        },
        Commands::Readme => {
            let client = ApiClient::new(&config.api)?;
            println!("{}", client.readme().await?);
            Ok(())
        },
        Commands::Tree { path } => {
            let client = ApiClient::new(&config.api)?;
            for item in client.browse(&path).await? {
                let marker = if item.is_srt { "*" } else { " " };
                println!("{} {}", marker, item.name);
            }
            Ok(())
        },
        Commands::Login { password } => {
            let client = ApiClient::new(&config.api)?;
            let token = client.login(&password).await?;
            println!("{}", token);
            Ok(())
        },
        Commands::Completions { .. } => Ok(()),
    }
}

/// Load the config file and apply command line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &cli.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(config_log_level.to_level_filter());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;

    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }
    if let Some(token) = &cli.token {
        config.api.token = token.clone();
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    // Validate the configuration after loading and overriding
    config.validate()
        .context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if cli.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    Ok(config)
}

async fn run_translate(config: &Config, args: TranslateArgs) -> Result<()> {
    let mut config = config.clone();
    if args.fake_progress {
        config.progress.enabled = true;
    }

    let mut request = TranslationRequest::new(
        args.file,
        args.lang.unwrap_or_else(|| config.defaults.lang.clone()),
        args.model.unwrap_or_else(|| config.defaults.model.clone()),
    );
    if let Some(context) = args.context {
        request = request.with_context(context);
    }
    if args.test {
        request = request.with_test_limit(config.defaults.test_limit);
    }

    let mut driver = SessionDriver::connect(&config)?;

    let bar = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style.progress_chars("█▓▒░"));
    driver.controller_mut().subscribe(ProgressRenderer { bar: bar.clone() });

    match driver.start(request) {
        Ok(stream_id) => info!("Following translation stream {}", stream_id),
        Err(SessionError::Validation(message)) => {
            bar.finish_and_clear();
            return Err(anyhow!(message));
        },
        Err(e) => {
            bar.finish_and_clear();
            return Err(anyhow!("Translation could not start: {}", e));
        },
    }

    let interrupted = tokio::select! {
        _ = driver.run_until_terminal() => false,
        _ = tokio::signal::ctrl_c() => true,
    };

    if interrupted {
        driver.controller_mut().teardown();
        bar.abandon_with_message("interrupted");
        warn!("Stopped following the translation; the job may still be running on the service");
        return Err(anyhow!("Interrupted"));
    }

    let controller = driver.controller();
    match controller.status() {
        SessionStatus::Complete => {
            match controller.output_file() {
                Some(output_file) => info!("Output file: {}", output_file),
                None => warn!("The service did not report an output file"),
            }
            Ok(())
        },
        status => {
            error!("Translation ended with status {}", status);
            Err(anyhow!("Translation failed"))
        },
    }
}
