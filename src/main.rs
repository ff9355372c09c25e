// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::{Read, Write};
use std::path::PathBuf;

use lingobatch::app_config::{self, Config, TranslationProvider};
use lingobatch::app_controller::{Controller, SheetOptions, SubtitleOptions};
use lingobatch::file_utils::FileManager;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    #[value(name = "deepseek")]
    DeepSeek,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::DeepSeek => TranslationProvider::DeepSeek,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
        }
    }
}

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

/// Overrides shared by the translating commands
#[derive(Args, Debug, Clone)]
struct TranslationArgs {
    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// API key for the selected provider
    #[arg(long, env = "LINGOBATCH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Source language code or name (e.g., 'en', 'English')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code or name, repeat for several languages
    #[arg(short, long = "target-language")]
    target_languages: Vec<String>,
}

#[derive(Args, Debug)]
struct SheetArgs {
    /// Input CSV/TSV file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output directory, defaults to the input's directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Start over instead of resuming from an existing output
    #[arg(short, long)]
    force_overwrite: bool,

    /// Language of the reference translations shown to the model
    #[arg(long)]
    reference_language: Option<String>,

    /// Second sheet mapping source texts to reference translations
    #[arg(long, requires = "reference_language")]
    reference_file: Option<PathBuf>,

    #[command(flatten)]
    translation: TranslationArgs,
}

#[derive(Args, Debug)]
struct SubtitleArgs {
    /// Input SRT/ASS file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output directory, defaults to the input's directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    #[command(flatten)]
    translation: TranslationArgs,
}

#[derive(Args, Debug)]
struct TextArgs {
    /// Text to translate, read from stdin when omitted
    #[arg(value_name = "TEXT", conflicts_with = "file")]
    text: Option<String>,

    /// Read the text from a file
    #[arg(long)]
    file: Option<PathBuf>,

    #[command(flatten)]
    translation: TranslationArgs,
}

/// Language pair of a glossary, defaults come from the configuration
#[derive(Args, Debug)]
struct GlossaryPair {
    /// Source language of the pair
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language of the pair
    #[arg(short, long)]
    target_language: Option<String>,
}

#[derive(Subcommand, Debug)]
enum GlossaryAction {
    /// Add or replace a term
    Add {
        term: String,
        translation: String,
        #[command(flatten)]
        pair: GlossaryPair,
    },
    /// Remove a term
    Remove {
        term: String,
        #[command(flatten)]
        pair: GlossaryPair,
    },
    /// List terms, optionally filtered
    List {
        /// Only show terms or translations containing this text
        #[arg(long)]
        search: Option<String>,
        /// Page to show, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Terms per page
        #[arg(long, default_value_t = 20)]
        page_size: usize,
        #[command(flatten)]
        pair: GlossaryPair,
    },
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate the source column of CSV/TSV sheets into each target language
    Sheet(SheetArgs),

    /// Translate SRT/ASS subtitles, one output file per target language
    Subtitle(SubtitleArgs),

    /// Translate free-form text using the glossary
    Text(TextArgs),

    /// Manage glossaries per language pair
    Glossary {
        #[command(subcommand)]
        action: GlossaryAction,
    },

    /// Generate shell completions for lingobatch
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// LingoBatch - Concurrent batch translation with AI
#[derive(Parser, Debug)]
#[command(name = "lingobatch")]
#[command(version)]
#[command(about = "AI-powered batch translation of sheets, subtitles and text")]
#[command(long_about = "LingoBatch translates spreadsheets, subtitles and text using AI providers.

EXAMPLES:
    lingobatch sheet data.csv -t fr -t de          # Add French and German columns
    lingobatch sheet data.csv --reference-language es
    lingobatch sheet ./sheets/ -o ./out/           # Translate every sheet of a directory
    lingobatch subtitle movie.en.srt -s en -t es   # Translate subtitles into Spanish
    lingobatch text \"Hello world\" -t ja            # Translate a snippet
    lingobatch glossary add engine moteur -s en -t fr
    lingobatch completions bash > lingobatch.bash  # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

RESUMING:
    Sheet outputs are checkpointed while running. Running the same command again
    resumes from the existing output; use -f to start over. Ctrl-C stops the job
    after in-flight batches finish.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color code for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
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
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install the logger with the most verbose level; the effective level is
    // narrowed with set_max_level once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "lingobatch", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Sheet(args) => {
            apply_translation_args(&mut config, &args.translation);
            let controller = validated_controller(config)?;
            let options = SheetOptions {
                output_dir: args.output_dir,
                reference_language: args.reference_language,
                reference_file: args.reference_file,
                force_overwrite: args.force_overwrite,
            };
            controller.run_sheet(&args.input_path, &options).await?;
        }
        Commands::Subtitle(args) => {
            apply_translation_args(&mut config, &args.translation);
            let controller = validated_controller(config)?;
            let options = SubtitleOptions {
                output_dir: args.output_dir,
                force_overwrite: args.force_overwrite,
            };
            controller.run_subtitle(&args.input_path, &options).await?;
        }
        Commands::Text(args) => {
            apply_translation_args(&mut config, &args.translation);
            let text = read_text(&args)?;
            let controller = validated_controller(config)?;
            let results = controller.run_text(&text).await?;
            let single = results.len() == 1;
            for (language, translation) in results {
                if single {
                    println!("{}", translation);
                } else {
                    println!("[{}]\n{}\n", language, translation);
                }
            }
        }
        Commands::Glossary { action } => run_glossary(&config, action)?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Load or create the configuration and apply the log level
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let (mut config, created) = Config::load_or_create(&cli.config_path)?;
    if created {
        warn!("Config file not found at '{}', created default config.", cli.config_path);
    }

    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }
    log::set_max_level(level_filter(&config.log_level));
    Ok(config)
}

/// Override config values with CLI options
fn apply_translation_args(config: &mut Config, args: &TranslationArgs) {
    if let Some(provider) = &args.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &args.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }
    if let Some(api_key) = &args.api_key {
        config.translation.active_provider_config_mut().api_key = api_key.clone();
    }
    if let Some(source_language) = &args.source_language {
        config.source_language = source_language.clone();
    }
    if !args.target_languages.is_empty() {
        config.target_languages = args.target_languages.clone();
    }
}

fn validated_controller(config: Config) -> Result<Controller> {
    config.validate().context("Configuration validation failed")?;
    Controller::with_config(config)
}

fn read_text(args: &TextArgs) -> Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    if let Some(file) = &args.file {
        return FileManager::read_to_string(file);
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read text from stdin")?;
    Ok(text)
}

fn run_glossary(config: &Config, action: GlossaryAction) -> Result<()> {
    let store = lingobatch::translation::GlossaryStore::new(&config.glossary_dir);
    let resolve = |pair: &GlossaryPair| -> Result<(String, String)> {
        let source = pair.source_language.clone().unwrap_or_else(|| config.source_language.clone());
        let target = match &pair.target_language {
            Some(target) => target.clone(),
            None => config
                .target_languages
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("No target language given or configured"))?,
        };
        Ok((source, target))
    };

    match action {
        GlossaryAction::Add { term, translation, pair } => {
            let (source, target) = resolve(&pair)?;
            store.add_term(&source, &target, &term, &translation)?;
            info!("Added '{}' → '{}' ({} → {})", term, translation, source, target);
        }
        GlossaryAction::Remove { term, pair } => {
            let (source, target) = resolve(&pair)?;
            if store.remove_term(&source, &target, &term)? {
                info!("Removed '{}' ({} → {})", term, source, target);
            } else {
                warn!("Term '{}' not found ({} → {})", term, source, target);
            }
        }
        GlossaryAction::List {
            search,
            page,
            page_size,
            pair,
        } => {
            let (source, target) = resolve(&pair)?;
            let listing = store.list(&source, &target, search.as_deref(), page, page_size)?;
            for (term, translation) in &listing.entries {
                println!("{} → {}", term, translation);
            }
            println!(
                "Page {}/{} ({} terms)",
                listing.page, listing.total_pages, listing.total_terms
            );
        }
    }
    Ok(())
}
