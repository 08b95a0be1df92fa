//! livetrans 命令行入口
//!
//! 读取 HTML 文件，执行一次全量翻译后输出翻译后的文档。

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use livetrans::document::Document;
use livetrans::env::{core::LogLevel, generate_env_docs, EnvVar};
use livetrans::translation::backend::IdentityBackend;
use livetrans::translation::config::constants::DEFAULT_ROOT_SELECTOR;
use livetrans::translation::config::{ConfigManager, ManualDictionary};
use livetrans::translation::error::helpers::log_error;
use livetrans::translation::{EngineOptions, TranslationEngine, TranslationError};

const ASCII: &str = " _ _           _
| (_)_   _____| |_ _ __ __ _ _ __  ___
| | \\ \\ / / _ \\ __| '__/ _` | '_ \\/ __|
| | |\\ V /  __/ |_| | | (_| | | | \\__ \\
|_|_| \\_/ \\___|\\__|_|  \\__,_|_| |_|___/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// Microsoft translator (requires network access)
    Microsoft,
    /// Leave every text unchanged, useful for checking selectors offline
    Identity,
}

#[derive(Parser, Debug)]
#[command(
    name = "livetrans",
    version,
    about = ASCII,
    long_about = None,
    after_help = "Environment variables:\n  Run with --print-env to list the LIVETRANS_* variables."
)]
struct Cli {
    /// HTML file to translate, or "-" for stdin
    #[arg(required_unless_present_any = ["print_env", "init_config"])]
    input: Option<String>,

    /// Target language
    #[arg(short, long)]
    to: Option<String>,

    /// Source language (auto-detect when omitted)
    #[arg(short, long)]
    from: Option<String>,

    /// Extra ignore selector (repeatable)
    #[arg(short, long = "ignore", value_name = "SELECTOR")]
    ignore: Vec<String>,

    /// Force selector, overrides ignore rules (repeatable)
    #[arg(long = "force", value_name = "SELECTOR")]
    force: Vec<String>,

    /// TOML manual dictionary, grouped by target language or "all"
    #[arg(short, long, value_name = "FILE")]
    dict: Option<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root element to translate
    #[arg(short, long, default_value = DEFAULT_ROOT_SELECTOR)]
    root: String,

    /// Document charset
    #[arg(short, long, default_value = "utf-8")]
    encoding: String,

    /// Translation backend
    #[arg(short, long, value_enum, default_value_t = BackendKind::Microsoft)]
    backend: BackendKind,

    /// Disable the translation cache
    #[arg(long)]
    no_cache: bool,

    /// Directory for the on-disk translation cache
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Write output to file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print supported environment variables and exit
    #[arg(long)]
    print_env: bool,

    /// Write an example configuration file and exit
    #[arg(long, value_name = "FILE")]
    init_config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(LogLevel::get_or_default("info".to_string())))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.print_env {
        println!("{}", generate_env_docs());
        return Ok(());
    }

    if let Some(path) = &cli.init_config {
        ConfigManager::generate_example_config(path)?;
        eprintln!("Example configuration written to {}", path.display());
        return Ok(());
    }

    let mut config = ConfigManager::load(cli.config.as_deref())?;
    if let Some(to) = &cli.to {
        config.to_lang = to.clone();
    }
    if let Some(from) = &cli.from {
        config.from_lang = from.clone();
    }
    config.ignore.extend(cli.ignore.iter().cloned());
    config.force.extend(cli.force.iter().cloned());
    if cli.no_cache {
        config.cache_enabled = false;
    }
    if let Some(dir) = &cli.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    if let Some(path) = &cli.dict {
        merge_dictionary(&mut config.manual_dictionary, read_dictionary(path)?);
    }

    let data = read_input(cli.input.as_deref().unwrap_or("-"))?;
    let document = Rc::new(Document::from_bytes(&data, &cli.encoding)?);

    let builder = EngineOptions::builder(config);
    let builder = match cli.backend {
        BackendKind::Identity => builder.backend(IdentityBackend),
        BackendKind::Microsoft => microsoft_backend(builder)?,
    };
    let engine = TranslationEngine::new(document.clone(), builder.build())?;

    let result = engine.translate_all(&cli.root).await;
    let stats = engine.stats();
    engine.destroy().await;
    if let Err(e) = result {
        log_error(&e);
        return Err(e.into());
    }

    tracing::info!(
        "翻译完成: {} 个元素, 词典 {} / 缓存 {} / 网络 {} 个片段, 网络失败 {} 次",
        stats.elements_done,
        stats.resolution.from_dictionary,
        stats.resolution.from_cache,
        stats.resolution.from_network,
        stats.resolution.network_failures
    );

    let html = document.serialize(&cli.encoding)?;
    match &cli.output {
        Some(path) => fs::write(path, html)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&html)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

#[cfg(feature = "microsoft-backend")]
fn microsoft_backend(
    builder: livetrans::translation::EngineOptionsBuilder,
) -> Result<livetrans::translation::EngineOptionsBuilder, TranslationError> {
    Ok(builder.backend(livetrans::translation::MicrosoftBackend::new()))
}

#[cfg(not(feature = "microsoft-backend"))]
fn microsoft_backend(
    _builder: livetrans::translation::EngineOptionsBuilder,
) -> Result<livetrans::translation::EngineOptionsBuilder, TranslationError> {
    Err(TranslationError::ConfigError(
        "未启用 microsoft-backend feature".to_string(),
    ))
}

fn read_input(input: &str) -> io::Result<Vec<u8>> {
    if input == "-" {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
        Ok(data)
    } else {
        fs::read(input)
    }
}

fn read_dictionary(path: &Path) -> Result<ManualDictionary, TranslationError> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| {
        TranslationError::ConfigError(format!("解析词典失败 {}: {}", path.display(), e))
    })
}

/// 命令行词典覆盖配置文件中的同名术语
fn merge_dictionary(target: &mut ManualDictionary, extra: ManualDictionary) {
    for (group, terms) in extra {
        target.entry(group).or_default().extend(terms);
    }
}
