use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hanspell_rs::checker::SpellChecker;
use hanspell_rs::client::HttpSpellService;
use hanspell_rs::config::Config;
use hanspell_rs::normalizer::{normalize, normalize_auto, Correction, ResponseFormat};
use hanspell_rs::reconciler::UserSelection;
use hanspell_rs::speller::{Review, Speller};
use hanspell_rs::terms::ProtectedTermSet;

#[derive(Parser)]
#[command(name = "hanspell", version, about = "Korean spell checking from the command line")]
struct Cli {
    /// Configuration file (defaults to ./hanspell.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check text and list the corrections
    Check {
        /// Input file (stdin when omitted)
        file: Option<PathBuf>,
        /// Print corrections as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check text and print it with corrections applied
    Fix {
        /// Input file (stdin when omitted)
        file: Option<PathBuf>,
        /// Which option to apply to every correction
        #[arg(long, value_enum, default_value_t = Pick::First)]
        pick: Pick,
    },
    /// Normalize a saved service response
    Parse {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = FormatArg::Auto)]
        format: FormatArg,
    },
    /// Manage protected terms
    Nouns {
        #[command(subcommand)]
        action: NounAction,
    },
}

#[derive(Subcommand)]
enum NounAction {
    List,
    Add { term: String },
    Remove { term: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Pick {
    First,
    Keep,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Auto,
    Nara,
    Pusan,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_from_default(),
    };

    match cli.command {
        Command::Check { file, json } => {
            let review = run_check(&config, file.as_deref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&review.corrections)?);
            } else {
                print_corrections(&review.corrections);
            }
        }
        Command::Fix { file, pick } => {
            let review = run_check(&config, file.as_deref()).await?;
            let selections: Vec<UserSelection> = review
                .corrections
                .iter()
                .map(|c| select(c, pick))
                .collect();
            print!("{}", review.apply(&selections));
        }
        Command::Parse { file, format } => {
            let body = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let corrections = match format {
                FormatArg::Auto => normalize_auto(&body)?,
                FormatArg::Nara => normalize(&body, ResponseFormat::StreamLines)?,
                FormatArg::Pusan => normalize(&body, ResponseFormat::HtmlEmbedded)?,
                FormatArg::Json => normalize(&body, ResponseFormat::FlatArray)?,
            };
            print_corrections(&corrections);
        }
        Command::Nouns { action } => {
            let store = config
                .term_store()
                .ok_or_else(|| anyhow!("No data directory available for protected terms"))?;
            match action {
                NounAction::List => {
                    let terms = store.load()?;
                    if terms.is_empty() {
                        eprintln!("등록된 고유명사가 없습니다.");
                    }
                    for term in terms.sorted() {
                        println!("{}", term);
                    }
                }
                NounAction::Add { term } => {
                    store.add(&term)?;
                    eprintln!("\"{}\"이(가) 고유명사로 추가되었습니다.", term.trim());
                }
                NounAction::Remove { term } => {
                    if !store.remove(&term)? {
                        bail!("\"{}\" is not registered", term.trim());
                    }
                }
            }
        }
    }

    Ok(())
}

fn open_speller(config: &Config) -> Result<Speller<HttpSpellService>> {
    let service = HttpSpellService::new(&config.service)?;
    let checker = SpellChecker::new(service).with_max_words(config.checker.max_words);

    match config.term_store() {
        Some(store) => Ok(Speller::with_store(checker, store)?),
        None => {
            tracing::warn!("No data directory available; protected terms are not persisted");
            Ok(Speller::new(checker, ProtectedTermSet::new()))
        }
    }
}

async fn run_check(config: &Config, file: Option<&Path>) -> Result<Review> {
    let text = read_input(file)?;
    if text.trim().is_empty() {
        bail!("선택된 텍스트가 없습니다.");
    }

    let speller = open_speller(config)?;
    let review = speller
        .check(&text)
        .await
        .map_err(|e| anyhow!("맞춤법 검사 오류: {}", e))?;

    if review.is_empty() {
        eprintln!("수정할 것이 없습니다. 훌륭합니다!");
    }
    Ok(review)
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn select(correction: &Correction, pick: Pick) -> UserSelection {
    match pick {
        Pick::Keep => UserSelection::KeptOriginal,
        Pick::First => correction
            .candidates
            .first()
            .map(|c| UserSelection::Candidate(c.clone()))
            .unwrap_or_default(),
    }
}

fn print_corrections(corrections: &[Correction]) {
    for (i, correction) in corrections.iter().enumerate() {
        println!("오류 {}: {}", i + 1, correction.original);
        println!("  수정: {}", correction.options().join(" | "));
        let help = correction.help.trim();
        if !help.is_empty() {
            for line in help.lines() {
                println!("  {}", line);
            }
        }
    }
}
