use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tingli::app::{App, DrillMode, preload_message};
use tingli::config::Config;
use tingli::event::{AppEvent, EventHandler};
use tingli::presets;
use tingli::romanize::resolver::split_source_list;
use tingli::store::schema::ExportData;
use tingli::store::{JsonStore, KvStore, MemoryStore};

const TICK_RATE: Duration = Duration::from_millis(100);
const PRELOAD_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Parser)]
#[command(name = "tingli", version, about = "Terminal listening trainer for pinyin and tones")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[arg(long, global = true, help = "Wait for :next instead of advancing automatically")]
    no_auto_advance: bool,

    #[arg(long, global = true, value_name = "MS", help = "Delay before auto-advance")]
    delay: Option<u64>,

    #[arg(long, global = true, help = "Message language (en, ru)")]
    locale: Option<String>,

    #[arg(short, long, global = true, help = "Log debug output to stderr")]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Dictation drill over characters or words (the default)
    Listen {
        #[arg(help = "Comma-separated characters, e.g. 你,好")]
        chars: Option<String>,
        #[arg(long, help = "Use a built-in character list")]
        preset: Option<String>,
    },
    /// Drill random syllables from the audio catalog
    Phonetic,
    /// Show totals and recent attempts
    Stats,
    /// List built-in character lists
    Presets,
    /// Clear all drill progress
    Reset,
    /// Store every catalog recording in the offline cache
    Preload,
    /// Write progress and settings to a JSON file
    Export { path: PathBuf },
    /// Replace progress with a previously exported file
    Import { path: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config unreadable, using defaults");
        Config::default()
    });
    if cli.no_auto_advance {
        config.auto_advance = false;
    }
    if let Some(delay) = cli.delay {
        config.advance_delay_ms = delay;
    }
    if let Some(locale) = cli.locale {
        config.locale = locale;
    }
    config.validate();
    rust_i18n::set_locale(&config.locale);

    let json_store = match JsonStore::new() {
        Ok(store) => {
            if store.check_interrupted_import() {
                tracing::warn!("removed leftovers of an interrupted import");
            }
            Some(store)
        }
        Err(e) => {
            tracing::warn!(error = %e, "data directory unavailable, progress will not be saved");
            None
        }
    };

    match cli.command.unwrap_or(Command::Listen {
        chars: None,
        preset: None,
    }) {
        Command::Presets => {
            for preset in presets::all() {
                println!("{:<14} {} ({})", preset.id, preset.name, preset.description);
                println!("{:<14} {}", "", preset.chars);
            }
            Ok(())
        }
        Command::Export { path } => {
            let Some(store) = json_store else {
                bail!("no data directory to export from");
            };
            let data = store.export_all(&config);
            let json = serde_json::to_string_pretty(&data)?;
            fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported progress to {}", path.display());
            Ok(())
        }
        Command::Import { path } => {
            let Some(store) = json_store else {
                bail!("no data directory to import into");
            };
            let json = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let data: ExportData = serde_json::from_str(&json).context("not a tingli export")?;
            store.import_all(&data)?;
            let mut imported = data.config;
            imported.validate();
            imported.save()?;
            println!("Imported progress from {}", path.display());
            Ok(())
        }
        command => {
            let store: Rc<dyn KvStore> = match json_store {
                Some(store) => Rc::new(store),
                None => Rc::new(MemoryStore::new()),
            };
            run(command, config, store)
        }
    }
}

fn run(command: Command, config: Config, store: Rc<dyn KvStore>) -> Result<()> {
    let mut app = App::new(config, store)?;
    let opening = match command {
        Command::Stats => {
            print_lines(&app.stats_report());
            return Ok(());
        }
        Command::Reset => {
            print_lines(&app.reset_all());
            return Ok(());
        }
        Command::Preload => {
            let count = app.preload(PRELOAD_TIMEOUT)?;
            println!("{}", preload_message(count));
            return Ok(());
        }
        Command::Phonetic => {
            app.mode = DrillMode::Phonetic;
            if app.phonetic().is_active() {
                app.resume()
            } else {
                app.start_phonetic()
            }
        }
        Command::Listen { chars, preset } => {
            let texts = match (chars, preset) {
                (Some(chars), _) => split_source_list(&chars),
                (None, Some(id)) => match presets::find(&id) {
                    Some(preset) => preset.characters(),
                    None => bail!("unknown preset `{id}` (see `tingli presets`)"),
                },
                (None, None) => Vec::new(),
            };
            if texts.is_empty() {
                app.resume()
            } else {
                app.start_listening(&texts)
            }
        }
        Command::Presets | Command::Export { .. } | Command::Import { .. } => Vec::new(),
    };
    print_lines(&opening);

    let events = EventHandler::new(TICK_RATE);
    loop {
        let lines = match events.next() {
            AppEvent::Line(line) => app.handle_line(&line, Instant::now()),
            AppEvent::Tick => app.tick(Instant::now()),
            AppEvent::Eof => break,
        };
        print_lines(&lines);
        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn print_lines(lines: &[String]) {
    let mut stdout = io::stdout().lock();
    for line in lines {
        // Prompts end in "> " and stay on the input line.
        if line.ends_with("> ") {
            let _ = write!(stdout, "{line}");
        } else {
            let _ = writeln!(stdout, "{line}");
        }
    }
    let _ = stdout.flush();
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "tingli=debug" } else { "tingli=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
