// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging and build the config
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code (0 = success, 1 = broken links or failed
//    save/load, 2 = error)
//
// Rust concepts used:
// - async/await: probes and the Gist API are network calls
// - Result<T, E>: For error handling (T = success type, E = error type)
// - match: Pattern matching to handle different subcommands
// =============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use link_notes::checker::{HttpProber, LinkState, LinkStatus};
use link_notes::cli::{Cli, Commands};
use link_notes::config::Config;
use link_notes::editor::Editor;
use link_notes::engine::Engine;
use link_notes::persist::{BannerKind, GistStore, PersistError, PersistenceBridge, Session};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // If an unexpected error occurred, print it and exit with code 2
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Logs go to stderr so they never mix with the report on stdout
// RUST_LOG wins over --verbose when both are given
fn init_logging(verbose: bool) {
    let default = if verbose { "link_notes=debug" } else { "link_notes=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(cli: Cli) -> Result<i32> {
    let config = Config::from_cli(&cli);

    match cli.command {
        Commands::Check { file, json } => handle_check(&config, &file, json).await,
        Commands::Render { file, html, no_check } => {
            handle_render(&config, &file, html, no_check).await
        }
        Commands::Edit { file, html, save } => handle_edit(&config, file, html, save).await,
        Commands::Save { file } => handle_save(&config, &file).await,
        Commands::Load { output } => handle_load(&config, output).await,
    }
}

fn build_engine(config: &Config) -> Result<Engine> {
    let prober = HttpProber::new(&config.probe).context("could not build the HTTP client")?;
    Ok(Engine::new(Arc::new(prober), config.engine.clone()))
}

fn build_bridge(config: &Config) -> Result<Arc<PersistenceBridge>> {
    let store = GistStore::new(&config.store).context("could not build the Gist client")?;
    let session = Session::from(config.credential.clone());
    Ok(Arc::new(PersistenceBridge::new(Arc::new(store), session)))
}

fn read_note(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))
}

// Handles the 'check' subcommand
//
// Every link in the file is probed once, one after another
async fn handle_check(config: &Config, file: &Path, json: bool) -> Result<i32> {
    let engine = build_engine(config)?;
    engine.load_text(read_note(file)?);

    let results = engine.check_all().await;
    if results.is_empty() {
        println!("✅ No links found to check");
        return Ok(0);
    }

    print_results(&results, json)?;

    let broken_count = results.iter().filter(|r| !r.is_reachable()).count();
    Ok(if broken_count > 0 { 1 } else { 0 })
}

// Handles the 'render' subcommand
async fn handle_render(config: &Config, file: &Path, html: bool, no_check: bool) -> Result<i32> {
    let engine = build_engine(config)?;
    engine.load_text(read_note(file)?);

    if !no_check {
        engine.check_all().await;
    }

    let rendered = engine.render();
    if html {
        println!("{}", rendered.to_html());
    } else {
        println!("{}", rendered.to_annotated_text());
    }
    Ok(0)
}

// Handles the 'edit' subcommand
//
// Lines from stdin are appended to the note one at a time, exactly like a
// user typing. The engine's debounce decides when links get checked.
async fn handle_edit(config: &Config, file: Option<PathBuf>, html: bool, save: bool) -> Result<i32> {
    let engine = build_engine(config)?;
    let mut editor = Editor::new(engine.clone(), build_bridge(config)?);
    let mut events = engine.subscribe();

    let mut buffer = match file {
        Some(path) => read_note(&path)?,
        None => {
            // First authenticated session: pick up where the saved note left off
            editor.set_session(Session::from(config.credential.clone())).await;
            editor.engine().text()
        }
    };
    if !buffer.is_empty() {
        editor.input(buffer.clone(), Some(buffer.chars().count()));
    }

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    buffer.push_str(&line);
                    buffer.push('\n');
                    editor.input(buffer.clone(), Some(buffer.chars().count()));
                }
                None => stdin_open = false,
            },
            event = events.recv() => match event {
                Ok(record) => on_status_change(&mut editor, &record),
                Err(RecvError::Lagged(missed)) => tracing::warn!(missed, "status updates dropped"),
                Err(RecvError::Closed) => break,
            },
            _ = engine.settle(), if !stdin_open => break,
        }
    }
    while let Ok(record) = events.try_recv() {
        on_status_change(&mut editor, &record);
    }

    let rendered = editor.redraw();
    println!();
    if html {
        println!("{}", rendered.to_html());
    } else {
        println!("{}", rendered.to_annotated_text());
    }

    let table = engine.statuses();
    if !table.is_empty() {
        println!();
        print_table(table.records());
    }

    let mut exit_code = 0;
    if save {
        if let Err(e) = editor.save().await {
            report_persist_error(&e);
            exit_code = 1;
        }
    }
    if let Some(banner) = editor.banner() {
        print_banner(banner.kind, &banner.text);
    }

    engine.shutdown();
    Ok(exit_code)
}

// A probe finished: report it and rebuild the display so the highlight
// changes while the caret stays put
fn on_status_change(editor: &mut Editor, record: &LinkStatus) {
    if record.state.is_terminal() {
        print_status_line(record);
        editor.redraw();
    }
}

// Handles the 'save' subcommand
async fn handle_save(config: &Config, file: &Path) -> Result<i32> {
    let bridge = build_bridge(config)?;
    let content = read_note(file)?;

    let result = bridge.save(&content).await;
    if let Some(banner) = bridge.banner() {
        print_banner(banner.kind, &banner.text);
    }
    match result {
        Ok(()) => Ok(0),
        Err(e) => {
            report_persist_error(&e);
            Ok(1)
        }
    }
}

// Handles the 'load' subcommand
async fn handle_load(config: &Config, output: Option<PathBuf>) -> Result<i32> {
    let bridge = build_bridge(config)?;

    let result = bridge.load().await;
    if let Some(banner) = bridge.banner() {
        print_banner(banner.kind, &banner.text);
    }
    match result {
        Ok(Some(content)) => {
            match output {
                Some(path) => std::fs::write(&path, content)
                    .with_context(|| format!("could not write {}", path.display()))?,
                None => println!("{}", content),
            }
            Ok(0)
        }
        Ok(None) => Ok(0),
        Err(e) => {
            report_persist_error(&e);
            Ok(1)
        }
    }
}

fn report_persist_error(error: &PersistError) {
    match error {
        PersistError::Unauthenticated => {
            eprintln!("Sign in first: pass --token or set GITHUB_TOKEN");
        }
        other => eprintln!("Error: {}", other),
    }
}

fn print_banner(kind: BannerKind, text: &str) {
    match kind {
        BannerKind::Success => println!("💾 {}", text),
        BannerKind::Error => eprintln!("⚠️  {}", text),
    }
}

// Prints the results either as a table or JSON
fn print_results(results: &[LinkStatus], json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(results)?;
        println!("{}", json_output);
    } else {
        print_table(results);
    }
    Ok(())
}

// Prints results as a human-readable table in the terminal
fn print_table(results: &[LinkStatus]) {
    println!("{:<60} {:<15} {:<30}", "URL", "STATUS", "MESSAGE");
    println!("{}", "=".repeat(105));

    for result in results {
        let message = match (&result.error, result.http_status) {
            (Some(error), _) => error.clone(),
            (None, Some(code)) => format!("HTTP {}", code),
            (None, None) => String::new(),
        };

        println!(
            "{:<60} {:<15} {:<30}",
            truncate_url(&result.url),
            format_state(result.state),
            message
        );
    }

    println!();

    let ok_count = results.iter().filter(|r| r.is_reachable()).count();
    let broken_count = results.len() - ok_count;

    println!("📊 Summary:");
    println!("   ✅ Reachable: {}", ok_count);
    println!("   ❌ Unreachable: {}", broken_count);
    println!("   📋 Total: {}", results.len());
}

fn print_status_line(record: &LinkStatus) {
    match &record.error {
        Some(error) => println!("{} {} ({})", format_state(record.state), record.url, error),
        None => println!("{} {}", format_state(record.state), record.url),
    }
}

// Truncate long URLs for display, on a char boundary
fn truncate_url(url: &str) -> String {
    if url.chars().count() > 57 {
        let head: String = url.chars().take(57).collect();
        format!("{}...", head)
    } else {
        url.to_string()
    }
}

fn format_state(state: LinkState) -> &'static str {
    match state {
        LinkState::Checking => "⏳ CHECKING",
        LinkState::Reachable => "✅ REACHABLE",
        LinkState::Unreachable => "❌ UNREACHABLE",
    }
}
