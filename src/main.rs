//! Progressive Import - Step-by-step CSV import wizard
//!
//! This is the main entry point. It handles:
//! 1. CLI argument parsing (--config, --file, --script, etc.)
//! 2. Loading the configuration and string bundles
//! 3. Assembling the welcome -> import -> complete wizard
//! 4. Driving it from the console, or in a GTK window with --gui

use anyhow::{Context, Result};
use clap::Parser;
use progressive::config::WizardConfig;
use progressive::i18n::Localization;
use progressive::import::CsvImportEngine;
use progressive::task::{TaskBridge, TaskRuntime};
use progressive::ui::console::{ConsoleDriver, ConsoleHost, HELP};
use progressive::ui::pages;
use progressive::ui::{UiLoop, Wizard};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Progressive Import - CSV import wizard
#[derive(Parser, Debug)]
#[command(name = "progressive-import")]
#[command(about = "Step-by-step CSV import wizard")]
#[command(version)]
struct Args {
    /// Configuration file (default: ~/.config/progressive/wizard.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Interface language, overrides the configuration
    #[arg(long)]
    locale: Option<String>,

    /// CSV file to preselect on the import page
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Read wizard commands from a file instead of stdin
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Open a GTK window (requires the `gtk` feature)
    #[arg(long)]
    gui: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    info!("Progressive Import v{}", env!("CARGO_PKG_VERSION"));

    let config = WizardConfig::load(args.config.as_deref())?;
    let locale = args
        .locale
        .clone()
        .unwrap_or_else(|| config.wizard.locale.clone());
    let l10n = Localization::embedded(locale.as_str())?;
    info!("Locale: {}", l10n.locale());

    let runtime = TaskRuntime::new()?;
    let ui = UiLoop::new();

    if args.gui {
        run_gui(args, ui, runtime, config, l10n)
    } else {
        run_console(args, ui, runtime, config, l10n)
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}

/// Put `--file` into the session so the import page starts with it
fn preselect(wizard: &Wizard, file: Option<&PathBuf>) {
    if let Some(file) = file {
        info!("Preselected file: {}", file.display());
        wizard
            .context()
            .with_mut(|ctx| ctx.import.selected_file = Some(file.clone()));
    }
}

fn run_console(
    args: Args,
    ui: UiLoop,
    runtime: TaskRuntime,
    config: WizardConfig,
    l10n: Localization,
) -> Result<()> {
    let wizard = pages::import_wizard(
        &ui,
        ConsoleHost::new(),
        TaskBridge::new(&ui, runtime.handle()),
        &config,
        &l10n,
        Arc::new(CsvImportEngine),
    )?;
    preselect(&wizard, args.file.as_ref());
    wizard.setup()?;
    ui.run_pending();

    let scripted = args.script.is_some();
    let input: Box<dyn BufRead> = match args.script {
        Some(ref path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open script: {}", path.display()))?,
        )),
        None => {
            println!("{}", HELP);
            Box::new(std::io::stdin().lock())
        }
    };

    let driver = ConsoleDriver::new(wizard);
    for line in input.lines() {
        let line = line.context("Failed to read command")?;
        match driver.execute(&line) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if scripted => return Err(e.context(format!("Command failed: {}", line.trim()))),
            Err(e) => eprintln!("{:#}", e),
        }
    }

    Ok(())
}

#[cfg(feature = "gtk")]
fn run_gui(
    args: Args,
    ui: UiLoop,
    runtime: TaskRuntime,
    config: WizardConfig,
    l10n: Localization,
) -> Result<()> {
    use progressive::ui::gtk_host;

    let file = args.file;
    let exit_code = gtk_host::run("Progressive Import", move |host| {
        let wizard = pages::import_wizard(
            &ui,
            host,
            TaskBridge::new(&ui, runtime.handle()),
            &config,
            &l10n,
            Arc::new(CsvImportEngine),
        )?;
        preselect(&wizard, file.as_ref());
        Ok(wizard)
    })?;

    std::process::exit(exit_code);
}

#[cfg(not(feature = "gtk"))]
fn run_gui(
    _args: Args,
    _ui: UiLoop,
    _runtime: TaskRuntime,
    _config: WizardConfig,
    _l10n: Localization,
) -> Result<()> {
    anyhow::bail!("This build has no GUI; rebuild with `--features gtk` or drop --gui")
}
