//! pixreview: visual-regression screenshot review in the terminal.
//!
//! Entry point for the `pixreview` binary. `open` runs the interactive
//! reviewer; `diff`, `reset` and `status` run headless and exit.
//!
//! # Startup sequence for `open`
//!
//! 1. Parse the CLI, load the config, apply overrides, start file logging.
//!    All of this is read-only with respect to the terminal.
//! 2. `install_panic_hook()` so a panic restores the terminal before the
//!    message prints.
//! 3. `register_sigterm()`, polled in the event loop heartbeat.
//! 4. Open the review store, build the promoter, spawn the image loader and
//!    load the document, all before `init_tui()` so a bad path or database
//!    fails with a plain error instead of a half-drawn screen.
//! 5. `init_tui()`, then the event task.
//!
//! `restore_tui()` runs once after the event loop exits. Inside the loop `?`
//! is only used in the Render arm; draw errors break out and still reach it.

mod app;
mod cli;
mod config;
mod event;
mod headless;
mod loader;
mod logging;
mod pages;
mod promote;
mod theme;
mod timer;
mod tui;
mod ui;

use std::sync::atomic::Ordering;

use anyhow::Context;
use clap::Parser;
use pixreview_core::diff::DiffOptions;
use pixreview_core::{ResetPolicy, ReviewStore};

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::event::AppEvent;
use crate::ui::keybindings::{handle_key, handle_mouse, KeyAction};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_file = cli.config.clone().unwrap_or_else(config::config_path);
    let (mut config, warning) = Config::load(&config_file);
    config.apply_cli(&cli);
    if let Command::Open { skip_classified, frame_delay_ms, .. } = &cli.command {
        config.skip_classified |= *skip_classified;
        if let Some(ms) = frame_delay_ms {
            config.frame_delay_ms = *ms;
        }
    }

    logging::init(&config.log_file)?;
    if let Some(warning) = warning {
        tracing::warn!("{warning}");
    }
    tracing::info!(command = ?cli.command, db = %config.db_path.display(), "pixreview starting");

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Open { document, .. } => run_tui(config, &document).await,
        Command::Diff { recorded, actual, out, threshold, include_aa, mask } => {
            let options = DiffOptions {
                threshold,
                include_anti_aliased: include_aa,
                diff_mask: mask,
                ..DiffOptions::default()
            };
            let count = headless::diff(&recorded, &actual, out.as_deref(), &options, &mut stdout)?;
            if count > 0 {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Reset { scope, include_pending } => {
            let store = open_store(&config).await?;
            let policy = ResetPolicy {
                all_includes_pending: include_pending || config.reset_all_includes_pending,
            };
            headless::reset(&store, scope, policy, &mut stdout).await
        }
        Command::Status { document, json } => {
            let store = open_store(&config).await?;
            headless::status(&store, &document, json, &mut stdout).await
        }
    }
}

async fn open_store(config: &Config) -> anyhow::Result<ReviewStore> {
    if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    ReviewStore::open(&config.db_path)
        .await
        .with_context(|| format!("opening review database {}", config.db_path.display()))
}

async fn run_tui(config: Config, document: &std::path::Path) -> anyhow::Result<()> {
    let theme = theme::Theme::from_name(&config.theme);

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm()?;

    let handler = event::EventHandler::new();
    let tx = handler.tx.clone();
    let mut rx = handler.rx;

    let store = open_store(&config).await?;
    let promoter = promote::HttpPromoter::new(config.endpoint.clone(), config.request_timeout())
        .context("building the baseline-update client")?;
    let loader = loader::Loader::spawn(tx.clone()).context("starting the image loader")?;
    let mut app = app::App::new(store, promoter, loader, tx.clone(), config);
    app.open_document(document)
        .await
        .with_context(|| format!("opening {}", document.display()))?;

    let mut terminal = tui::init_tui()?;
    event::spawn_event_task(tx);

    // Exits only via `break`, so `restore_tui()` below is always reached.
    let outcome: anyhow::Result<()> = 'event_loop: loop {
        tokio::select! {
            // Heartbeat: SIGTERM is checked at least every 50ms even when
            // nothing else arrives.
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    tracing::info!("SIGTERM received");
                    break 'event_loop Ok(());
                }
            }
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(AppEvent::Render) => {
                        if let Err(e) = terminal.draw(|frame| ui::render(frame, &mut app, &theme)) {
                            break 'event_loop Err(e.into());
                        }
                    }
                    Some(AppEvent::Key(key)) => match handle_key(key, &mut app) {
                        KeyAction::Quit => break 'event_loop Ok(()),
                        KeyAction::Run(action) => app.perform(action).await,
                        KeyAction::Continue => {}
                    },
                    Some(AppEvent::Mouse(mouse)) => {
                        handle_mouse(mouse, &mut app);
                    }
                    // ratatui picks up the new size on the next Render.
                    Some(AppEvent::Resize(_, _)) => {}
                    Some(AppEvent::Tick) => app.on_tick().await,
                    Some(AppEvent::PairLoaded(pair)) => app.on_pair_loaded(*pair),
                    Some(AppEvent::FrameTick { page, generation }) => app.on_frame_tick(page, generation),
                    Some(AppEvent::Marked { page, result }) => app.on_marked(page, result).await,
                    // Every sender is gone.
                    None => break 'event_loop Ok(()),
                }
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop Ok(());
                }
            }
        }
    };

    tui::restore_tui()?;
    tracing::info!(ok = outcome.is_ok(), "pixreview exiting");
    outcome
}
