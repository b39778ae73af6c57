mod blade;
mod cli;
mod config;
mod datasource;
mod grid;
mod highlight;
mod input;
mod k8s;
mod model;
mod nav;
mod process;
mod scheduler;
mod shell;
mod ui;
mod view;

use anyhow::{Context, Result};
use blade::{BladeContext, BladeKind};
use clap::Parser;
use cli::CliArgs;
use config::RuntimeConfigWatcher;
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::StreamExt;
use kube::Client;
use model::{Command, Invocation, UiEvent};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use shell::Shell;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;
const HOUSEKEEPING_TICK: Duration = Duration::from_millis(250);

struct LoopContext {
    client: Option<Client>,
    events_tx: mpsc::UnboundedSender<UiEvent>,
    events_rx: mpsc::UnboundedReceiver<UiEvent>,
    config: RuntimeConfigWatcher,
    refresh: Duration,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let _log_guard = init_tracing(&args.log_filter, &args.log_file)?;

    let mut config_watcher = RuntimeConfigWatcher::new(args.config.clone());
    let config = config_watcher.load_current()?;
    let blade_kind = args.blade.or(config.blade).unwrap_or(BladeKind::Rio);
    let refresh = config.refresh_interval(args.refresh_ms);
    info!(
        blade = ?blade_kind,
        refresh_ms = refresh.as_millis() as u64,
        config = config.source.as_deref().unwrap_or("-"),
        "starting axe"
    );

    let client = match k8s::connect(args.kubeconfig.as_deref()).await {
        Ok(client) => Some(client),
        Err(error) => {
            warn!(error = %compact_error(&error), "kubernetes client unavailable");
            None
        }
    };

    let blade = blade::build(
        blade_kind,
        BladeContext {
            rio: config.rio.clone(),
            kubectl: config.kubectl.clone(),
            client: client.clone(),
        },
    );

    let cancel = CancellationToken::new();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let mut shell = Shell::new(blade, events_tx.clone(), cancel.clone(), config.status_delay);
    let mut context = LoopContext {
        client,
        events_tx,
        events_rx,
        config: config_watcher,
        refresh,
    };

    let result = run(&mut shell, &mut context).await;
    cancel.cancel();
    result
}

fn init_tracing(level_filter: &str, log_file: &Path) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .with_writer(writer)
        .try_init();

    Ok(guard)
}

async fn run(shell: &mut Shell, context: &mut LoopContext) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, shell, context).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_ALTERNATE_KEYS
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    shell: &mut Shell,
    context: &mut LoopContext,
) -> Result<()> {
    let LoopContext {
        client,
        events_tx,
        events_rx,
        config,
        refresh,
    } = context;
    let mut reader = EventStream::new();
    let mut ticker = interval(*refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut housekeeping = interval(HOUSEKEEPING_TICK);
    housekeeping.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        terminal
            .draw(|frame| ui::render(frame, shell))
            .context("failed to render terminal frame")?;

        if !shell.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        shell.handle_key(key);
                        for command in shell.take_commands() {
                            terminal
                                .draw(|frame| ui::render(frame, shell))
                                .context("failed to render terminal frame")?;
                            execute_command(terminal, shell, client.as_ref(), events_tx, command).await;
                        }
                    }
                    Some(Ok(Event::Resize(_, _))) => {}
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        shell.post_status(&format!("terminal event error: {error}"), true);
                    }
                    None => {
                        warn!("terminal event stream closed");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                shell.refresh_focused();
                match config.reload_if_changed() {
                    Ok(Some(config)) => {
                        info!(config = config.source.as_deref().unwrap_or("-"), "runtime config reloaded");
                        shell.set_status_delay(config.status_delay);
                    }
                    Ok(None) => {}
                    Err(error) => shell.post_status(&compact_error(&error), true),
                }
            }
            _ = housekeeping.tick() => {
                shell.expire_banners(Instant::now());
            }
            maybe_event = events_rx.recv() => {
                if let Some(event) = maybe_event {
                    shell.handle_ui_event(event);
                }
            }
        }
    }

    Ok(())
}

async fn execute_command(
    terminal: &mut TuiTerminal,
    shell: &mut Shell,
    client: Option<&Client>,
    events: &mpsc::UnboundedSender<UiEvent>,
    command: Command,
) {
    match command {
        Command::Capture {
            invocation,
            title,
            style,
        } => match process::capture(&invocation).await {
            Ok(body) => shell.show_text(&title, &body, style.as_deref()),
            Err(error) => shell.post_status(&compact_error(&error), true),
        },
        Command::Interactive { invocation, label } => {
            match run_interactive(terminal, &invocation).await {
                Ok(()) => {
                    debug!(label = %label, "interactive command finished");
                    shell.refresh_focused();
                }
                Err(error) => shell.post_status(&compact_error(&error), true),
            }
        }
        Command::Follow { invocation, title } => {
            let stream = shell.next_stream_id();
            match process::follow(&invocation, stream, events.clone()) {
                Ok(handle) => shell.show_stream(&title, handle),
                Err(error) => shell.post_status(&compact_error(&error), true),
            }
        }
        Command::Mutate { invocation, label } => match process::capture(&invocation).await {
            Ok(_) => shell.after_mutation(&label),
            Err(error) => shell.post_status(&compact_error(&error), true),
        },
        Command::PickContainer {
            target,
            selector,
            purpose,
        } => {
            let Some(client) = client.cloned() else {
                shell.post_status("listing containers needs a Kubernetes client", true);
                return;
            };
            match k8s::list_containers(client, &selector).await {
                Ok(containers) => shell.show_containers(&target, purpose, containers),
                Err(error) => shell.post_status(&compact_error(&error), true),
            }
        }
    }
}

async fn run_interactive(terminal: &mut TuiTerminal, invocation: &Invocation) -> Result<()> {
    suspend_terminal_for_subprocess(terminal)?;
    let run_result = process::run_attached(invocation).await;
    let restore_result = resume_terminal_after_subprocess(terminal);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal resume error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn suspend_terminal_for_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode for subprocess")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen for subprocess")?;
    terminal
        .show_cursor()
        .context("failed to show cursor for subprocess")?;
    Ok(())
}

fn resume_terminal_after_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    enable_raw_mode().context("failed to re-enable raw mode after subprocess")?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)
        .context("failed to re-enter alternate screen after subprocess")?;
    terminal
        .clear()
        .context("failed to clear terminal after subprocess")?;
    Ok(())
}

fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("\n")
}
