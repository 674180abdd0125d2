//! `openterm macro` — manage saved macros and play them.
//!
//! `macro play` uses this terminal as the session: bytes go to stdout and
//! the text written so far is what `WAITFOR=` steps search.  Ctrl-C stops
//! the playback.

use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::sync::{Arc, Mutex};

use crate::cli::output;
use crate::cli::{Cli, Context, MacroAction};
use crate::errors::{OpenTermError, Result};
use crate::macros::{MacroLibrary, MacroPlayer, MacroSink, PlaybackState};

/// Execute a `macro` subcommand.
pub fn execute(cli: &Cli, action: &MacroAction) -> Result<()> {
    let ctx = Context::load(cli)?;
    match action {
        MacroAction::List => list(&ctx),
        MacroAction::Add { name, file } => add(&ctx, name, file.as_deref()),
        MacroAction::Update { name, file } => update(&ctx, name, file.as_deref()),
        MacroAction::Remove { name } => remove(&ctx, name),
        MacroAction::Show { name } => show(&ctx, name),
        MacroAction::Play { name, on_connect } => play(&ctx, name, *on_connect),
    }
}

fn list(ctx: &Context) -> Result<()> {
    let library = MacroLibrary::load(&ctx.macros_path())?;
    if !library.is_empty() {
        output::info(&format!("{} saved macro(s)", library.len()));
    }
    output::print_macros_table(&library.list());
    Ok(())
}

fn add(ctx: &Context, name: &str, file: Option<&str>) -> Result<()> {
    let content = read_content(file)?;

    let mut library = MacroLibrary::load(&ctx.macros_path())?;
    let steps = library.add(name, &content)?.steps().len();
    library.save()?;

    output::success(&format!("Macro '{name}' saved ({steps} step(s))"));
    Ok(())
}

fn update(ctx: &Context, name: &str, file: Option<&str>) -> Result<()> {
    let content = read_content(file)?;

    let mut library = MacroLibrary::load(&ctx.macros_path())?;
    let steps = library.update_content(name, &content)?.steps().len();
    library.save()?;

    output::success(&format!("Macro '{name}' updated ({steps} step(s))"));
    Ok(())
}

/// Macro text from `file`, or from stdin when no file is given.
fn read_content(file: Option<&str>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| OpenTermError::CommandFailed(format!("failed to read {path}: {e}"))),
        None => {
            if io::stdin().is_terminal() {
                output::info("Enter macro lines, finish with Ctrl-D:");
            }
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn remove(ctx: &Context, name: &str) -> Result<()> {
    let mut library = MacroLibrary::load(&ctx.macros_path())?;
    let removed = library.remove(name)?;
    library.save()?;

    output::success(&format!("Deleted macro '{}'", removed.name));
    Ok(())
}

fn show(ctx: &Context, name: &str) -> Result<()> {
    let library = MacroLibrary::load(&ctx.macros_path())?;
    let entry = library
        .find(name)
        .ok_or_else(|| OpenTermError::MacroNotFound(name.to_string()))?;

    output::info(&format!("Macro '{}' ({})", entry.name, entry.id));
    output::print_steps_table(&entry.steps());
    Ok(())
}

fn play(ctx: &Context, name: &str, on_connect: bool) -> Result<()> {
    let library = MacroLibrary::load(&ctx.macros_path())?;
    let entry = library
        .find(name)
        .ok_or_else(|| OpenTermError::MacroNotFound(name.to_string()))?;

    let steps = entry.steps();
    if steps.is_empty() {
        output::warning(&format!("Macro '{}' has no steps.", entry.name));
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let config = ctx.settings.playback_config();
    let final_state = runtime.block_on(async move {
        let mut player = MacroPlayer::new(config);
        let sink: Arc<dyn MacroSink> = Arc::new(StdoutSink::default());

        if on_connect {
            player.play_on_connect(steps, sink);
        } else {
            player.play(steps, vec![sink]);
        }

        let mut progress = player.subscribe();
        let mut last_message = None;
        loop {
            let state = progress.borrow_and_update().clone();
            if state.status_message != last_message {
                if let Some(msg) = &state.status_message {
                    output::status(msg);
                }
                last_message = state.status_message.clone();
            }
            if !state.is_playing {
                break;
            }

            tokio::select! {
                changed = progress.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => player.stop(),
            }
        }

        player.wait().await;
        player.state()
    });

    report(&final_state);
    Ok(())
}

fn report(state: &PlaybackState) {
    if state.cancelled {
        output::warning(&format!(
            "Playback stopped at step {} of {}",
            state.current_step_index, state.total_steps
        ));
    } else {
        output::success(&format!("Played {} step(s)", state.total_steps));
    }
}

/// Sink that writes to this process's stdout.
///
/// Carriage returns are expanded to CRLF so each submitted line is visible
/// on its own row.  The visible text is everything written so far.
#[derive(Default)]
struct StdoutSink {
    written: Mutex<String>,
}

impl MacroSink for StdoutSink {
    fn send_bytes(&self, data: &[u8]) {
        let mut expanded = Vec::with_capacity(data.len());
        for &b in data {
            if b == b'\r' {
                expanded.extend_from_slice(b"\r\n");
            } else {
                expanded.push(b);
            }
        }

        let mut out = io::stdout().lock();
        // A closed stdout is not worth aborting the macro over.
        let _ = out.write_all(&expanded);
        let _ = out.flush();

        if let Ok(mut written) = self.written.lock() {
            written.push_str(&String::from_utf8_lossy(&expanded));
        }
    }

    fn current_visible_text(&self) -> Option<String> {
        self.written.lock().ok().map(|w| w.clone())
    }
}
