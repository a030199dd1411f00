//! Line-oriented control of a running scheduler
//!
//! Stands in for the frame's physical button: each line read from the
//! input is one command, answered on the output.

use inkplay_core::MANUAL_REFRESH_WAIT_SECS;
use std::io::{self, BufRead, Write};
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigStore;
use crate::core::{RefreshTarget, SchedulerControl};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Refresh(RefreshTarget),
    TogglePause,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("usage: show <playlist> <instance>")]
    ShowUsage,
}

/// Why the control loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlExit {
    Quit,
    EndOfInput,
}

const HELP: &str = "commands: next | previous | current | show <playlist> <instance> | pause | status | quit";

/// Parse one input line; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let command = match verb.to_ascii_lowercase().as_str() {
        "refresh" | "next" | "n" => Command::Refresh(RefreshTarget::Next),
        "previous" | "prev" | "p" => Command::Refresh(RefreshTarget::Previous),
        "current" | "redraw" => Command::Refresh(RefreshTarget::Current),
        "show" => match (words.next(), words.next(), words.next()) {
            (Some(playlist), Some(instance), None) => Command::Refresh(RefreshTarget::Instance {
                playlist: playlist.to_string(),
                instance: instance.to_string(),
            }),
            _ => return Err(ParseError::ShowUsage),
        },
        "pause" | "resume" => Command::TogglePause,
        "status" | "s" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// Human-readable summary of the scheduler and the last cycle
pub fn status_report(store: &ConfigStore, control: &SchedulerControl) -> String {
    let config = store.snapshot();
    let refresh = &config.refresh;
    let mut lines = vec![format!(
        "scheduler: {}{}",
        control.state(),
        if control.is_paused() { " (paused)" } else { "" }
    )];
    lines.push(format!("last cycle: {:?}", refresh.status));
    if let Some(displayed) = &refresh.last_displayed {
        lines.push(format!(
            "showing: {} ({})",
            displayed.instance_ref(),
            displayed.plugin_id
        ));
    }
    if let Some(at) = refresh.last_success {
        lines.push(format!("last success: {}", at.to_rfc3339()));
    }
    if let Some(fault) = &refresh.last_error {
        lines.push(format!(
            "last error: {} (consecutive failures: {})",
            fault, refresh.consecutive_failures
        ));
    }
    for playlist in &config.playlists {
        let window = playlist.window.map_or_else(
            || "always".to_string(),
            |w| {
                let span = w.span_minutes();
                format!("{} ({}h{:02}m)", w, span / 60, span % 60)
            },
        );
        lines.push(format!(
            "playlist {}: {} instances, window {}, cursor {}",
            playlist.name,
            playlist.len(),
            window,
            playlist.cursor
        ));
    }
    lines.join("\n")
}

/// Read commands until `quit` or end of input
///
/// Refresh commands block until the cycle ran and print its outcome.
pub fn run<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    control: &SchedulerControl,
    store: &ConfigStore,
) -> io::Result<ControlExit> {
    for line in input.lines() {
        let line = line?;
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(Command::Refresh(target))) => {
                let wait = Duration::from_secs(MANUAL_REFRESH_WAIT_SECS);
                match control.request_refresh_and_wait(target.clone(), wait) {
                    Ok(report) => writeln!(
                        output,
                        "{}: {} (next in {}s)",
                        target,
                        report.outcome,
                        report.next_interval.as_secs()
                    )?,
                    Err(e) => writeln!(output, "{}: {}", target, e)?,
                }
            }
            Ok(Some(Command::TogglePause)) => {
                let paused = control.toggle_pause();
                writeln!(output, "{}", if paused { "paused" } else { "resumed" })?;
            }
            Ok(Some(Command::Status)) => writeln!(output, "{}", status_report(store, control))?,
            Ok(Some(Command::Help)) => writeln!(output, "{}", HELP)?,
            Ok(Some(Command::Quit)) => return Ok(ControlExit::Quit),
            Err(e) => writeln!(output, "{}", e)?,
        }
        output.flush()?;
    }
    log::debug!("Control input closed");
    Ok(ControlExit::EndOfInput)
}
