use owo_colors::OwoColorize;
use std::io::Write;

use crate::transfer::TransferState;

/// Small wrapper around stdout/stderr printing to provide consistent, colored
/// user-facing messages. Colors are enabled only when output is a TTY.
fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

pub fn print_info(msg: &str) {
    if is_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {}", msg);
    }
}

pub fn print_warn(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {}", msg);
    }
}

pub fn print_error(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

pub fn print_success(msg: &str) {
    if is_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {}", msg);
    }
}

const BAR_WIDTH: usize = 24;

/// Renders transfer snapshots: a redrawn single line on a TTY, otherwise one
/// line per status change or 10% step.
pub struct ProgressLine {
    tty: bool,
    drawn: usize,
    last_status: String,
    last_step: Option<u8>,
}

impl Default for ProgressLine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressLine {
    pub fn new() -> Self {
        Self {
            tty: is_tty(),
            drawn: 0,
            last_status: String::new(),
            last_step: None,
        }
    }

    pub fn update(&mut self, state: &TransferState) {
        let line = render_line(state);
        if self.tty {
            let pad = self.drawn.saturating_sub(line.chars().count());
            print!("\r{}{}", line.cyan(), " ".repeat(pad));
            let _ = std::io::stdout().flush();
            self.drawn = line.chars().count();
        } else {
            let step = (state.progress * 10.0).floor() as u8;
            if state.status != self.last_status || self.last_step != Some(step) {
                println!("{line}");
                self.last_status = state.status.clone();
                self.last_step = Some(step);
            }
        }
    }

    /// End the redrawn line so later output starts on a fresh row.
    pub fn finish(&mut self) {
        if self.tty && self.drawn > 0 {
            println!();
            self.drawn = 0;
        }
    }
}

/// "[#######.........]  42% Uploading photo.jpg  1.2 MB/s  00:03 remaining"
pub fn render_line(state: &TransferState) -> String {
    let pct = (state.progress.clamp(0.0, 1.0) * 100.0).round() as usize;
    let filled = pct * BAR_WIDTH / 100;
    let mut line = format!(
        "[{}{}] {:>3}% {}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        pct,
        state.status
    );
    for extra in [&state.transfer_speed, &state.time_remaining] {
        if !extra.is_empty() {
            line.push_str("  ");
            line.push_str(extra);
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_bar_status_and_rate() {
        let state = TransferState {
            is_transferring: true,
            progress: 0.5,
            status: "Uploading photo.jpg".into(),
            filename: "photo.jpg".into(),
            transfer_speed: "1.0 MB/s".into(),
            time_remaining: "00:02 remaining".into(),
            ..Default::default()
        };
        let line = render_line(&state);
        assert!(line.starts_with(&format!("[{}{}]", "#".repeat(12), ".".repeat(12))));
        assert!(line.contains(" 50% Uploading photo.jpg"));
        assert!(line.ends_with("1.0 MB/s  00:02 remaining"));
    }

    #[test]
    fn omits_empty_rate_fields() {
        let state = TransferState {
            progress: 1.0,
            status: "Done".into(),
            ..Default::default()
        };
        assert!(render_line(&state).ends_with("100% Done"));
    }
}
