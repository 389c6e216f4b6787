// Status reporting. Job and transfer logic only ever talks to the
// `Reporter` trait; the console rendering (colours, symbols, spinner) lives
// in `ConsoleReporter` and a recording implementation backs tests and
// non-interactive front ends.

use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::time::Duration;

/// Severity / kind of a status event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Failure,
    Warning,
    Info,
    /// Transient "still working" updates while a job is polled.
    Progress,
    /// Indented detail line belonging to the previous event.
    Detail,
}

pub trait Reporter {
    fn report(&self, level: Level, message: &str);

    fn success(&self, message: &str) {
        self.report(Level::Success, message);
    }

    fn failure(&self, message: &str) {
        self.report(Level::Failure, message);
    }

    fn warning(&self, message: &str) {
        self.report(Level::Warning, message);
    }

    fn info(&self, message: &str) {
        self.report(Level::Info, message);
    }

    fn progress(&self, message: &str) {
        self.report(Level::Progress, message);
    }

    fn detail(&self, message: &str) {
        self.report(Level::Detail, message);
    }
}

/// Terminal renderer used by the two binaries.
#[derive(Default)]
pub struct ConsoleReporter {
    spinner: RefCell<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn spin(&self, message: &str) {
        let mut slot = self.spinner.borrow_mut();
        let spinner = slot.get_or_insert_with(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });
        spinner.set_message(format!("⏳ {message}"));
    }

    fn stop_spinner(&self) {
        if let Some(pb) = self.spinner.borrow_mut().take() {
            pb.finish_and_clear();
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, level: Level, message: &str) {
        tracing::debug!(?level, "{message}");
        if level == Level::Progress {
            self.spin(message);
            return;
        }
        self.stop_spinner();
        match level {
            Level::Success => println!("{} {}", "✓".green().bold(), message),
            Level::Failure => eprintln!("{} {}", "✗".red().bold(), message.red()),
            Level::Warning => println!("{} {}", "⚠".yellow().bold(), message),
            Level::Info => println!("{} {}", "ℹ".blue(), message),
            Level::Detail => println!("   • {message}"),
            Level::Progress => {}
        }
    }
}

impl Drop for ConsoleReporter {
    fn drop(&mut self) {
        self.stop_spinner();
    }
}

/// Records every event; useful for tests and machine-readable output.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: RefCell<Vec<(Level, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Level, String)> {
        self.events.borrow().clone()
    }

    /// Messages reported at `level`, in order.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages(level).iter().any(|m| m.contains(needle))
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, level: Level, message: &str) {
        tracing::debug!(?level, "{message}");
        self.events.borrow_mut().push((level, message.to_string()));
    }
}
