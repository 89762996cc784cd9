//! Console output formatting with ANSI color support.
//!
//! Provides styled terminal output with automatic TTY detection and respect
//! for the NO_COLOR environment variable, plus the interactive pieces of a
//! batch: the plan table, the confirmation prompt and the progress bar.

use crate::pipeline::{BatchPlan, BatchReport, ConfirmGate, ProgressSink};
use async_trait::async_trait;
use std::io::{self, BufRead, IsTerminal, Write};

/// Width of the progress bar in cells.
const BAR_WIDTH: usize = 50;

/// ANSI style codes for terminal formatting.
#[derive(Debug, Clone, Copy)]
pub enum Style {
    Bold,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
}

impl Style {
    /// Returns the ANSI escape code for this style.
    fn code(self) -> &'static str {
        match self {
            Style::Bold => "1",
            Style::Red => "31",
            Style::Green => "32",
            Style::Yellow => "33",
            Style::Blue => "34",
            Style::Magenta => "35",
            Style::Cyan => "36",
        }
    }
}

const RESET: &str = "\x1b[0m";

/// Console output handler with color support detection.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    colors_enabled: bool,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    /// Creates a new Console instance, detecting color support.
    ///
    /// Colors are disabled if:
    /// - The `NO_COLOR` environment variable is set
    /// - stdout is not a terminal (TTY)
    pub fn new() -> Self {
        let colors_enabled = std::env::var("NO_COLOR").is_err() && io::stdout().is_terminal();

        Self { colors_enabled }
    }

    /// Creates a Console with colors explicitly enabled or disabled.
    pub fn with_colors(enabled: bool) -> Self {
        Self {
            colors_enabled: enabled,
        }
    }

    /// Applies ANSI styles to text if colors are enabled.
    pub fn style(&self, text: &str, styles: &[Style]) -> String {
        if !self.colors_enabled || styles.is_empty() {
            return text.to_string();
        }

        let codes: Vec<&str> = styles.iter().map(|s| s.code()).collect();
        format!("\x1b[{}m{}{}", codes.join(";"), text, RESET)
    }

    /// Creates a colored label like `[INFO]`.
    pub fn label(&self, label: &str, color: Style) -> String {
        let styled = self.style(label, &[color, Style::Bold]);
        format!("[{}]", styled)
    }

    /// Prints an info message with blue `[INFO]` label.
    pub fn info(&self, message: &str) {
        println!("{} {}", self.label("INFO", Style::Blue), message);
    }

    /// Prints a success message with green `[OK]` label.
    pub fn success(&self, message: &str) {
        println!("{} {}", self.label("OK", Style::Green), message);
    }

    /// Prints a warning message with yellow `[WARN]` label.
    pub fn warning(&self, message: &str) {
        println!("{} {}", self.label("WARN", Style::Yellow), message);
    }

    /// Prints an error message with red `[ERROR]` label.
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", self.label("ERROR", Style::Red), message);
    }

    /// Prints a step message with cyan `[STEP]` label.
    pub fn step(&self, message: &str) {
        println!("{} {}", self.label("STEP", Style::Cyan), message);
    }

    /// Prints a section header in magenta bold.
    pub fn section(&self, message: &str) {
        println!();
        println!("{}", self.style(message, &[Style::Magenta, Style::Bold]));
    }

    /// Formats a count with styling.
    pub fn count(&self, n: u64) -> String {
        self.style(&n.to_string(), &[Style::Green, Style::Bold])
    }

    /// Prints `message` and reads one line from stdin.
    ///
    /// Returns an empty string on EOF.
    pub fn prompt(&self, message: &str) -> io::Result<String> {
        print!("{}", self.style(message, &[Style::Bold]));
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    /// Renders the progress bar line for `current` out of `total`.
    pub fn progress_bar(&self, current: u64, total: u64) -> String {
        let current = current.min(total);
        let fraction = if total == 0 {
            1.0
        } else {
            current as f64 / total as f64
        };
        let filled = (fraction * BAR_WIDTH as f64) as usize;
        let bar = format!("[{}{}]", "█".repeat(filled), "-".repeat(BAR_WIDTH - filled));
        let percent = fraction * 100.0;

        let color = if percent < 50.0 {
            Style::Red
        } else if percent < 80.0 {
            Style::Yellow
        } else {
            Style::Green
        };

        self.style(&format!("{} {:.2}%", bar, percent), &[color])
    }

    /// Prints the counted plan of a batch.
    pub fn show_plan(&self, plan: &BatchPlan) {
        self.info(&format!(
            "There are {} chapters to download.",
            self.count(plan.chapters().len() as u64)
        ));
        for rejected in plan.rejected() {
            self.warning(&format!("Skipping chapter {}: {}", rejected.requested, rejected.error));
        }
        for chapter in plan.chapters() {
            let line = format!("Chapter {} has {} pages.", chapter.requested, chapter.pages);
            if chapter.pages == 0 {
                self.warning(&line);
            } else {
                self.info(&line);
            }
        }
        self.info(&format!("Total pages: {}", self.count(plan.total_pages())));
    }

    /// Returns the confirmation gate for a batch: the interactive prompt, or
    /// a plan printout that always proceeds when `assume_yes` is set.
    pub fn gate(self, assume_yes: bool) -> Box<dyn ConfirmGate> {
        if assume_yes {
            Box::new(Unattended { console: self })
        } else {
            Box::new(self)
        }
    }

    /// Prints the summary of a completed batch.
    pub fn show_report(&self, report: &BatchReport) {
        self.success(&format!(
            "Downloaded {} of {} pages",
            self.count(report.pages_written),
            report.total_pages
        ));
        if report.pages_failed > 0 {
            self.warning(&format!("{} pages failed", report.pages_failed));
        }
        for chapter in &report.chapters_skipped {
            self.warning(&format!(
                "Chapter {} skipped: routing token not found",
                chapter
            ));
        }
        if report.history_recorded {
            self.info("Saved to download history");
        }
    }
}

impl ProgressSink for Console {
    fn update(&self, current: u64, total: u64) {
        let mut stdout = io::stdout();
        let _ = write!(stdout, "\r{}", self.progress_bar(current, total));
        let _ = stdout.flush();
    }
}

#[async_trait]
impl ConfirmGate for Console {
    /// Shows the plan and asks `(Y/N)`; only `Y` (any case) proceeds.
    async fn confirm(&self, plan: &BatchPlan) -> bool {
        self.show_plan(plan);

        let console = *self;
        let answer = tokio::task::spawn_blocking(move || {
            console.prompt("Do you want to proceed with the download? (Y/N): ")
        })
        .await;

        match answer {
            Ok(Ok(answer)) => answer.eq_ignore_ascii_case("y"),
            Ok(Err(e)) => {
                self.error(&format!("Could not read answer: {}", e));
                false
            }
            Err(e) => {
                self.error(&format!("Prompt failed: {}", e));
                false
            }
        }
    }
}

/// Gate for `--yes`: shows the plan, never prompts.
struct Unattended {
    console: Console,
}

#[async_trait]
impl ConfirmGate for Unattended {
    async fn confirm(&self, plan: &BatchPlan) -> bool {
        self.console.show_plan(plan);
        true
    }
}
