use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::engine::{BuildOutcome, PipelineReport};

use super::styling::{done, pending, section};

/// Spinner shown while a pass walks the tracked pipelines.
pub struct ScanProgress {
    pb: ProgressBar,
    total: usize,
    done: usize,
}

impl ScanProgress {
    pub fn start(total: usize, top: usize) -> Self {
        eprintln!("{}", section("⚙️ ", "Scan"));
        let pb = create_spinner(
            pending(format!(
                "Scanning {total} pipelines (top {top} builds each)"
            ))
            .to_string(),
        );
        Self { pb, total, done: 0 }
    }

    pub fn pipeline_done(&mut self, report: &PipelineReport) {
        self.done += 1;
        let running = match report.still_running() {
            0 => String::new(),
            n => format!(", {n} still running"),
        };
        self.pb.println(format!(
            "  {} {} ({}): {} observed, {} added{running}",
            done("✓"),
            report.pipeline_id,
            report.name,
            report.builds.len(),
            report.count(BuildOutcome::Added)
        ));
        self.pb.set_message(
            pending(format!("Scanned {}/{} pipelines", self.done, self.total)).to_string(),
        );
    }

    pub fn finish(self) {
        self.pb.finish_with_message(
            done(format!("Scanned {} pipelines ✓", self.done)).to_string(),
        );
        eprintln!();
    }

    /// Stops the spinner without claiming success.
    pub fn abandon(self) {
        self.pb.abandon();
        eprintln!();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
