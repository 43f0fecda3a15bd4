//! Progress reporting

use crate::types::{ItemStatus, ProgressEvent, Stage};
use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Progress reporter for a backup run
///
/// One spinner for discovery, one bar reused by each per-file stage. Every
/// finished file also gets its own line above the bar.
pub struct ProgressReporter {
    scan_bar: ProgressBar,
    stage_bar: ProgressBar,
    show_throughput: bool,
    stage: Option<Stage>,
    stage_started_at: Option<Instant>,
    stage_bytes: AtomicU64,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new(show_throughput: bool) -> Self {
        let scan_bar = ProgressBar::new_spinner();
        scan_bar.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            scan_bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }

        let stage_bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::with_template("{prefix:>8} {bar:30.cyan/blue} {pos}/{len} files | {msg}")
        {
            stage_bar.set_style(style.progress_chars("=>-"));
        }

        Self {
            scan_bar,
            stage_bar,
            show_throughput,
            stage: None,
            stage_started_at: None,
            stage_bytes: AtomicU64::new(0),
        }
    }

    /// Reporter that draws nothing (`--json`)
    pub fn hidden() -> Self {
        let reporter = Self::new(false);
        reporter.scan_bar.disable_steady_tick();
        reporter.scan_bar.set_draw_target(ProgressDrawTarget::hidden());
        reporter.stage_bar.set_draw_target(ProgressDrawTarget::hidden());
        reporter
    }

    /// Mark start of discovery.
    pub fn start_scan(&self, label: &str) {
        self.scan_bar.set_message(format!("Scanning {}...", label));
    }

    /// Update discovery counters.
    pub fn update_scan(&self, files: u64, bytes: u64) {
        self.scan_bar.set_message(format!(
            "Scanning... {} files | {}",
            files,
            HumanBytes(bytes)
        ));
    }

    pub fn finish_scan(&self, files: usize, bytes: u64) {
        self.scan_bar.finish_with_message(format!(
            "Found {} media files | {}",
            files,
            HumanBytes(bytes)
        ));
    }

    /// Reset the bar for a new stage.
    pub fn start_stage(&mut self, stage: Stage, total: usize) {
        self.stage = Some(stage);
        self.stage_started_at = Some(Instant::now());
        self.stage_bytes.store(0, Ordering::Relaxed);
        self.stage_bar.reset();
        self.stage_bar.set_prefix(stage.to_string());
        self.stage_bar.set_length(total as u64);
        self.stage_bar.set_position(0);
        self.stage_bar.set_message("starting...".to_string());
    }

    /// Record one finished file.
    pub fn on_event(&self, event: &ProgressEvent) {
        if event.status == ItemStatus::Copied {
            self.stage_bytes
                .fetch_add(event.size_bytes, Ordering::Relaxed);
        }

        self.stage_bar
            .println(format_event_line(event, self.show_throughput));
        self.stage_bar.set_position(event.index as u64);

        if self.show_throughput && event.stage == Stage::Transferring {
            self.stage_bar.set_message(format!(
                "{} copied | {}/s",
                HumanBytes(self.stage_bytes.load(Ordering::Relaxed)),
                HumanBytes(self.current_throughput_bps())
            ));
        } else {
            self.stage_bar.set_message(event.file_name.clone());
        }
    }

    /// Finalize the current stage.
    pub fn finish_stage(&self, message: &str) {
        let label = self.stage.map(|s| s.to_string()).unwrap_or_default();
        self.stage_bar
            .finish_with_message(format!("{} complete: {}", label, message));
    }

    fn current_throughput_bps(&self) -> u64 {
        match self.stage_started_at {
            Some(started) => {
                let secs = started.elapsed().as_secs_f64();
                if secs > 0.0 {
                    (self.stage_bytes.load(Ordering::Relaxed) as f64 / secs) as u64
                } else {
                    0
                }
            }
            None => 0,
        }
    }
}

/// One line per finished file, e.g. `[2/5] copied VID_0002.MOV (10.00 MiB, 21.40 MB/s)`
pub fn format_event_line(event: &ProgressEvent, show_throughput: bool) -> String {
    let counter = format!("[{}/{}, {:.2}%]", event.index, event.total, event.percent());
    let size = HumanBytes(event.size_bytes);

    match &event.status {
        ItemStatus::Copied => match event.throughput_mbps {
            Some(mbps) if show_throughput => format!(
                "{} copied {} ({}, {:.2} MB/s)",
                counter, event.file_name, size, mbps
            ),
            _ => format!("{} copied {} ({})", counter, event.file_name, size),
        },
        ItemStatus::Skipped => format!(
            "{} skipped {} (already present)",
            counter, event.file_name
        ),
        ItemStatus::Verified => format!("{} verified {}", counter, event.file_name),
        ItemStatus::Deleted => format!("{} deleted {} ({})", counter, event.file_name, size),
        ItemStatus::Failed { reason } => format!(
            "{} FAILED {} {}: {}",
            counter,
            event.stage.to_string().to_lowercase(),
            event.file_name,
            reason
        ),
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn event(status: ItemStatus, throughput_mbps: Option<f64>) -> ProgressEvent {
        ProgressEvent {
            stage: Stage::Transferring,
            index: 2,
            total: 5,
            file_name: "VID_0002.MOV".to_string(),
            status,
            size_bytes: 10 * 1024 * 1024,
            throughput_mbps,
        }
    }

    #[test]
    fn test_copied_line_includes_size_and_speed() {
        let line = format_event_line(&event(ItemStatus::Copied, Some(21.4)), true);
        assert!(line.starts_with("[2/5, 40.00%] copied VID_0002.MOV"));
        assert!(line.contains("10.00 MiB"));
        assert!(line.contains("21.40 MB/s"));
    }

    #[test]
    fn test_speed_hidden_when_disabled_or_unmeasured() {
        let hidden = format_event_line(&event(ItemStatus::Copied, Some(21.4)), false);
        assert!(!hidden.contains("MB/s"));

        let unmeasured = format_event_line(&event(ItemStatus::Copied, None), true);
        assert!(!unmeasured.contains("MB/s"));
    }

    #[test]
    fn test_every_line_carries_percentage() {
        let first = ProgressEvent {
            index: 1,
            total: 8,
            ..event(ItemStatus::Verified, None)
        };
        assert_eq!(format_event_line(&first, true), "[1/8, 12.50%] verified VID_0002.MOV");

        let last = ProgressEvent {
            index: 5,
            ..event(ItemStatus::Skipped, None)
        };
        assert!(format_event_line(&last, true).starts_with("[5/5, 100.00%] skipped"));
    }

    #[test]
    fn test_failed_line_names_stage_and_reason() {
        let line = format_event_line(
            &event(
                ItemStatus::Failed {
                    reason: "connection reset".to_string(),
                },
                None,
            ),
            true,
        );
        assert_eq!(
            line,
            "[2/5, 40.00%] FAILED transfer VID_0002.MOV: connection reset"
        );
    }

    #[test]
    fn test_stage_progress_tracks_position_and_bytes() {
        let mut reporter = ProgressReporter::hidden();
        reporter.start_stage(Stage::Transferring, 5);

        reporter.on_event(&event(ItemStatus::Copied, Some(1.0)));
        reporter.on_event(&ProgressEvent {
            index: 3,
            ..event(ItemStatus::Skipped, None)
        });

        assert_eq!(reporter.stage_bar.position(), 3);
        assert_eq!(reporter.stage_bar.length(), Some(5));
        assert_eq!(
            reporter.stage_bytes.load(Ordering::Relaxed),
            10 * 1024 * 1024
        );
    }

    #[test]
    fn test_throughput_becomes_non_zero_after_transfer_time() {
        let mut reporter = ProgressReporter::hidden();
        reporter.start_stage(Stage::Transferring, 1);
        thread::sleep(Duration::from_millis(30));
        reporter.on_event(&event(ItemStatus::Copied, None));

        assert!(reporter.current_throughput_bps() > 0);
    }

    #[test]
    fn test_scan_methods_execute_without_panicking() {
        let reporter = ProgressReporter::hidden();
        reporter.start_scan("iPhone");
        reporter.update_scan(3, 2048);
        reporter.finish_scan(3, 2048);
    }
}
