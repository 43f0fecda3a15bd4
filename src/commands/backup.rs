//! Interactive backup command

use crate::config::{Cli, Config, FileConfig};
use crate::device::{DeviceClass, MountedDevice};
use crate::pipeline::{FailureRecord, Pipeline, RunSummary};
use crate::types::{CamrollError, ProgressEvent, Stage};
use crate::ui::ProgressReporter;
use console::Term;
use indicatif::HumanBytes;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use tracing::warn;

/// Source of answers to interactive questions
pub trait Prompter {
    /// Show `question` and return the trimmed answer
    fn ask(&mut self, question: &str) -> io::Result<String>;

    /// Yes/no question; anything but `y`/`yes` is no
    fn confirm(&mut self, question: &str) -> bool {
        match self.ask(&format!("{} (y/N): ", question)) {
            Ok(answer) => is_yes(&answer),
            Err(e) => {
                warn!(error = %e, "could not read answer, assuming no");
                false
            }
        }
    }
}

/// Prompts on stderr so `--json` output on stdout stays parseable
pub struct TermPrompter {
    term: Term,
}

impl TermPrompter {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Default for TermPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TermPrompter {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.term.write_str(question)?;
        let answer = self.term.read_line()?;
        Ok(answer.trim().to_string())
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Run a backup, asking for whatever the command line left open
pub fn run(mut cli: Cli, prompter: &mut dyn Prompter) -> Result<RunSummary, CamrollError> {
    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    if cli.dest.is_none() && file.destination.is_none() {
        let answer = prompter.ask("Destination directory: ")?;
        if !answer.is_empty() {
            cli.dest = Some(PathBuf::from(answer));
        }
    }
    if cli.device.is_none() && file.device.is_none() {
        cli.device = Some(prompt_device(prompter)?);
    }

    let json = cli.json;
    let config = Config::from_layers(file, &cli);
    config.validate()?;

    let mount = config.mount.clone().ok_or_else(|| {
        CamrollError::Config(
            "No mount point given; pass --mount with the directory the device storage is mounted on"
                .to_string(),
        )
    })?;

    let display_name = format!("{} at {}", config.device.name_pattern(), mount.display());
    let mut device = MountedDevice::new().with_mount(&display_name, &mount);

    let summary = drive(&mut device, &config, prompter, json)?;
    if !json {
        println!("{}", format_run_summary(&summary));
        if summary.has_failures() {
            println!("{}", format_error_summary(&summary.failures));
        }
    }
    Ok(summary)
}

fn prompt_device(prompter: &mut dyn Prompter) -> Result<DeviceClass, CamrollError> {
    let answer =
        prompter.ask("Select device type:\n  1. iPhone\n  2. Pixel/Android\nEnter 1 or 2: ")?;
    DeviceClass::parse(&answer)
        .ok_or_else(|| CamrollError::Config(format!("Invalid device type selection: '{}'", answer)))
}

fn drive(
    device: &mut MountedDevice,
    config: &Config,
    prompter: &mut dyn Prompter,
    json: bool,
) -> Result<RunSummary, CamrollError> {
    let mut reporter = if json {
        ProgressReporter::hidden()
    } else {
        ProgressReporter::new(config.show_throughput)
    };
    let say = |line: String| {
        if !json {
            println!("{}", line);
        }
    };

    let mut pipeline = Pipeline::start(device, config)?;
    say(format!("Connected to {}", pipeline.device_info().display_name));

    reporter.start_scan(config.media_root().as_str());
    let scan_progress = |files: u64, bytes: u64| reporter.update_scan(files, bytes);
    let manifest = pipeline.discover(Some(&scan_progress))?;
    let total = manifest.len();
    reporter.finish_scan(total, manifest.total_size());

    if total == 0 {
        say(format!("No supported files found in {}", config.media_root()));
        return Ok(pipeline.finish());
    }

    if !config
        .confirm_start
        .resolve(|| prompter.confirm("Start copying files?"))
    {
        pipeline.cancel()?;
        say("Operation cancelled by user.".to_string());
        return Ok(pipeline.finish());
    }

    let space = pipeline.check_space()?;
    say(format_space_check(space.required, space.available, space.shortfall()));
    if !space.is_sufficient()
        && !config
            .proceed_on_low_space
            .resolve(|| prompter.confirm("Insufficient space on destination. Continue anyway?"))
    {
        pipeline.cancel()?;
        say("Operation cancelled by user.".to_string());
        return Ok(pipeline.finish());
    }

    say(format!("Copying to {}", pipeline.dest_root().display()));
    reporter.start_stage(Stage::Transferring, total);
    let on_event = |event: &ProgressEvent| reporter.on_event(event);
    let transfers = pipeline.transfer(Some(&on_event))?;
    let copied = transfers.iter().filter(|r| r.outcome.is_copied()).count();
    let skipped = transfers.iter().filter(|r| r.outcome.is_skipped()).count();
    reporter.finish_stage(&format!(
        "{} copied, {} skipped, {} failed",
        copied,
        skipped,
        total - copied - skipped
    ));

    reporter.start_stage(Stage::Verifying, total);
    let on_event = |event: &ProgressEvent| reporter.on_event(event);
    let verification = pipeline.verify(Some(&on_event))?;
    let verified = verification.verified_count();
    reporter.finish_stage(&format!(
        "{} verified, {} failed",
        verified,
        verification.failed_count()
    ));

    if verified == 0 {
        say("Nothing verified; leaving the device untouched.".to_string());
        pipeline.delete(false, None)?;
        return Ok(pipeline.finish());
    }

    let question = format!(
        "Delete {} verified file(s) from {}?",
        verified, config.device
    );
    if config
        .confirm_deletion
        .resolve(|| prompter.confirm(&question))
    {
        reporter.start_stage(Stage::Deleting, verified);
        let on_event = |event: &ProgressEvent| reporter.on_event(event);
        let deletions = pipeline.delete(true, Some(&on_event))?;
        let deleted = deletions.iter().filter(|d| d.is_deleted()).count();
        reporter.finish_stage(&format!(
            "{} deleted, {} failed",
            deleted,
            deletions.len() - deleted
        ));
    } else {
        pipeline.delete(false, None)?;
        say("Skipped deletion.".to_string());
    }

    Ok(pipeline.finish())
}

fn format_space_check(required: u64, available: Option<u64>, shortfall: u64) -> String {
    let mut lines = vec!["Space check:".to_string()];
    lines.push(format!("  Required:  {}", HumanBytes(required)));
    match available {
        Some(available) => {
            lines.push(format!("  Available: {}", HumanBytes(available)));
            if shortfall > 0 {
                lines.push(format!("  Short by {}", HumanBytes(shortfall)));
            }
        }
        None => lines.push("  Available: unknown".to_string()),
    }
    lines.join("\n")
}

fn format_run_summary(summary: &RunSummary) -> String {
    let mut lines = vec![format!(
        "Summary ({}): {} found | {} copied, {} skipped, {} failed | {} copied",
        summary.state,
        summary.discovered,
        summary.copied,
        summary.skipped,
        summary.failed,
        HumanBytes(summary.bytes_copied)
    )];

    if summary.cancelled {
        lines.push("  Cancelled before copying.".to_string());
    } else if summary.discovered > 0 {
        lines.push(format!(
            "  Verified: {}, failed verification: {}",
            summary.verified, summary.verification_failed
        ));
        if summary.deletion_requested {
            lines.push(format!(
                "  Deleted from device: {}, failed to delete: {}",
                summary.deleted, summary.deletion_failed
            ));
        } else {
            lines.push("  Originals left on the device.".to_string());
        }
    }
    lines.push(format!("  Destination: {}", summary.destination.display()));
    lines.join("\n")
}

#[derive(Debug)]
struct ErrorRecord<'a> {
    kind: &'static str,
    file_name: &'a str,
    message: &'a str,
    suggestion: &'static str,
}

impl<'a> ErrorRecord<'a> {
    fn new(failure: &'a FailureRecord) -> Self {
        let (kind, suggestion) = humanize_failure(failure.stage);
        Self {
            kind,
            file_name: &failure.file_name,
            message: &failure.reason,
            suggestion,
        }
    }
}

fn humanize_failure(stage: Stage) -> (&'static str, &'static str) {
    match stage {
        Stage::Transferring => (
            "Copy failed",
            "Check the device connection and run again; files already copied will be skipped.",
        ),
        Stage::Verifying => (
            "Verification failed",
            "Run again to re-copy these files. Their originals were not deleted.",
        ),
        Stage::Deleting => (
            "Deletion failed",
            "The copy is safe; delete the remaining originals by hand or run again with --delete.",
        ),
    }
}

/// Plain-English hint for an error that stopped the run
pub fn fatal_hint(error: &CamrollError) -> Option<&'static str> {
    if !error.is_fatal() {
        return None;
    }
    match error {
        CamrollError::DeviceNotFound { .. } => {
            Some("Check that the device is unlocked, trusted, and mounted at --mount.")
        }
        CamrollError::DeviceUnreachable { .. } => Some(
            "The device went away mid-run. Reconnect it and run again; finished copies are kept.",
        ),
        CamrollError::Discovery { .. } => {
            Some("Check --media-root, or the device layout under the mount point.")
        }
        CamrollError::Config(_) => Some("Run with --help to see the available options."),
        _ => None,
    }
}

fn format_error_summary(failures: &[FailureRecord]) -> String {
    let mut groups: BTreeMap<&'static str, Vec<ErrorRecord<'_>>> = BTreeMap::new();
    for failure in failures {
        let record = ErrorRecord::new(failure);
        groups.entry(record.kind).or_default().push(record);
    }

    let mut lines = Vec::new();
    lines.push("Error summary:".to_string());
    for (kind, items) in groups {
        lines.push(format!("  {} ({}):", kind, items.len()));
        for record in items.iter().take(3) {
            lines.push(format!("    - {}: {}", record.file_name, record.message));
        }
        if items.len() > 3 {
            lines.push(format!("    - ... {} more", items.len() - 3));
        }
        if let Some(first) = items.first() {
            lines.push(format!("    Try: {}", first.suggestion));
        }
    }
    lines.join("\n")
}
