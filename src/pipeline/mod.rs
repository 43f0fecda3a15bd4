//! Pipeline - sequences discovery, transfer, verification and deletion
//!
//! A [`Pipeline`] owns the device session for the whole run and only lets
//! the stages run in order:
//!
//! ```text
//! Discovering -> Transferring -> Verifying -> AwaitingDeletionConfirmation -> Deleting -> Done
//!      |              |                                   |
//!      +-> Done       +-> Done (cancelled)                +-> Done (declined)
//! ```
//!
//! Any live state may move to `Failed` when the device stops answering at
//! the start of a stage. Per-file failures never change the state; they are
//! collected into the stage results and the [`RunSummary`].
//!
//! Interactive callers drive the stage methods one by one and ask the user in
//! between; [`run`] drives them with the decisions already in [`Config`].

mod state;
mod summary;

pub use state::PipelineState;
pub use summary::{FailureRecord, RunSummary};

use crate::catalog::{build_manifest, DiscoveryCallback, ExtensionFilter};
use crate::config::Config;
use crate::device::{DeviceCapability, DeviceInfo, DeviceSession};
use crate::executor::{self, SpaceReport};
use crate::types::{
    CamrollError, DeletionResult, Manifest, ProgressCallback, TransferResult, VerificationResult,
};
use crate::verify::{self, VerifyMode};
use chrono::{Local, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// `<base>/<YYYY-MM-DD>` for the given calendar date
pub fn destination_root(base: &Path, date: NaiveDate) -> PathBuf {
    base.join(date.format("%Y-%m-%d").to_string())
}

/// One backup run against one connected device
pub struct Pipeline<'a, D: DeviceCapability + ?Sized> {
    session: DeviceSession<'a, D>,
    config: &'a Config,
    filter: ExtensionFilter,
    dest_root: PathBuf,
    state: PipelineState,
    manifest: Manifest,
    space: Option<SpaceReport>,
    transfers: Vec<TransferResult>,
    verification: Option<VerificationResult>,
    deletions: Vec<DeletionResult>,
    deletion_requested: bool,
    cancelled: bool,
}

impl<'a, D: DeviceCapability + ?Sized> Pipeline<'a, D> {
    /// Connect to the configured device; the dated folder uses today's local date
    pub fn start(device: &'a mut D, config: &'a Config) -> Result<Self, CamrollError> {
        Self::start_on(device, config, Local::now().date_naive())
    }

    /// Like [`Pipeline::start`] with an explicit run date
    pub fn start_on(
        device: &'a mut D,
        config: &'a Config,
        date: NaiveDate,
    ) -> Result<Self, CamrollError> {
        let filter = config.extension_filter()?;
        let session = DeviceSession::open(device, config.device.name_pattern())?;
        let dest_root = destination_root(&config.destination, date);

        info!(
            device = %session.info().display_name,
            dest = %dest_root.display(),
            "pipeline started"
        );

        Ok(Self {
            session,
            config,
            filter,
            dest_root,
            state: PipelineState::Discovering,
            manifest: Manifest::default(),
            space: None,
            transfers: Vec::new(),
            verification: None,
            deletions: Vec::new(),
            deletion_requested: false,
            cancelled: false,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn device_info(&self) -> &DeviceInfo {
        self.session.info()
    }

    /// Dated folder copies land in
    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn transfers(&self) -> &[TransferResult] {
        &self.transfers
    }

    pub fn verification(&self) -> Option<&VerificationResult> {
        self.verification.as_ref()
    }

    pub fn deletions(&self) -> &[DeletionResult] {
        &self.deletions
    }

    /// Catalogue the media root
    ///
    /// An empty manifest finishes the run; a root that cannot be listed fails it.
    pub fn discover(
        &mut self,
        on_progress: Option<&DiscoveryCallback<'_>>,
    ) -> Result<&Manifest, CamrollError> {
        self.expect_state(PipelineState::Discovering, "discover")?;

        let media_root = self.config.media_root();
        match build_manifest(self.session.device(), media_root, &self.filter, on_progress) {
            Ok(manifest) => self.manifest = manifest,
            Err(e) => {
                self.advance(PipelineState::Failed)?;
                return Err(e);
            }
        }

        if self.manifest.is_empty() {
            info!(root = %media_root, "no media found");
            self.advance(PipelineState::Done)?;
        } else {
            self.advance(PipelineState::Transferring)?;
        }

        Ok(&self.manifest)
    }

    /// Free-space pre-flight for the pending copies
    ///
    /// Creates the dated folder so the measurement targets its filesystem.
    pub fn check_space(&mut self) -> Result<SpaceReport, CamrollError> {
        self.expect_state(PipelineState::Transferring, "check space")?;
        self.prepare_destination()?;

        let report = executor::check_space(&self.manifest, &self.dest_root);
        if let Some(warning) = report.warning() {
            warning.log("destination may not have enough space");
        }
        self.space = Some(report);
        Ok(report)
    }

    /// Stop before any file is copied
    pub fn cancel(&mut self) -> Result<(), CamrollError> {
        self.expect_state(PipelineState::Transferring, "cancel")?;
        info!("run cancelled before transfer");
        self.cancelled = true;
        self.advance(PipelineState::Done)
    }

    /// Copy every manifest entry into the dated folder
    pub fn transfer(
        &mut self,
        on_event: Option<&ProgressCallback<'_>>,
    ) -> Result<&[TransferResult], CamrollError> {
        self.expect_state(PipelineState::Transferring, "transfer")?;
        self.ensure_reachable()?;
        self.prepare_destination()?;

        self.transfers =
            executor::transfer(self.session.device(), &self.manifest, &self.dest_root, on_event);
        self.advance(PipelineState::Verifying)?;
        Ok(self.transfers.as_slice())
    }

    /// Re-check every manifest entry against the dated folder
    pub fn verify(
        &mut self,
        on_event: Option<&ProgressCallback<'_>>,
    ) -> Result<&VerificationResult, CamrollError> {
        self.expect_state(PipelineState::Verifying, "verify")?;
        // Size checks never touch the device.
        if self.config.verify_mode == VerifyMode::Checksum {
            self.ensure_reachable()?;
        }

        let result = verify::verify(
            self.session.device(),
            &self.manifest,
            &self.dest_root,
            self.config.verify_mode,
            on_event,
        );
        self.advance(PipelineState::AwaitingDeletionConfirmation)?;
        Ok(&*self.verification.insert(result))
    }

    /// Delete verified originals if `confirmed`; declining ends the run untouched
    pub fn delete(
        &mut self,
        confirmed: bool,
        on_event: Option<&ProgressCallback<'_>>,
    ) -> Result<&[DeletionResult], CamrollError> {
        self.expect_state(PipelineState::AwaitingDeletionConfirmation, "delete")?;

        if !confirmed {
            info!("deletion declined");
            self.advance(PipelineState::Done)?;
            return Ok(self.deletions.as_slice());
        }

        self.ensure_reachable()?;
        self.advance(PipelineState::Deleting)?;
        self.deletion_requested = true;

        let verification = self.verification.take().unwrap_or_default();
        self.deletions =
            executor::delete_verified(self.session.device_mut(), &verification, true, on_event);
        self.verification = Some(verification);

        self.advance(PipelineState::Done)?;
        Ok(self.deletions.as_slice())
    }

    /// Summary of the run so far
    pub fn summary(&self) -> RunSummary {
        RunSummary::collect(self)
    }

    /// Disconnect and summarise; a disconnect failure is only logged
    pub fn finish(self) -> RunSummary {
        let summary = self.summary();
        if let Err(e) = self.session.finish() {
            warn!(error = %e, "failed to disconnect device");
        }
        info!(state = %summary.state, "pipeline finished");
        summary
    }

    fn prepare_destination(&mut self) -> Result<(), CamrollError> {
        if let Err(e) = fs::create_dir_all(&self.dest_root) {
            self.advance(PipelineState::Failed)?;
            return Err(e.into());
        }
        Ok(())
    }

    /// The session's device must still be listed by the transport
    fn ensure_reachable(&mut self) -> Result<(), CamrollError> {
        let id = self.session.info().id.clone();
        let reachable = self
            .session
            .device()
            .list_devices()
            .map(|devices| devices.iter().any(|d| d.id == id))
            .unwrap_or(false);

        if reachable {
            return Ok(());
        }

        warn!(%id, state = %self.state, "device unreachable at stage start");
        self.advance(PipelineState::Failed)?;
        Err(CamrollError::DeviceUnreachable { id })
    }

    fn expect_state(&self, expected: PipelineState, operation: &str) -> Result<(), CamrollError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CamrollError::Pipeline(format!(
                "cannot {} while {}",
                operation, self.state
            )))
        }
    }

    fn advance(&mut self, next: PipelineState) -> Result<(), CamrollError> {
        if !self.state.can_transition_to(next) {
            return Err(CamrollError::Pipeline(format!(
                "illegal transition {} -> {}",
                self.state, next
            )));
        }
        debug!(from = %self.state, to = %next, "pipeline state");
        self.state = next;
        Ok(())
    }
}

/// Run every stage without prompting
///
/// The copy always starts. A space shortfall continues only when
/// `proceed_on_low_space` is `Yes`, and deletion happens only when
/// `confirm_deletion` is `Yes`; `Ask` counts as no.
pub fn run<D: DeviceCapability + ?Sized>(
    device: &mut D,
    config: &Config,
    on_event: Option<&ProgressCallback<'_>>,
) -> Result<RunSummary, CamrollError> {
    let mut pipeline = Pipeline::start(device, config)?;

    if pipeline.discover(None)?.is_empty() {
        return Ok(pipeline.finish());
    }

    let space = pipeline.check_space()?;
    if !space.is_sufficient() && !config.proceed_on_low_space.resolve(|| false) {
        pipeline.cancel()?;
        return Ok(pipeline.finish());
    }

    pipeline.transfer(on_event)?;
    pipeline.verify(on_event)?;
    pipeline.delete(config.confirm_deletion.resolve(|| false), on_event)?;

    Ok(pipeline.finish())
}
