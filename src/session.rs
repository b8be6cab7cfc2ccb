//! Editing session: the state machine that ties regions, decoding, trimming, encoding and
//! resource ownership together.
//!
//! A session is driven by a single owner (normally the UI loop). Decoding runs on a
//! background thread; everything else happens synchronously inside [EditSession::poll]
//! or [EditSession::wait] when the decode outcome is picked up. At most one decode is in
//! flight, and any operation that would start a second one fails with [EditError::Busy].

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::buffer::{AudioBuffer, BufferInfo};
use crate::decode::{DecodeError, DecodeService, SourceFile, SourceFormat};
use crate::decode_thread::{DecodeCommand, DecodeOutcome, DecodeThread, JobId, Notifier};
use crate::error::{EditError, Result};
use crate::region::{Region, RegionDraft, RegionEvent, RegionId, RegionKind, RegionModel};
use crate::resource::{ResourceHandle, ResourceLifecycle};
use crate::time_base::TimeBase;
use crate::trim::{self, TrimMode, TrimSpec};
use crate::wav;

/// Name given to published trim results and used as the default export file name.
pub const DEFAULT_EXPORT_NAME: &str = "edited_audio.wav";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing loaded yet.
    Empty,
    /// A source file is being decoded.
    Decoding,
    /// A buffer is loaded and no work is in flight.
    Ready,
    /// The current resource is being decoded for a trim.
    Trimming,
}

/// Completion of a job started by [EditSession::begin_load] or [EditSession::request_trim].
#[derive(Debug)]
pub enum SessionEvent {
    Loaded {
        job: JobId,
        buffer: AudioBuffer,
        resource: ResourceHandle,
    },
    LoadFailed {
        job: JobId,
        error: EditError,
    },
    Trimmed {
        job: JobId,
        mode: TrimMode,
        resource: ResourceHandle,
        info: BufferInfo,
    },
    TrimFailed {
        job: JobId,
        error: EditError,
    },
}

enum PendingJob {
    Load {
        job: JobId,
        name: String,
        format: SourceFormat,
        bytes: Arc<[u8]>,
    },
    Trim {
        job: JobId,
        spec: TrimSpec,
    },
}

impl PendingJob {
    fn job(&self) -> JobId {
        match self {
            PendingJob::Load { job, .. } | PendingJob::Trim { job, .. } => *job,
        }
    }
}

pub struct EditSession {
    state: SessionState,
    regions: RegionModel,
    /// [None] until the first successful load.
    time_base: Option<TimeBase>,
    buffer_info: Option<BufferInfo>,
    resources: ResourceLifecycle,
    pending: Option<PendingJob>,
    next_job: u64,
    export_name: String,
    decode_thread: DecodeThread,
}

impl EditSession {
    /// Creates a session that decodes with `service` on its own thread.
    pub fn new(service: Box<dyn DecodeService>) -> Result<Self> {
        Self::with_notifier(service, None)
    }

    /// Like [EditSession::new], and calls `notifier` from the decode thread whenever a
    /// result is ready to be picked up by [EditSession::poll].
    pub fn with_notifier(
        service: Box<dyn DecodeService>,
        notifier: Option<Notifier>,
    ) -> Result<Self> {
        Ok(Self {
            state: SessionState::Empty,
            regions: RegionModel::new(),
            time_base: None,
            buffer_info: None,
            resources: ResourceLifecycle::new(),
            pending: None,
            next_job: 0,
            export_name: DEFAULT_EXPORT_NAME.to_string(),
            decode_thread: DecodeThread::spawn(service, notifier)?,
        })
    }

    /// Sets the name used for published trim results.
    pub fn set_export_name(&mut self, name: impl Into<String>) {
        self.export_name = name.into();
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn time_base(&self) -> Option<&TimeBase> {
        self.time_base.as_ref()
    }

    /// Shape of the active buffer.
    pub fn buffer_info(&self) -> Option<BufferInfo> {
        self.buffer_info
    }

    pub fn regions(&self) -> &RegionModel {
        &self.regions
    }

    pub fn current_resource(&self) -> Option<ResourceHandle> {
        self.resources.current().cloned()
    }

    /// Starts decoding `file` in the background.
    ///
    /// # Errors
    ///
    /// [EditError::Busy] while another job is pending, [EditError::UnsupportedFormat] for
    /// files that are not mp3, wav or ogg. Neither starts any work.
    pub fn begin_load(&mut self, file: SourceFile) -> Result<JobId> {
        self.ensure_idle()?;
        let format = file.format()?;

        let bytes: Arc<[u8]> = file.bytes.into();

        let job = self.next_job_id();
        self.dispatch(DecodeCommand::Decode {
            job,
            bytes: Arc::clone(&bytes),
            format,
        })?;

        info!(job = job.0, name = %file.name, %format, "loading source");
        self.pending = Some(PendingJob::Load {
            job,
            name: file.name,
            format,
            bytes,
        });
        self.state = SessionState::Decoding;
        Ok(job)
    }

    /// Loads `file` and blocks until it is decoded.
    pub fn load_source(&mut self, file: SourceFile) -> Result<AudioBuffer> {
        self.begin_load(file)?;
        match self.wait() {
            Some(SessionEvent::Loaded { buffer, .. }) => Ok(buffer),
            Some(SessionEvent::LoadFailed { error, .. }) => Err(error),
            _ => Err(DecodeError::WorkerStopped.into()),
        }
    }

    /// Replaces the selection with `start..end` seconds on the view's timeline.
    pub fn set_selection(&mut self, start: f64, end: f64) -> Result<Region> {
        let draft = RegionDraft::selection(start, end);
        self.store_region(|regions, duration| regions.create_or_update(draft, duration))
    }

    /// Places a marker at `at` seconds.
    pub fn add_marker(&mut self, at: f64) -> Result<Region> {
        let draft = RegionDraft::marker(at);
        self.store_region(|regions, duration| regions.create_or_update(draft, duration))
    }

    /// Applies a region change reported by the waveform view.
    pub fn handle_region_event(&mut self, event: RegionEvent) -> Result<Region> {
        self.store_region(|regions, duration| regions.apply_event(event, duration))
    }

    pub fn remove_region(&mut self, id: RegionId) -> Result<Option<Region>> {
        self.ensure_idle()?;
        Ok(self.regions.remove(id))
    }

    /// Removes every selection and marker.
    pub fn clear_regions(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.regions.remove_all();
        Ok(())
    }

    /// Tells the session how long the view's timeline is when it differs from the active
    /// buffer. Selections drawn afterwards are rebased from this duration when trimming.
    ///
    /// # Errors
    ///
    /// [EditError::InvalidRegion] unless `duration` is finite and positive.
    pub fn set_view_duration(&mut self, duration: f64) -> Result<()> {
        self.ensure_idle()?;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(EditError::InvalidRegion(format!(
                "view duration must be positive, got {duration}"
            )));
        }
        let time_base = self.time_base.as_mut().ok_or(EditError::NoSource)?;
        time_base.set_view_duration(duration);
        Ok(())
    }

    /// Starts a trim of the current resource using the active selection.
    ///
    /// # Errors
    ///
    /// [EditError::Busy] while another job is pending, [EditError::NoSource] before the
    /// first load, [EditError::InvalidRegion] if there is no selection or it does not map
    /// onto the active buffer.
    pub fn request_trim(&mut self, mode: TrimMode) -> Result<JobId> {
        self.ensure_idle()?;
        let time_base = self.time_base.ok_or(EditError::NoSource)?;
        let resource = self.resources.current().cloned().ok_or(EditError::NoSource)?;
        let selection = self
            .regions
            .selection()
            .ok_or_else(|| EditError::InvalidRegion("no selection to trim".to_string()))?;

        let spec = TrimSpec::new(time_base.rebase(selection)?, mode);

        let job = self.next_job_id();
        self.dispatch(DecodeCommand::Decode {
            job,
            bytes: resource.shared_bytes(),
            format: resource.format(),
        })?;

        info!(
            job = job.0,
            ?mode,
            start = spec.start,
            end = spec.end,
            resource = %resource,
            "trimming"
        );
        self.pending = Some(PendingJob::Trim { job, spec });
        self.state = SessionState::Trimming;
        Ok(job)
    }

    /// Trims the current resource and blocks until the result is published.
    pub fn trim(&mut self, mode: TrimMode) -> Result<ResourceHandle> {
        self.request_trim(mode)?;
        match self.wait() {
            Some(SessionEvent::Trimmed { resource, .. }) => Ok(resource),
            Some(SessionEvent::TrimFailed { error, .. }) => Err(error),
            _ => Err(DecodeError::WorkerStopped.into()),
        }
    }

    /// Picks up a finished job without blocking.
    pub fn poll(&mut self) -> Option<SessionEvent> {
        while let Some(outcome) = self.decode_thread.try_recv() {
            if let Some(event) = self.complete(outcome) {
                return Some(event);
            }
        }
        None
    }

    /// Blocks until the pending job finishes. Returns [None] if nothing is pending.
    pub fn wait(&mut self) -> Option<SessionEvent> {
        while self.pending.is_some() {
            match self.decode_thread.recv() {
                Some(outcome) => {
                    if let Some(event) = self.complete(outcome) {
                        return Some(event);
                    }
                }
                None => {
                    let pending = self.pending.take()?;
                    return Some(self.fail(pending, DecodeError::WorkerStopped.into()));
                }
            }
        }
        None
    }

    /// Abandons the pending job. Its result is discarded when it arrives.
    ///
    /// Returns `true` if a job was cancelled.
    pub fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                info!(job = pending.job().0, "pending job cancelled");
                self.state = self.idle_state();
                true
            }
            None => false,
        }
    }

    /// Writes the current resource to `path`.
    pub fn export_current(&self, path: &Path) -> Result<()> {
        let resource = self.resources.current().ok_or(EditError::NoSource)?;
        std::fs::write(path, resource.bytes())?;
        info!(resource = %resource, path = %path.display(), "exported");
        Ok(())
    }

    /// Runs a region edit against the view's timeline.
    fn store_region(
        &mut self,
        edit: impl FnOnce(&mut RegionModel, f64) -> Result<Region>,
    ) -> Result<Region> {
        self.ensure_idle()?;
        let time_base = self.time_base.as_mut().ok_or(EditError::NoSource)?;
        let region = edit(&mut self.regions, time_base.view_duration)?;
        if region.kind == RegionKind::Selection {
            time_base.mark_drawn();
        }
        Ok(region)
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.state {
            SessionState::Decoding | SessionState::Trimming => Err(EditError::Busy),
            SessionState::Empty | SessionState::Ready => Ok(()),
        }
    }

    fn idle_state(&self) -> SessionState {
        if self.buffer_info.is_some() {
            SessionState::Ready
        } else {
            SessionState::Empty
        }
    }

    fn next_job_id(&mut self) -> JobId {
        self.next_job += 1;
        JobId(self.next_job)
    }

    fn dispatch(&self, command: DecodeCommand) -> Result<()> {
        self.decode_thread
            .send(command)
            .map_err(|_| DecodeError::WorkerStopped.into())
    }

    /// Applies `outcome` if it belongs to the pending job.
    fn complete(&mut self, outcome: DecodeOutcome) -> Option<SessionEvent> {
        if self.pending.as_ref().map(PendingJob::job) != Some(outcome.job) {
            debug!(job = outcome.job.0, "discarding stale decode result");
            return None;
        }
        let pending = self.pending.take()?;

        let buffer = match outcome.result {
            Ok(buffer) => buffer,
            Err(error) => return Some(self.fail(pending, error.into())),
        };

        match pending {
            PendingJob::Load {
                job,
                name,
                format,
                bytes,
            } => {
                let resource = self.resources.adopt_upload(name, format, bytes);
                self.time_base = Some(TimeBase::original(buffer.duration()));
                self.buffer_info = Some(buffer.info());
                self.regions.remove_all();
                self.state = SessionState::Ready;

                info!(
                    job = job.0,
                    frames = buffer.frame_count(),
                    channels = buffer.channel_count(),
                    sample_rate = buffer.sample_rate(),
                    "source loaded"
                );
                Some(SessionEvent::Loaded {
                    job,
                    buffer,
                    resource,
                })
            }
            PendingJob::Trim { job, spec } => match self.publish_trim(&buffer, &spec) {
                Ok((resource, info)) => Some(SessionEvent::Trimmed {
                    job,
                    mode: spec.mode,
                    resource,
                    info,
                }),
                Err(error) => Some(self.fail(PendingJob::Trim { job, spec }, error)),
            },
        }
    }

    fn publish_trim(
        &mut self,
        source: &AudioBuffer,
        spec: &TrimSpec,
    ) -> Result<(ResourceHandle, BufferInfo)> {
        let trimmed = trim::trim(source, spec)?;
        let bytes = wav::encode(&trimmed)?;

        let resource = self.resources.publish(self.export_name.clone(), bytes);
        let info = trimmed.info();
        self.time_base = Some(TimeBase::after_trim(trimmed.duration()));
        self.buffer_info = Some(info);
        self.regions.remove_all();
        self.state = SessionState::Ready;

        info!(
            resource = %resource,
            frames = info.frame_count,
            duration = info.duration(),
            "trim published"
        );
        Ok((resource, info))
    }

    fn fail(&mut self, pending: PendingJob, error: EditError) -> SessionEvent {
        self.state = self.idle_state();
        warn!(job = pending.job().0, %error, "job failed");
        match pending {
            PendingJob::Load { job, .. } => SessionEvent::LoadFailed { job, error },
            PendingJob::Trim { job, .. } => SessionEvent::TrimFailed { job, error },
        }
    }
}
