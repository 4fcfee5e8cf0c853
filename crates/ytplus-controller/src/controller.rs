//! Status poll controller.
//!
//! # Design
//! - One controller per UI surface, holding its backend client and view.
//! - UI events arrive through [`Controller::handle`]; nothing reaches into
//!   ambient globals.
//! - The poll loop is a spawned task that exists only while the surface is
//!   visible. Ticks from the timer and manual refreshes share one in-flight
//!   guard, so status requests never overlap. Suspending or resuming the loop
//!   resets its schedule but not the guard; a manual refresh still running
//!   across a resume keeps the new loop waiting.
//! - Shared state sits behind a mutex that is never held across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use ytplus_api_models::{DownloadMode, DownloadStatus, StatusSnapshot};

use crate::api::{DownloaderApi, status_within};
use crate::config::ControllerConfig;
use crate::error::{ControllerError, ControllerResult};
use crate::form::DownloadForm;
use crate::poll::{PollOutcome, PollState, TickDecision};
use crate::reconcile::{LogDelta, log_delta, progress_view};
use crate::view::{
    ControlState, LogEntry, NoticeLevel, PreviewView, ProgressView, StatusView, Visibility,
};

/// Events a UI forwards to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// The download form was submitted.
    Submit(DownloadForm),
    /// The cancel control was pressed.
    Cancel,
    /// A metadata preview was requested for the URL.
    Preview(String),
    /// The log panel's clear control was pressed.
    ClearLogs,
    /// The video/audio selector changed.
    ModeChanged(DownloadMode),
    /// The surface was shown or hidden.
    Visibility(Visibility),
    /// Poll once right now.
    Refresh,
}

/// Result of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// No download is tracked as active; nothing was sent.
    NotActive,
    /// The backend accepted the request; termination shows up in a later poll.
    Requested,
}

/// Result of one poll tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another status request was still outstanding; nothing was sent.
    Skipped,
    /// A snapshot was fetched and folded into the view.
    Reconciled(Reconciliation),
    /// The request failed; the delay was increased.
    Failed,
    /// Polling was suspended or restarted while the request was in flight.
    Discarded,
}

/// What reconciling one snapshot changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// The local active flag was set by this snapshot.
    pub became_active: bool,
    /// The local active flag was cleared by a terminal status.
    pub finished: bool,
    /// The rendered log was cleared before appending.
    pub log_reset: bool,
    /// Server lines appended to the log panel.
    pub appended: usize,
    /// Progress surface contents.
    pub progress: Option<ProgressView>,
}

/// Download activity as seen by the controller, published after every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Activity {
    /// A download is tracked as active.
    pub downloading: bool,
    /// Status from the latest snapshot.
    pub status: Option<DownloadStatus>,
    /// Downloads that reached a terminal status while tracked.
    pub finished_runs: u64,
}

struct SharedState {
    downloading: bool,
    submitting: bool,
    rendered_server_lines: usize,
    poll: PollState,
    poll_epoch: u64,
    activity: Activity,
}

struct Inner<A, V> {
    api: A,
    view: V,
    config: ControllerConfig,
    state: Mutex<SharedState>,
    activity: watch::Sender<Activity>,
}

/// The status poll controller.
pub struct Controller<A, V>
where
    A: DownloaderApi + 'static,
    V: StatusView + 'static,
{
    inner: Arc<Inner<A, V>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl<A, V> Controller<A, V>
where
    A: DownloaderApi + 'static,
    V: StatusView + 'static,
{
    /// Create an idle controller. Polling starts on the first
    /// [`Visibility::Visible`] event.
    pub fn new(api: A, view: V, config: ControllerConfig) -> Self {
        let (activity, _) = watch::channel(Activity::default());
        let state = SharedState {
            downloading: false,
            submitting: false,
            rendered_server_lines: 0,
            poll: PollState::new(config.poll),
            poll_epoch: 0,
            activity: Activity::default(),
        };
        Self {
            inner: Arc::new(Inner {
                api,
                view,
                config,
                state: Mutex::new(state),
                activity,
            }),
            poller: Mutex::new(None),
        }
    }

    /// Dispatch a UI event.
    ///
    /// Must be called from within a Tokio runtime, since visibility changes
    /// spawn or abort the poll task.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying operation after it has already been
    /// reported to the view.
    pub async fn handle(&self, event: UiEvent) -> ControllerResult<()> {
        match event {
            UiEvent::Submit(form) => self.submit(&form).await,
            UiEvent::Cancel => self.cancel().await.map(|_| ()),
            UiEvent::Preview(url) => self.preview(&url).await.map(|_| ()),
            UiEvent::ClearLogs => {
                self.clear_logs();
                Ok(())
            }
            UiEvent::ModeChanged(mode) => {
                self.mode_changed(mode);
                Ok(())
            }
            UiEvent::Visibility(visibility) => {
                self.set_visibility(visibility);
                Ok(())
            }
            UiEvent::Refresh => {
                self.tick().await;
                Ok(())
            }
        }
    }

    /// Validate the form and ask the backend to start a download.
    ///
    /// # Errors
    ///
    /// Validation failures make no request. Rejections and transport failures
    /// re-enable the submit control.
    pub async fn submit(&self, form: &DownloadForm) -> ControllerResult<()> {
        let request = {
            let mut state = self.inner.lock_state();
            if state.downloading {
                drop(state);
                return Err(self.reject_locally("Download already in progress!"));
            }
            if state.submitting {
                drop(state);
                return Err(self.reject_locally("A download request is already being sent"));
            }
            let request = match form.validate() {
                Ok(request) => request,
                Err(err) => {
                    drop(state);
                    self.inner.notice(NoticeLevel::Error, err.user_message());
                    return Err(err);
                }
            };
            state.submitting = true;
            request
        };

        self.inner.view.set_controls(ControlState::Submitting);
        let result = self.inner.api.start_download(&request).await;

        let mut state = self.inner.lock_state();
        state.submitting = false;
        match result {
            Ok(()) => {
                state.downloading = true;
                state.activity.downloading = true;
                self.inner.publish(&state);
                drop(state);
                info!(url = %request.url, mode = request.mode.as_str(), "download started");
                self.inner.view.set_controls(ControlState::Active);
                self.inner.view.show_progress();
                self.inner.notice(
                    NoticeLevel::Success,
                    format!("Download started: {}", request.url),
                );
                Ok(())
            }
            Err(err) => {
                drop(state);
                warn!(error = %err, "download request failed");
                self.inner.view.set_controls(ControlState::Idle);
                let message = match &err {
                    ControllerError::Rejected { message, .. } => format!("Error: {message}"),
                    other => format!("Network error: {other}"),
                };
                self.inner.notice(NoticeLevel::Error, message);
                Err(err)
            }
        }
    }

    /// Ask the backend to cancel the tracked download.
    ///
    /// # Errors
    ///
    /// Returns the backend rejection or transport failure after reporting it.
    pub async fn cancel(&self) -> ControllerResult<CancelOutcome> {
        if !self.is_downloading() {
            debug!("cancel ignored; no download is active");
            return Ok(CancelOutcome::NotActive);
        }

        match self.inner.api.cancel().await {
            Ok(()) => {
                info!("cancellation requested");
                self.inner
                    .notice(NoticeLevel::Warning, "Cancellation requested...");
                Ok(CancelOutcome::Requested)
            }
            Err(err) => {
                warn!(error = %err, "cancel request failed");
                let message = match &err {
                    ControllerError::Rejected { message, .. } => format!("Cancel error: {message}"),
                    other => format!("Network error: {other}"),
                };
                self.inner.notice(NoticeLevel::Error, message);
                Err(err)
            }
        }
    }

    /// Fetch and show the metadata preview for `url`.
    ///
    /// Returns `Ok(None)` without a request when the URL is blank.
    ///
    /// # Errors
    ///
    /// Returns the rejection (including a `success: false` body) or transport
    /// failure after reporting it inline.
    pub async fn preview(&self, url: &str) -> ControllerResult<Option<PreviewView>> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(None);
        }

        self.inner.view.set_preview_busy(true);
        let result = self.inner.api.info(url).await;
        self.inner.view.set_preview_busy(false);

        let err = match result {
            Ok(info) if info.success => {
                let preview = PreviewView::from_info(&info);
                self.inner.view.show_preview(&preview);
                return Ok(Some(preview));
            }
            Ok(info) => ControllerError::Rejected {
                endpoint: crate::api::INFO_PATH,
                status: 200,
                message: info
                    .error
                    .unwrap_or_else(|| "no metadata returned".to_string()),
            },
            Err(err) => err,
        };
        debug!(error = %err, "preview failed");
        self.inner.notice(
            NoticeLevel::Error,
            format!("Preview Error: {}", err.user_message()),
        );
        Err(err)
    }

    /// Clear the log panel. Server lines already shown are not replayed.
    pub fn clear_logs(&self) {
        self.inner.view.clear_log();
        self.inner.notice(NoticeLevel::Info, "Logs cleared.");
    }

    /// Enable the resolution picker for video, disable it for audio.
    pub fn mode_changed(&self, mode: DownloadMode) {
        self.inner
            .view
            .set_resolution_enabled(mode == DownloadMode::Video);
    }

    /// Start or suspend the poll loop.
    ///
    /// Showing an already visible surface and hiding a hidden one are no-ops.
    /// Resuming always starts from a fresh poll state.
    pub fn set_visibility(&self, visibility: Visibility) {
        let mut poller = self.poller.lock().unwrap_or_else(PoisonError::into_inner);
        match visibility {
            Visibility::Visible => {
                if poller.as_ref().is_some_and(|handle| !handle.is_finished()) {
                    return;
                }
                self.inner.restart_poll_state();
                debug!("poll loop started");
                *poller = Some(spawn_poll_loop(Arc::clone(&self.inner)));
            }
            Visibility::Hidden => {
                if let Some(handle) = poller.take() {
                    handle.abort();
                    self.inner.restart_poll_state();
                    debug!("poll loop suspended");
                }
            }
        }
    }

    /// Whether the poll loop task is running.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Run one poll tick now, honouring the in-flight guard.
    pub async fn tick(&self) -> TickOutcome {
        self.inner.poll_once().await.unwrap_or(TickOutcome::Failed)
    }

    /// Run one poll tick now and return its failure instead of folding it
    /// into the backoff silently.
    ///
    /// # Errors
    ///
    /// Returns the status request's error, including a timeout. The delay has
    /// already been increased when this happens.
    pub async fn refresh_once(&self) -> ControllerResult<TickOutcome> {
        self.inner.poll_once().await
    }

    /// Fold a snapshot into the view as a successful poll would.
    pub fn reconcile(&self, snapshot: &StatusSnapshot) -> Reconciliation {
        let mut state = self.inner.lock_state();
        self.inner.reconcile_locked(&mut state, snapshot)
    }

    /// Whether a download is tracked as active.
    #[must_use]
    pub fn is_downloading(&self) -> bool {
        self.inner.lock_state().downloading
    }

    /// Delay before the next timer tick.
    #[must_use]
    pub fn poll_delay(&self) -> Duration {
        self.inner.lock_state().poll.delay()
    }

    /// Watch download activity (flag changes, snapshot statuses, finished runs).
    #[must_use]
    pub fn activity(&self) -> watch::Receiver<Activity> {
        self.inner.activity.subscribe()
    }

    fn reject_locally(&self, message: &str) -> ControllerError {
        self.inner.notice(NoticeLevel::Error, message);
        ControllerError::validation(message)
    }
}

impl<A, V> Drop for Controller<A, V>
where
    A: DownloaderApi + 'static,
    V: StatusView + 'static,
{
    fn drop(&mut self) {
        let poller = self.poller.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = poller.take() {
            handle.abort();
        }
    }
}

impl<A, V> Inner<A, V>
where
    A: DownloaderApi + 'static,
    V: StatusView + 'static,
{
    fn lock_state(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notice(&self, level: NoticeLevel, message: impl Into<String>) {
        self.view.append_log(&LogEntry::local(level, message));
    }

    fn publish(&self, state: &SharedState) {
        self.activity.send_replace(state.activity);
    }

    fn current_delay(&self) -> Duration {
        self.lock_state().poll.delay()
    }

    fn restart_poll_state(&self) {
        let mut state = self.lock_state();
        state.poll.restart();
        state.poll_epoch = state.poll_epoch.wrapping_add(1);
    }

    async fn poll_once(&self) -> ControllerResult<TickOutcome> {
        let epoch = {
            let mut state = self.lock_state();
            match state.poll.begin_tick() {
                TickDecision::Skip => {
                    debug!(
                        delay_ms = duration_ms(state.poll.delay()),
                        "status request still in flight; skipping tick"
                    );
                    return Ok(TickOutcome::Skipped);
                }
                TickDecision::Fetch => state.poll_epoch,
            }
        };

        let mut in_flight = InFlight {
            inner: self,
            armed: true,
        };
        let result = status_within(&self.api, self.config.status_timeout).await;

        let mut state = self.lock_state();
        in_flight.armed = false;
        if state.poll_epoch != epoch {
            state.poll.abandon();
            debug!("discarding status from a suspended poll loop");
            return Ok(TickOutcome::Discarded);
        }
        match result {
            Ok(snapshot) => {
                state.poll.finish(PollOutcome::Success);
                Ok(TickOutcome::Reconciled(
                    self.reconcile_locked(&mut state, &snapshot),
                ))
            }
            Err(err) => {
                let next = state.poll.finish(PollOutcome::Failure);
                debug!(
                    error = %err,
                    failures = state.poll.consecutive_failures(),
                    delay_ms = duration_ms(next),
                    "status poll failed; backing off"
                );
                Err(err)
            }
        }
    }

    fn reconcile_locked(
        &self,
        state: &mut SharedState,
        snapshot: &StatusSnapshot,
    ) -> Reconciliation {
        let mut outcome = Reconciliation::default();

        if snapshot.is_downloading && !state.downloading {
            state.downloading = true;
            outcome.became_active = true;
            self.view.set_controls(ControlState::Active);
            self.view.show_progress();
        }

        let progress = progress_view(snapshot, self.config.stall_threshold_secs);
        self.view.render_progress(&progress);
        outcome.progress = Some(progress);

        match log_delta(state.rendered_server_lines, &snapshot.logs) {
            LogDelta::Append(lines) => {
                for line in lines {
                    self.view.append_log(&LogEntry::server(line.as_str()));
                }
                state.rendered_server_lines += lines.len();
                outcome.appended = lines.len();
            }
            LogDelta::Rebuild(lines) => {
                debug!(
                    rendered = state.rendered_server_lines,
                    received = lines.len(),
                    "server log shrank; rebuilding"
                );
                self.view.clear_log();
                for line in lines {
                    self.view.append_log(&LogEntry::server(line.as_str()));
                }
                state.rendered_server_lines = lines.len();
                outcome.log_reset = true;
                outcome.appended = lines.len();
            }
        }

        if snapshot.status.is_terminal() && state.downloading {
            state.downloading = false;
            state.activity.finished_runs = state.activity.finished_runs.saturating_add(1);
            outcome.finished = true;
            info!(status = %snapshot.status, "download finished");
            self.view.set_controls(ControlState::Idle);
        }

        state.activity.downloading = state.downloading;
        state.activity.status = Some(snapshot.status);
        self.publish(state);
        outcome
    }
}

/// Releases the in-flight marker when a status request is dropped before it
/// completes, as happens when the poll task is aborted mid-request.
struct InFlight<'a, A, V>
where
    A: DownloaderApi + 'static,
    V: StatusView + 'static,
{
    inner: &'a Inner<A, V>,
    armed: bool,
}

impl<A, V> Drop for InFlight<'_, A, V>
where
    A: DownloaderApi + 'static,
    V: StatusView + 'static,
{
    fn drop(&mut self) {
        if self.armed {
            self.inner.lock_state().poll.abandon();
        }
    }
}

fn spawn_poll_loop<A, V>(inner: Arc<Inner<A, V>>) -> JoinHandle<()>
where
    A: DownloaderApi + 'static,
    V: StatusView + 'static,
{
    tokio::spawn(async move {
        loop {
            sleep(inner.current_delay()).await;
            let _ = inner.poll_once().await;
        }
    })
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
