//! Shared capture session loop for all Weaver backends.
//!
//! `run_session` owns the full pipeline: drain raw events from the backend
//! on a fixed cadence, run them through the `Recorder`, and forward every
//! resulting message to the sink. Control arrives over a command channel.
//! The drain ticker lives inside the select loop, so stopping the session
//! cancels it with everything else; no timer outlives its owner.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use weaver_common::protocol::ControlMessage;

use crate::backend::{Backend, BackendError};
use crate::recorder::Recorder;
use crate::sink::{CaptureSink, SinkError};
use crate::store::SessionStore;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Commands the session host (CLI, bridge, test harness) can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Control(ControlMessage),
    Navigate(String),
    Status,
    Shutdown,
}

/// Drive one capture session until `Shutdown` arrives or the command
/// channel closes. The backend must already be launched.
pub async fn run_session<B, T, S>(
    backend: &mut B,
    recorder: &mut Recorder,
    store: &T,
    sink: &mut S,
    mut commands: mpsc::Receiver<SessionCommand>,
    poll_interval: Duration,
) -> Result<(), SessionError>
where
    B: Backend + ?Sized,
    T: SessionStore + ?Sized,
    S: CaptureSink + ?Sized,
{
    seed_baseline(backend, recorder).await;

    // A session restored into the recording state arms immediately, the
    // same as an explicit start.
    if recorder.is_recording() {
        backend.arm().await?;
    }

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !recorder.is_recording() {
                    continue;
                }
                let events = backend.drain_events().await?;
                for event in events {
                    if let Some(message) = recorder.handle_event(event) {
                        sink.emit(message).await?;
                    }
                }
            }

            command = commands.recv() => {
                match command {
                    None | Some(SessionCommand::Shutdown) => break,
                    Some(SessionCommand::Control(control)) => {
                        apply_control(backend, recorder, store, control).await?;
                    }
                    Some(SessionCommand::Navigate(url)) => {
                        match backend.navigate(&url).await {
                            Ok(result) => recorder.seed_url(&result.url),
                            Err(e) => warn!("Navigation failed: {}", e),
                        }
                    }
                    Some(SessionCommand::Status) => {
                        info!(recording = recorder.is_recording(), "Session status");
                    }
                }
            }
        }
    }

    if recorder.is_recording() {
        backend.disarm().await?;
    }
    Ok(())
}

/// Start/stop transitions arm or disarm the backend and persist the new
/// flag. Repeated starts and stops are no-ops end to end.
async fn apply_control<B, T>(
    backend: &mut B,
    recorder: &mut Recorder,
    store: &T,
    control: ControlMessage,
) -> Result<(), SessionError>
where
    B: Backend + ?Sized,
    T: SessionStore + ?Sized,
{
    let was_recording = recorder.is_recording();
    recorder.handle_control(&control);
    let now_recording = recorder.is_recording();

    if was_recording == now_recording {
        return Ok(());
    }

    if now_recording {
        backend.arm().await?;
        seed_baseline(backend, recorder).await;
    } else {
        backend.disarm().await?;
    }

    if let Err(e) = store.save(now_recording).await {
        warn!("Could not persist recording state: {}", e);
    }
    Ok(())
}

/// Best effort: a bridge backend has no page to ask until an extension
/// connects, and that must not fail the session.
async fn seed_baseline<B>(backend: &mut B, recorder: &mut Recorder)
where
    B: Backend + ?Sized,
{
    match backend.page_info().await {
        Ok(info) => recorder.seed_url(&info.url),
        Err(e) => debug!("No page info yet: {}", e),
    }
}
