//! Session loop tests against a scripted backend.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use weaver_engine::backend::{Backend, BackendError, NavigationResult};
use weaver_engine::protocol::{CaptureMessage, ControlMessage, PageEvent, PageInfo, TargetInfo};
use weaver_engine::recorder::Recorder;
use weaver_engine::session::{SessionCommand, run_session};
use weaver_engine::sink::ChannelSink;
use weaver_engine::store::{MemoryStore, SessionStore};

const POLL: Duration = Duration::from_millis(10);
const SETTLE: Duration = Duration::from_millis(80);

#[derive(Clone, Default)]
struct MockBackend {
    queue: Arc<Mutex<VecDeque<PageEvent>>>,
    armed: Arc<Mutex<bool>>,
    arm_calls: Arc<Mutex<usize>>,
    disarm_calls: Arc<Mutex<usize>>,
}

impl MockBackend {
    fn push(&self, event: PageEvent) {
        self.queue.lock().unwrap().push_back(event);
    }

    fn arm_count(&self) -> usize {
        *self.arm_calls.lock().unwrap()
    }

    fn disarm_count(&self) -> usize {
        *self.disarm_calls.lock().unwrap()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        true
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        Ok(NavigationResult {
            url: url.to_string(),
            title: String::new(),
        })
    }

    async fn arm(&mut self) -> Result<(), BackendError> {
        *self.armed.lock().unwrap() = true;
        *self.arm_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn disarm(&mut self) -> Result<(), BackendError> {
        *self.armed.lock().unwrap() = false;
        *self.disarm_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn drain_events(&mut self) -> Result<Vec<PageEvent>, BackendError> {
        if !*self.armed.lock().unwrap() {
            return Ok(Vec::new());
        }
        Ok(self.queue.lock().unwrap().drain(..).collect())
    }

    async fn page_info(&mut self) -> Result<PageInfo, BackendError> {
        Ok(PageInfo {
            url: "https://app.test/".into(),
            title: "App".into(),
        })
    }
}

struct Harness {
    backend: MockBackend,
    store: MemoryStore,
    cmd_tx: mpsc::Sender<SessionCommand>,
    msg_rx: mpsc::Receiver<CaptureMessage>,
    session: tokio::task::JoinHandle<Result<(), weaver_engine::session::SessionError>>,
}

fn spawn_session(initially_recording: bool) -> Harness {
    let backend = MockBackend::default();
    let store = MemoryStore::new(initially_recording);
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (msg_tx, msg_rx) = mpsc::channel(64);

    let mut task_backend = backend.clone();
    let task_store = store.clone();
    let session = tokio::spawn(async move {
        let mut recorder = Recorder::restore(&task_store).await;
        let mut sink = ChannelSink::new(msg_tx);
        run_session(
            &mut task_backend,
            &mut recorder,
            &task_store,
            &mut sink,
            cmd_rx,
            POLL,
        )
        .await
    });

    Harness {
        backend,
        store,
        cmd_tx,
        msg_rx,
        session,
    }
}

fn click_event() -> PageEvent {
    PageEvent::Click {
        target: TargetInfo {
            tag: "button".into(),
            id: "submit-btn".into(),
            text: "Submit Order".into(),
            ..Default::default()
        },
        url: "https://app.test/checkout".into(),
    }
}

async fn recv_capture(harness: &mut Harness) -> CaptureMessage {
    tokio::time::timeout(Duration::from_secs(2), harness.msg_rx.recv())
        .await
        .expect("Timed out waiting for a capture message")
        .expect("Capture channel closed")
}

#[tokio::test]
async fn start_capture_stop_end_to_end() {
    let mut harness = spawn_session(false);

    harness
        .cmd_tx
        .send(SessionCommand::Control(ControlMessage::StartRecording))
        .await
        .unwrap();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(harness.backend.arm_count(), 1);
    assert!(harness.store.load().await.unwrap());

    harness.backend.push(click_event());
    let message = recv_capture(&mut harness).await;
    assert!(matches!(message, CaptureMessage::ClickDetected { .. }));

    harness
        .cmd_tx
        .send(SessionCommand::Control(ControlMessage::StopRecording))
        .await
        .unwrap();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(harness.backend.disarm_count(), 1);
    assert!(!harness.store.load().await.unwrap());

    // Events arriving after the stop never reach the sink.
    harness.backend.push(click_event());
    tokio::time::sleep(SETTLE).await;
    assert!(harness.msg_rx.try_recv().is_err());

    harness.cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
    harness.session.await.unwrap().unwrap();
}

#[tokio::test]
async fn repeated_start_commands_arm_once() {
    let mut harness = spawn_session(false);

    for _ in 0..3 {
        harness
            .cmd_tx
            .send(SessionCommand::Control(ControlMessage::StartRecording))
            .await
            .unwrap();
    }
    tokio::time::sleep(SETTLE).await;
    assert_eq!(harness.backend.arm_count(), 1);

    harness.backend.push(click_event());
    recv_capture(&mut harness).await;
    assert!(harness.msg_rx.try_recv().is_err());

    harness.cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
    harness.session.await.unwrap().unwrap();
}

#[tokio::test]
async fn restored_recording_state_arms_without_a_command() {
    let mut harness = spawn_session(true);

    tokio::time::sleep(SETTLE).await;
    assert_eq!(harness.backend.arm_count(), 1);

    harness.backend.push(click_event());
    let message = recv_capture(&mut harness).await;
    assert!(matches!(message, CaptureMessage::ClickDetected { .. }));

    // Session teardown releases the probe for a still-recording session.
    harness.cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
    harness.session.await.unwrap().unwrap();
    assert_eq!(harness.backend.disarm_count(), 1);
}

#[tokio::test]
async fn one_navigation_produces_one_page_change() {
    let mut harness = spawn_session(true);
    tokio::time::sleep(SETTLE).await;

    // Two detection paths reporting the same SPA route change.
    for _ in 0..2 {
        harness.backend.push(PageEvent::LocationChanged {
            url: "https://app.test/#/settings".into(),
            title: "Settings".into(),
        });
    }

    let message = recv_capture(&mut harness).await;
    assert_eq!(
        message,
        CaptureMessage::PageChanged {
            url: "https://app.test/#/settings".into(),
            title: "Settings".into(),
        }
    );
    tokio::time::sleep(SETTLE).await;
    assert!(harness.msg_rx.try_recv().is_err());

    harness.cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
    harness.session.await.unwrap().unwrap();
}

#[tokio::test]
async fn baseline_url_suppresses_the_initial_location_report() {
    let mut harness = spawn_session(true);
    tokio::time::sleep(SETTLE).await;

    // The probe reports the URL the session already started on.
    harness.backend.push(PageEvent::LocationChanged {
        url: "https://app.test/".into(),
        title: "App".into(),
    });
    tokio::time::sleep(SETTLE).await;
    assert!(harness.msg_rx.try_recv().is_err());

    harness.cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
    harness.session.await.unwrap().unwrap();
}

#[tokio::test]
async fn closing_the_command_channel_ends_the_session() {
    let harness = spawn_session(false);
    drop(harness.cmd_tx);
    tokio::time::timeout(Duration::from_secs(2), harness.session)
        .await
        .expect("Session should end when its command channel closes")
        .unwrap()
        .unwrap();
}
