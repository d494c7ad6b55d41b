//! The recording state machine.
//!
//! A `Recorder` owns the per-session mutable state (recording flag, last
//! seen URL) and turns raw probe events into capture messages. Probes report
//! everything they see; the allow-list, text clipping and navigation dedup
//! all happen here so they can be tested without a browser.

use tracing::{debug, warn};
use weaver_common::protocol::{
    CaptureMessage, ControlMessage, ElementInfo, FormField, InteractionKind, PageEvent, TargetInfo,
};

use crate::store::SessionStore;

/// Tags whose clicks are always captured.
const CLICKABLE_TAGS: [&str; 5] = ["button", "a", "input", "ion-button", "app-button"];

/// Tags that produce `input` form captures.
const FORM_CONTROL_TAGS: [&str; 3] = ["input", "textarea", "select"];

/// Captured element text is clipped to this many characters.
const TEXT_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
}

pub struct Recorder {
    state: RecorderState,
    last_url: Option<String>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            state: RecorderState::Idle,
            last_url: None,
        }
    }

    /// Restore the recording flag from the external store. A missing or
    /// unreadable store starts the session idle.
    pub async fn restore(store: &dyn SessionStore) -> Self {
        let mut recorder = Self::new();
        match store.load().await {
            Ok(true) => recorder.state = RecorderState::Recording,
            Ok(false) => {}
            Err(e) => warn!("Could not restore recording state, starting idle: {}", e),
        }
        recorder
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Idempotent: starting an already-recording session changes nothing.
    pub fn start_recording(&mut self) {
        if self.is_recording() {
            return;
        }
        self.state = RecorderState::Recording;
        debug!("Recording started");
    }

    /// Idempotent counterpart of `start_recording`.
    pub fn stop_recording(&mut self) {
        if !self.is_recording() {
            return;
        }
        self.state = RecorderState::Idle;
        debug!("Recording stopped");
    }

    pub fn handle_control(&mut self, control: &ControlMessage) {
        match control {
            ControlMessage::StartRecording => self.start_recording(),
            ControlMessage::StopRecording => self.stop_recording(),
        }
    }

    /// Set the navigation baseline without emitting anything. Called when a
    /// session opens or the driver navigates explicitly, so the next
    /// `location_changed` report is compared against where we actually are.
    pub fn seed_url(&mut self, url: &str) {
        self.last_url = Some(url.to_string());
    }

    /// Turn one raw probe event into at most one capture message.
    ///
    /// While idle every event is dropped, including events that were still
    /// in flight when recording stopped.
    pub fn handle_event(&mut self, event: PageEvent) -> Option<CaptureMessage> {
        if !self.is_recording() {
            return None;
        }

        match event {
            PageEvent::Click { target, url } => on_click(target, url),
            PageEvent::Input { target, url } => on_input(target, url),
            PageEvent::Submit {
                form_id,
                form_action,
                url,
            } => Some(CaptureMessage::FormInteraction {
                field: FormField::Form {
                    form_id,
                    form_action,
                },
                kind: InteractionKind::Submit,
                url,
            }),
            PageEvent::LocationChanged { url, title } => self.on_location_changed(url, title),
        }
    }

    /// Multiple detection paths may report the same navigation; only a URL
    /// that differs from the last seen one produces a message.
    fn on_location_changed(&mut self, url: String, title: String) -> Option<CaptureMessage> {
        if self.last_url.as_deref() == Some(url.as_str()) {
            return None;
        }
        self.last_url = Some(url.clone());
        Some(CaptureMessage::PageChanged { url, title })
    }
}

fn on_click(target: TargetInfo, url: String) -> Option<CaptureMessage> {
    if !is_clickable(&target) {
        return None;
    }
    Some(CaptureMessage::ClickDetected {
        element: ElementInfo {
            tag: target.tag.to_ascii_lowercase(),
            id: target.id,
            class: target.class,
            input_type: target.input_type,
        },
        text: clip_text(&target.text),
        url,
    })
}

fn on_input(target: TargetInfo, url: String) -> Option<CaptureMessage> {
    if !FORM_CONTROL_TAGS
        .iter()
        .any(|t| target.tag.eq_ignore_ascii_case(t))
    {
        return None;
    }
    Some(CaptureMessage::FormInteraction {
        field: FormField::Control {
            tag: target.tag.to_ascii_lowercase(),
            input_type: target.input_type,
            name: target.name,
            id: target.id,
            placeholder: target.placeholder,
        },
        kind: InteractionKind::Input,
        url,
    })
}

fn is_clickable(target: &TargetInfo) -> bool {
    CLICKABLE_TAGS
        .iter()
        .any(|t| target.tag.eq_ignore_ascii_case(t))
        || target.role.as_deref() == Some("button")
        || target.has_onclick
}

/// Clip to `TEXT_LIMIT` characters, never splitting a char.
fn clip_text(text: &str) -> String {
    text.trim().chars().take(TEXT_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_text_keeps_short_text_intact() {
        assert_eq!(clip_text("  Submit Order  "), "Submit Order");
    }

    #[test]
    fn clip_text_counts_chars_not_bytes() {
        let text = "é".repeat(80);
        let clipped = clip_text(&text);
        assert_eq!(clipped.chars().count(), 50);
        assert_eq!(clipped, "é".repeat(50));
    }

    #[test]
    fn uppercase_tags_still_match_the_allow_list() {
        let target = TargetInfo {
            tag: "BUTTON".into(),
            ..Default::default()
        };
        assert!(is_clickable(&target));
    }
}
