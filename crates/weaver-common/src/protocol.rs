use serde::{Deserialize, Serialize};

/// Control messages consumed by the recorder. Wire names match what the
/// browser extension side has always sent (`{"action": "startRecording"}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlMessage {
    StartRecording,
    StopRecording,
}

/// Capture messages produced by the recorder, fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CaptureMessage {
    ClickDetected {
        element: ElementInfo,
        text: String,
        url: String,
    },
    FormInteraction {
        field: FormField,
        #[serde(rename = "type")]
        kind: InteractionKind,
        url: String,
    },
    PageChanged {
        url: String,
        title: String,
    },
}

/// Descriptive payload for a clicked element.
///
/// `input_type` stays on the wire as an explicit `null` for non-inputs;
/// consumers key off its presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub tag: String,
    pub id: String,
    pub class: String,
    #[serde(rename = "type")]
    pub input_type: Option<String>,
}

/// A form interaction touches either a single control or a whole form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormField {
    Control {
        tag: String,
        #[serde(rename = "type")]
        input_type: Option<String>,
        name: String,
        id: String,
        placeholder: String,
    },
    Form {
        #[serde(rename = "formId")]
        form_id: String,
        #[serde(rename = "formAction")]
        form_action: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Input,
    Submit,
}

/// Raw events as a probe observes them, before any filtering.
///
/// Probes report everything; the allow-list, truncation and navigation
/// dedup live in the engine where they can be tested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PageEvent {
    Click {
        target: TargetInfo,
        url: String,
    },
    Input {
        target: TargetInfo,
        url: String,
    },
    Submit {
        #[serde(default)]
        form_id: String,
        #[serde(default)]
        form_action: String,
        url: String,
    },
    LocationChanged {
        url: String,
        title: String,
    },
}

/// Everything a probe can tell us about an event target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TargetInfo {
    pub tag: String,
    pub id: String,
    pub class: String,
    pub input_type: Option<String>,
    pub role: Option<String>,
    pub has_onclick: bool,
    pub text: String,
    pub name: String,
    pub placeholder: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
}
