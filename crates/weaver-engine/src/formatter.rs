use weaver_common::protocol::{CaptureMessage, FormField, InteractionKind};

/// One-line terminal rendering of a capture message.
pub fn format_message(message: &CaptureMessage) -> String {
    match message {
        CaptureMessage::ClickDetected { element, text, url } => {
            let mut desc = element.tag.clone();
            if !element.id.is_empty() {
                desc.push('#');
                desc.push_str(&element.id);
            }
            if text.is_empty() {
                format!("click  {} ({})", desc, url)
            } else {
                format!("click  {} \"{}\" ({})", desc, text, url)
            }
        }

        CaptureMessage::FormInteraction { field, kind, url } => {
            let verb = match kind {
                InteractionKind::Input => "input",
                InteractionKind::Submit => "submit",
            };
            let target = match field {
                FormField::Control { tag, name, id, .. } => {
                    if !name.is_empty() {
                        format!("{}[name={}]", tag, name)
                    } else if !id.is_empty() {
                        format!("{}#{}", tag, id)
                    } else {
                        tag.clone()
                    }
                }
                FormField::Form {
                    form_id,
                    form_action,
                } => {
                    if !form_id.is_empty() {
                        format!("form#{}", form_id)
                    } else if !form_action.is_empty() {
                        format!("form action={}", form_action)
                    } else {
                        "form".to_string()
                    }
                }
            };
            format!("form   {} {} ({})", verb, target, url)
        }

        CaptureMessage::PageChanged { url, title } => {
            if title.is_empty() {
                format!("page   {}", url)
            } else {
                format!("page   {} [{}]", url, title)
            }
        }
    }
}
