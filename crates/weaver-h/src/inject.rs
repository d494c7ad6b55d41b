use chromiumoxide::Page;
use std::error::Error;
use std::future::Future;
use std::time::Duration;
use weaver_engine::protocol::PageEvent;
use weaver_probe::PROBE_JS;

/// Default timeout for JavaScript evaluation (10 seconds).
/// This prevents hanging when dialogs (alert/confirm/prompt) block the JS thread.
const EVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum retries for context errors during page navigation.
const MAX_CONTEXT_RETRIES: u32 = 10;

/// Delay between retries when context is not found (page navigating).
const CONTEXT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Returns the probe's queue when it is installed and listening, `false`
/// otherwise so the caller can re-arm after a navigation wiped the context.
const DRAIN_EXPR: &str =
    "(window.WeaverProbe && window.WeaverProbe.isEnabled()) ? window.WeaverProbe.drain() : false";

/// Check if an error indicates the page context is unavailable (e.g., during navigation).
fn is_context_error(err: &str) -> bool {
    err.contains("Cannot find context")
        || err.contains("Execution context was destroyed")
        || err.contains("-32000")
}

/// Retry an async operation that may fail due to context errors during page navigation.
/// Returns immediately on success or non-context errors; retries only on context errors.
async fn retry_on_context_error<T, E, F, Fut>(
    operation_name: &str,
    mut operation: F,
) -> Result<T, Box<dyn Error + Send + Sync>>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_error = None;

    for attempt in 0..MAX_CONTEXT_RETRIES {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let err_str = e.to_string();
                if is_context_error(&err_str) {
                    tracing::debug!(
                        "{} context error (attempt {}/{}), retrying...",
                        operation_name,
                        attempt + 1,
                        MAX_CONTEXT_RETRIES
                    );
                    last_error = Some(err_str);
                    tokio::time::sleep(CONTEXT_RETRY_DELAY).await;
                    continue;
                }
                return Err(err_str.into());
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| format!("{} failed after retries", operation_name))
        .into())
}

/// Install the probe if this page context does not have it yet.
pub async fn ensure_probe(page: &Page) -> Result<(), Box<dyn Error + Send + Sync>> {
    retry_on_context_error("Probe injection", || try_ensure_probe(page)).await
}

async fn try_ensure_probe(page: &Page) -> Result<(), Box<dyn Error + Send + Sync>> {
    let is_loaded: bool = page
        .evaluate("typeof window.WeaverProbe !== 'undefined'")
        .await
        .map_err(|e| format!("Failed to check probe status: {}", e))?
        .into_value()
        .map_err(|e| format!("Failed to get bool value: {}", e))?;

    if !is_loaded {
        page.evaluate(PROBE_JS)
            .await
            .map_err(|e| format!("Failed to inject probe.js: {}", e))?;
    }

    Ok(())
}

/// Attach or detach the probe's page listeners. Injects first when needed;
/// both probe calls are idempotent on the page side.
pub async fn set_capture(page: &Page, enabled: bool) -> Result<(), Box<dyn Error + Send + Sync>> {
    ensure_probe(page).await?;
    let expression = if enabled {
        "window.WeaverProbe.enable()"
    } else {
        "window.WeaverProbe.disable()"
    };
    retry_on_context_error("Probe toggle", || try_toggle(page, expression)).await
}

async fn try_toggle(page: &Page, expression: &str) -> Result<(), String> {
    page.evaluate(expression)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// One poll of the probe's event queue.
///
/// `Ok(None)` means the probe is gone or disabled (a navigation replaced the
/// page context); the caller re-arms and tries again next tick.
pub async fn drain_probe(
    page: &Page,
) -> Result<Option<Vec<PageEvent>>, Box<dyn Error + Send + Sync>> {
    let value = match evaluate_with_timeout(page, DRAIN_EXPR).await {
        Ok(value) => value,
        Err(EvalError::Timeout) => {
            return Err(
                "Drain timed out - possibly blocked by a dialog (alert/confirm/prompt)".into(),
            );
        }
        Err(EvalError::Context(_)) => {
            // The page is mid-navigation; treat like a missing probe.
            return Ok(None);
        }
        Err(EvalError::Other(err_str)) => {
            return Err(format!("Drain failed: {}", err_str).into());
        }
    };

    match value {
        serde_json::Value::Bool(false) => Ok(None),
        serde_json::Value::Array(items) => {
            let mut events = Vec::with_capacity(items.len());
            for item in items {
                match serde_json::from_value::<PageEvent>(item) {
                    Ok(event) => events.push(event),
                    Err(e) => tracing::warn!("Dropping malformed probe event: {}", e),
                }
            }
            Ok(Some(events))
        }
        other => Err(format!("Unexpected drain result: {}", other).into()),
    }
}

enum EvalError {
    Timeout,
    Context(String),
    Other(String),
}

async fn evaluate_with_timeout(page: &Page, expression: &str) -> Result<serde_json::Value, EvalError> {
    let eval_result = tokio::time::timeout(EVAL_TIMEOUT, page.evaluate(expression)).await;

    match eval_result {
        Err(_) => Err(EvalError::Timeout),
        Ok(Err(e)) => {
            let err_str = e.to_string();
            if is_context_error(&err_str) {
                Err(EvalError::Context(err_str))
            } else {
                Err(EvalError::Other(err_str))
            }
        }
        Ok(Ok(remote_object)) => remote_object
            .into_value::<serde_json::Value>()
            .map_err(|e| EvalError::Other(format!("Failed to get result: {}", e))),
    }
}
