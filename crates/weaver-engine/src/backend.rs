use async_trait::async_trait;
pub use weaver_common::error::BackendError;
use weaver_common::protocol::{PageEvent, PageInfo};

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
}

/// The Backend trait is the unified interface both delivery crates implement:
/// headless Chromium over CDP, and the WebSocket bridge a browser extension
/// connects to. The engine only ever talks to this surface.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Launch the backend (start browser, bind the bridge socket, etc.)
    async fn launch(&mut self) -> Result<(), BackendError>;

    /// Close the backend and clean up resources.
    async fn close(&mut self) -> Result<(), BackendError>;

    /// Check if the backend is ready to capture.
    async fn is_ready(&self) -> bool;

    /// Navigate to a specific URL. Backends that cannot drive navigation
    /// (the extension bridge, where the user owns the browser) report
    /// `NotSupported`.
    async fn navigate(&mut self, _url: &str) -> Result<NavigationResult, BackendError> {
        Err(BackendError::NotSupported("navigate".into()))
    }

    /// Enable capture: install the page-side probe and attach its listeners.
    async fn arm(&mut self) -> Result<(), BackendError>;

    /// Disable capture and detach the probe's listeners. Together with
    /// `arm` this scopes every page-side resource to the recording window;
    /// nothing keeps observing after a stop.
    async fn disarm(&mut self) -> Result<(), BackendError>;

    /// Collect the raw events observed since the previous drain.
    async fn drain_events(&mut self) -> Result<Vec<PageEvent>, BackendError>;

    /// Current URL and title of the observed page.
    async fn page_info(&mut self) -> Result<PageInfo, BackendError>;
}
