use crate::server::{BridgeHandle, BridgeServer};
use async_trait::async_trait;
use tracing::info;
use weaver_engine::backend::{Backend, BackendError};
use weaver_engine::protocol::{PageEvent, PageInfo};

/// Capture backend backed by a live browser extension. The user drives the
/// browser; we only flip the extension's recording state and collect what it
/// reports.
pub struct RemoteBackend {
    port: u16,
    handle: Option<BridgeHandle>,
    armed: bool,
    last_page: Option<PageInfo>,
}

impl RemoteBackend {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            handle: None,
            armed: false,
            last_page: None,
        }
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        info!("Launching Remote Backend on port {}", self.port);
        let server = BridgeServer::new(self.port);
        match server.start().await {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => Err(BackendError::Other(format!("Bridge failed: {}", e))),
        }
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        self.handle = None;
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.handle.is_some()
    }

    // navigate() keeps the trait default: the user owns the remote browser.

    async fn arm(&mut self) -> Result<(), BackendError> {
        let handle = self.handle.as_ref().ok_or(BackendError::NotReady)?;
        handle
            .desired_tx
            .send(true)
            .map_err(|_| BackendError::ConnectionLost)?;
        self.armed = true;
        Ok(())
    }

    async fn disarm(&mut self) -> Result<(), BackendError> {
        self.armed = false;
        let handle = self.handle.as_ref().ok_or(BackendError::NotReady)?;
        handle
            .desired_tx
            .send(false)
            .map_err(|_| BackendError::ConnectionLost)?;
        Ok(())
    }

    async fn drain_events(&mut self) -> Result<Vec<PageEvent>, BackendError> {
        if !self.armed {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        {
            let handle = self.handle.as_mut().ok_or(BackendError::NotReady)?;
            while let Ok(event) = handle.event_rx.try_recv() {
                events.push(event);
            }
        }

        // Track where the remote page is so page_info has an answer.
        for event in &events {
            if let PageEvent::LocationChanged { url, title } = event {
                self.last_page = Some(PageInfo {
                    url: url.clone(),
                    title: title.clone(),
                });
            }
        }
        Ok(events)
    }

    async fn page_info(&mut self) -> Result<PageInfo, BackendError> {
        self.handle.as_ref().ok_or(BackendError::NotReady)?;
        self.last_page
            .clone()
            .ok_or_else(|| BackendError::Other("No page reported by the extension yet".into()))
    }
}
