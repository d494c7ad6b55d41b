use crate::cdp::CdpClient;
use crate::inject::{drain_probe, set_capture};
use async_trait::async_trait;
use tracing::info;
use weaver_engine::backend::{Backend, BackendError, NavigationResult};
use weaver_engine::protocol::{PageEvent, PageInfo};

pub struct HeadlessBackend {
    client: Option<CdpClient>,
    visible: bool,
    armed: bool,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            client: None,
            visible: false,
            armed: false,
        }
    }

    pub fn new_with_visibility(visible: bool) -> Self {
        Self {
            client: None,
            visible,
            armed: false,
        }
    }

    pub fn get_client(&self) -> Option<&CdpClient> {
        self.client.as_ref()
    }

    async fn get_page_info(page: &chromiumoxide::Page) -> Result<PageInfo, BackendError> {
        let title = page
            .get_title()
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        let url = page
            .url()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(PageInfo { url, title })
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for HeadlessBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        info!("Launching Headless Backend (Chromium)...");
        let client = CdpClient::launch(self.visible)
            .await
            .map_err(|e| BackendError::Other(e.to_string()))?;
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| BackendError::Other(e.to_string()))?;
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        let client = self.client.as_mut().ok_or(BackendError::NotReady)?;

        info!("Navigating to: {}", url);
        client
            .page
            .goto(url)
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?;

        let info = Self::get_page_info(&client.page).await?;
        Ok(NavigationResult {
            url: info.url,
            title: info.title,
        })
    }

    async fn arm(&mut self) -> Result<(), BackendError> {
        let client = self.client.as_ref().ok_or(BackendError::NotReady)?;
        set_capture(&client.page, true)
            .await
            .map_err(|e| BackendError::Probe(e.to_string()))?;
        self.armed = true;
        Ok(())
    }

    async fn disarm(&mut self) -> Result<(), BackendError> {
        self.armed = false;
        let client = self.client.as_ref().ok_or(BackendError::NotReady)?;
        set_capture(&client.page, false)
            .await
            .map_err(|e| BackendError::Probe(e.to_string()))?;
        Ok(())
    }

    async fn drain_events(&mut self) -> Result<Vec<PageEvent>, BackendError> {
        if !self.armed {
            return Ok(Vec::new());
        }
        let client = self.client.as_ref().ok_or(BackendError::NotReady)?;

        match drain_probe(&client.page).await {
            // A navigation replaced the page context; reinstall the probe
            // and pick events up again on the next tick.
            Ok(None) => {
                set_capture(&client.page, true)
                    .await
                    .map_err(|e| BackendError::Probe(e.to_string()))?;
                Ok(Vec::new())
            }
            Ok(Some(events)) => Ok(events),
            Err(e) => Err(BackendError::Probe(e.to_string())),
        }
    }

    async fn page_info(&mut self) -> Result<PageInfo, BackendError> {
        let client = self.client.as_ref().ok_or(BackendError::NotReady)?;
        Self::get_page_info(&client.page).await
    }
}
