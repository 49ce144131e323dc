//! HTTP readiness probe for the API server under test

use async_trait::async_trait;
use std::time::Duration;
use url::Url;

use shared::{Stage, stage_debug};

use crate::error::BootstrapResult;
use crate::traits::ApiReadiness;

/// Issues a GET against a fixed URL; any response counts as ready
#[derive(Clone)]
pub struct HttpReadinessProbe {
    url: Url,
    client: reqwest::Client,
}

impl HttpReadinessProbe {
    pub fn new(url: Url, timeout: Duration) -> BootstrapResult<Self> {
        // No pooled connections: each probe may run on a different runtime
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self { url, client })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ApiReadiness for HttpReadinessProbe {
    async fn probe(&self) -> BootstrapResult<()> {
        let response = self.client.get(self.url.clone()).send().await?;
        // The status code is irrelevant: a redirect or 404 still proves the server is up
        stage_debug!(Stage::ApiReadiness, "{} answered with {}", self.url, response.status());
        Ok(())
    }
}
