use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest_middleware::Error),
    #[error("bad response: {0}")]
    Response(#[from] reqwest::Error),
    #[error("{url} answered with {status}")]
    Status { url: String, status: StatusCode },
}

/// Where announcement pages come from.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;

    /// Whether several uncached fetches may run at once without corrupting
    /// shared state.
    fn supports_concurrent_fetches(&self) -> bool {
        false
    }
}

pub struct HttpSource {
    client: ClientWithMiddleware,
}

impl HttpSource {
    pub fn new(max_retries: u32) -> Self {
        let client = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(
                ExponentialBackoff::builder().build_with_max_retries(max_retries),
            ))
            .build();

        Self { client }
    }
}

#[async_trait]
impl PageSource for HttpSource {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        info!("Fetching page");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        Ok(response.text().await?)
    }

    fn supports_concurrent_fetches(&self) -> bool {
        true
    }
}
