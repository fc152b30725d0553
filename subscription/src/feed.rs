use async_trait::async_trait;
use base64::Engine as _;
use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use bytes::Bytes;
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

/// Standard alphabet with padding. Non-zero trailing bits are tolerated.
const FEED_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("feed request failed: {0}")]
    Request(reqwest::Error),
    #[error("feed request timed out")]
    Timeout,
    #[error("feed source responded with {0}")]
    Status(StatusCode),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Request(e)
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Where the raw, still encoded, feed comes from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Bytes, FetchError>;
}

/// Fetches the feed over HTTP on every call. Nothing is cached.
pub struct HttpFeedSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpFeedSource {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpFeedSource { client, url })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> Result<Bytes, FetchError> {
        let response = self.client.get(self.url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        Ok(response.bytes().await?)
    }
}

/// Decodes a base64 feed body into its newline-delimited text.
///
/// Line breaks inside the encoded payload are skipped, the same way a
/// streaming decoder would. Bytes that are not UTF-8 become U+FFFD.
pub fn decode_feed(raw: &[u8]) -> Result<String, DecodeError> {
    let payload: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| !matches!(b, b'\r' | b'\n'))
        .collect();

    let decoded = FEED_ENGINE.decode(payload)?;
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}
