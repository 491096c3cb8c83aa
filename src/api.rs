use crate::config::GeocodeConfig;
use crate::models::{AddressRecord, NominatimResponse};
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geocoder returned status {0}")]
    Status(StatusCode),
    #[error("no address found: {0}")]
    NoResult(String),
    #[error("could not decode geocoder response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Coordinates in, structured address out.
pub trait ReverseGeocoder {
    fn resolve_address(
        &self,
        lat: f64,
        lon: f64,
    ) -> impl Future<Output = Result<AddressRecord, LookupError>> + Send;
}

pub struct NominatimClient {
    client: Client,
    endpoint: String,
}

impl NominatimClient {
    pub fn new(config: &GeocodeConfig) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

impl ReverseGeocoder for NominatimClient {
    fn resolve_address(
        &self,
        lat: f64,
        lon: f64,
    ) -> impl Future<Output = Result<AddressRecord, LookupError>> + Send {
        let url = format!(
            "{}/reverse?format=jsonv2&lat={}&lon={}&zoom=18&addressdetails=1",
            self.endpoint, lat, lon
        );
        async move {
            let res = self.client.get(url).send().await?;
            let status = res.status();
            if !status.is_success() {
                return Err(LookupError::Status(status));
            }
            let body = res.text().await?;
            parse_reverse_response(&body)
        }
    }
}

/// Nominatim answers an unresolvable point with HTTP 200 and `{"error": ..}`.
pub fn parse_reverse_response(body: &str) -> Result<AddressRecord, LookupError> {
    let res: NominatimResponse = serde_json::from_str(body)?;
    if let Some(err) = res.error {
        return Err(LookupError::NoResult(err));
    }
    Ok(AddressRecord::from(res))
}
