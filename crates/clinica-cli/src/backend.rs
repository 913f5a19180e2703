//! Read-only client for the clinic backend.

use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use clinica_core::models::config::BackendConfig;
use clinica_core::models::reference::{Doctor, ObraSocial, ReferenceSnapshot, Study, Tarifa};

#[derive(Deserialize)]
struct DoctorsResponse {
    doctors: Vec<Doctor>,
}

#[derive(Deserialize)]
struct StudiesResponse {
    studies: Vec<Study>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObrasSocialesResponse {
    obras_sociales: Vec<ObraSocial>,
}

#[derive(Deserialize)]
struct TarifasResponse {
    tarifas: Vec<Tarifa>,
}

/// HTTP client for the reference collections.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: Url,
    http: reqwest::Client,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let base_url = config.endpoint()?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("clinica-cli/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { base_url, http })
    }

    /// Fetch all four collections.
    pub async fn snapshot(&self) -> anyhow::Result<ReferenceSnapshot> {
        let (doctors, studies, obras, tarifas) = tokio::try_join!(
            self.get::<DoctorsResponse>("doctors"),
            self.get::<StudiesResponse>("studies"),
            self.get::<ObrasSocialesResponse>("obras-sociales"),
            self.get::<TarifasResponse>("tarifas"),
        )?;

        let snapshot = ReferenceSnapshot {
            doctors: doctors.doctors,
            studies: studies.studies,
            obras_sociales: obras.obras_sociales,
            tarifas: tarifas.tarifas,
        };

        info!(
            "Fetched {} doctors, {} studies, {} obras sociales, {} tarifas from {}",
            snapshot.doctors.len(),
            snapshot.studies.len(),
            snapshot.obras_sociales.len(),
            snapshot.tarifas.len(),
            self.base_url
        );

        Ok(snapshot)
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid path {} for {}", path, self.base_url))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let url = self.url(path)?;
        debug!("GET {}", url);

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        Self::handle_response(url, response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        url: Url,
        response: reqwest::Response,
    ) -> anyhow::Result<T> {
        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .with_context(|| format!("invalid response body from {}", url))
        } else {
            let message = response.text().await.unwrap_or_default();
            anyhow::bail!("HTTP {} from {}: {}", status, url, message.trim())
        }
    }
}
