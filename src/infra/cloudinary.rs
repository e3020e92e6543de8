//! Cloudinary-backed [`AssetStore`].
//!
//! Deletion uses the signed `image/destroy` endpoint. The signature is the
//! hex SHA-256 of the sorted, `&`-joined parameters followed by the API
//! secret.

use async_trait::async_trait;
use reqwest::{Client, Url, header::CONTENT_TYPE};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::debug;
use url::form_urlencoded;

use crate::application::repos::{AssetStore, AssetStoreError};
use crate::config::{AssetCredentials, AssetSettings};
use crate::domain::assets::PublicId;

use super::error::InfraError;

const RESULT_OK: &str = "ok";

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: Option<String>,
    error: Option<DestroyError>,
}

#[derive(Debug, Deserialize)]
struct DestroyError {
    message: String,
}

#[derive(Clone)]
pub struct CloudinaryAssetStore {
    client: Client,
    destroy_url: Url,
    api_key: String,
    api_secret: String,
}

impl CloudinaryAssetStore {
    pub fn new(settings: &AssetSettings, credentials: &AssetCredentials) -> Result<Self, InfraError> {
        let destroy_url = Url::parse(&format!(
            "{}/{}/image/destroy",
            settings.api_base_url, credentials.cloud_name
        ))
        .map_err(|err| InfraError::configuration(format!("invalid asset api url: {err}")))?;

        let client = Client::builder()
            .user_agent(concat!("tierlist/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.delete_timeout)
            .build()
            .map_err(|err| InfraError::asset_client(err.to_string()))?;

        Ok(Self {
            client,
            destroy_url,
            api_key: credentials.api_key.clone(),
            api_secret: credentials.api_secret.clone(),
        })
    }

    pub fn destroy_url(&self) -> &Url {
        &self.destroy_url
    }

    fn sign(&self, public_id: &str, timestamp: i64) -> String {
        destroy_signature(public_id, timestamp, &self.api_secret)
    }

    fn destroy_body(&self, public_id: &PublicId, timestamp: i64) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("public_id", public_id.as_str())
            .append_pair("timestamp", &timestamp.to_string())
            .append_pair("api_key", &self.api_key)
            .append_pair("signature", &self.sign(public_id.as_str(), timestamp))
            .append_pair("signature_algorithm", "sha256")
            .finish()
    }
}

/// Signature over the parameters of a destroy call.
pub(crate) fn destroy_signature(public_id: &str, timestamp: i64, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("public_id={public_id}&timestamp={timestamp}").as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl AssetStore for CloudinaryAssetStore {
    async fn destroy(&self, public_id: &PublicId) -> Result<(), AssetStoreError> {
        let timestamp = OffsetDateTime::now_utc().unix_timestamp();
        let body = self.destroy_body(public_id, timestamp);

        let response = self
            .client
            .post(self.destroy_url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(AssetStoreError::transport)?;

        let status = response.status();
        let payload: DestroyResponse = response.json().await.map_err(|err| {
            AssetStoreError::transport(format!("unreadable response ({status}): {err}"))
        })?;

        if let Some(error) = payload.error {
            return Err(AssetStoreError::Rejected {
                public_id: public_id.to_string(),
                reason: error.message,
            });
        }

        match payload.result.as_deref() {
            Some(RESULT_OK) if status.is_success() => {
                debug!(public_id = %public_id, "asset destroyed");
                Ok(())
            }
            other => Err(AssetStoreError::Rejected {
                public_id: public_id.to_string(),
                reason: format!("status {status}, result {}", other.unwrap_or("missing")),
            }),
        }
    }
}
