use crate::domain::model::{DirectionsResponse, FeatureCollection, LngLat, QueryParameters};
use crate::domain::ports::{FeatureSource, RouteSource};
use crate::utils::error::{LayerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

pub const DEFAULT_HOST: &str = "https://api.mapbox.com";
pub const DEFAULT_TILESET: &str = "mapbox.mapbox-streets-v8";

/// Tilequery 與 Directions 兩個服務共用的 HTTP client。
/// access token 原樣帶在 query string，不做其他驗證。
#[derive(Debug, Clone)]
pub struct MapboxClient {
    client: Client,
    host: Url,
    tileset: String,
    access_token: String,
}

impl MapboxClient {
    pub fn new(host: &str, tileset: &str, access_token: &str) -> Result<Self> {
        Self::with_client(Client::new(), host, tileset, access_token)
    }

    pub fn with_client(client: Client, host: &str, tileset: &str, access_token: &str) -> Result<Self> {
        let mut host = Url::parse(host).map_err(|e| LayerError::InvalidConfigValueError {
            field: "service.host".to_string(),
            value: host.to_string(),
            reason: format!("Invalid URL format: {}", e),
        })?;

        // join 會取代最後一段 path，所以 host 一律以 '/' 結尾
        if !host.path().ends_with('/') {
            let path = format!("{}/", host.path());
            host.set_path(&path);
        }

        Ok(Self {
            client,
            host,
            tileset: tileset.to_string(),
            access_token: access_token.to_string(),
        })
    }

    pub fn tilequery_url(&self, query: &QueryParameters) -> Result<Url> {
        let center = query.center()?;
        let mut url = self.join(&format!(
            "v4/{}/tilequery/{}.json",
            self.tileset, center
        ))?;

        url.query_pairs_mut()
            .append_pair("radius", &query.radius.to_string())
            .append_pair("limit", &query.effective_limit().to_string())
            .append_pair("layers", &query.layers_csv())
            .append_pair("access_token", &self.access_token);

        Ok(url)
    }

    pub fn directions_url(&self, origin: LngLat, destination: LngLat) -> Result<Url> {
        let mut url = self.join(&format!(
            "directions/v5/mapbox/walking/{};{}",
            origin, destination
        ))?;

        url.query_pairs_mut()
            .append_pair("geometries", "geojson")
            .append_pair("access_token", &self.access_token);

        Ok(url)
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.host.join(path).map_err(|e| LayerError::ConfigError {
            message: format!("Cannot build request URL for '{}': {}", path, e),
        })
    }

    /// 單次請求，不重試；非 2xx 與格式錯誤的 JSON 都回傳錯誤
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let display_url = redact_token(&url);
        tracing::debug!("Making API request to: {}", display_url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if !status.is_success() {
            return Err(LayerError::HttpStatusError {
                url: display_url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl FeatureSource for MapboxClient {
    async fn query_features(&self, query: &QueryParameters) -> Result<FeatureCollection> {
        let url = self.tilequery_url(query)?;
        let collection: FeatureCollection = self.get_json(url).await?;

        for (i, feature) in collection.features.iter().enumerate() {
            tracing::debug!("feature {}: {}", i, feature.properties_json());
        }
        tracing::info!(
            "📍 Tile query returned {} features (limit {})",
            collection.features.len(),
            query.effective_limit()
        );

        Ok(collection)
    }
}

#[async_trait]
impl RouteSource for MapboxClient {
    async fn walking_routes(
        &self,
        origin: LngLat,
        destination: LngLat,
    ) -> Result<DirectionsResponse> {
        let url = self.directions_url(origin, destination)?;
        let response: DirectionsResponse = self.get_json(url).await?;
        tracing::debug!(
            "Directions returned {} routes for {} -> {}",
            response.routes.len(),
            origin,
            destination
        );
        Ok(response)
    }
}

fn redact_token(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if k == "access_token" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), value)
        })
        .collect();

    if !pairs.is_empty() {
        redacted.query_pairs_mut().clear().extend_pairs(pairs);
    }
    redacted.to_string()
}
