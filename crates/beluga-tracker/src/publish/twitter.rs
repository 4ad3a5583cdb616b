//! Twitter (X) publisher using the v1.1 media upload and status endpoints.
//!
//! The v1.1 status endpoint is used because it is the one that accepts
//! post-level `lat`/`long` geotags.

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::oauth::OAuthSigner;
use super::{Post, PublishReceipt, Publisher};
use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::http::{check_status, join_url, HttpClient};

const SERVICE: &str = "Twitter";

#[derive(Debug, Deserialize)]
struct MediaUploadResponse {
    media_id_string: String,
}

/// Publishes posts to a Twitter account.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    http: HttpClient,
    api_base: String,
    upload_base: String,
    credentials: Credentials,
}

impl TwitterClient {
    /// Create a client. Credentials are only checked when publishing.
    #[must_use]
    pub fn new(
        http: HttpClient,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            upload_base: upload_base.into(),
            credentials,
        }
    }

    async fn upload_media(&self, signer: &OAuthSigner, path: &Path) -> Result<String> {
        let url = join_url(&self.upload_base, "media/upload.json");
        let image = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "map.png".to_string(), |n| n.to_string_lossy().into_owned());
        debug!(%url, bytes = image.len(), "uploading media");

        let part = Part::bytes(image)
            .file_name(file_name)
            .mime_str("image/png")?;
        let form = Form::new().part("media", part);

        let response = self
            .http
            .inner()
            .post(&url)
            .header(AUTHORIZATION, signer.authorization("POST", &url, &[])?)
            .multipart(form)
            .send()
            .await?;
        let body = check_status(SERVICE, response).await?.text().await?;
        let uploaded: MediaUploadResponse = serde_json::from_str(&body)
            .map_err(|e| Error::unexpected(SERVICE, format!("media upload: {e}")))?;
        Ok(uploaded.media_id_string)
    }

    async fn update_status(
        &self,
        signer: &OAuthSigner,
        post: &Post,
        media_id: &str,
    ) -> Result<PublishReceipt> {
        let url = join_url(&self.api_base, "statuses/update.json");
        let params = status_params(post, media_id);
        let borrowed: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        debug!(%url, media_id, "posting status");

        let response = self
            .http
            .inner()
            .post(&url)
            .header(AUTHORIZATION, signer.authorization("POST", &url, &borrowed)?)
            .form(&borrowed)
            .send()
            .await?;
        let body = check_status(SERVICE, response).await?.text().await?;
        let raw: Value = serde_json::from_str(&body)?;
        PublishReceipt::from_response(raw)
    }
}

/// Form parameters for the status update, geotag included.
#[must_use]
pub fn status_params(post: &Post, media_id: &str) -> Vec<(&'static str, String)> {
    vec![
        ("status", post.text.clone()),
        ("media_ids", media_id.to_string()),
        ("lat", post.position.latitude.to_string()),
        ("long", post.position.longitude.to_string()),
        ("display_coordinates", "true".to_string()),
    ]
}

#[async_trait]
impl Publisher for TwitterClient {
    async fn publish(&self, post: &Post) -> Result<PublishReceipt> {
        let signer = OAuthSigner::new(self.credentials.twitter()?);
        let media_id = self.upload_media(&signer, &post.media_path).await?;
        self.update_status(&signer, post, &media_id).await
    }
}

impl PublishReceipt {
    /// Build a receipt from a v1.1 status object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedResponse`] if the object has no `id_str`.
    pub fn from_response(raw: Value) -> Result<Self> {
        let id = raw
            .get("id_str")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::unexpected(SERVICE, "status response has no id_str"))?
            .to_string();
        let text = raw.get("text").and_then(Value::as_str).map(ToString::to_string);
        Ok(Self { id, text, raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_server;
    use crate::position::Position;
    use std::path::PathBuf;

    fn post() -> Post {
        Post {
            text: "BelugaXL GBWYB is on the move!".to_string(),
            media_path: PathBuf::from("/tmp/map.png"),
            position: Position::new(53.2, 8.5),
        }
    }

    #[test]
    fn test_status_params_include_geotag() {
        let params = status_params(&post(), "1234567890");

        assert!(params.contains(&("status", "BelugaXL GBWYB is on the move!".to_string())));
        assert!(params.contains(&("media_ids", "1234567890".to_string())));
        assert!(params.contains(&("lat", "53.2".to_string())));
        assert!(params.contains(&("long", "8.5".to_string())));
        assert!(params.contains(&("display_coordinates", "true".to_string())));
    }

    #[test]
    fn test_receipt_from_response() {
        let raw = serde_json::json!({
            "id_str": "1050118621198921728",
            "text": "BelugaXL GBWYB is on the move! https://t.co/abc",
            "coordinates": {"type": "Point", "coordinates": [8.5, 53.2]}
        });
        let receipt = PublishReceipt::from_response(raw).unwrap();

        assert_eq!(receipt.id, "1050118621198921728");
        assert!(receipt.text.unwrap().starts_with("BelugaXL"));
        assert!(receipt.raw.get("coordinates").is_some());
    }

    #[test]
    fn test_receipt_requires_id() {
        let result = PublishReceipt::from_response(serde_json::json!({"errors": []}));
        assert!(matches!(result, Err(Error::UnexpectedResponse { .. })));
    }

    #[test]
    fn test_media_upload_response() {
        let parsed: MediaUploadResponse = serde_json::from_str(
            r#"{"media_id": 710511363345354753, "media_id_string": "710511363345354753", "size": 11065}"#,
        )
        .unwrap();
        assert_eq!(parsed.media_id_string, "710511363345354753");
    }

    #[tokio::test]
    async fn test_publish_requires_credentials() {
        let client = TwitterClient::new(
            HttpClient::new(&crate::config::HttpConfig::default()).unwrap(),
            "http://127.0.0.1:9/1.1",
            "http://127.0.0.1:9/1.1",
            Credentials::default(),
        );
        let err = client.publish(&post()).await.unwrap_err();
        assert!(err.is_missing_credential());
    }

    #[tokio::test]
    async fn test_publish_uploads_then_posts_geotagged_status() {
        let media_path =
            std::env::temp_dir().join(format!("beluga_tracker_publish_{}.png", std::process::id()));
        std::fs::write(&media_path, b"\x89PNG\r\n\x1a\n").unwrap();

        let (upload_base, upload_request) = test_server::serve_once(
            200,
            "application/json",
            r#"{"media_id": 710511363345354753, "media_id_string": "710511363345354753"}"#,
        )
        .await;
        let (api_base, status_request) = test_server::serve_once(
            200,
            "application/json",
            r#"{"id_str": "1050118621198921728", "text": "BelugaXL GBWYB is on the move!"}"#,
        )
        .await;

        let credentials = Credentials {
            twitter_api_key: Some("xvz1evFS4wEEPTGEFPHBog".to_string()),
            twitter_api_key_secret: Some("kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".to_string()),
            twitter_access_token: Some(
                "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".to_string(),
            ),
            twitter_secret_access_token: Some(
                "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".to_string(),
            ),
            ..Credentials::default()
        };
        let client = TwitterClient::new(
            test_server::client(),
            format!("{api_base}/1.1"),
            format!("{upload_base}/1.1"),
            credentials,
        );
        let post = Post {
            media_path: media_path.clone(),
            ..post()
        };

        let receipt = client.publish(&post).await;
        std::fs::remove_file(&media_path).ok();
        let receipt = receipt.unwrap();
        assert_eq!(receipt.id, "1050118621198921728");

        let upload = upload_request.await.unwrap();
        assert!(upload.starts_with("POST /1.1/media/upload.json HTTP/1.1\r\n"));
        let upload = upload.to_ascii_lowercase();
        assert!(upload.contains("authorization: oauth "));
        assert!(upload.contains("name=\"media\""));
        assert!(upload.contains("content-type: image/png"));

        let status = status_request.await.unwrap();
        assert!(status.starts_with("POST /1.1/statuses/update.json HTTP/1.1\r\n"));
        assert!(status.contains("status=BelugaXL+GBWYB+is+on+the+move%21"));
        assert!(status.contains("media_ids=710511363345354753"));
        assert!(status.contains("lat=53.2&long=8.5&display_coordinates=true"));
        assert!(status
            .to_ascii_lowercase()
            .contains("authorization: oauth "));
    }
}
