// ABOUTME: Client for the Street View Publish API plus the three-phase upload orchestrator
// ABOUTME: Session acquire, raw byte stream, publish, then a detached confirmation fetch

use crate::error::{ApiError, Result};
use crate::mask::derive_mask;
use crate::photo::{Photo, PhotosPage, UploadRef};
use bytes::Bytes;
use reqwest::header;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Raw upload protocol header required by the session endpoint
const UPLOAD_PROTOCOL_HEADER: &str = "X-Goog-Upload-Protocol";

/// Declared byte length of the raw upload
const UPLOAD_LENGTH_HEADER: &str = "X-Goog-Upload-Content-Length";

/// Photosphere uploads are always JPEG
const UPLOAD_CONTENT_TYPE: &str = "image/jpeg";

/// Client scoped to one bearer token. Cheap to clone; holds no per-request
/// state beyond the token itself.
#[derive(Clone)]
pub struct StreetViewClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl StreetViewClient {
    pub fn new(http: reqwest::Client, base_url: &str, token: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Acquire an upload session sized for `byte_len` bytes
    pub async fn start_upload(&self, byte_len: usize) -> Result<UploadRef> {
        let resp = self
            .http
            .post(format!("{}/v1/photo:startUpload", self.base_url))
            .bearer_auth(&self.token)
            .header(UPLOAD_LENGTH_HEADER, byte_len.to_string())
            .json(&json!({}))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "startUpload for {} bytes failed with status {}",
                byte_len,
                resp.status()
            )));
        }

        Ok(resp.json().await?)
    }

    /// Stream the raw image bytes to the upload session endpoint
    async fn stream_bytes(&self, session: &UploadRef, bytes: Bytes) -> Result<()> {
        let byte_len = bytes.len();
        let resp = self
            .http
            .post(&session.upload_url)
            .bearer_auth(&self.token)
            .header(header::CONTENT_TYPE, UPLOAD_CONTENT_TYPE)
            .header(UPLOAD_PROTOCOL_HEADER, "raw")
            .header(UPLOAD_LENGTH_HEADER, byte_len.to_string())
            .body(bytes)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "byte stream of {} bytes rejected with status {}",
                byte_len,
                resp.status()
            )));
        }

        Ok(())
    }

    /// Publish the uploaded bytes as a photosphere. The update mask is
    /// derived mechanically from the partial metadata object.
    pub async fn publish_photo(&self, session: &UploadRef, metadata: &Value) -> Result<Photo> {
        let mask = derive_mask(metadata);

        let mut body = metadata.clone();
        if let Some(obj) = body.as_object_mut() {
            obj.insert(
                "uploadReference".to_string(),
                json!({"uploadUrl": session.upload_url}),
            );
        }

        let resp = self
            .http
            .post(format!("{}/v1/photo", self.base_url))
            .bearer_auth(&self.token)
            .query(&[("updateMask", mask.join(","))])
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "publish failed with status {}",
                resp.status()
            )));
        }

        Ok(resp.json().await?)
    }

    /// Fetch a single photosphere by its remote identifier
    pub async fn get_photo(&self, id: &str) -> Result<Photo> {
        let resp = self
            .http
            .get(format!("{}/v1/photo/{}", self.base_url, id))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "getPhoto {} failed with status {}",
                id,
                resp.status()
            )));
        }

        Ok(resp.json().await?)
    }

    /// List all photospheres owned by the authenticated user, walking the
    /// remote pagination until exhausted
    pub async fn list_photos(&self) -> Result<Vec<Photo>> {
        let mut photos = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self
                .http
                .get(format!("{}/v1/photos", self.base_url))
                .bearer_auth(&self.token);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token)]);
            }

            let resp = req.send().await?;
            if !resp.status().is_success() {
                return Err(ApiError::Upstream(format!(
                    "listPhotos failed with status {}",
                    resp.status()
                )));
            }

            let page: PhotosPage = resp.json().await?;
            photos.extend(page.photos);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(photos)
    }

    /// Proxy-fetch a thumbnail image the remote API only serves with auth
    pub async fn fetch_thumbnail(&self, url: &str) -> Result<Bytes> {
        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;

        if !resp.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "thumbnail fetch failed with status {}",
                resp.status()
            )));
        }

        Ok(resp.bytes().await?)
    }

    /// Run the full upload pipeline: validate, acquire a session, stream the
    /// bytes, publish, then kick off a best-effort confirmation fetch that
    /// never affects the returned result.
    pub async fn upload(&self, bytes: Bytes, metadata: Value) -> Result<Photo> {
        if metadata.pointer("/pose/latLngPair").is_none() || metadata.get("captureTime").is_none()
        {
            return Err(ApiError::Validation(
                "Missing required fields: pose.latLngPair and captureTime".to_string(),
            ));
        }

        let session = self.start_upload(bytes.len()).await?;
        self.stream_bytes(&session, bytes).await?;
        let photo = self.publish_photo(&session, &metadata).await?;

        if let Some(id) = photo.photo_id.as_ref().map(|p| p.id.clone()) {
            info!("photo published: {}", id);

            // Fire and forget: diagnostic fetch of the freshly published
            // resource, errors swallowed
            let client = self.clone();
            tokio::spawn(async move {
                match client.get_photo(&id).await {
                    Ok(fetched) => info!(
                        "confirmation fetch for {}: share link {:?}",
                        id, fetched.share_link
                    ),
                    Err(e) => warn!("confirmation fetch for {} failed: {}", id, e),
                }
            });
        }

        Ok(photo)
    }
}
