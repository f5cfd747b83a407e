// ABOUTME: Data model for photosphere resources as the Street View Publish API represents them
// ABOUTME: Wire format is camelCase JSON; all fields optional because responses are partial

use serde::{Deserialize, Serialize};

/// A published photosphere resource. Owned by the remote platform; this
/// service only ever references it, never caches it authoritatively.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    /// Remote identifier, assigned on publish
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_id: Option<PhotoId>,
    /// Upload session reference used to publish this photo
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_reference: Option<UploadRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pose: Option<Pose>,
    /// When the imagery was captured (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_time: Option<String>,
    /// When the imagery was uploaded (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<Connection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub places: Option<Vec<Place>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<String>,
}

/// Remote photo identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoId {
    pub id: String,
}

/// Single-use upload session issued by the remote API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRef {
    pub upload_url: String,
}

/// Position and orientation of a photosphere
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Pose {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat_lng_pair: Option<LatLng>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

/// Floor of a building the photosphere was taken on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub number: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Directed link from this photosphere to another
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub target: PhotoId,
}

/// Place association for a photosphere
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub place_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One page of the remote photo listing
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PhotosPage {
    #[serde(default)]
    pub photos: Vec<Photo>,
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_wire_names_are_camel_case() {
        let body = r#"{
            "photoId": {"id": "abc123"},
            "pose": {"latLngPair": {"latitude": 52.2, "longitude": 21.0}, "heading": 180.0},
            "captureTime": "2024-05-01T12:00:00Z",
            "thumbnailUrl": "https://example.test/thumb.jpg",
            "shareLink": "https://example.test/share"
        }"#;

        let photo: Photo = serde_json::from_str(body).unwrap();
        assert_eq!(photo.photo_id.as_ref().unwrap().id, "abc123");
        assert_eq!(
            photo.pose.as_ref().unwrap().lat_lng_pair.as_ref().unwrap().latitude,
            52.2
        );
        assert_eq!(photo.capture_time.as_deref(), Some("2024-05-01T12:00:00Z"));

        let out = serde_json::to_value(&photo).unwrap();
        assert!(out.get("photoId").is_some());
        assert!(out["pose"].get("latLngPair").is_some());
        // Unset optionals stay off the wire
        assert!(out.get("uploadReference").is_none());
    }

    #[test]
    fn test_photos_page_defaults() {
        let page: PhotosPage = serde_json::from_str("{}").unwrap();
        assert!(page.photos.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
