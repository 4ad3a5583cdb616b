//! Publishing of sightings to a social-media account.
//!
//! A [`Post`] carries the composed [`StatusMessage`] text, the path of the
//! rendered map and the position used as the post's geotag.

pub mod oauth;
pub mod status;
pub mod twitter;

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

use crate::error::Result;
use crate::position::Position;

pub use status::StatusMessage;
pub use twitter::TwitterClient;

/// Everything needed to publish one sighting.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    /// Status text.
    pub text: String,
    /// Image attached to the post.
    pub media_path: PathBuf,
    /// Post-level geotag.
    pub position: Position,
}

/// What the provider returned for a published post.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishReceipt {
    /// Provider id of the new post.
    pub id: String,
    /// Text as stored by the provider, which may differ (shortened links).
    pub text: Option<String>,
    /// The full provider response.
    pub raw: Value,
}

/// A social-media account that accepts posts.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a post with its image and geotag.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing, authentication fails or
    /// the provider rejects the post.
    async fn publish(&self, post: &Post) -> Result<PublishReceipt>;
}

/// Publish `post` once, logging the provider's answer either way.
///
/// # Errors
///
/// Propagates the publisher's error after logging it.
pub async fn publish(publisher: &dyn Publisher, post: &Post) -> Result<PublishReceipt> {
    match publisher.publish(post).await {
        Ok(receipt) => {
            info!(id = %receipt.id, response = %receipt.raw, "provider accepted post");
            info!(content = %post.text, "post content");
            Ok(receipt)
        }
        Err(e) => {
            error!(error = %e, "publishing failed");
            Err(e)
        }
    }
}
