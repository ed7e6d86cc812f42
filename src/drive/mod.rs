use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod auth;
pub mod client;
pub mod ids;

pub use client::DriveClient;
pub use ids::{parse_file_id, parse_folder_id};

use crate::Result;

/// MIME type Drive uses for natively stored videos
pub const DRIVE_VIDEO_MIME: &str = "application/vnd.google-apps.video";

/// A remote video resource as listed or resolved from Drive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileRef {
    /// Drive resource ID
    pub id: String,

    /// Display name of the file
    pub name: String,

    /// MIME type reported by Drive
    pub mime_type: String,
}

/// File metadata used for provenance headers and change detection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMetadata {
    pub name: String,
    pub mime_type: String,

    /// Display name of the first owner (empty for shared-drive files)
    pub owner_display_name: String,

    /// RFC 3339 modification time, exactly as Drive reports it
    pub modified_time: String,
}

/// One ranged piece of file content
#[derive(Debug, Clone, Default)]
pub struct MediaChunk {
    pub bytes: Vec<u8>,

    /// Full size of the resource, when the server reports it
    pub total_size: Option<u64>,
}

/// One page of a child listing
#[derive(Debug, Clone, Default)]
pub struct FilePage {
    pub files: Vec<RemoteFileRef>,
    pub next_page_token: Option<String>,
}

/// Remote operations the downloader and orchestrator rely on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Fetch metadata for a file by ID
    async fn get_metadata(&self, id: &str) -> Result<RemoteMetadata>;

    /// Fetch `len` bytes of file content starting at `offset`
    async fn get_media_range(&self, id: &str, offset: u64, len: u64) -> Result<MediaChunk>;

    /// List one page of non-trashed children of a folder, shared drives included
    async fn list_children(&self, folder_id: &str, page_token: Option<String>) -> Result<FilePage>;
}

/// Check whether a MIME type describes a video
pub fn is_video_mime(mime: &str) -> bool {
    mime.starts_with("video/") || mime == DRIVE_VIDEO_MIME
}

/// Resolve a file's display name and MIME type
pub async fn resolve_name(api: &dyn DriveApi, id: &str) -> Result<RemoteFileRef> {
    let meta = api.get_metadata(id).await?;

    let name = if meta.name.is_empty() {
        id.to_string()
    } else {
        meta.name
    };

    Ok(RemoteFileRef {
        id: id.to_string(),
        name,
        mime_type: meta.mime_type,
    })
}

/// List every video inside a folder, following pagination to the end
pub async fn list_videos(api: &dyn DriveApi, folder_id: &str) -> Result<Vec<RemoteFileRef>> {
    let mut videos = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = api.list_children(folder_id, page_token.take()).await?;
        pages += 1;

        videos.extend(page.files.into_iter().filter(|f| is_video_mime(&f.mime_type)));

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    tracing::debug!(folder = folder_id, pages, videos = videos.len(), "folder listing complete");

    Ok(videos)
}
