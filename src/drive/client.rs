use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use super::{DriveApi, FilePage, MediaChunk, RemoteFileRef, RemoteMetadata};
use crate::{DriveScribeError, Result};

/// Default Drive v3 REST endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

const METADATA_FIELDS: &str = "name,mimeType,owners(displayName),modifiedTime";
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType)";
const LIST_PAGE_SIZE: &str = "1000";

/// Drive v3 REST client authenticated with a bearer token
pub struct DriveClient {
    client: Client,
    base_url: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    id: Option<String>,
    name: Option<String>,
    mime_type: Option<String>,
    modified_time: Option<String>,
    #[serde(default)]
    owners: Vec<Owner>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Owner {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<FileResource>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl DriveClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// Build a `files` endpoint URL, optionally scoped to a single file
    fn files_url(&self, id: Option<&str>) -> Result<Url> {
        let raw = match id {
            Some(id) => format!("{}/files/{}", self.base_url, id),
            None => format!("{}/files", self.base_url),
        };

        Url::parse(&raw).map_err(|e| DriveScribeError::remote(id.unwrap_or("files"), format!("invalid API URL {raw}: {e}")))
    }

    fn authorized(&self, url: Url) -> RequestBuilder {
        self.client.get(url).bearer_auth(&self.access_token)
    }

    async fn send(&self, id: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| DriveScribeError::remote(id, e))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);

        Err(DriveScribeError::remote(id, format!("HTTP {}: {}", status, reason.trim())))
    }
}

/// Parse the total size out of a `Content-Range` header (`bytes 0-99/1234`)
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/').and_then(|(_, total)| total.trim().parse().ok())
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn get_metadata(&self, id: &str) -> Result<RemoteMetadata> {
        let mut url = self.files_url(Some(id))?;
        url.query_pairs_mut()
            .append_pair("fields", METADATA_FIELDS)
            .append_pair("supportsAllDrives", "true");

        tracing::debug!(id, "fetching file metadata");

        let resource: FileResource = self
            .send(id, self.authorized(url))
            .await?
            .json()
            .await
            .map_err(|e| DriveScribeError::remote(id, format!("malformed metadata response: {e}")))?;

        Ok(RemoteMetadata {
            name: resource.name.unwrap_or_default(),
            mime_type: resource.mime_type.unwrap_or_default(),
            owner_display_name: resource
                .owners
                .into_iter()
                .find_map(|o| o.display_name)
                .unwrap_or_default(),
            modified_time: resource.modified_time.unwrap_or_default(),
        })
    }

    async fn get_media_range(&self, id: &str, offset: u64, len: u64) -> Result<MediaChunk> {
        let mut url = self.files_url(Some(id))?;
        url.query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("supportsAllDrives", "true");

        let last = offset + len.max(1) - 1;
        let request = self
            .authorized(url)
            .header(header::RANGE, format!("bytes={offset}-{last}"));

        let response = self.send(id, request).await?;
        let status = response.status();

        let content_range_total = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);

        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            // Empty files and reads past the end land here
            return Ok(MediaChunk {
                bytes: Vec::new(),
                total_size: Some(content_range_total.unwrap_or(offset)),
            });
        }

        let content_length = response.content_length();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DriveScribeError::remote(id, format!("content stream interrupted: {e}")))?
            .to_vec();

        let total_size = if status == StatusCode::PARTIAL_CONTENT {
            content_range_total
        } else {
            // The server ignored the range and sent everything
            Some(content_length.unwrap_or(bytes.len() as u64))
        };

        Ok(MediaChunk { bytes, total_size })
    }

    async fn list_children(&self, folder_id: &str, page_token: Option<String>) -> Result<FilePage> {
        let mut url = self.files_url(None)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("q", &format!("'{folder_id}' in parents and trashed = false"))
                .append_pair("fields", LIST_FIELDS)
                .append_pair("pageSize", LIST_PAGE_SIZE)
                .append_pair("supportsAllDrives", "true")
                .append_pair("includeItemsFromAllDrives", "true");
            if let Some(token) = page_token.as_deref() {
                query.append_pair("pageToken", token);
            }
        }

        tracing::debug!(folder = folder_id, paged = page_token.is_some(), "listing folder");

        let list: FileList = self
            .send(folder_id, self.authorized(url))
            .await?
            .json()
            .await
            .map_err(|e| DriveScribeError::remote(folder_id, format!("malformed listing response: {e}")))?;

        let files = list
            .files
            .into_iter()
            .filter_map(|f| {
                let id = f.id?;
                Some(RemoteFileRef {
                    name: f.name.unwrap_or_else(|| id.clone()),
                    mime_type: f.mime_type.unwrap_or_default(),
                    id,
                })
            })
            .collect();

        Ok(FilePage {
            files,
            next_page_token: list.next_page_token,
        })
    }
}
