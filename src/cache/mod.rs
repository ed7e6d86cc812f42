//! Skip detection for already transcribed files.
//!
//! A previous run leaves an `.srt` next to the video whose header records the
//! Drive owner and modification time. When both still match the live metadata
//! the download and transcription are skipped. This compares metadata, not
//! content, so it is an optimization rather than a guarantee.

use std::path::{Path, PathBuf};

use crate::drive::DriveApi;
use crate::output::{read_header, sibling_path, MODIFIED_KEY, OWNER_KEY};

/// Why prior output could not be reused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProceedReason {
    /// No sibling subtitle file exists
    NoSubtitle,
    /// The subtitle file has no usable provenance header
    NoHeader,
    /// Drive metadata could not be fetched
    MetadataUnavailable(String),
    /// Owner or modification time differs from the header
    Changed,
}

/// Outcome of a skip check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipDecision {
    /// Prior output is current
    Skip { subtitle_path: PathBuf },
    /// Work has to be done
    Proceed(ProceedReason),
}

impl SkipDecision {
    pub fn is_skip(&self) -> bool {
        matches!(self, SkipDecision::Skip { .. })
    }
}

/// Decide whether the video destined for `target_path` can be skipped
///
/// Never fails: every error path resolves to [`SkipDecision::Proceed`].
pub async fn should_skip(target_path: &Path, remote_id: &str, api: &dyn DriveApi) -> SkipDecision {
    let subtitle_path = sibling_path(target_path, "srt");
    if !subtitle_path.exists() {
        return SkipDecision::Proceed(ProceedReason::NoSubtitle);
    }

    let header = read_header(&subtitle_path);
    if !header.contains_key(OWNER_KEY) && !header.contains_key(MODIFIED_KEY) {
        tracing::debug!(path = %subtitle_path.display(), "subtitle has no provenance header");
        return SkipDecision::Proceed(ProceedReason::NoHeader);
    }

    // Blank values are omitted when the header is written, so absent means empty
    let stored_owner = header.get(OWNER_KEY).map(String::as_str).unwrap_or("");
    let stored_modified = header.get(MODIFIED_KEY).map(String::as_str).unwrap_or("");

    let meta = match api.get_metadata(remote_id).await {
        Ok(meta) => meta,
        Err(e) => {
            tracing::debug!(id = remote_id, "skip check failed, proceeding: {}", e);
            return SkipDecision::Proceed(ProceedReason::MetadataUnavailable(e.to_string()));
        }
    };

    if stored_owner == meta.owner_display_name.trim() && stored_modified == meta.modified_time.trim() {
        SkipDecision::Skip { subtitle_path }
    } else {
        tracing::debug!(
            id = remote_id,
            stored_modified = %stored_modified,
            remote_modified = %meta.modified_time,
            "remote file changed since last transcription"
        );
        SkipDecision::Proceed(ProceedReason::Changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::{MockDriveApi, RemoteMetadata};
    use crate::DriveScribeError;

    fn metadata(owner: &str, modified: &str) -> RemoteMetadata {
        RemoteMetadata {
            name: "talk.mp4".to_string(),
            mime_type: "video/mp4".to_string(),
            owner_display_name: owner.to_string(),
            modified_time: modified.to_string(),
        }
    }

    fn api_returning(meta: RemoteMetadata) -> MockDriveApi {
        let mut api = MockDriveApi::new();
        api.expect_get_metadata()
            .times(1)
            .returning(move |_| Ok(meta.clone()));
        api
    }

    fn write_srt(dir: &Path, content: &str) -> PathBuf {
        let target = dir.join("talk.mp4");
        std::fs::write(dir.join("talk.srt"), content).unwrap();
        target
    }

    const HEADER: &str = "# Owner: Jane Doe\n# Modified: 2025-01-16T08:06:53.000Z\n\n1\n";

    #[test]
    fn test_matching_header_skips() {
        let dir = tempfile::tempdir().unwrap();
        let target = write_srt(dir.path(), HEADER);
        let api = api_returning(metadata("Jane Doe", "2025-01-16T08:06:53.000Z"));

        let decision = tokio_test::block_on(should_skip(&target, "FILEID12345", &api));

        assert_eq!(
            decision,
            SkipDecision::Skip {
                subtitle_path: dir.path().join("talk.srt")
            }
        );
    }

    #[tokio::test]
    async fn test_owner_mismatch_proceeds() {
        let dir = tempfile::tempdir().unwrap();
        let target = write_srt(dir.path(), HEADER);
        let api = api_returning(metadata("John Roe", "2025-01-16T08:06:53.000Z"));

        let decision = should_skip(&target, "FILEID12345", &api).await;
        assert_eq!(decision, SkipDecision::Proceed(ProceedReason::Changed));
    }

    #[tokio::test]
    async fn test_modified_mismatch_proceeds() {
        let dir = tempfile::tempdir().unwrap();
        let target = write_srt(dir.path(), HEADER);
        let api = api_returning(metadata("Jane Doe", "2025-02-01T00:00:00.000Z"));

        let decision = should_skip(&target, "FILEID12345", &api).await;
        assert!(!decision.is_skip());
    }

    #[tokio::test]
    async fn test_missing_subtitle_never_calls_api() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = MockDriveApi::new();
        api.expect_get_metadata().times(0);

        let decision = should_skip(&dir.path().join("talk.mp4"), "FILEID12345", &api).await;
        assert_eq!(decision, SkipDecision::Proceed(ProceedReason::NoSubtitle));
    }

    #[tokio::test]
    async fn test_headerless_subtitle_proceeds() {
        let dir = tempfile::tempdir().unwrap();
        let target = write_srt(dir.path(), "1\n00:00:00,000 --> 00:00:01,000\nhi\n");
        let mut api = MockDriveApi::new();
        api.expect_get_metadata().times(0);

        let decision = should_skip(&target, "FILEID12345", &api).await;
        assert_eq!(decision, SkipDecision::Proceed(ProceedReason::NoHeader));
    }

    #[tokio::test]
    async fn test_ownerless_shared_drive_file_skips() {
        let dir = tempfile::tempdir().unwrap();
        let target = write_srt(dir.path(), "# Modified: 2025-01-16T08:06:53.000Z\n\n1\n");
        let api = api_returning(metadata("", "2025-01-16T08:06:53.000Z"));

        let decision = should_skip(&target, "FILEID12345", &api).await;
        assert!(decision.is_skip());
    }

    #[tokio::test]
    async fn test_metadata_failure_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let target = write_srt(dir.path(), HEADER);
        let mut api = MockDriveApi::new();
        api.expect_get_metadata()
            .returning(|id| Err(DriveScribeError::remote(id, "HTTP 403 Forbidden")));

        let decision = should_skip(&target, "FILEID12345", &api).await;
        assert!(matches!(
            decision,
            SkipDecision::Proceed(ProceedReason::MetadataUnavailable(_))
        ));
    }
}
