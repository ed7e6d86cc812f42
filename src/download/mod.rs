use std::io::Write;
use std::path::Path;

use crate::drive::DriveApi;
use crate::Result;

/// Default bytes requested per ranged fetch (100 MiB)
pub const DEFAULT_CHUNK_SIZE: u64 = 100 * 1024 * 1024;

/// Compute a percentage that never exceeds 100 and never moves backwards
fn percent_complete(downloaded: u64, total: u64, previous: u8) -> u8 {
    let pct = if total == 0 {
        100
    } else {
        (downloaded.saturating_mul(100) / total).min(100) as u8
    };
    pct.max(previous)
}

/// Download a Drive file to `dest_path` in bounded chunks
///
/// `on_progress` receives the percentage complete, the bytes written and the
/// total size after every chunk. While the server withholds the total the
/// percentage stays put and the download ends on a short or empty chunk. The
/// destination is truncated up front; a failed chunk leaves the partial file
/// in place and returns the error as-is.
pub async fn download<F>(
    api: &dyn DriveApi,
    id: &str,
    dest_path: &Path,
    chunk_size: u64,
    mut on_progress: F,
) -> Result<u64>
where
    F: FnMut(u8, u64, Option<u64>),
{
    let chunk_size = chunk_size.max(1);
    let mut file = fs_err::File::create(dest_path)?;
    let mut downloaded = 0u64;
    let mut last_pct = 0u8;

    tracing::debug!(id, path = %dest_path.display(), chunk_size, "starting chunked download");

    loop {
        let chunk = api.get_media_range(id, downloaded, chunk_size).await?;
        let received = chunk.bytes.len() as u64;

        file.write_all(&chunk.bytes)?;
        downloaded += received;

        let finished = match chunk.total_size {
            Some(total) => {
                last_pct = percent_complete(downloaded, total, last_pct);
                received == 0 || downloaded >= total
            }
            None => received < chunk_size,
        };
        on_progress(last_pct, downloaded, chunk.total_size);

        if finished {
            break;
        }
    }

    if last_pct < 100 {
        on_progress(100, downloaded, Some(downloaded));
    }

    file.flush()?;

    tracing::info!(
        id,
        path = %dest_path.display(),
        size = %crate::utils::format_file_size(downloaded),
        "download complete"
    );

    Ok(downloaded)
}
