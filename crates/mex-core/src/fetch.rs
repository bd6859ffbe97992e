//! Single media fetch: HTTP GET via curl, streamed into a part file.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;

use crate::control::CancelFlag;
use crate::storage::PartFile;

/// Bytes captured from the start of the body for magic-byte sniffing.
pub const SNIFF_PREFIX_LEN: usize = 16;

const USER_AGENT: &str = concat!("mex/", env!("CARGO_PKG_VERSION"));

/// Error from one fetch attempt. Classified by `retry::classify` so the
/// executor can decide on backoff before converting to an outcome.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error(transparent)]
    Curl(#[from] curl::Error),
    /// Final response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Disk write failed (e.g. disk full, permission denied). Not retried.
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
    /// A stop request was observed mid-transfer.
    #[error("cancelled")]
    Cancelled,
}

/// What a successful fetch produced, beyond the part file contents.
#[derive(Debug)]
pub struct FetchResult {
    pub bytes_written: u64,
    /// Content-Type of the final response, if the server sent one.
    pub content_type: Option<String>,
    /// Leading body bytes for magic sniffing.
    pub prefix: Vec<u8>,
}

/// GET `url` and stream the body into `part`. Follows redirects; a non-2xx
/// final status is an error. The cancellation flag is checked in the write
/// callback, so a stop aborts the transfer within one buffer.
pub fn fetch_to_part(
    url: &str,
    part: &PartFile,
    cancel: &CancelFlag,
) -> Result<FetchResult, FetchError> {
    let bytes_written = Arc::new(AtomicU64::new(0));
    let bytes_written_in_cb = Arc::clone(&bytes_written);
    let prefix: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::with_capacity(SNIFF_PREFIX_LEN)));
    let prefix_in_cb = Arc::clone(&prefix);
    let storage_error: Arc<Mutex<Option<std::io::Error>>> = Arc::new(Mutex::new(None));
    let storage_error_cb = Arc::clone(&storage_error);
    let part = part.clone();
    let cancel_in_cb = cancel.clone();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.useragent(USER_AGENT)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    // Abort if throughput drops below 1 KiB/s for 30s; media items are small
    // enough that ten minutes of wall clock also bounds a stuck transfer.
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(Duration::from_secs(30))?;
    easy.timeout(Duration::from_secs(600))?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(move |data| {
            if cancel_in_cb.is_stopped() {
                return Ok(0);
            }
            let off = bytes_written_in_cb.fetch_add(data.len() as u64, Ordering::Relaxed);
            {
                let mut p = prefix_in_cb.lock().unwrap();
                if p.len() < SNIFF_PREFIX_LEN {
                    let take = (SNIFF_PREFIX_LEN - p.len()).min(data.len());
                    p.extend_from_slice(&data[..take]);
                }
            }
            match part.write_at(off, data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    let _ = storage_error_cb.lock().unwrap().replace(e);
                    Ok(0)
                }
            }
        })?;
        let perform_result = transfer.perform();
        if let Err(e) = perform_result {
            if e.is_write_error() {
                if cancel.is_stopped() {
                    return Err(FetchError::Cancelled);
                }
                if let Some(io_err) = storage_error.lock().unwrap().take() {
                    return Err(FetchError::Storage(io_err));
                }
            }
            return Err(FetchError::Curl(e));
        }
    }

    let code = easy.response_code()?;
    if code < 200 || code >= 300 {
        return Err(FetchError::Http(code));
    }

    let content_type = easy.content_type()?.map(|s| s.to_string());
    let prefix = std::mem::take(&mut *prefix.lock().unwrap());
    Ok(FetchResult {
        bytes_written: bytes_written.load(Ordering::Relaxed),
        content_type,
        prefix,
    })
}
