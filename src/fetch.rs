//! Audio fetching over HTTP.
//!
//! Podcast enclosure URLs are almost always a chain of tracking
//! redirects in front of a CDN, so redirects are followed manually with
//! a hop cap instead of relying on the client's default policy.

use crate::config::FetchSettings;
use crate::error::{OrdrettError, Result};
use futures::StreamExt;
use reqwest::header::{ACCEPT, LOCATION, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::{Client, Url};
use tracing::{debug, info, instrument};

/// Smallest body accepted as real audio.
const MIN_PAYLOAD_BYTES: u64 = 1024;

/// Progress callback granularity.
const PROGRESS_STEP_BYTES: u64 = 5 * 1024 * 1024;

/// Browser-like User-Agent; several podcast CDNs reject generic
/// library agents.
const FETCH_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Build the HTTP client used for audio fetching.
///
/// Redirects are disabled at the client level; `fetch_audio` follows
/// them itself so the hop count and relative `Location` handling are
/// under our control.
pub fn build_client(settings: &FetchSettings) -> Result<Client> {
    Client::builder()
        .redirect(Policy::none())
        .timeout(settings.timeout())
        .build()
        .map_err(OrdrettError::Http)
}

/// Download audio bytes from a URL, following up to `max_redirects`
/// redirect hops (5 by default).
///
/// `progress` is invoked with the running byte count roughly every
/// 5 MiB so callers can surface download progress.
#[instrument(skip(client, progress), fields(url = %url))]
pub async fn fetch_audio(
    client: &Client,
    url: &str,
    max_redirects: u32,
    progress: &(dyn Fn(u64) + Send + Sync),
) -> Result<Vec<u8>> {
    let mut current = Url::parse(url)
        .map_err(|e| OrdrettError::InvalidInput(format!("Invalid URL {}: {}", url, e)))?;

    for hop in 0..=max_redirects {
        debug!(hop, url = %current, "Requesting audio");

        let response = client
            .get(current.clone())
            .header(USER_AGENT, FETCH_USER_AGENT)
            .header(ACCEPT, "audio/*, */*")
            .send()
            .await
            .map_err(|e| OrdrettError::FetchFailed(format!("{}: {}", current, e)))?;

        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    OrdrettError::FetchFailed(format!(
                        "Redirect from {} without a Location header",
                        current
                    ))
                })?;

            // Location may be relative; resolve against the current URL.
            current = current.join(location).map_err(|e| {
                OrdrettError::FetchFailed(format!("Invalid redirect target {}: {}", location, e))
            })?;

            if hop == max_redirects {
                return Err(OrdrettError::TooManyRedirects(max_redirects));
            }
            continue;
        }

        if !status.is_success() {
            return Err(OrdrettError::FetchStatus(status.as_u16()));
        }

        return read_body(response, progress).await;
    }

    Err(OrdrettError::TooManyRedirects(max_redirects))
}

/// Stream the response body into memory, emitting progress callbacks.
async fn read_body(
    response: reqwest::Response,
    progress: &(dyn Fn(u64) + Send + Sync),
) -> Result<Vec<u8>> {
    let expected = response.content_length();
    let mut bytes: Vec<u8> = match expected {
        Some(len) => Vec::with_capacity(len.min(256 * 1024 * 1024) as usize),
        None => Vec::new(),
    };
    let mut next_report = PROGRESS_STEP_BYTES;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| OrdrettError::FetchFailed(format!("read failed: {}", e)))?;
        bytes.extend_from_slice(&chunk);

        if bytes.len() as u64 >= next_report {
            progress(bytes.len() as u64);
            next_report += PROGRESS_STEP_BYTES;
        }
    }

    let total = bytes.len() as u64;
    if total < MIN_PAYLOAD_BYTES {
        return Err(OrdrettError::InvalidPayload(total));
    }

    info!(bytes = total, "Audio download complete");
    Ok(bytes)
}

/// Guess a file extension from the URL path, defaulting to mp3.
pub fn extension_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path()
                .rsplit('/')
                .next()
                .and_then(|name| name.rsplit_once('.'))
                .map(|(_, ext)| ext.to_lowercase())
        })
        .filter(|ext| crate::validate::is_accepted_extension(ext))
        .unwrap_or_else(|| "mp3".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_url() {
        assert_eq!(
            extension_from_url("https://cdn.example.com/ep/42/audio.m4a?ts=1"),
            "m4a"
        );
        assert_eq!(
            extension_from_url("https://cdn.example.com/stream"),
            "mp3"
        );
        // Unknown extensions fall back to mp3.
        assert_eq!(
            extension_from_url("https://cdn.example.com/file.aiff"),
            "mp3"
        );
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_url() {
        let client = build_client(&FetchSettings::default()).unwrap();
        let err = fetch_audio(&client, "not a url", 5, &|_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, OrdrettError::InvalidInput(_)));
    }
}
