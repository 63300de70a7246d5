//! Screenshot values and the image validity probe.
//!
//! A [`Screenshot`] carries the raw data string exactly as received from the
//! Puppet service, plus a local `loaded` flag. The flag starts undetermined
//! and is set at most once by a best-effort probe fired at construction; the
//! probe runs off to the side and never blocks protocol flow.
//!
//! Probe failures are information, not errors: an undecodable payload
//! resolves the flag to `false` and nothing propagates to the caller.

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;
use std::sync::{Arc, OnceLock};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use tracing::{debug, trace};

use crate::error::{Error, Result};

// ============================================================================
// Screenshot
// ============================================================================

/// A screenshot received from the Puppet service.
///
/// The wire payload is only the data string; `loaded` is client-side state
/// derived after unwrapping and is never transmitted.
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Raw image data (data URI, base64, or raw bytes as a string).
    data: String,

    /// Probe verdict slot. Set at most once, only by the probe task.
    loaded: Arc<OnceLock<bool>>,
}

impl Screenshot {
    /// Creates a screenshot and fires the validity probe.
    ///
    /// The probe is detached and best-effort: it needs an ambient tokio
    /// runtime, and without one the flag simply stays undetermined.
    #[must_use]
    pub fn new(data: impl Into<String>) -> Self {
        let data = data.into();
        let loaded: Arc<OnceLock<bool>> = Arc::new(OnceLock::new());

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let probe_data = data.clone();
            let slot = Arc::clone(&loaded);
            handle.spawn(async move {
                let verdict = probe_image(&probe_data).await;
                trace!(verdict, "Screenshot probe completed");
                let _ = slot.set(verdict);
            });
        } else {
            debug!("No tokio runtime, screenshot probe skipped");
        }

        Self { data, loaded }
    }

    /// Returns the raw data string as transmitted.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Returns the probe verdict, or `None` while it is still undetermined.
    #[inline]
    #[must_use]
    pub fn loaded(&self) -> Option<bool> {
        self.loaded.get().copied()
    }

    /// Decodes the payload to raw image bytes.
    ///
    /// Data URIs have their base64 body decoded; bare payloads are tried as
    /// base64 and otherwise passed through as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if a data URI body is not valid base64.
    pub fn as_bytes(&self) -> Result<Vec<u8>> {
        decode_image_bytes(&self.data)
    }

    /// Decodes the payload and writes the bytes to a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] on undecodable payloads and [`Error::Io`]
    /// if the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.as_bytes()?;
        std::fs::write(path.as_ref(), bytes).map_err(Error::Io)?;
        Ok(())
    }
}

// ============================================================================
// Probe
// ============================================================================

/// Checks whether `data` decodes as a displayable image.
///
/// Resolves `true` on a successful decode and `false` on every failure path:
/// malformed URI, invalid base64, undecodable pixels, or an aborted decode
/// worker. Decode buffers are transient and released on every exit path.
pub async fn probe_image(data: &str) -> bool {
    let bytes = match decode_image_bytes(data) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    // Pixel decoding is CPU-bound; keep it off the reactor.
    match tokio::task::spawn_blocking(move || image::load_from_memory(&bytes).is_ok()).await {
        Ok(verdict) => verdict,
        Err(_) => false,
    }
}

/// Extracts raw image bytes from a data URI, base64 string, or raw payload.
fn decode_image_bytes(data: &str) -> Result<Vec<u8>> {
    if let Some(rest) = data.strip_prefix("data:") {
        // data:<mime>;base64,<body>
        let Some((_meta, body)) = rest.split_once(',') else {
            return Err(Error::decode("data URI has no body"));
        };
        return Base64Standard
            .decode(body)
            .map_err(|e| Error::decode(format!("invalid base64 in data URI: {e}")));
    }

    // Bare payload: base64 if it decodes, raw bytes otherwise
    match Base64Standard.decode(data) {
        Ok(bytes) => Ok(bytes),
        Err(_) => Ok(data.as_bytes().to_vec()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;
    use std::time::Duration;

    /// Encodes a 1x1 PNG as a base64 data URI.
    fn tiny_png_data_uri() -> String {
        let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode png");
        format!("data:image/png;base64,{}", Base64Standard.encode(&bytes))
    }

    /// Waits for the probe verdict with a bounded number of polls.
    async fn await_verdict(screenshot: &Screenshot) -> Option<bool> {
        for _ in 0..100 {
            if let Some(verdict) = screenshot.loaded() {
                return Some(verdict);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }

    #[tokio::test]
    async fn test_probe_valid_png_resolves_true() {
        assert!(probe_image(&tiny_png_data_uri()).await);
    }

    #[tokio::test]
    async fn test_probe_undecodable_uri_resolves_false() {
        // Syntactically valid data URI whose body is not an image
        let uri = format!("data:image/png;base64,{}", Base64Standard.encode(b"nope"));
        assert!(!probe_image(&uri).await);
    }

    #[tokio::test]
    async fn test_probe_invalid_base64_resolves_false() {
        assert!(!probe_image("data:image/png;base64,!!!not-base64!!!").await);
    }

    #[tokio::test]
    async fn test_probe_garbage_resolves_false() {
        assert!(!probe_image("complete garbage, not an image at all").await);
    }

    #[tokio::test]
    async fn test_screenshot_flag_transitions_once_to_true() {
        let screenshot = Screenshot::new(tiny_png_data_uri());

        let verdict = await_verdict(&screenshot).await;
        assert_eq!(verdict, Some(true));

        // No further transitions
        assert_eq!(screenshot.loaded(), Some(true));
    }

    #[tokio::test]
    async fn test_screenshot_flag_transitions_to_false_on_bad_data() {
        let screenshot = Screenshot::new("data:image/jpeg;base64,AAAA");

        let verdict = await_verdict(&screenshot).await;
        assert_eq!(verdict, Some(false));
    }

    #[tokio::test]
    async fn test_screenshot_data_is_untouched() {
        let uri = tiny_png_data_uri();
        let screenshot = Screenshot::new(uri.clone());
        assert_eq!(screenshot.data(), uri);
    }

    #[tokio::test]
    async fn test_as_bytes_round_trip() {
        let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 0, 0, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode png");

        let uri = format!("data:image/png;base64,{}", Base64Standard.encode(&bytes));
        let screenshot = Screenshot::new(uri);

        assert_eq!(screenshot.as_bytes().expect("decode"), bytes);
    }

    #[tokio::test]
    async fn test_as_bytes_rejects_bad_data_uri_body() {
        let screenshot = Screenshot::new("data:image/png;base64,!!!not-base64!!!");
        assert!(matches!(screenshot.as_bytes(), Err(Error::Decode { .. })));
    }

    #[tokio::test]
    async fn test_save_writes_decoded_bytes() {
        let uri = tiny_png_data_uri();
        let screenshot = Screenshot::new(uri);

        let dir = std::env::temp_dir().join("puppet-client-probe-test");
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("tiny.png");

        screenshot.save(&path).expect("save");
        let written = std::fs::read(&path).expect("read back");
        assert_eq!(written, screenshot.as_bytes().expect("decode"));

        let _ = std::fs::remove_file(&path);
    }
}
