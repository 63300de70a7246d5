//! Outbound capture request types.
//!
//! A capture request asks the Puppet service to render a page off-device and
//! stream back trackers and a screenshot. Requests are serialize-only: the
//! service never echoes them back.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// ImageFormat
// ============================================================================

/// Image format for the requested screenshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// PNG format (lossless, larger file size).
    #[default]
    Png,
    /// JPEG format with quality (0-100).
    Jpeg(u8),
}

impl ImageFormat {
    /// Creates PNG format.
    #[inline]
    #[must_use]
    pub fn png() -> Self {
        Self::Png
    }

    /// Creates JPEG format with quality (0-100).
    #[inline]
    #[must_use]
    pub fn jpeg(quality: u8) -> Self {
        Self::Jpeg(quality.min(100))
    }

    /// Returns the MIME type for this format.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg(_) => "image/jpeg",
        }
    }

    /// Returns the format string for the wire protocol.
    #[must_use]
    pub fn format_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg(_) => "jpeg",
        }
    }

    /// Returns the encoding quality (0-100).
    ///
    /// PNG is lossless, so its quality is always 100.
    #[must_use]
    pub fn quality(&self) -> u8 {
        match self {
            Self::Png => 100,
            Self::Jpeg(q) => (*q).min(100),
        }
    }
}

// ============================================================================
// CaptureRequest
// ============================================================================

/// A render-and-capture request sent to the Puppet service.
///
/// All fields are required; there is no server-side defaulting. The value is
/// immutable once constructed.
///
/// # Format
///
/// ```json
/// {
///   "url": "https://example.com",
///   "imageType": "jpeg",
///   "imageQuality": 80,
///   "width": 1280,
///   "height": 800,
///   "waitForEvent": "networkidle0"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureRequest {
    /// Target page URL.
    pub url: String,

    /// Screenshot format (`png` or `jpeg`).
    #[serde(rename = "imageType")]
    pub image_type: String,

    /// Encoding quality (0-100).
    #[serde(rename = "imageQuality")]
    pub image_quality: u8,

    /// Viewport width in pixels.
    pub width: u32,

    /// Viewport height in pixels.
    pub height: u32,

    /// Named signal the renderer waits for before capturing
    /// (e.g. `networkidle0`).
    #[serde(rename = "waitForEvent")]
    pub wait_for_event: String,
}

impl CaptureRequest {
    /// Creates a capture request for the given page and viewport.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        format: ImageFormat,
        width: u32,
        height: u32,
        wait_for_event: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            image_type: format.format_str().to_string(),
            image_quality: format.quality(),
            width,
            height,
            wait_for_event: wait_for_event.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
