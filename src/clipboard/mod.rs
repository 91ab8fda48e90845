use gtk4::gdk;
use gtk4::gdk::prelude::*;
use gtk4::glib;
use thiserror::Error;

pub(crate) const MIME_TEXT_URI_LIST: &str = "text/uri-list";
const MIME_TEXT_PLAIN: &str = "text/plain";
const MIME_TEXT_PLAIN_UTF8: &str = "text/plain;charset=utf-8";
pub(crate) const MIME_IMAGE_PNG: &str = "image/png";

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("failed to access default display for clipboard operations")]
    DisplayUnavailable,
    #[error("failed to set clipboard content: {source}")]
    SetContent {
        #[source]
        source: glib::BoolError,
    },
}

pub type ClipboardResult<T> = std::result::Result<T, ClipboardError>;

pub trait ClipboardBackend {
    fn set_text(&self, text: &str) -> ClipboardResult<()>;
    fn set_png(&self, png: &[u8]) -> ClipboardResult<()>;
}

/// Clipboard of the default GDK display. Content stays available while the
/// primary instance runs.
#[derive(Debug, Default)]
pub struct GdkClipboard;

impl GdkClipboard {
    fn clipboard() -> ClipboardResult<gdk::Clipboard> {
        let display = gdk::Display::default().ok_or(ClipboardError::DisplayUnavailable)?;
        Ok(display.clipboard())
    }
}

pub(crate) fn bytes_provider(mime_type: &str, bytes: &[u8]) -> gdk::ContentProvider {
    gdk::ContentProvider::for_bytes(mime_type, &glib::Bytes::from(bytes))
}

impl ClipboardBackend for GdkClipboard {
    fn set_text(&self, text: &str) -> ClipboardResult<()> {
        let clipboard = Self::clipboard()?;
        let provider = gdk::ContentProvider::new_union(&[
            bytes_provider(MIME_TEXT_PLAIN_UTF8, text.as_bytes()),
            bytes_provider(MIME_TEXT_PLAIN, text.as_bytes()),
        ]);
        clipboard
            .set_content(Some(&provider))
            .map_err(|source| ClipboardError::SetContent { source })?;
        tracing::debug!(len = text.len(), "placed text on clipboard");
        Ok(())
    }

    fn set_png(&self, png: &[u8]) -> ClipboardResult<()> {
        let clipboard = Self::clipboard()?;
        let provider = bytes_provider(MIME_IMAGE_PNG, png);
        clipboard
            .set_content(Some(&provider))
            .map_err(|source| ClipboardError::SetContent { source })?;
        tracing::debug!(bytes = png.len(), "placed png on clipboard");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_error_mentions_display() {
        let err = ClipboardError::DisplayUnavailable;
        assert!(format!("{err}").contains("display"));
    }
}
