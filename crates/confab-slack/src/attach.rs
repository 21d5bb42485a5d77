//! Image attachment handling for the reply pipeline.

use base64::Engine;
use tracing::warn;

use crate::client::SlackApi;
use crate::event::SlackFile;

/// An image ready to hand to a vision completion.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub mime_type: String,
    pub base64: String,
}

/// Outcome of trying to use a message's attachments.
#[derive(Debug, Clone)]
pub enum ImageOutcome {
    /// No attachment claims an image MIME type.
    NoImage,
    /// First image attachment, downloaded and encoded.
    Ready(EncodedImage),
    /// An image was claimed but could not be fetched or was oversized.
    Unavailable,
}

/// Pick the first `image/*` attachment and fetch it.
///
/// Only the first qualifying attachment counts, even when several are
/// present. Oversized files are skipped before spending the bandwidth.
pub async fn first_image<S: SlackApi + ?Sized>(
    slack: &S,
    files: &[SlackFile],
    max_bytes: u64,
) -> ImageOutcome {
    let Some(file) = files.iter().find(|f| f.mimetype.starts_with("image/")) else {
        return ImageOutcome::NoImage;
    };

    if file.size > max_bytes {
        warn!(size = file.size, limit = max_bytes, "image exceeds size limit");
        return ImageOutcome::Unavailable;
    }

    let bytes = match slack.download_file(&file.url_private).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(url = %file.url_private, error = %e, "image download failed");
            return ImageOutcome::Unavailable;
        }
    };
    if bytes.is_empty() {
        warn!(url = %file.url_private, "image download returned no bytes");
        return ImageOutcome::Unavailable;
    }

    ImageOutcome::Ready(EncodedImage {
        mime_type: file.mimetype.clone(),
        base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
    })
}
