use actix_multipart::{Multipart, MultipartError};
use futures::{StreamExt, TryStreamExt};

use crate::error::{PredictError, ValidationError};

pub const ALLOWED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];
pub const ALLOWED_MIME_PREFIX: &str = "image/";

/// Multipart field that carries the image.
pub const UPLOAD_FIELD: &str = "file";

const FALLBACK_FILENAME: &str = "uploaded-image";
const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// An image as received from the client, before and after validation.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub data: Vec<u8>,
    pub filename: String,
    pub content_type: Option<String>,
}

impl UploadedImage {
    pub fn new(data: Vec<u8>, filename: impl Into<String>, content_type: Option<String>) -> Self {
        Self {
            data,
            filename: filename.into(),
            content_type,
        }
    }

    /// Declared media type without parameters, lower-cased. Empty when absent.
    pub fn mime_type(&self) -> String {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// Filename sent to the remote service.
    pub fn upload_filename(&self) -> String {
        let filename = sanitize_filename(&self.filename);
        if filename.is_empty() {
            FALLBACK_FILENAME.to_string()
        } else {
            filename
        }
    }

    /// Media type sent to the remote service.
    pub fn upload_mime_type(&self) -> String {
        let mime = self.mime_type();
        if mime.is_empty() {
            FALLBACK_MIME_TYPE.to_string()
        } else {
            mime
        }
    }
}

/// Reduces a client-supplied filename to a safe ASCII name.
///
/// Non-ASCII characters are dropped, path separators and whitespace runs
/// become a single `_`, anything outside `[A-Za-z0-9_.-]` is removed and
/// leading/trailing dots and underscores are trimmed.
pub fn sanitize_filename(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

pub fn validate_image_upload(upload: Option<UploadedImage>) -> Result<UploadedImage, ValidationError> {
    let upload = upload.ok_or(ValidationError::NoFile)?;

    let filename = sanitize_filename(&upload.filename);
    if filename.is_empty() {
        return Err(ValidationError::EmptyFilename);
    }

    let extension = match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return Err(ValidationError::NoExtension),
    };
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ValidationError::UnsupportedType { extension });
    }

    let mime = upload.mime_type();
    if !mime.is_empty() && !mime.starts_with(ALLOWED_MIME_PREFIX) {
        return Err(ValidationError::InvalidMimeType { mime });
    }

    Ok(upload)
}

/// Errors the multipart reader raises when the request carries no multipart
/// body at all: no or wrong content type, or a body without a single part.
fn is_missing_body(err: &MultipartError) -> bool {
    matches!(
        err,
        MultipartError::ContentTypeMissing
            | MultipartError::ContentTypeParse
            | MultipartError::ContentTypeIncompatible
            | MultipartError::BoundaryMissing
            | MultipartError::Incomplete
    )
}

/// Pulls the `file` part out of a multipart body, enforcing the byte cap.
///
/// Only a part that carries a `filename` counts as the upload; a bare `file`
/// form value does not. Other parts are drained and ignored and a repeated
/// `file` part keeps the first. A request with no multipart body yields `None`.
pub async fn read_upload(
    mut payload: Multipart,
    max_bytes: usize,
) -> Result<Option<UploadedImage>, PredictError> {
    let limit_mb = (max_bytes / (1024 * 1024)) as u64;
    let mut upload = None;
    let mut parts_seen = 0usize;

    loop {
        let mut field = match payload.try_next().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if parts_seen == 0 && is_missing_body(&e) => {
                log::debug!("Request has no multipart upload: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(PredictError::Unexpected(e.to_string())),
        };
        parts_seen += 1;

        let (name, filename) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().map(str::to_string),
                cd.get_filename().map(str::to_string),
            ),
            None => (None, None),
        };
        let wanted = upload.is_none() && name.as_deref() == Some(UPLOAD_FIELD) && filename.is_some();
        let content_type = field.content_type().map(|m| m.to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| PredictError::Unexpected(e.to_string()))?;
            if !wanted {
                continue;
            }
            if data.len() + chunk.len() > max_bytes {
                return Err(ValidationError::TooLarge { limit_mb }.into());
            }
            data.extend_from_slice(&chunk);
        }

        if wanted {
            upload = Some(UploadedImage::new(data, filename.unwrap_or_default(), content_type));
        }
    }

    Ok(upload)
}
