//! Multipart form bodies.
//!
//! Only parts carrying a file name are kept; plain text fields of a
//! multipart body are skipped.

use std::convert::Infallible;

use axum::body::Bytes;
use axum::http::{header, request::Parts};
use futures_util::stream;

use crate::error::RouterError;

/// One uploaded file from a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field the file was sent under.
    pub name: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Whether the request declares a multipart body.
pub fn has_multipart_body(parts: &Parts) -> bool {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Split a buffered multipart body into its file parts, in body order.
pub async fn parse_files(parts: &Parts, body: Bytes) -> Result<Vec<FilePart>, RouterError> {
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| RouterError::Parse("missing multipart content type".to_string()))?;
    let boundary = multer::parse_boundary(content_type).map_err(parse_error)?;

    let body = stream::once(async move { Ok::<_, Infallible>(body) });
    let mut multipart = multer::Multipart::new(body, boundary);

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(parse_error)? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let name = field.name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(ToString::to_string);
        let data = field.bytes().await.map_err(parse_error)?;
        files.push(FilePart {
            name,
            file_name,
            content_type,
            data,
        });
    }
    Ok(files)
}

fn parse_error(err: multer::Error) -> RouterError {
    RouterError::Parse(format!("invalid multipart body: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    const BOUNDARY: &str = "X-BOUNDARY";

    fn parts() -> Parts {
        Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    fn body() -> Bytes {
        Bytes::from(format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"title\"\r\n\r\n\
             holiday\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"photo\"; filename=\"beach.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\n\
             JPEGDATA\r\n\
             --{b}--\r\n",
            b = BOUNDARY
        ))
    }

    #[tokio::test]
    async fn test_keeps_only_file_parts() {
        let files = parse_files(&parts(), body()).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "photo");
        assert_eq!(files[0].file_name, "beach.jpg");
        assert_eq!(files[0].content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(&files[0].data[..], b"JPEGDATA");
    }

    #[tokio::test]
    async fn test_truncated_body_is_parse_error() {
        let truncated = body().slice(..40);
        let err = parse_files(&parts(), truncated).await.unwrap_err();
        assert!(matches!(err, RouterError::Parse(_)));
    }

    #[tokio::test]
    async fn test_missing_boundary_is_parse_error() {
        let parts = Request::builder()
            .header(header::CONTENT_TYPE, "multipart/form-data")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let err = parse_files(&parts, body()).await.unwrap_err();
        assert!(matches!(err, RouterError::Parse(_)));
    }

    #[test]
    fn test_detects_multipart() {
        assert!(has_multipart_body(&parts()));
        let plain = Request::builder().body(()).unwrap().into_parts().0;
        assert!(!has_multipart_body(&plain));
    }
}
