//! The multipart form accepted by `POST /upload`.
//!
//! The file part is streamed to a temporary file while the request is being
//! read, so the handler only ever sees a finished spool on local disk.

use std::path::Path;

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::StatusCode;
use tempfile::{NamedTempFile, TempPath};
use tokio::io::AsyncWriteExt;

use crate::handler::{Error, ErrorKind};

/// Tracing target for form parsing.
const TRACING_TARGET: &str = "uptrack_server::extract::upload_form";

/// Multipart field carrying the file.
pub const FILE_FIELD: &str = "filename";

/// Optional multipart field carrying a caller-chosen token.
pub const TOKEN_FIELD: &str = "token";

/// An uploaded file spooled to local disk. The spool is removed on drop.
#[derive(Debug)]
pub struct SpooledFile {
    /// Final path component of the client-supplied name.
    pub file_name: String,
    pub path: TempPath,
    pub size: u64,
}

/// A parsed upload: the spooled file plus the token the caller asked for.
#[derive(Debug)]
pub struct UploadForm {
    pub file: SpooledFile,
    /// `None` when the field is absent or empty.
    pub token: Option<String>,
}

impl<S> FromRequest<S> for UploadForm
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(not_multipart)?;

        let mut file = None;
        let mut token = None;

        while let Some(field) = multipart.next_field().await.map_err(unreadable)? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some(FILE_FIELD) => file = Some(spool(field).await?),
                Some(TOKEN_FIELD) => token = Some(field.text().await.map_err(unreadable)?),
                other => {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        field = ?other,
                        "Ignoring unknown multipart field"
                    );
                }
            }
        }

        let file = file.ok_or_else(|| {
            Error::bad_request("Missing file field").with_resource(FILE_FIELD)
        })?;

        Ok(Self {
            file,
            token: token.filter(|t: &String| !t.is_empty()),
        })
    }
}

/// Reduces a client-supplied file name to its final path component.
fn sanitize_file_name(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next()?;
    let base = Path::new(base).file_name()?.to_str()?;
    (!base.is_empty()).then(|| base.to_owned())
}

async fn spool(mut field: Field<'_>) -> Result<SpooledFile, Error> {
    let file_name = field
        .file_name()
        .and_then(sanitize_file_name)
        .ok_or_else(|| {
            Error::bad_request("The file field must carry a file name").with_resource(FILE_FIELD)
        })?;

    let spool_failed = |e: std::io::Error| Error::internal().with_detail(format!("spool file: {e}"));

    let (file, path) = NamedTempFile::new().map_err(spool_failed)?.into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut size = 0_u64;
    while let Some(chunk) = field.chunk().await.map_err(unreadable)? {
        file.write_all(&chunk).await.map_err(spool_failed)?;
        size += chunk.len() as u64;
    }
    file.flush().await.map_err(spool_failed)?;

    Ok(SpooledFile {
        file_name,
        path,
        size,
    })
}

fn not_multipart(rejection: MultipartRejection) -> Error {
    Error::bad_request("Expected a multipart/form-data body").with_detail(rejection.body_text())
}

fn unreadable(error: MultipartError) -> Error {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return Error::new(ErrorKind::PayloadTooLarge)
            .with_resource(FILE_FIELD)
            .with_detail(error.body_text());
    }

    Error::bad_request("Failed to read multipart field").with_detail(error.body_text())
}
