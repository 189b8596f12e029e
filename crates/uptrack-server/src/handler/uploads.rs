//! Upload and progress polling handlers.
//!
//! Uploads are spooled to a temporary file, then handed to the
//! [`UploadTracker`] which transfers them in the background while clients
//! poll `/uploads/progress/{token}`.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use uptrack_core::progress::{Progress, ProgressCache};
use uuid::Uuid;

use super::response::UploadTicket;
use crate::extract::{TokenPath, UploadForm};
use crate::handler::{Error, Result};
use crate::service::{ServiceState, TokenMinter, UploadTracker};

/// Tracing target for upload operations.
const TRACING_TARGET: &str = "uptrack_server::handler::uploads";

/// Accepts a multipart upload and transfers it to object storage in the background.
#[tracing::instrument(skip_all, fields(file_name = %form.file.file_name))]
async fn upload_file(
    State(minter): State<TokenMinter>,
    State(tracker): State<UploadTracker>,
    form: UploadForm,
) -> Result<(StatusCode, Json<UploadTicket>)> {
    let UploadForm { file, token } = form;

    let token = match token {
        Some(token) => token,
        None => minter.mint(&file.file_name)?,
    };

    let progress = tracker.progress().set_progress(&token, 0, file.size).await?;

    tracing::info!(
        target: TRACING_TARGET,
        token = %token,
        size = file.size,
        "Upload accepted"
    );

    tracker.spawn(token.clone(), file.path, file.file_name, file.size);

    Ok((StatusCode::ACCEPTED, Json(UploadTicket::new(token, progress))))
}

/// Issues a fresh token with an `IDLE` record.
#[tracing::instrument(skip_all)]
async fn start_upload(
    State(progress_cache): State<ProgressCache>,
) -> Result<(StatusCode, Json<UploadTicket>)> {
    let token = Uuid::new_v4().to_string();
    let progress = progress_cache.reserve(&token).await?;

    tracing::info!(target: TRACING_TARGET, token = %token, "Upload token issued");

    Ok((StatusCode::CREATED, Json(UploadTicket::new(token, progress))))
}

/// Returns the progress record of a token.
#[tracing::instrument(skip_all, fields(token = %token.as_str()))]
async fn get_progress(
    State(progress_cache): State<ProgressCache>,
    token: TokenPath,
) -> Result<Json<Progress>> {
    let Some(progress) = progress_cache.get_progress(&token).await? else {
        return Err(Error::not_found("No progress recorded for this token").with_resource("progress"));
    };

    tracing::debug!(
        target: TRACING_TARGET,
        status = %progress.status,
        current_position = progress.current_position,
        end_position = progress.end_position,
        "Progress polled"
    );

    Ok(Json(progress))
}

/// Returns a [`Router`] with all upload routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/upload", post(upload_file))
        .route("/uploads", post(start_upload))
        .route("/uploads/progress/{token}", get(get_progress))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum_test::TestServer;
    use axum_test::multipart::{MultipartForm, Part};
    use uptrack_core::progress::ProgressStatus;

    use super::*;
    use crate::extract::{FILE_FIELD, TOKEN_FIELD};
    use crate::handler::test::serve_routes;

    async fn wait_for_done(server: &TestServer, token: &str) -> Progress {
        let mut progress = Progress::idle();
        for _ in 0..100 {
            let response = server.get(&format!("/uploads/progress/{token}")).await;
            if response.status_code() == StatusCode::OK {
                progress = response.json::<Progress>();
                if progress.status == ProgressStatus::Done {
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        progress
    }

    fn file_form(file_name: &str, content: &[u8]) -> MultipartForm {
        MultipartForm::new().add_part(
            FILE_FIELD,
            Part::bytes(content.to_vec()).file_name(file_name),
        )
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() -> anyhow::Result<()> {
        let server = serve_routes(routes()).await?;

        let response = server.get("/uploads/progress/unknown-token").await;
        response.assert_status_not_found();
        Ok(())
    }

    #[tokio::test]
    async fn start_upload_reserves_idle_record() -> anyhow::Result<()> {
        let server = serve_routes(routes()).await?;

        let response = server.post("/uploads").await;
        response.assert_status(StatusCode::CREATED);
        let ticket = response.json::<UploadTicket>();
        assert_eq!(ticket.progress.status, ProgressStatus::Idle);

        let response = server
            .get(&format!("/uploads/progress/{}", ticket.token))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Progress>(), Progress::idle());
        Ok(())
    }

    #[tokio::test]
    async fn upload_with_token_reaches_done() -> anyhow::Result<()> {
        let server = serve_routes(routes()).await?;
        let content = vec![1_u8; 64 * 1024];

        let form = file_form("data.bin", &content).add_text(TOKEN_FIELD, "my-token");
        let response = server.post("/upload").multipart(form).await;
        response.assert_status(StatusCode::ACCEPTED);

        let ticket = response.json::<UploadTicket>();
        assert_eq!(ticket.token, "my-token");
        assert_eq!(ticket.progress, Progress::new(0, content.len() as u64));

        let progress = wait_for_done(&server, "my-token").await;
        assert_eq!(progress, Progress::new(content.len() as u64, content.len() as u64));
        Ok(())
    }

    #[tokio::test]
    async fn minted_tokens_are_stable_per_file_name() -> anyhow::Result<()> {
        let server = serve_routes(routes()).await?;

        let first = server
            .post("/upload")
            .multipart(file_form("dir/report.txt", b"hello"))
            .await
            .json::<UploadTicket>();
        let second = server
            .post("/upload")
            .multipart(file_form("report.txt", b"hello again"))
            .await
            .json::<UploadTicket>();
        let other = server
            .post("/upload")
            .multipart(file_form("notes.txt", b"hello"))
            .await
            .json::<UploadTicket>();

        assert_eq!(first.token, second.token);
        assert_ne!(first.token, other.token);
        Ok(())
    }

    #[tokio::test]
    async fn upload_without_file_is_rejected() -> anyhow::Result<()> {
        let server = serve_routes(routes()).await?;

        let form = MultipartForm::new().add_text(TOKEN_FIELD, "tok");
        let response = server.post("/upload").multipart(form).await;
        response.assert_status_bad_request();
        Ok(())
    }

    #[tokio::test]
    async fn token_with_delimiter_is_rejected() -> anyhow::Result<()> {
        let server = serve_routes(routes()).await?;

        let form = file_form("data.bin", b"abc").add_text(TOKEN_FIELD, "bad;token");
        let response = server.post("/upload").multipart(form).await;
        response.assert_status_bad_request();
        Ok(())
    }
}
