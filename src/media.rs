use std::io;

use actix_multipart::{Multipart, MultipartError};
use actix_web::{get, post, web, HttpResponse};
use bytesize::ByteSize;
use futures_util::TryStreamExt as _;
use log::debug;
use tempfile::NamedTempFile;
use tokio::{fs::File, io::AsyncWriteExt};

use crate::{auth::Identity, error::ApiError, model::NewUpload, uploads::UploadService, util};

/// Largest file accepted by the upload endpoint.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub ByteSize);

fn bad_multipart(err: MultipartError) -> ApiError {
    debug!("unreadable multipart body: {err}");
    ApiError::BadRequest("unable to parse form".into())
}

fn spool_failed(err: io::Error) -> ApiError {
    ApiError::Internal(format!("failed to spool upload: {err}"))
}

/// Streams the `file` field of a multipart form into a temp file. Other
/// fields are skipped.
async fn receive_file(mut payload: Multipart, limit: ByteSize) -> Result<NewUpload, ApiError> {
    let mut received = None;

    while let Some(mut field) = payload.try_next().await.map_err(bad_multipart)? {
        if received.is_some() || field.name() != Some("file") {
            while field.try_next().await.map_err(bad_multipart)?.is_some() {}
            continue;
        }

        // clients may send a full path, only the last component is kept
        let filename = field
            .content_disposition()
            .and_then(|x| x.get_filename())
            .map(util::base_name)
            .filter(|x| !x.is_empty())
            .unwrap_or("unknown")
            .to_owned();

        let content_type = field
            .content_type()
            .unwrap_or(&mime::APPLICATION_OCTET_STREAM)
            .to_string();

        let body = NamedTempFile::new().map_err(spool_failed)?;
        let mut out = File::from_std(body.reopen().map_err(spool_failed)?);
        let mut size = 0u64;

        while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
            size += chunk.len() as u64;

            if size > limit.as_u64() {
                return Err(ApiError::PayloadTooLarge);
            }

            out.write_all(&chunk).await.map_err(spool_failed)?;
        }

        out.flush().await.map_err(spool_failed)?;

        received = Some(NewUpload {
            filename,
            size: size as i64,
            content_type,
            body,
        });
    }

    received.ok_or_else(|| ApiError::BadRequest("error retrieving file".into()))
}

#[post("/upload")]
async fn upload(
    session: Identity,
    payload: Multipart,
    uploads: web::Data<UploadService>,
    limit: web::Data<UploadLimit>,
) -> Result<HttpResponse, ApiError> {
    let file = receive_file(payload, limit.0).await?;

    debug!(
        "upload requested by {}: {} ({}, {})",
        session.user_id,
        file.filename,
        file.content_type,
        ByteSize::b(file.size as u64)
    );

    let record = uploads.upload(session.user_id, file).await?;

    Ok(HttpResponse::Created().json(record))
}

#[get("/mine")]
async fn mine(
    session: Identity,
    uploads: web::Data<UploadService>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(uploads.fetch_mine(&session).await?))
}

#[get("/{id}")]
async fn by_id(
    _session: Identity,
    uploads: web::Data<UploadService>,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(uploads.fetch_by_id(*id).await?))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    // "/mine" has to be registered before "/{id}"
    let scope = web::scope("/object")
        .service(upload)
        .service(mine)
        .service(by_id);

    cfg.service(scope);
}
