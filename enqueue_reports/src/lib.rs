use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use aws_sdk_s3::types::ByteStream;
use lambda_http::{Body, Error, Request, Response};
use migration_common::keys::ReportId;
use migration_common::marker::Marker;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

pub const UPLOADED_MESSAGE: &str = "Repid json files uploaded to s3 for processing";
pub const FAILED_MESSAGE: &str = "Error occurred, check logs";

#[derive(Debug, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub repid_list: Vec<String>
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueResponse {
    pub message: String
}

/// Outcome of staging one request. Keys are the object keys written,
/// failures are the identifiers whose marker never reached the bucket.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EnqueueSummary {
    pub uploaded: Vec<String>,
    pub failed: Vec<String>
}

#[async_trait]
pub trait MarkerUploader: Send + Sync {
    /// Uploads the file at `path` to the processing bucket under `key`.
    async fn upload(&self, path: &Path, key: &str) -> Result<(), Error>;
}

pub struct S3MarkerUploader {
    client: s3::Client,
    bucket: String
}

impl S3MarkerUploader {
    pub fn new(client: s3::Client, bucket: String) -> Self {
        S3MarkerUploader { client, bucket }
    }
}

#[async_trait]
impl MarkerUploader for S3MarkerUploader {
    async fn upload(&self, path: &Path, key: &str) -> Result<(), Error> {
        let body = ByteStream::from_path(path).await?;
        self.client.put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(body)
            .send()
            .await?;
        Ok(())
    }
}

/// Writes the marker document for `report` into `scratch_dir`, replacing any
/// file left behind by an earlier invocation.
pub async fn write_marker_file(scratch_dir: &Path, report: &ReportId) -> Result<PathBuf, Error> {
    let path = scratch_dir.join(format!("{}.json", report.object_key()));
    match tokio::fs::remove_file(&path).await {
        Ok(()) => debug!("removed stale marker file {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {},
        Err(e) => return Err(e.into())
    }
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await?;
    file.write_all(Marker::new(report.as_str()).to_json()?.as_bytes()).await?;
    file.flush().await?;
    Ok(path)
}

/// Stages one marker object per identifier in `request`.
///
/// Upload failures are logged and recorded in the summary without stopping
/// the remaining identifiers. Scratch file errors abort the request.
pub async fn enqueue_reports(
    uploader: &dyn MarkerUploader,
    scratch_dir: &Path,
    request: &EnqueueRequest
) -> Result<EnqueueSummary, Error> {
    let mut summary = EnqueueSummary::default();
    for repid in &request.repid_list {
        if repid.trim().is_empty() {
            warn!("skipping empty repid");
            summary.failed.push(repid.to_owned());
            continue
        }
        let report = ReportId::new(repid.as_str());
        let key = report.object_key();
        let path = write_marker_file(scratch_dir, &report).await?;
        match uploader.upload(&path, &key).await {
            Ok(()) => {
                info!("uploaded marker for {} as {}", repid, key);
                summary.uploaded.push(key)
            },
            Err(e) => {
                error!("marker for repid {} was not uploaded: {}", repid, e);
                summary.failed.push(repid.to_owned())
            }
        }
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("could not remove scratch file {}: {}", path.display(), e);
        }
    }
    Ok(summary)
}

fn json_response(status: u16, message: &str) -> Result<Response<Body>, Error> {
    let body = serde_json::to_string(&EnqueueResponse { message: message.to_string() })?;
    Ok(
        Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(body.into())
            .map_err(Box::new)?
    )
}

pub async fn function_handler(
    event: Request,
    uploader: &dyn MarkerUploader,
    scratch_dir: &Path
) -> Result<Response<Body>, Error> {
    debug!("request: {} {}", event.method(), event.uri());
    let request: serde_json::Result<EnqueueRequest> = match event.body() {
        Body::Text(s) => serde_json::from_str(s),
        Body::Binary(b) => serde_json::from_slice(b),
        Body::Empty => return Ok(
            Response::builder()
                .status(400)
                .header("content-type", "text/plain")
                .body("Expected a request body.".into())
                .map_err(Box::new)?
        )
    };

    match request {
        Ok(request) => match enqueue_reports(uploader, scratch_dir, &request).await {
            Ok(summary) => {
                info!("staged {} markers, {} failed", summary.uploaded.len(), summary.failed.len());
                json_response(200, UPLOADED_MESSAGE)
            },
            Err(e) => {
                error!("error staging markers: {}", e);
                json_response(200, FAILED_MESSAGE)
            }
        },
        Err(e) => {
            error!("error parsing body: {}", e);
            Ok(
                Response::builder()
                    .status(400)
                    .header("content-type", "application/json")
                    .body(serde_json::json!({ "error": e.to_string() }).to_string().into())
                    .map_err(Box::new)?
            )
        }
    }
}
