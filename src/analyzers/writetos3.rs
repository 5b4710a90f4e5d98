use anyhow::Result;
use aws_sdk_s3::primitives::ByteStream;
use chrono::NaiveDate;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::io::Write;
use tracing::info;

use crate::output::{LATEST_FILE, snapshot_name};

pub const S3_PREFIX: &str = "dashboard";

/// Serializes `value` to JSON, gzip-compressing it when `gzip` is set.
pub fn encode_json(value: &impl Serialize, gzip: bool) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(value)?;
    if !gzip {
        return Ok(body);
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&body)?;
    Ok(encoder.finish()?)
}

/// Serializes a value to JSON and uploads it to an S3 bucket with `application/json` content type.
pub async fn write_json_to_s3(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    value: &impl Serialize,
    gzip: bool,
) -> Result<()> {
    let body = encode_json(value, gzip)?;

    let mut request = client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(bytes::Bytes::from(body)))
        .content_type("application/json");
    if gzip {
        request = request.content_encoding("gzip");
    }
    request.send().await?;

    Ok(())
}

/// Uploads the dated snapshot and the `latest` copy under [`S3_PREFIX`].
#[tracing::instrument(skip(client, value), fields(date = %date))]
pub async fn publish_snapshot(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    date: NaiveDate,
    value: &impl Serialize,
    gzip: bool,
) -> Result<()> {
    let dated_key = format!("{S3_PREFIX}/{}", snapshot_name(date));
    let latest_key = format!("{S3_PREFIX}/{LATEST_FILE}");

    write_json_to_s3(client, bucket, &dated_key, value, gzip).await?;
    write_json_to_s3(client, bucket, &latest_key, value, gzip).await?;

    info!(dated_key = %dated_key, latest_key = %latest_key, "Snapshot uploaded to S3");
    Ok(())
}
