//! S3 access for resume documents.

use anyhow::{Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

/// Object key for a resume: `resumes/<user_id>/<resume_id>.pdf`.
pub fn resume_key(user_id: Uuid, resume_id: Uuid) -> String {
    format!("resumes/{user_id}/{resume_id}.pdf")
}

pub async fn put_resume(s3: &S3Client, bucket: &str, key: &str, bytes: Bytes) -> Result<()> {
    s3.put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(bytes))
        .content_type("application/pdf")
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

    info!("Uploaded resume to s3://{bucket}/{key}");
    Ok(())
}

pub async fn get_resume(s3: &S3Client, bucket: &str, key: &str) -> Result<Vec<u8>> {
    let object = s3
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("S3 download failed: {e}"))?;

    let bytes = object
        .body
        .collect()
        .await
        .with_context(|| format!("Failed to read s3://{bucket}/{key}"))?;
    Ok(bytes.into_bytes().to_vec())
}

pub async fn delete_resume(s3: &S3Client, bucket: &str, key: &str) -> Result<()> {
    s3.delete_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("S3 delete failed: {e}"))?;

    info!("Deleted s3://{bucket}/{key}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_key_is_scoped_by_user() {
        let user = Uuid::nil();
        let resume = Uuid::from_u128(1);
        assert_eq!(
            resume_key(user, resume),
            "resumes/00000000-0000-0000-0000-000000000000/00000000-0000-0000-0000-000000000001.pdf"
        );
    }
}
