use async_trait::async_trait;
use aws_sdk_s3 as s3;
use aws_sdk_s3::types::SdkError;
use lambda_runtime::Error;
use percent_encoding::percent_decode_str;

/// The processing bucket as seen by the worker.
#[async_trait]
pub trait MarkerBucket: Send + Sync {
    /// Object body, or `None` when no object is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    async fn delete(&self, key: &str) -> Result<(), Error>;
}

pub struct S3MarkerBucket {
    client: s3::Client,
    bucket: String
}

impl S3MarkerBucket {
    pub fn new(client: s3::Client, bucket: String) -> Self {
        S3MarkerBucket { client, bucket }
    }
}

#[async_trait]
impl MarkerBucket for S3MarkerBucket {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let result = self.client.get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;
        match result {
            Ok(output) => Ok(Some(output.body.collect().await?.into_bytes().to_vec())),
            Err(SdkError::ServiceError(e)) if e.err().is_no_such_key() => Ok(None),
            Err(e) => Err(e.into())
        }
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.client.delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }
}

/// Object keys arrive form-encoded in S3 notifications.
pub fn decode_object_key(key: &str) -> String {
    let spaced = key.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

#[test]
fn test_decode_object_key() {
    assert_eq!(decode_object_key("REPORTID%23123"), "REPORTID#123");
    assert_eq!(decode_object_key("REPORTID%23a_b+c%2Bd"), "REPORTID#a_b c+d");
    assert_eq!(decode_object_key("plain"), "plain");
}
