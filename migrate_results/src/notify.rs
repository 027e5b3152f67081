use async_trait::async_trait;
use aws_sdk_dynamodb::model::AttributeValue;
use aws_sdk_sns as sns;
use lambda_runtime::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tracing::info;

pub const SUMMARY_SUBJECT: &str = "Processed result items";

/// Entry of the summary published after each run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedResult {
    pub processed_result_barcode: Value
}

impl ProcessedResult {
    /// Carries the record's `PK` with its type: strings stay strings, numbers
    /// become JSON numbers.
    pub fn from_key(key: &AttributeValue) -> Self {
        let value = match key {
            AttributeValue::S(s) => Value::String(s.to_owned()),
            AttributeValue::N(n) => match serde_json::from_str::<Number>(n) {
                Ok(number) => Value::Number(number),
                Err(_) => Value::String(n.to_owned())
            },
            _ => Value::Null
        };
        ProcessedResult { processed_result_barcode: value }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, subject: &str, message: &str) -> Result<(), Error>;
}

pub struct SnsNotifier {
    client: sns::Client,
    topic_arn: String
}

impl SnsNotifier {
    pub fn new(client: sns::Client, topic_arn: String) -> Self {
        SnsNotifier { client, topic_arn }
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    async fn publish(&self, subject: &str, message: &str) -> Result<(), Error> {
        let output = self.client.publish()
            .topic_arn(&self.topic_arn)
            .subject(subject)
            .message(message)
            .send()
            .await?;
        info!("published to {} as {:?}", self.topic_arn, output.message_id());
        Ok(())
    }
}

pub async fn publish_summary(notifier: &dyn Notifier, processed: &[ProcessedResult]) -> Result<(), Error> {
    let message = serde_json::to_string(processed)?;
    notifier.publish(SUMMARY_SUBJECT, &message).await
}

#[test]
fn test_summary_shape() {
    let processed = vec![
        ProcessedResult::from_key(&AttributeValue::S(String::from("RESULT#BC1"))),
        ProcessedResult::from_key(&AttributeValue::N(String::from("42"))),
        ProcessedResult::from_key(&AttributeValue::N(String::from("4.5")))
    ];
    assert_eq!(
        serde_json::to_string(&processed).unwrap(),
        r#"[{"processed_result_barcode":"RESULT#BC1"},{"processed_result_barcode":42},{"processed_result_barcode":4.5}]"#
    );
}
