pub mod bucket;
pub mod migrate;
pub mod notify;
pub mod store;

use aws_lambda_events::event::s3::S3Event;
use aws_sdk_s3 as s3;
use aws_sdk_sns as sns;
use lambda_runtime::{Error, LambdaEvent};
use migration_common::aws::{cross_account_dynamodb_client, dynamodb_client, load_sdk_config};
use migration_common::config::MigrateConfig;
use migration_common::keys::ReportId;
use migration_common::marker::Marker;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::bucket::{decode_object_key, MarkerBucket, S3MarkerBucket};
use crate::migrate::Migration;
use crate::notify::{publish_summary, Notifier, ProcessedResult, SnsNotifier};
use crate::store::{DynamoStore, RecordStore};

pub const PROCESSING_MESSAGE: &str = "Reports processing";
pub const FAILED_MESSAGE: &str = "Reports not published due to error, check logs";
pub const NO_REPORT_MESSAGE: &str = "No report to process";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String
}

impl MigrationResponse {
    fn message(message: &str) -> Self {
        MigrationResponse {
            status_code: 200,
            body: serde_json::json!({ "message": message }).to_string()
        }
    }
}

/// Everything the worker talks to, built once per execution environment.
pub struct Worker {
    pub source: Box<dyn RecordStore>,
    pub target: Box<dyn RecordStore>,
    pub markers: Box<dyn MarkerBucket>,
    pub notifier: Box<dyn Notifier>,
    pub source_results_index: String,
    pub target_results_index: String
}

impl Worker {
    pub async fn from_config(config: &MigrateConfig) -> Worker {
        let sdk_config = load_sdk_config().await;
        let source_client = dynamodb_client(&sdk_config, config.dynamodb_endpoint.as_deref());
        let target_client = cross_account_dynamodb_client(&sdk_config, &config.target).await;
        info!(
            "migrating {} (secondary {:?}) into {} (secondary {:?})",
            config.table_name,
            config.secondary_table_name,
            config.target.table_name,
            config.target.secondary_table_name
        );
        Worker {
            source: Box::new(DynamoStore::new(source_client, config.table_name.clone())),
            target: Box::new(DynamoStore::new(target_client, config.target.table_name.clone())),
            markers: Box::new(S3MarkerBucket::new(s3::Client::new(&sdk_config), config.bucket_name.clone())),
            notifier: Box::new(SnsNotifier::new(sns::Client::new(&sdk_config), config.topic_arn.clone())),
            source_results_index: config.results_index.clone(),
            target_results_index: config.target.results_index.clone()
        }
    }

    pub async fn function_handler(&self, event: LambdaEvent<S3Event>) -> Result<MigrationResponse, Error> {
        Ok(self.handle_event(&event.payload).await)
    }

    /// Never fails: a bad marker ends the run early and migration errors are
    /// logged and reported in the response body, so the event is not retried.
    pub async fn handle_event(&self, event: &S3Event) -> MigrationResponse {
        if event.records.len() > 1 {
            warn!("event carries {} records, only the first is processed", event.records.len());
        }
        let key = match event.records.first().and_then(|r| r.s3.object.key.as_deref()) {
            Some(key) => decode_object_key(key),
            None => {
                error!("event without an object key");
                return MigrationResponse::message(NO_REPORT_MESSAGE)
            }
        };
        let report = match self.read_marker(&key).await {
            Some(report) => report,
            None => return MigrationResponse::message(NO_REPORT_MESSAGE)
        };
        info!("repid={}", report);

        match self.process(&report, &key).await {
            Ok(processed) => {
                info!("{} results migrated for {}", processed.len(), report);
                MigrationResponse::message(PROCESSING_MESSAGE)
            },
            Err(e) => {
                error!("migration of {} failed: {}", report, e);
                MigrationResponse::message(FAILED_MESSAGE)
            }
        }
    }

    async fn read_marker(&self, key: &str) -> Option<ReportId> {
        match self.markers.get(key).await {
            Ok(Some(bytes)) => match Marker::from_slice(&bytes) {
                Ok(marker) => {
                    let report = marker.report_id();
                    if report.is_none() {
                        error!("marker {} has an empty repid", key);
                    }
                    report
                },
                Err(e) => {
                    error!("marker {} is not valid json: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                error!("marker {} not found", key);
                None
            },
            Err(e) => {
                error!("failed to get marker {}: {}", key, e);
                None
            }
        }
    }

    /// Migrates `report`, publishes the summary and removes the marker.
    pub async fn process(&self, report: &ReportId, key: &str) -> Result<Vec<ProcessedResult>, Error> {
        let migration = Migration {
            source: self.source.as_ref(),
            target: self.target.as_ref(),
            source_results_index: &self.source_results_index,
            target_results_index: &self.target_results_index
        };
        let processed = migration.run(report).await?;
        publish_summary(self.notifier.as_ref(), &processed).await?;
        self.markers.delete(key).await?;
        Ok(processed)
    }
}
