//! Copies one report's estimates and ready results into the target table.

use aws_sdk_dynamodb::model::AttributeValue;
use lambda_runtime::Error;
use migration_common::keys::{
    ReportId, StateDateKey, BARCODE, ESTIMATED, ESTIMATE_SK_PREFIX, ITEMS, PK, REPID,
    REPORTING_INDEX_PK, REPORT_DRAFT, REPORT_READY, SK, STATE, STATE_DATE_PREFIX, TYPE_EVENT,
};
use tracing::{debug, info, warn};

use crate::notify::ProcessedResult;
use crate::store::{list_attr, primary_key, string_attr, Item, PutOutcome, Query, RecordStore};

fn s(value: &str) -> AttributeValue {
    AttributeValue::S(value.to_string())
}

/// Ready results for `barcode` whose sort key starts with `sort_prefix`.
fn ready_results(index_name: &str, barcode: &AttributeValue, sort_prefix: String, trimmed_repid: &str) -> Query {
    Query::partition(BARCODE, barcode.clone())
        .on_index(index_name)
        .sort_begins_with(SK, sort_prefix)
        .filter(TYPE_EVENT, s(REPORT_READY))
        .filter(REPID, s(trimmed_repid))
}

pub struct Migration<'a> {
    pub source: &'a dyn RecordStore,
    pub target: &'a dyn RecordStore,
    pub source_results_index: &'a str,
    pub target_results_index: &'a str
}

impl<'a> Migration<'a> {
    /// Migrates everything belonging to `report` and returns the results that
    /// were newly written to the target table.
    ///
    /// Writes are insert-if-absent, so running a report twice leaves the target
    /// unchanged the second time and returns nothing.
    pub async fn run(&self, report: &ReportId) -> Result<Vec<ProcessedResult>, Error> {
        let copied = self.copy_estimates(report).await?;
        info!("copied {} estimates for {}", copied, report);

        let subreports = self.source.query(
            &Query::partition(PK, s(REPORTING_INDEX_PK)).sort_begins_with(SK, report.as_str())
        ).await?;
        info!("No of subreports for {}: {}", report, subreports.len());

        let mut processed = Vec::new();
        let trimmed = report.trimmed();
        for subreport in &subreports {
            let barcodes = list_attr(subreport, ITEMS);
            info!("No of task barcodes in {:?}: {}", string_attr(subreport, SK), barcodes.len());
            for barcode in &barcodes {
                let results = self.source.query(
                    &ready_results(self.source_results_index, barcode, STATE_DATE_PREFIX.to_string(), trimmed)
                ).await?;
                if results.is_empty() {
                    info!("No results found for {:?}", barcode);
                    continue
                }
                info!("No of result items for {:?}: {}", barcode, results.len());
                for result in results {
                    if let Some(p) = self.migrate_result(barcode, result, trimmed).await? {
                        processed.push(p);
                    }
                }
            }
        }
        Ok(processed)
    }

    async fn copy_estimates(&self, report: &ReportId) -> Result<usize, Error> {
        let estimates = self.source.query(
            &Query::partition(PK, s(report.as_str()))
                .sort_begins_with(SK, ESTIMATE_SK_PREFIX)
                .filter(STATE, s(ESTIMATED))
        ).await?;
        info!("Found {} estimated items for {}", estimates.len(), report);

        let mut copied = 0;
        for estimate in estimates {
            let sort_key = string_attr(&estimate, SK).map(str::to_owned);
            match self.target.put_if_absent(estimate).await? {
                PutOutcome::Inserted => copied += 1,
                PutOutcome::AlreadyExists => debug!("estimate {:?} already migrated", sort_key)
            }
        }
        Ok(copied)
    }

    async fn migrate_result(
        &self,
        barcode: &AttributeValue,
        mut result: Item,
        trimmed_repid: &str
    ) -> Result<Option<ProcessedResult>, Error> {
        let state_date = match string_attr(&result, SK).map(StateDateKey::parse) {
            Some(Ok(key)) => key,
            Some(Err(e)) => {
                warn!("skipping result for {:?}: {}", barcode, e);
                return Ok(None)
            },
            None => {
                warn!("skipping result for {:?} without a sort key", barcode);
                return Ok(None)
            }
        };
        let processed = match primary_key(&result) {
            Ok(key) => ProcessedResult::from_key(key),
            Err(e) => {
                warn!("skipping result for {:?}: {}", barcode, e);
                return Ok(None)
            }
        };
        let key_text = processed.processed_result_barcode.to_string();

        let existing = self.target.query(
            &ready_results(self.target_results_index, barcode, state_date.prefix(), trimmed_repid)
        ).await?;
        if !existing.is_empty() {
            debug!("{} already has a ready result for {}", key_text, state_date);
            return Ok(None)
        }

        result.insert(TYPE_EVENT.to_string(), s(REPORT_DRAFT));
        match self.target.put_if_absent(result).await? {
            PutOutcome::Inserted => {
                info!("migrated result {} {}", key_text, state_date);
                Ok(Some(processed))
            },
            PutOutcome::AlreadyExists => {
                debug!("result {} {} already migrated", key_text, state_date);
                Ok(None)
            }
        }
    }
}
