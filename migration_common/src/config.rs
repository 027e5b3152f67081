use std::env;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const PROCESSING_BUCKET_NAME: &str = "PROCESSING_BUCKET_NAME";
pub const SCRATCH_DIR: &str = "SCRATCH_DIR";
pub const TABLE_NAME: &str = "TABLE_NAME";
pub const HMS_TABLE_NAME: &str = "HMS_TABLE_NAME";
pub const SNS_ARN: &str = "SNS_ARN";
pub const SOURCE_RESULTS_INDEX: &str = "SOURCE_RESULTS_INDEX";
pub const DYNAMODB_ENDPOINT: &str = "DYNAMODB_ENDPOINT";
pub const TARGET_ACC_ROLE_ARN: &str = "TARGET_ACC_ROLE_ARN";
pub const TARGET_ACC_REGION: &str = "TARGET_ACC_REGION";
pub const TARGET_ACC_TABLE_NAME: &str = "TARGET_ACC_TABLE_NAME";
pub const TARGET_ACC_HMS_TABLE_NAME: &str = "TARGET_ACC_HMS_TABLE_NAME";
pub const TARGET_RESULTS_INDEX: &str = "TARGET_RESULTS_INDEX";
pub const TARGET_DYNAMODB_ENDPOINT: &str = "TARGET_DYNAMODB_ENDPOINT";
pub const ROLE_SESSION_NAME: &str = "ROLE_SESSION_NAME";

const DEFAULT_SCRATCH_DIR: &str = "/tmp";
const DEFAULT_SOURCE_RESULTS_INDEX: &str = "PK-SK-index";
const DEFAULT_TARGET_RESULTS_INDEX: &str = "barcode-SK-index";
const DEFAULT_ROLE_SESSION_NAME: &str = "report-migration-session";

#[derive(Debug, PartialEq, Eq)]
pub struct ConfigError {
    pub variable: &'static str
}

impl std::error::Error for ConfigError {}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "missing required environment variable {}", self.variable)
    }
}

fn optional<F: Fn(&str) -> Option<String>>(lookup: &F, variable: &str) -> Option<String> {
    lookup(variable).filter(|v| !v.trim().is_empty())
}

fn required<F: Fn(&str) -> Option<String>>(lookup: &F, variable: &'static str) -> Result<String, ConfigError> {
    optional(lookup, variable).ok_or(ConfigError { variable })
}

fn env_lookup(variable: &str) -> Option<String> {
    env::var(variable).ok()
}

/// Settings for the function that stages marker objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub bucket_name: String,
    pub scratch_dir: PathBuf
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        Ok(IngestConfig {
            bucket_name: required(&lookup, PROCESSING_BUCKET_NAME)?,
            scratch_dir: PathBuf::from(
                optional(&lookup, SCRATCH_DIR).unwrap_or_else(|| DEFAULT_SCRATCH_DIR.to_string())
            )
        })
    }
}

/// Where and as whom the migrated records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossAccountTarget {
    pub role_arn: String,
    pub session_name: String,
    pub region: String,
    pub table_name: String,
    pub secondary_table_name: Option<String>,
    pub results_index: String,
    pub dynamodb_endpoint: Option<String>
}

/// Settings for the migration worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateConfig {
    pub table_name: String,
    pub secondary_table_name: Option<String>,
    pub results_index: String,
    pub bucket_name: String,
    pub topic_arn: String,
    pub dynamodb_endpoint: Option<String>,
    pub target: CrossAccountTarget
}

impl MigrateConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let target = CrossAccountTarget {
            role_arn: required(&lookup, TARGET_ACC_ROLE_ARN)?,
            session_name: optional(&lookup, ROLE_SESSION_NAME)
                .unwrap_or_else(|| DEFAULT_ROLE_SESSION_NAME.to_string()),
            region: required(&lookup, TARGET_ACC_REGION)?,
            table_name: required(&lookup, TARGET_ACC_TABLE_NAME)?,
            secondary_table_name: optional(&lookup, TARGET_ACC_HMS_TABLE_NAME),
            results_index: optional(&lookup, TARGET_RESULTS_INDEX)
                .unwrap_or_else(|| DEFAULT_TARGET_RESULTS_INDEX.to_string()),
            dynamodb_endpoint: optional(&lookup, TARGET_DYNAMODB_ENDPOINT)
        };
        Ok(MigrateConfig {
            table_name: required(&lookup, TABLE_NAME)?,
            secondary_table_name: optional(&lookup, HMS_TABLE_NAME),
            results_index: optional(&lookup, SOURCE_RESULTS_INDEX)
                .unwrap_or_else(|| DEFAULT_SOURCE_RESULTS_INDEX.to_string()),
            bucket_name: required(&lookup, PROCESSING_BUCKET_NAME)?,
            topic_arn: required(&lookup, SNS_ARN)?,
            dynamodb_endpoint: optional(&lookup, DYNAMODB_ENDPOINT),
            target
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| vars.get(k).cloned()
    }

    fn worker_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            (TABLE_NAME, "table1"),
            (PROCESSING_BUCKET_NAME, "processing-bucket"),
            (SNS_ARN, "arn:aws:sns:us-east-2:1234567890:migrated"),
            (TARGET_ACC_ROLE_ARN, "arn:aws:iam::0987654321:role/AccessRoleForMainAcc"),
            (TARGET_ACC_REGION, "us-east-2"),
            (TARGET_ACC_TABLE_NAME, "main_table")
        ]
    }

    #[test]
    fn ingest_defaults_scratch_dir() {
        let config = IngestConfig::from_lookup(lookup_from(&[(PROCESSING_BUCKET_NAME, "bucket")])).unwrap();
        assert_eq!(config.bucket_name, "bucket");
        assert_eq!(config.scratch_dir, PathBuf::from("/tmp"));
    }

    #[test]
    fn ingest_requires_bucket() {
        let err = IngestConfig::from_lookup(lookup_from(&[(PROCESSING_BUCKET_NAME, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError { variable: PROCESSING_BUCKET_NAME });
    }

    #[test]
    fn worker_defaults() {
        let config = MigrateConfig::from_lookup(lookup_from(&worker_vars())).unwrap();
        assert_eq!(config.results_index, "PK-SK-index");
        assert_eq!(config.target.results_index, "barcode-SK-index");
        assert_eq!(config.target.session_name, "report-migration-session");
        assert_eq!(config.secondary_table_name, None);
        assert_eq!(config.dynamodb_endpoint, None);
    }

    #[test]
    fn worker_reports_first_missing_variable() {
        let vars: Vec<_> = worker_vars().into_iter()
            .filter(|(k, _)| *k != TARGET_ACC_REGION)
            .collect();
        let err = MigrateConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert_eq!(err.to_string(), "missing required environment variable TARGET_ACC_REGION");
    }
}
