//! Attribute names and composite key encodings of the report tables.

use std::fmt::{Display, Formatter};

pub const PK: &str = "PK";
pub const SK: &str = "SK";
pub const BARCODE: &str = "barcode";
pub const STATE: &str = "STATE";
pub const ITEMS: &str = "ITEMS";
pub const TYPE_EVENT: &str = "type_event";
pub const REPID: &str = "REPID";

pub const ESTIMATE_SK_PREFIX: &str = "#DEF#TS";
pub const REPORTING_INDEX_PK: &str = "REPORTING_INDEX";
pub const STATE_DATE_PREFIX: &str = "#STATE_DATE#";
pub const REPORT_ID_PREFIX: &str = "REPORTID#";

pub const ESTIMATED: &str = "ESTIMATED";
pub const REPORT_READY: &str = "REPORT_READY";
pub const REPORT_DRAFT: &str = "REPORT_DRAFT";

#[derive(Debug, PartialEq, Eq)]
pub struct KeyError {
    pub key: String,
    pub reason: &'static str
}

impl std::error::Error for KeyError {}

impl Display for KeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid key {:?}: {}", self.key, self.reason)
    }
}

/// A report identifier as stored in `PK` of the estimate records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportId(String);

impl ReportId {
    pub fn new(raw: impl Into<String>) -> Self {
        ReportId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier without its `REPORTID#` prefix, which is how result
    /// records refer to their report in `REPID`.
    pub fn trimmed(&self) -> &str {
        self.0.strip_prefix(REPORT_ID_PREFIX).unwrap_or(&self.0)
    }

    /// Object key for the marker of this report. Path separators are flattened
    /// so every marker lives at the top of the bucket.
    pub fn object_key(&self) -> String {
        self.0.replace('/', "_")
    }
}

impl Display for ReportId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sort key of a result record: `#STATE_DATE#<date>` optionally followed by
/// `#<rest>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDateKey {
    pub state_date: String,
    pub rest: Option<String>
}

impl StateDateKey {
    pub fn parse(sort_key: &str) -> Result<Self, KeyError> {
        let body = sort_key.strip_prefix(STATE_DATE_PREFIX).ok_or_else(|| KeyError {
            key: sort_key.to_string(),
            reason: "missing #STATE_DATE# prefix"
        })?;
        let (state_date, rest) = match body.split_once('#') {
            Some((date, rest)) => (date, Some(rest.to_string())),
            None => (body, None)
        };
        if state_date.is_empty() {
            return Err(KeyError { key: sort_key.to_string(), reason: "empty state date" })
        }
        Ok(StateDateKey { state_date: state_date.to_string(), rest })
    }

    /// Sort key prefix selecting every record written for the same state date.
    pub fn prefix(&self) -> String {
        format!("{}{}", STATE_DATE_PREFIX, self.state_date)
    }
}

impl Display for StateDateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.rest {
            Some(rest) => write!(f, "{}#{}", self.prefix(), rest),
            None => f.write_str(&self.prefix())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_only_the_literal_prefix() {
        assert_eq!(ReportId::new("REPORTID#123").trimmed(), "123");
        // Leading characters that merely occur in the prefix are kept.
        assert_eq!(ReportId::new("REPORTID#R12").trimmed(), "R12");
        assert_eq!(ReportId::new("123").trimmed(), "123");
    }

    #[test]
    fn object_key_flattens_separators() {
        assert_eq!(ReportId::new("REPORTID#a/b/c").object_key(), "REPORTID#a_b_c");
        assert_eq!(ReportId::new("REPORTID#123").object_key(), "REPORTID#123");
    }

    #[test]
    fn parses_state_date_with_suffix() {
        let key = StateDateKey::parse("#STATE_DATE#2023-03-01T10:00:00#BC1").unwrap();
        assert_eq!(key.state_date, "2023-03-01T10:00:00");
        assert_eq!(key.rest.as_deref(), Some("BC1"));
        assert_eq!(key.prefix(), "#STATE_DATE#2023-03-01T10:00:00");
        assert_eq!(key.to_string(), "#STATE_DATE#2023-03-01T10:00:00#BC1");
    }

    #[test]
    fn parses_bare_state_date() {
        let key = StateDateKey::parse("#STATE_DATE#1677300937").unwrap();
        assert_eq!(key.state_date, "1677300937");
        assert_eq!(key.rest, None);
    }

    #[test]
    fn rejects_other_sort_keys() {
        assert_eq!(
            StateDateKey::parse("#DEF#TS#1").unwrap_err().reason,
            "missing #STATE_DATE# prefix"
        );
        assert_eq!(StateDateKey::parse("#STATE_DATE##x").unwrap_err().reason, "empty state date");
    }
}
