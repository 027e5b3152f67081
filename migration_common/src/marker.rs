use serde::{Deserialize, Serialize};

use crate::keys::ReportId;

/// Body of the object that hands a report over to the migration worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub repid: String
}

impl Marker {
    pub fn new(repid: impl Into<String>) -> Self {
        Marker { repid: repid.into() }
    }

    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// `None` when the marker names no report.
    pub fn report_id(&self) -> Option<ReportId> {
        if self.repid.trim().is_empty() {
            None
        } else {
            Some(ReportId::new(self.repid.as_str()))
        }
    }
}

#[test]
fn test_marker_document() {
    let marker = Marker::new("REPORTID#a/b");
    assert_eq!(marker.to_json().unwrap(), r#"{"repid":"REPORTID#a/b"}"#);
    assert_eq!(marker.report_id().unwrap().object_key(), "REPORTID#a_b");
    assert!(Marker::from_slice(b"{\"other\": 1}").is_err());
    assert_eq!(Marker::new("").report_id(), None);
}
