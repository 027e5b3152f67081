//! Plumbing shared by the report migration functions: configuration, AWS
//! clients, tracing setup, the marker document and the record key contract.

pub mod aws;
pub mod config;
pub mod keys;
pub mod marker;

const TRACE_DEBUG: &str = "TRACE_DEBUG";

/// Installs the fmt subscriber used by every function in this workspace.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(match std::env::var(TRACE_DEBUG) {
            Ok(_) => tracing::Level::DEBUG,
            Err(_) => tracing::Level::INFO
        })
        // disable printing the name of the module in every log line.
        .with_target(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .init();
}
