use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_config::meta::region::RegionProviderChain;
use aws_config::sts::AssumeRoleProvider;
use aws_config::SdkConfig;
use aws_sdk_dynamodb as ddb;
use aws_sdk_dynamodb::Region;
use tracing::info;

use crate::config::CrossAccountTarget;

pub async fn load_sdk_config() -> SdkConfig {
    let region_provider = RegionProviderChain::default_provider().or_else("us-east-1");
    aws_config::from_env().region(region_provider).load().await
}

/// Client for a table in the function's own account.
pub fn dynamodb_client(config: &SdkConfig, endpoint: Option<&str>) -> ddb::Client {
    let ddb_config = match endpoint {
        Some(endpoint) => ddb::config::Builder::from(config).endpoint_url(endpoint).build(),
        None => ddb::config::Builder::from(config).build()
    };
    ddb::Client::from_conf(ddb_config)
}

/// Client for the target account's tables.
///
/// Requests are signed with credentials obtained by assuming `target.role_arn`.
/// The provider sits behind the SDK's lazy credentials cache, so a warm
/// execution environment re-assumes the role before the session expires
/// instead of holding on to the first set of credentials.
pub async fn cross_account_dynamodb_client(config: &SdkConfig, target: &CrossAccountTarget) -> ddb::Client {
    let region = Region::new(target.region.clone());
    let base_provider = DefaultCredentialsChain::builder()
        .region(region.clone())
        .build()
        .await;
    let provider = AssumeRoleProvider::builder(target.role_arn.clone())
        .session_name(target.session_name.clone())
        .region(region.clone())
        .build(base_provider);
    info!("target account client for role {} in {}", target.role_arn, target.region);

    let builder = ddb::config::Builder::from(config)
        .region(region)
        .credentials_provider(provider);
    let ddb_config = match &target.dynamodb_endpoint {
        Some(endpoint) => builder.endpoint_url(endpoint).build(),
        None => builder.build()
    };
    ddb::Client::from_conf(ddb_config)
}
