use aws_sdk_s3 as s3;
use enqueue_reports::{function_handler, S3MarkerUploader};
use lambda_http::{run, service_fn, Error, Request};
use migration_common::aws::load_sdk_config;
use migration_common::config::IngestConfig;
use migration_common::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = IngestConfig::from_env()?;
    let sdk_config = load_sdk_config().await;
    let uploader = S3MarkerUploader::new(s3::Client::new(&sdk_config), config.bucket_name.clone());

    let uploader = &uploader;
    let scratch_dir = config.scratch_dir.as_path();
    run(service_fn(move |event: Request| async move {
        function_handler(event, uploader, scratch_dir).await
    })).await
}
