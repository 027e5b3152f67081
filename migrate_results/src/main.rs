use aws_lambda_events::event::s3::S3Event;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use migrate_results::Worker;
use migration_common::config::MigrateConfig;
use migration_common::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = MigrateConfig::from_env()?;
    let worker = Worker::from_config(&config).await;

    let worker = &worker;
    run(service_fn(move |event: LambdaEvent<S3Event>| async move {
        worker.function_handler(event).await
    })).await
}
