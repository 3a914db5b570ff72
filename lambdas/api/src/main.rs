use api::{build_router, AppState, Config};
use aws_config::BehaviorVersion;

#[tokio::main]
async fn main() -> Result<(), lambda_http::Error> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = Config::from_env()?;
    let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;

    let app = build_router(AppState::from_aws(&config, &sdk_config));

    let app = tower::ServiceBuilder::new()
        .layer(axum_aws_lambda::LambdaLayer::default())
        .service(app);

    lambda_http::run(app).await?;
    Ok(())
}
