use medcost_api::{run_server, AppConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medcost_api=info,actix_web=info".into()),
        )
        .init();

    run_server(AppConfig::from_env()).await
}
