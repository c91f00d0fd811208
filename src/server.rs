//! App assembly and the HTTP server loop.

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{middleware, web, App, HttpServer, ResponseError};
use tracing::info;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers;
use crate::state::AppContext;

/// CORS is open to every origin, method and header.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
}

fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(move |err, _req| {
            if err.status_code() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge { limit }.into()
            } else {
                ApiError::InvalidBody(err.to_string()).into()
            }
        })
}

pub fn create_app(
    ctx: web::Data<AppContext>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Response = ServiceResponse<impl MessageBody>,
        Config = (),
        InitError = (),
        Error = actix_web::Error,
    >,
> {
    let batch_enabled = ctx.config.batch_enabled;
    let limit = ctx.config.max_upload_size;

    let mut app = App::new()
        .app_data(ctx)
        .app_data(json_config(limit))
        .service(web::resource("/").route(web::get().to(handlers::root)))
        .service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(web::resource("/predict").route(web::post().to(handlers::predict)));
    if batch_enabled {
        app = app.service(
            web::resource("/predict_batch").route(web::post().to(handlers::predict_batch)),
        );
    }

    app.default_service(web::route().to(handlers::not_found))
        .wrap(cors())
        .wrap(middleware::Logger::default())
}

pub async fn run_server(config: AppConfig) -> std::io::Result<()> {
    let addr = (config.host.clone(), config.port);
    let ctx = web::Data::new(AppContext::load(config));

    info!(
        host = %addr.0,
        port = addr.1,
        model_loaded = ctx.model.is_loaded(),
        batch_enabled = ctx.config.batch_enabled,
        "Server running at http://{}:{}",
        addr.0,
        addr.1
    );

    HttpServer::new(move || create_app(ctx.clone()))
        .bind(addr)?
        .run()
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
