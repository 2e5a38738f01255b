//! Application factory: routes plus the middleware stack every response goes through

use crate::constants::{ACCESS_LOG_FORMAT, ANY_ORIGIN, CORS_METHODS};
use crate::error;
use crate::handlers;
use crate::state::AppState;
use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::header;
use actix_web::middleware::{self, ErrorHandlers};
use actix_web::{web, App};

/// Build the application around shared state.
///
/// Middleware order, outermost first: access log (outside production), CORS,
/// hardening headers, compression, error envelope.
pub fn app(
    state: web::Data<AppState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let config = state.config.clone();

    App::new()
        .app_data(state)
        .wrap(ErrorHandlers::new().default_handler(error::render_error))
        .wrap(middleware::Compress::default())
        .wrap(response_headers())
        .wrap(cors(&config.allow_origin))
        .wrap(middleware::Condition::new(
            !config.is_production(),
            middleware::Logger::new(ACCESS_LOG_FORMAT),
        ))
        .configure(handlers::configure)
}

/// No-cache and basic hardening headers on every response
fn response_headers() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new()
        .add((
            header::CACHE_CONTROL,
            "no-store, no-cache, must-revalidate, proxy-revalidate",
        ))
        .add((header::PRAGMA, "no-cache"))
        .add((header::EXPIRES, "0"))
        .add(("surrogate-control", "no-store"))
        .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .add((header::X_FRAME_OPTIONS, "SAMEORIGIN"))
        .add((header::X_DNS_PREFETCH_CONTROL, "off"))
}

fn cors(allow_origin: &str) -> Cors {
    let cors = Cors::default()
        .allowed_methods(CORS_METHODS)
        .allow_any_header()
        .max_age(3600);

    if allow_origin == ANY_ORIGIN {
        cors.allow_any_origin()
    } else {
        cors.allowed_origin(allow_origin)
    }
}
