//! services/api/src/bin/api.rs

use api_lib::{
    adapters::GeminiMatcherAdapter,
    config::Config,
    error::ApiError,
    web::{build_router, middleware::{PREMIUM_HEADER, USER_ID_HEADER}, rest::ApiDoc, AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use axum::Router;
use hafiz_core::DENSITY_TABLE_VERSION;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize the Matcher Adapter ---
    let api_key = config
        .gemini_api_key
        .as_ref()
        .ok_or_else(|| ApiError::Internal("GEMINI_API_KEY is required".to_string()))?;
    let matcher_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(&config.matcher_api_base);
    let matcher = Arc::new(GeminiMatcherAdapter::new(
        Client::with_config(matcher_config),
        config.matcher_model.clone(),
    ));
    info!(
        "Matcher model '{}' via {}",
        config.matcher_model, config.matcher_api_base
    );

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(config.clone(), matcher));
    let shutdown = app_state.shutdown.clone();
    info!(
        "Daily limit {} per caller; estimated pages use {}",
        app_state.quota.daily_limit(),
        DENSITY_TABLE_VERSION
    );

    // --- 4. Create the Web Router ---
    let cors = cors_layer(&config.cors_origin)?;
    let app = Router::new()
        .merge(build_router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    tokio::spawn(wait_for_ctrl_c(shutdown.clone()));
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("Server stopped.");
    Ok(())
}

fn cors_layer(origin: &str) -> Result<CorsLayer, ApiError> {
    let allow_origin = if origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let value = origin
            .parse::<HeaderValue>()
            .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", origin, e)))?;
        AllowOrigin::exact(value)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(PREMIUM_HEADER),
        ]))
}

async fn wait_for_ctrl_c(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", e);
        return;
    }
    info!("Shutdown signal received.");
    shutdown.cancel();
}
