use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::StatusCode;
use axum::{routing::get, Router};
use http::HeaderValue;
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use threadline_api as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::telemetry::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    // Init events; the processor owns the receiving half for the process lifetime
    let (event_sender, event_rx) = api::events::channel(cfg.event_channel_capacity);
    let notifier: Arc<dyn api::services::notifications::NotificationClient> =
        match cfg.notification_service_url.clone() {
            Some(url) => {
                info!("Notification delivery enabled: {}", url);
                Arc::new(api::services::notifications::HttpNotificationClient::new(
                    url,
                )?)
            }
            None => {
                info!("Notification service URL not configured; events are logged only");
                Arc::new(api::services::notifications::LoggingNotificationClient::default())
            }
        };
    tokio::spawn(api::events::process_events(event_rx, notifier));

    // Outbound ports: real HTTP clients when configured, local stand-ins otherwise
    let gateway: Arc<dyn api::services::payments::GatewayClient> =
        match cfg.gateway.base_url.clone() {
            Some(url) => Arc::new(api::services::payments::HttpGatewayClient::new(
                url,
                &cfg.gateway,
            )?),
            None => {
                info!("Gateway base URL not configured; using the local gateway");
                Arc::new(api::services::payments::LocalGatewayClient::default())
            }
        };
    let inventory: Arc<dyn api::services::inventory::InventoryClient> =
        match cfg.inventory_service_url.clone() {
            Some(url) => Arc::new(api::services::inventory::HttpInventoryClient::new(url)?),
            None => {
                info!("Inventory service URL not configured; using in-memory reservations");
                Arc::new(api::services::inventory::InMemoryInventoryClient::default())
            }
        };

    // Aggregate app services used by HTTP handlers
    let event_sender = Arc::new(event_sender);
    let services = api::handlers::AppServices::new(
        db.clone(),
        &cfg,
        inventory,
        gateway,
        Some(event_sender.clone()),
    );

    // Compose shared app state
    let app_state = api::AppState {
        db: db.clone(),
        jwt: api::auth::JwtVerifier::new(&cfg.jwt_secret),
        event_sender: Some(event_sender),
        services,
        config: cfg.clone(),
    };

    // Build CORS layer from config
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.should_allow_permissive_cors() {
        info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        CorsLayer::permissive()
    } else {
        error!("Missing CORS configuration detected; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        return Err("Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true".into());
    };

    // Build router: status/health + full v1 API + Swagger UI
    let app = Router::<api::AppState>::new()
        .route("/", get(|| async { "threadline-api up" }))
        .route(
            "/metrics",
            get(|| async move {
                match api::metrics::render() {
                    Ok(body) => (StatusCode::OK, body),
                    Err(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        String::from("metrics error"),
                    ),
                }
            }),
        )
        .nest("/api/v1", api::api_v1_routes())
        .merge(api::openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(TraceLayer::new_for_http().make_span_with(api::telemetry::RequestSpanMaker))
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            api::telemetry::propagate_request_id,
        ))
        .with_state(app_state);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port bind address")?;
    info!("threadline-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
