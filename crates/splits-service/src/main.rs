use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{web, App, HttpServer};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use splits::{CoordinatorGateway, Database, SplitsEngine};
use splits_service::config::ServiceConfig;
use splits_service::routes;
use splits_service::state::AppState;

fn build_cors(origins: &[String]) -> Cors {
    if origins.is_empty() {
        // Default: allow localhost on any port
        Cors::default()
            .allowed_origin_fn(|origin, _| {
                origin
                    .to_str()
                    .map(|o| o == "http://localhost" || o.starts_with("http://localhost:"))
                    .unwrap_or(false)
            })
            .allow_any_method()
            .allowed_headers(vec!["content-type"])
            .max_age(3600)
    } else {
        let mut cors = Cors::default();
        for origin in origins {
            cors = cors.allowed_origin(origin);
        }
        cors.allow_any_method()
            .allowed_headers(vec!["content-type"])
            .max_age(3600)
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration error: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!(?config, "configuration loaded");

    let db = match Database::new(&config.db_path) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("failed to open database at {}: {e}", config.db_path);
            std::process::exit(1);
        }
    };

    let gateway = match CoordinatorGateway::new(
        &config.rpc_url,
        config.coordinator,
        config.executor_private_key.as_deref(),
    ) {
        Ok(gateway) => gateway,
        Err(e) => {
            tracing::error!("failed to construct chain gateway: {e}");
            std::process::exit(1);
        }
    };

    let settings = config.chain_settings();
    let state = web::Data::new(AppState {
        engine: SplitsEngine::new(db, gateway, settings),
    });

    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(config.rate_limit_rpm)
        .finish()
        .expect("failed to build rate limiter config");

    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();

    tracing::info!("splits service listening on port {port}");
    tracing::info!(
        chain_id = config.chain_id,
        coordinator = %config.coordinator,
        "serving splits for configured coordinator"
    );
    tracing::info!("  POST http://localhost:{port}/splits");
    tracing::info!("  POST http://localhost:{port}/splits/{{id}}/settle");

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&allowed_origins))
            .wrap(Governor::new(&governor_conf))
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().limit(262_144))
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
