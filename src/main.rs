use axum::http::{HeaderValue, Method};
use dotenvy::dotenv;
use log::{info, warn};
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::error::Error;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{self, CorsLayer, Origin};
use tower_http::trace::TraceLayer;

use plushdesk::auth::client::BackendAuthClient;
use plushdesk::auth::memory::MemoryAuthenticator;
use plushdesk::auth::SharedAuthenticator;
use plushdesk::config::Config;
use plushdesk::db::memory::MemoryGateway;
use plushdesk::db::postgres::PgGateway;
use plushdesk::db::SharedGateway;
use plushdesk::routes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env file
    dotenv().ok();
    // Set logging levels if not already set
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "plushdesk=debug,tower_http=info");
    }

    // Initialize tracing with previously set logging levels
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let gateway: SharedGateway = match &config.database_url {
        Some(url) => {
            let pg_pool = Arc::new(
                PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect(url)
                    .await?,
            );
            info!("Postgres pool initialized");
            Arc::new(PgGateway::new(pg_pool))
        }
        None => {
            warn!("DATABASE_URL not set, keeping data in memory");
            Arc::new(MemoryGateway::new())
        }
    };

    let auth: SharedAuthenticator = match &config.backend {
        Some(backend) => {
            info!("Auth client initialized for {}", backend.url);
            Arc::new(BackendAuthClient::new(&backend.url, &backend.anon_key))
        }
        None => {
            warn!("BACKEND_URL not set, keeping accounts in memory");
            Arc::new(MemoryAuthenticator::new())
        }
    };

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    let app = routes::router(gateway, auth).layer(
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
            CorsLayer::new()
                .allow_origin(Origin::list(origins))
                .allow_methods(vec![
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                ])
                .allow_headers(cors::Any),
        ),
    );

    // Bind and serve
    info!("Listening on http://{}", config.bind_addr);
    axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
