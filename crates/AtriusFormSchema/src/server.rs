//! # Form Schema Server
//!
//! HTTP server publishing the compiled form schemas of one data directory. The directory is
//! compiled once at startup; `POST /forms/$reload` compiles it again and swaps the new set
//! in atomically, so requests in flight keep reading the set they started with.
//!
//! ## API Endpoints
//!
//! ```text
//! GET /health
//!   Returns: {"status": "ok", "service": "atrius-form-server", "version": ...}
//!
//! GET /forms
//!   Returns: {"forms": [{"key", "title", "role"}], "loadedAt": RFC 3339 timestamp}
//!
//! GET /forms/{key}
//!   Returns: the compiled field-group tree of the form
//!   404 with an OperationOutcome when no form has that key
//!
//! POST /forms/$reload
//!   Recompiles the data directory and publishes the result
//!   Returns: {"forms": count, "loadedAt": ...}
//!   500 with an OperationOutcome when loading fails; the published forms stay as they were
//! ```
//!
//! ## Configuration
//!
//! The server supports configuration through both command-line arguments and environment variables:
//!
//! - `FORMS_SERVER_PORT` / `--port`: Server port (default: 8080)
//! - `FORMS_SERVER_HOST` / `--host`: Server host (default: 127.0.0.1)
//! - `FORMS_LOG_LEVEL` / `--log-level`: Log level (default: info)
//! - `FORMS_REQUEST_TIMEOUT` / `--request-timeout`: Request timeout in seconds (default: 30)
//! - `FORMS_DATA_DIR` / `--data-dir`: Data directory (default: ./data)
//! - `FORMS_COMMON_QUESTIONNAIRE` / `--common-questionnaire`: Key of the common questionnaire (default: common)
//! - `FORMS_ENABLE_CORS` / `--enable-cors`: Enable CORS (default: true)
//! - `FORMS_CORS_ORIGINS` / `--cors-origins`: Allowed origins, comma-separated (default: *)
//! - `FORMS_CORS_METHODS` / `--cors-methods`: Allowed methods, comma-separated (default: GET,POST,OPTIONS)
//! - `FORMS_CORS_HEADERS` / `--cors-headers`: Allowed headers, comma-separated (default: common headers)
//! - `FORMS_FEATURE_GROUP_PANELS`: Render labelled groups as panels (default: false)
//! - `FORMS_FEATURE_HOSPITALIZATION_REASON`: Emit the hospitalization reason field (default: false)
//! - `FORMS_FEATURE_HOSPITALIZATION_COPY_CHECKBOXES`: Emit the copy-facility checkbox (default: false)
//!
//! ```bash
//! FORMS_DATA_DIR=/srv/forms \
//! FORMS_CORS_ORIGINS="https://portal.example.com" \
//! FORMS_FEATURE_GROUP_PANELS=true \
//! atrius-form-server
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use atrius_form_schema::{FeatureFlags, FormSourceConfig, FormStore};
use axum::{
    Router,
    routing::{get, post},
};
use http::{HeaderValue, Method, StatusCode};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

mod error;
mod handlers;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
    /// Log level for the server
    pub log_level: String,
    /// Request timeout in seconds
    pub request_timeout: u64,
    /// Whether to enable CORS
    pub enable_cors: bool,
    /// Allowed CORS origins (comma-separated list, "*" for any)
    pub cors_origins: String,
    /// Allowed CORS methods (comma-separated list, "*" for any)
    pub cors_methods: String,
    /// Allowed CORS headers (comma-separated list, "*" for any)
    pub cors_headers: String,
    /// Where questionnaires, terminology and clipboard keys are read from
    pub source: FormSourceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: "GET,POST,OPTIONS".to_string(),
            cors_headers: "Accept,Accept-Language,Content-Type,Content-Language,Authorization,X-Requested-With".to_string(),
            source: FormSourceConfig::new("./data"),
        }
    }
}

/// Main server entry point
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = parse_args();

    let filter = format!(
        "atrius_form_server={level},atrius_form_schema={level},tower_http={level}",
        level = config.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .init();

    info!("Starting form schema server...");
    info!("Configuration: {:?}", config);

    let store = Arc::new(FormStore::open(config.source.clone()).await?);
    info!("Published {} forms", store.keys().len());

    let app = create_app_with_config(store, &config);

    let host: std::net::IpAddr = config.host.parse().unwrap_or_else(|_| {
        warn!("Invalid host address '{}', using 127.0.0.1", config.host);
        std::net::IpAddr::from([127, 0, 0, 1])
    });

    let addr = SocketAddr::from((host, config.port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Parse command line arguments for server configuration
fn parse_args() -> ServerConfig {
    use clap::Parser;

    #[derive(Parser, Debug)]
    #[command(
        author,
        version,
        about = "Questionnaire form schema HTTP server",
        long_about = "HTTP server publishing form schemas compiled from FHIR Questionnaires\n\nEnvironment variables:\n  FORMS_SERVER_PORT - Server port (default: 8080)\n  FORMS_SERVER_HOST - Server host (default: 127.0.0.1)\n  FORMS_LOG_LEVEL - Log level: error, warn, info, debug, trace (default: info)\n  FORMS_REQUEST_TIMEOUT - Request timeout in seconds (default: 30)\n  FORMS_DATA_DIR - Data directory (default: ./data)\n  FORMS_COMMON_QUESTIONNAIRE - Key of the common questionnaire (default: common)\n  FORMS_ENABLE_CORS - Enable CORS: true/false (default: true)\n  FORMS_CORS_ORIGINS - Allowed origins (comma-separated, * for any) (default: *)\n  FORMS_CORS_METHODS - Allowed methods (comma-separated, * for any) (default: GET,POST,OPTIONS)\n  FORMS_CORS_HEADERS - Allowed headers (comma-separated, * for any) (default: common headers)\n  FORMS_FEATURE_GROUP_PANELS - Render labelled groups as panels (default: false)\n  FORMS_FEATURE_HOSPITALIZATION_REASON - Emit the hospitalization reason (default: false)\n  FORMS_FEATURE_HOSPITALIZATION_COPY_CHECKBOXES - Emit the copy-facility checkbox (default: false)\n\nNote: When using wildcard (*) origins, credentials are disabled for security."
    )]
    struct Args {
        /// Port to bind the server to
        #[arg(short, long, env = "FORMS_SERVER_PORT", default_value_t = 8080)]
        port: u16,

        /// Host address to bind to
        #[arg(
            short = 'H',
            long,
            env = "FORMS_SERVER_HOST",
            default_value = "127.0.0.1"
        )]
        host: String,

        /// Log level (error, warn, info, debug, trace)
        #[arg(short, long, env = "FORMS_LOG_LEVEL", default_value = "info")]
        log_level: String,

        /// Request timeout in seconds
        #[arg(short = 't', long, env = "FORMS_REQUEST_TIMEOUT", default_value_t = 30)]
        request_timeout: u64,

        /// Data directory holding questionnaires/, terminology/ and clipboard.json
        #[arg(short = 'd', long, env = "FORMS_DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,

        /// Key of the questionnaire compiled with the common clipboard table
        #[arg(long, env = "FORMS_COMMON_QUESTIONNAIRE", default_value = "common")]
        common_questionnaire: String,

        /// Enable CORS
        #[arg(short = 'c', long, env = "FORMS_ENABLE_CORS", default_value_t = true)]
        enable_cors: bool,

        /// Allowed CORS origins (comma-separated list, "*" for any)
        #[arg(long, env = "FORMS_CORS_ORIGINS", default_value = "*")]
        cors_origins: String,

        /// Allowed CORS methods (comma-separated list, "*" for any)
        #[arg(long, env = "FORMS_CORS_METHODS", default_value = "GET,POST,OPTIONS")]
        cors_methods: String,

        /// Allowed CORS headers (comma-separated list, "*" for any)
        #[arg(
            long,
            env = "FORMS_CORS_HEADERS",
            default_value = "Accept,Accept-Language,Content-Type,Content-Language,Authorization,X-Requested-With"
        )]
        cors_headers: String,

        /// Render labelled groups inside a panel
        #[arg(long, env = "FORMS_FEATURE_GROUP_PANELS", default_value_t = false)]
        feature_group_panels: bool,

        /// Emit the free-text reason of a hospitalization
        #[arg(long, env = "FORMS_FEATURE_HOSPITALIZATION_REASON", default_value_t = false)]
        feature_hospitalization_reason: bool,

        /// Emit the "same as notifying facility" checkbox of a hospitalization
        #[arg(
            long,
            env = "FORMS_FEATURE_HOSPITALIZATION_COPY_CHECKBOXES",
            default_value_t = false
        )]
        feature_hospitalization_copy_checkboxes: bool,
    }

    let args = Args::parse();

    let mut source = FormSourceConfig::new(args.data_dir);
    source.common_questionnaire = args.common_questionnaire;
    source.features = FeatureFlags {
        group_labels_as_panels: args.feature_group_panels,
        hospitalization_reason: args.feature_hospitalization_reason,
        hospitalization_copy_checkboxes: args.feature_hospitalization_copy_checkboxes,
    };

    ServerConfig {
        port: args.port,
        host: args.host,
        log_level: args.log_level,
        request_timeout: args.request_timeout,
        enable_cors: args.enable_cors,
        cors_origins: args.cors_origins,
        cors_methods: args.cors_methods,
        cors_headers: args.cors_headers,
        source,
    }
}

fn create_app_with_config(store: Arc<FormStore>, config: &ServerConfig) -> Router {
    use std::time::Duration;
    use tower::ServiceBuilder;
    use tower_http::timeout::TimeoutLayer;

    let mut app = Router::new()
        .route("/forms", get(handlers::list_forms))
        .route("/forms/$reload", post(handlers::reload))
        .route("/forms/{key}", get(handlers::get_form))
        .route("/health", get(handlers::health_check))
        .with_state(store)
        .layer(
            ServiceBuilder::new()
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(config.request_timeout),
                ))
                .into_inner(),
        );

    if config.enable_cors {
        app = app.layer(build_cors_layer(config));
    }

    app = app.layer(TraceLayer::new_for_http());

    app
}

/// Build CORS layer from configuration
///
/// - **Origins**: Use "*" for any origin, or provide a comma-separated list of allowed origins
/// - **Methods**: Use "*" for any method, or provide a comma-separated list (e.g., "GET,POST,OPTIONS")
/// - **Headers**: Use "*" for any header, or provide a comma-separated list of allowed headers
///
/// Note: When using wildcards (*), credentials are disabled for security.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin};

    let mut cors = CorsLayer::new();

    let using_wildcard_origin = config.cors_origins == "*";
    let using_wildcard_methods = config.cors_methods == "*";
    let using_wildcard_headers = config.cors_headers == "*";
    let using_any_wildcard =
        using_wildcard_origin || using_wildcard_methods || using_wildcard_headers;

    if using_wildcard_origin {
        cors = cors.allow_origin(AllowOrigin::any());
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    if using_wildcard_methods {
        cors = cors.allow_methods(AllowMethods::any());
    } else {
        let methods: Vec<Method> = config
            .cors_methods
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .filter_map(|s| Method::from_bytes(s.as_bytes()).ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    if using_wildcard_headers {
        cors = cors.allow_headers(AllowHeaders::any());
    } else {
        let headers: Vec<http::HeaderName> = config
            .cors_headers
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    if !using_any_wildcard {
        cors = cors.allow_credentials(true);
    } else {
        info!("CORS: Using wildcards, credentials are disabled for security");
    }

    cors
}
