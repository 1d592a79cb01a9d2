use std::sync::Arc;

use mcp_sse_bridge::{
    build_app,
    config::Config,
    logging,
    mcp::{server::SUPPORTED_PROTOCOL_VERSION, McpServer},
    session::Session,
    shutdown,
    telemetry::Telemetry,
    transport::TransportRegistry,
    AppState,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let session = Arc::new(Session::from_config(&config));
    let telemetry = Telemetry::create(session.clone(), &config);
    let server = Arc::new(McpServer::new(session.clone(), telemetry.clone()));

    let registry = TransportRegistry::new();
    let bind_socket = config.bind_socket()?;
    let app = build_app(AppState::new(registry.clone(), server));
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        protocol_version = SUPPORTED_PROTOCOL_VERSION,
        "sse server listening"
    );
    info!(
        api_base_url = %session.api_base_url(),
        has_api_credentials = session.credentials().is_some(),
        has_connection_string = config.connection_string.is_some(),
        telemetry = telemetry.is_enabled(),
        "server configuration"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown::signal(registry))
        .await?;
    Ok(())
}
