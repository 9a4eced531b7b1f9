use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use hookrelay::auth::Authenticator;
use hookrelay::config::RelayConfig;
use hookrelay::options::Options;
use hookrelay::{
    server, telemetry, Broker, DeliveryHandler, Dispatcher, RedisBroker, ShutdownCoordinator,
    ShutdownSignal, COMPONENT,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let options = Options::parse();

    // 1. Initialize Logging
    telemetry::init(options.enable_debug);
    info!(component = COMPONENT, "Starting");

    if let Err(e) = run(options).await {
        error!(component = COMPONENT, error = %e, "Fatal error");
        std::process::exit(1);
    }
}

async fn run(options: Options) -> Result<(), Box<dyn std::error::Error>> {
    // 2. Options, configuration and secret
    let handle_path = options.handle_path()?.to_string();
    let config = RelayConfig::load_from(&options.config_file)?;
    let user_agent = config.user_agent_header()?;
    let secret = options.load_secret()?;

    // 3. Broker
    let broker: Arc<dyn Broker> = Arc::new(RedisBroker::connect(&config.broker).await?);

    // 4. Delivery pipeline
    let dispatcher = Dispatcher::new(broker.clone());
    let coordinator = ShutdownCoordinator::new(dispatcher.in_flight().clone(), broker);
    let handler = Arc::new(DeliveryHandler::new(
        Authenticator::new(secret),
        dispatcher,
        config.topic.clone(),
        user_agent,
    ));
    let app = server::app(handler, &handle_path);

    // 5. Shutdown wiring
    let shutdown = ShutdownSignal::new();
    let mut stop = shutdown.subscribe();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move { shutdown.wait().await }
    });

    // 6. Serve until signalled, then drain
    let addr = SocketAddr::from(([0, 0, 0, 0], options.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        addr = %addr,
        path = %format!("/{}", handle_path),
        topic = %config.topic,
        "hookrelay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = stop.recv().await;
        })
        .await?;

    info!("HTTP server stopped accepting requests");
    coordinator.drain().await;

    info!("Shutdown complete");
    Ok(())
}
