pub mod bootstrap;
pub mod config;
pub mod mqtt;
pub mod retry;
pub mod runtime;
pub mod topic;
pub mod wifi;

#[cfg(test)]
mod testing;

use crate::bootstrap::{BootstrapSettings, ConnectivityBootstrap, Online};
use crate::config::{BootstrapConfig, ConfigStore, MessageHandler};
use crate::mqtt::callback::{dependum_callback, forwarding_callback, log_callback};
use crate::mqtt::message_manager::MsgManager;
use crate::mqtt::mqtt_handler::RumqttClient;
use crate::mqtt::MessageCallback;
use crate::runtime::Publisher;
use color_eyre::{eyre::eyre, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

const MESSAGE_CHANNEL_CAPACITY: usize = 100;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let store = ConfigStore::resolve()?;
    store.ensure_default_config().await?;
    let (config, secrets) = store.load().await?;

    setup_logging_env(config.debug);
    info!("Configuration loaded from {:?}", store.dir());

    let settings = config::bootstrap_settings(&config, &secrets);
    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let callback = message_callback(&config);
    let online = tokio::select! {
        _ = shutdown.cancelled() => {
            info!("Shutdown requested during bootstrap");
            return Ok(());
        }
        result = boot(&config, settings, callback) => {
            result.map_err(|e| eyre!("Bootstrap failed: {}", e))?
        }
    };

    let publishers = config
        .publishers
        .iter()
        .map(|p| Publisher::new(p.clone(), online.client_id()))
        .collect();

    let online = runtime::run_until_shutdown(online, publishers, shutdown)
        .await
        .map_err(|e| eyre!("Service loop failed: {}", e))?;

    let (_wifi, mqtt) = online.into_parts();
    info!(
        "Shutting down (broker session {})",
        if mqtt.connected() { "open" } else { "closed" }
    );
    Ok(())
}

async fn boot(
    config: &BootstrapConfig,
    settings: BootstrapSettings,
    callback: MessageCallback,
) -> Result<ConnectivityBootstrap<Online>, bootstrap::BootstrapError> {
    let wifi = config.wifi.build_driver();
    let mqtt = Box::new(RumqttClient::new(&config.mqtt));
    bootstrap::run(wifi, mqtt, settings, callback).await
}

/// Builds the configured callback; `Forward` also starts the consumer task
fn message_callback(config: &BootstrapConfig) -> MessageCallback {
    match config.message_handler {
        MessageHandler::Log => log_callback(),
        MessageHandler::Dependum => dependum_callback(),
        MessageHandler::Forward => {
            let MsgManager {
                received_msg,
                mut distribution_msg,
            } = MsgManager::with_capacity(MESSAGE_CHANNEL_CAPACITY);
            tokio::spawn(async move {
                while let Some(message) = distribution_msg.recv().await {
                    info!("{}", message.render());
                }
            });
            forwarding_callback(received_msg)
        }
    }
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received");
                shutdown.cancel();
            }
            Err(e) => error!("Unable to listen for shutdown signal: {}", e),
        }
    });
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    Ok(())
}

fn setup_logging_env(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
