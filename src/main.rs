mod api;
mod commands;
mod config;
mod controller;
mod error;
mod handlers;
mod models;
mod session;
mod view;

use api::HttpBackend;
use config::{AppConfig, SessionConfig};
use controller::VotingController;
use log::{error, info, warn};
use session::SessionStore;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::oneshot;

#[tokio::main]
async fn main() {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    // Configuration is resolved once and injected
    let app_config = AppConfig::from_env();
    let session_config = SessionConfig::from_env();

    let backend = match HttpBackend::new(&app_config) {
        Ok(backend) => backend,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return;
        }
    };
    info!("Talking to backend at {}", backend.base_url());

    let store = SessionStore::open(&session_config.session_dir, &session_config.session_id);
    if store.is_degraded() {
        warn!("Session will not survive a restart");
    }
    if session_config.resumed {
        info!("Resuming session {}", session_config.session_id);
    } else {
        println!(
            "Nova sessão {}. Para a retomar: BOOTH_SESSION_ID={}",
            session_config.session_id, session_config.session_id
        );
    }

    let controller = Arc::new(VotingController::new(backend, app_config, store));
    if controller.config().is_online_demo {
        warn!("Running as online demo; the backend may be unreachable");
    }
    controller.hydrate();
    println!("{}", view::render(&controller.view()));
    println!("Escreva 'help' para ver os comandos.");

    // Redraw whenever the controller reports a change, flushing the last one on shutdown
    let mut changes = controller.subscribe();
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let renderer = Arc::clone(&controller);
    let render_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    println!("{}", view::render(&renderer.view()));
                }
                _ = &mut stop_rx => break,
            }
        }
    });

    handlers::run_commands(&controller, BufReader::new(tokio::io::stdin())).await;

    let _ = stop_tx.send(());
    if let Err(e) = render_task.await {
        error!("Renderer stopped abnormally: {}", e);
    }
    info!("Leaving; session {} is kept until cleared", session_config.session_id);
}
