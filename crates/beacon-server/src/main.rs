mod auth;
mod handlers;
mod state;

use axum::routing::{get, post};
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let state = Arc::new(AppState::initialize()?);
    let bind_addr = state.config.server.bind_addr.clone();

    let app = Router::new()
        .route("/api/login", post(handlers::login))
        .route("/api/getEmails", get(handlers::get_emails))
        .route("/api/getSentEmails", get(handlers::get_sent_emails))
        .route("/api/getEmailById", get(handlers::get_email_by_id))
        .route("/api/sendEmail", post(handlers::send_email))
        .route("/api/trackOpen", get(handlers::track_open))
        .route("/api/update-seen", post(handlers::update_seen))
        .route("/api/addLead", post(handlers::add_lead))
        .route("/api/getLeads", get(handlers::get_leads))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "dashboard API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
