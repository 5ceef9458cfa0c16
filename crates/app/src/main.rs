//! ProfileSync - session-to-profile reconciliation service
//!
//! Loads configuration, starts the reconciler and logs every observed state
//! transition until Ctrl-C.

use anyhow::Context;
use profilesync_domain::AuthSnapshot;
use profilesync_infra::config;
use profilesync_infra::observability::init_tracing;
use profilesync_lib::AppContext;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load().context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialise tracing")?;

    info!(version = env!("CARGO_PKG_VERSION"), "ProfileSync starting...");

    let ctx = AppContext::new(config).context("failed to build application context")?;
    ctx.start().context("failed to start session reconciler")?;

    let mut states = ctx.reconciler.subscribe();
    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    warn!("state channel closed");
                    break;
                }
                let snapshot = states.borrow_and_update().clone();
                log_transition(&snapshot);
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("shutdown requested");
                break;
            }
        }
    }

    ctx.shutdown().await.context("failed to shut down cleanly")?;
    Ok(())
}

fn log_transition(snapshot: &AuthSnapshot) {
    info!(
        epoch = snapshot.epoch,
        phase = %snapshot.phase,
        ready = snapshot.ready,
        principal_id = snapshot.principal.as_ref().map_or("-", |p| p.id.as_str()),
        username = snapshot.profile.as_ref().map_or("-", |p| p.username.as_str()),
        role = snapshot.profile.as_ref().map_or("-", |p| p.role.as_str()),
        "auth state changed"
    );
}
