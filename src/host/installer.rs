// `metricmaster install --ws <id>`: publish the bot to a workspace marketplace.

use std::path::Path;

use anyhow::Context;
use base64::Engine;
use tracing::{debug, info, warn};

use crate::core::scheduler::HOOKS;
use crate::core::setup::{build_registration, MarketplaceApi, Pictures};

pub const BIG_PICTURE: &str = "metricmaster-1024x1536.webp";
pub const SMALL_PICTURE: &str = "metricmaster-256x256.webp";

/// Base64 of a picture file, or an empty string when it is not there.
pub async fn load_picture(dir: &Path, file_name: &str) -> String {
    let path = dir.join(file_name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => base64::engine::general_purpose::STANDARD.encode(bytes),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Marketplace picture missing");
            String::new()
        }
    }
}

/// Refuse to publish a cron table the host would misread.
pub fn validate_schedules() -> anyhow::Result<()> {
    for hook in HOOKS {
        let when = hook
            .schedule()
            .with_context(|| format!("hook {} has an invalid schedule", hook.sched_type))?;
        debug!(sched_type = hook.sched_type, when = %when, "Hook schedule ok");
    }
    Ok(())
}

pub async fn install(
    ws_id: &str,
    marketplace: &dyn MarketplaceApi,
    pictures_dir: &Path,
) -> anyhow::Result<()> {
    validate_schedules()?;
    let pictures = Pictures {
        big_b64: load_picture(pictures_dir, BIG_PICTURE).await,
        small_b64: load_picture(pictures_dir, SMALL_PICTURE).await,
    };
    let registration = build_registration(ws_id, pictures);

    marketplace
        .upsert_bot(&registration)
        .await
        .with_context(|| format!("failed to register bot in workspace {}", ws_id))?;

    info!(
        ws_id = ws_id,
        name = %registration.marketable_name,
        version = %registration.marketable_version,
        "Bot registered in marketplace"
    );
    Ok(())
}
