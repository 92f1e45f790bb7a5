use std::sync::Arc;

use anyhow::Context;
use streak_master::{
    clock::SystemClock,
    delivery::{DisabledPushSender, FcmPushSender, PushSender},
    dispatch::{ReminderDispatcher, ticker},
    settings::Settings,
    storage::sqlite::{self, reminder_storage::SqliteReminderStorage},
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = Settings::load().context("failed to load settings")?;
    log::info!(
        "Starting reminder dispatch. [timezone = {}, interval = {:?}]",
        settings.dispatch.timezone,
        settings.dispatch.interval()
    );

    let pool = sqlite::connect(&settings.database)
        .await
        .context("failed to open reminder database")?;
    let reminder_storage = Arc::new(SqliteReminderStorage::new(pool));

    let push: Arc<dyn PushSender> = match settings.push.server_key.as_deref() {
        Some(server_key) => Arc::new(FcmPushSender::new(&settings.push, server_key)?),
        None => {
            log::warn!("push.server_key is not set, push reminders will fail to deliver");
            Arc::new(DisabledPushSender)
        }
    };

    let dispatcher = Arc::new(ReminderDispatcher::new(
        reminder_storage,
        push,
        settings.dispatch.timezone,
    ));

    let shutdown = CancellationToken::new();
    let ticker = ticker::spawn(
        dispatcher,
        Arc::new(SystemClock),
        settings.dispatch.interval(),
        shutdown.clone(),
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    log::info!("Shutdown requested");

    shutdown.cancel();
    ticker.await?;

    Ok(())
}
