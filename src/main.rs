use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use retro_social_client::{
    utils::{format_timestamp, parse_smilies},
    AppState, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.clone()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Retro Social sync client against {}", config.api_base_url);

    let state = AppState::connect(config.clone())?;

    // 未登录时尝试使用环境变量中的凭据
    if !state.is_authenticated() {
        match (env::var("SYNC_USERNAME"), env::var("SYNC_PASSWORD")) {
            (Ok(username), Ok(password)) => state.login(&username, &password).await?,
            _ => {
                error!("No saved session; set SYNC_USERNAME and SYNC_PASSWORD to log in");
                return Err(anyhow::anyhow!("Not authenticated"));
            }
        }
    }

    // 通知
    let unread = state.notifications.load_all().await;
    info!("{} unread notifications", unread);
    for item in state.notifications.feed().iter().take(10) {
        info!("[{}] {}", format_timestamp(&item.created_at()), item.summary());
    }
    let notification_poller = state.notifications.start_polling(&config);

    // 会话
    let view = state.messaging_view(1024);
    if !view.refresh().await {
        warn!("Conversation list unavailable, retrying every {:?}", config.notification_poll_interval());
    }
    if let Ok(username) = env::var("OPEN_CONVERSATION") {
        match view.open_with_user(&username).await {
            Ok(conversation) => info!("Following conversation {} with {}", conversation.id, username),
            Err(e) => error!("Could not open conversation with {}: {}", username, e),
        }
    }
    for message in view.messages() {
        info!(
            "{} {}: {}",
            format_timestamp(&message.created_at),
            message.sender_username,
            parse_smilies(&message.content)
        );
    }

    // 未打开会话时没有消息轮询，会话列表在这里定期刷新
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut refresh = tokio::time::interval(config.notification_poll_interval());
    refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    refresh.tick().await;
    loop {
        tokio::select! {
            res = &mut shutdown => {
                res?;
                break;
            }
            _ = refresh.tick() => {
                if view.store().selected_id().is_none() && !view.refresh().await {
                    warn!("Conversation list still unavailable");
                }
            }
        }
    }
    info!("Shutting down...");

    view.shutdown();
    notification_poller.stop();

    Ok(())
}
