use backup_server::{BackgroundTasks, Config, Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 加载 .env 和配置
    dotenv::dotenv().ok();
    let config = Config::from_env();

    // 2. 日志
    setup_environment(&config)?;
    print_banner();
    tracing::info!(environment = %config.environment, "Backup server starting...");
    tracing::debug!(config = ?config.backup, "Backup configuration");

    // 3. 初始化状态和备份调度器
    let mut tasks = BackgroundTasks::new();
    let (state, scheduler) = ServerState::initialize(&config, tasks.shutdown_token()).await?;
    tasks.spawn("backup_scheduler", scheduler.run());

    // 4. HTTP 服务器，Ctrl+C 后优雅退出
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutting down...");
    };
    let result = Server::with_state(config, state).run(shutdown).await;

    // 5. 等待进行中的备份完成
    tasks.shutdown().await;

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }
    Ok(())
}
