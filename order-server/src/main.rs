use order_server::{Config, Server, ServerState, init_logger, init_logger_with_file};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境与日志
    dotenv::dotenv().ok();
    let config = Config::from_env();
    match &config.log_dir {
        Some(dir) => init_logger_with_file(None, Some(dir)),
        None => init_logger(),
    }

    tracing::info!(environment = %config.environment, "Order server starting...");

    // 2. 初始化服务状态
    let state = ServerState::initialize(&config).await?;

    // 3. 启动 HTTP 服务器 (Server::run 会注册后台任务)
    let server = Server::with_state(config, state);
    server.run().await?;

    Ok(())
}
