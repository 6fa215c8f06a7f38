/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | DATABASE_PATH | ./data/orders.db | SQLite 数据库文件 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | SWEEP_INTERVAL_SECS | 300 | 预留过期清扫间隔（秒） |
/// | NOTIFICATION_CLEANUP_INTERVAL_SECS | 3600 | 过期通知清理间隔（秒） |
/// | NOTIFICATION_RETENTION_DAYS | 30 | 通知保留天数 |
/// | LOG_DIR | (空) | 设置后启用文件日志 |
///
/// # 示例
///
/// ```ignore
/// DATABASE_PATH=/data/orders.db HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 数据库文件路径
    pub database_path: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 预留过期清扫间隔（秒）
    pub sweep_interval_secs: u64,
    /// 过期通知清理间隔（秒）
    pub notification_cleanup_interval_secs: u64,
    /// 通知保留天数
    pub notification_retention_days: i64,
    /// 文件日志目录（未设置则只输出到终端）
    pub log_dir: Option<String>,
}

impl Config {
    /// 从环境变量加载配置，未设置的项使用默认值
    pub fn from_env() -> Self {
        Self {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./data/orders.db".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            sweep_interval_secs: std::env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(300),
            notification_cleanup_interval_secs: std::env::var(
                "NOTIFICATION_CLEANUP_INTERVAL_SECS",
            )
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3600),
            notification_retention_days: std::env::var("NOTIFICATION_RETENTION_DAYS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
        }
    }

    /// 使用自定义值覆盖部分配置，常用于测试场景
    pub fn with_overrides(database_path: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.database_path = database_path.into();
        config.http_port = http_port;
        config
    }

    /// 通知保留时长（毫秒）
    pub fn notification_retention_millis(&self) -> i64 {
        self.notification_retention_days * 24 * 60 * 60 * 1000
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
