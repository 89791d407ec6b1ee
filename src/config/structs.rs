use serde::{Deserialize, Serialize};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 静态配置（从 TOML + 环境变量加载，启动时使用）
///
/// - server: 监听地址、对外公开的基础 URL
/// - database: 会话表所在的关系型数据库
/// - kv: 别名 / 标记所在的 KV 存储
/// - session: 会话存储后端选择
/// - alias: 别名生成参数
/// - origin / hub / analytics: 三个外部 HTTP 协作方
/// - tracking: 追踪任务队列
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub kv: KvConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub alias: AliasConfig,
    #[serde(default)]
    pub origin: OriginConfig,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：FL，分隔符：__
    /// 示例：FL__SERVER__PORT=9999
    pub fn load(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("FL")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// 生成别名链接时使用的公开地址（不带结尾斜杠）
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// KV 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvConfig {
    #[serde(rename = "type")]
    #[serde(default = "default_kv_type")]
    pub kv_type: String,
    #[serde(default)]
    pub redis: RedisConfig,
}

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
}

/// 会话存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// "database"（sessions 表）或 "kv"（与别名共用 KV）
    #[serde(default = "default_session_backend")]
    pub backend: String,
}

/// 别名配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasConfig {
    #[serde(default = "default_alias_id_length")]
    pub id_length: usize,
}

/// 源站请求配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    #[serde(default = "default_origin_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Farcaster Hub 配置（签名校验 + 用户资料）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_hub_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_hub_timeout")]
    pub timeout_secs: u64,
}

/// 分析上报配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_us_endpoint")]
    pub us_endpoint: String,
    #[serde(default = "default_eu_endpoint")]
    pub eu_endpoint: String,
    #[serde(default = "default_analytics_timeout")]
    pub timeout_secs: u64,
}

/// 追踪队列配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_tracking_workers")]
    pub workers: usize,
    #[serde(default = "default_tracking_queue_capacity")]
    pub queue_capacity: usize,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_public_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_database_url() -> String {
    "sqlite://framelinker.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_kv_type() -> String {
    "memory".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_redis_key_prefix() -> String {
    "framelinker:".to_string()
}

fn default_session_backend() -> String {
    "database".to_string()
}

fn default_alias_id_length() -> usize {
    8
}

fn default_origin_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("framelinker/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_hub_url() -> String {
    "https://hub.pinata.cloud".to_string()
}

fn default_hub_timeout() -> u64 {
    5
}

fn default_us_endpoint() -> String {
    "https://us.i.posthog.com".to_string()
}

fn default_eu_endpoint() -> String {
    "https://eu.i.posthog.com".to_string()
}

fn default_analytics_timeout() -> u64 {
    5
}

fn default_tracking_workers() -> usize {
    4
}

fn default_tracking_queue_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_file() -> Option<String> {
    None
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            public_url: default_public_url(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            kv_type: default_kv_type(),
            redis: RedisConfig::default(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: default_session_backend(),
        }
    }
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            id_length: default_alias_id_length(),
        }
    }
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_origin_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            url: default_hub_url(),
            api_key: None,
            timeout_secs: default_hub_timeout(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            us_endpoint: default_us_endpoint(),
            eu_endpoint: default_eu_endpoint(),
            timeout_secs: default_analytics_timeout(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            workers: default_tracking_workers(),
            queue_capacity: default_tracking_queue_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: default_log_file(),
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}
