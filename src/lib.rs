use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub mod commands;
pub mod core;
pub mod db;
pub mod logging;

pub use crate::core::{SyncDirection, Synchronizer};
pub use crate::db::{Settings, SyncSession, Target};

/// 应用状态，在 Tauri 命令中共享
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub config_dir: PathBuf,
    /// 每个会话配置一个同步器实例；实例之间的连接状态互不串扰
    pub synchronizers: Arc<Mutex<HashMap<String, Arc<Synchronizer>>>>,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        // 获取默认应用配置目录
        let default_config_dir = dirs::config_dir()
            .map(|p| p.join("filesync"))
            .unwrap_or_else(|| PathBuf::from(".filesync"));

        std::fs::create_dir_all(&default_config_dir)?;

        // 尝试读取自定义数据路径
        let config_file = default_config_dir.join("config.json");
        let config_dir = std::fs::read_to_string(&config_file)
            .ok()
            .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
            .and_then(|config| config.get("data_path")?.as_str().map(PathBuf::from))
            .filter(|p| p.exists() && p.is_dir())
            .inspect(|p| tracing::debug!("使用自定义数据路径: {:?}", p))
            .unwrap_or(default_config_dir);

        std::fs::create_dir_all(&config_dir)?;

        // 初始化数据库（带连接池配置）
        let db_path = config_dir.join("filesync.db");
        // SQLite 连接字符串格式: sqlite://path 或 sqlite:path
        // Windows 路径需要转换反斜杠为正斜杠
        let db_path_str = db_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid database path"))?
            .replace('\\', "/");

        let db = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(&format!("sqlite:{}?mode=rwc", db_path_str))
            .await?;

        // 运行数据库迁移
        sqlx::migrate!("./migrations").run(&db).await?;

        Ok(Self {
            db: Arc::new(db),
            config_dir,
            synchronizers: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// 取（或创建）某个会话的同步器实例
    pub async fn synchronizer(&self, session_id: &str) -> Arc<Synchronizer> {
        let mut map = self.synchronizers.lock().await;
        map.entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Synchronizer::new()))
            .clone()
    }

    /// 清理资源（应用关闭时调用）
    pub async fn cleanup(&self) {
        tracing::info!("正在清理应用资源...");

        // 1. 断开所有活跃连接
        {
            let mut map = self.synchronizers.lock().await;
            for (session_id, sync) in map.drain() {
                tracing::debug!("断开会话连接: {}", session_id);
                sync.close().await;
            }
        }

        // 2. 关闭数据库连接池
        tracing::debug!("关闭数据库连接池...");
        self.db.close().await;

        tracing::info!("资源清理完成");
    }
}

// 平台配置目录
pub mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            // Linux
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        }
    }
}
