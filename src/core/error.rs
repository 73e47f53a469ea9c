//! 同步引擎错误类型

use thiserror::Error;

/// 引擎统一错误：任何一类错误都会中止整个进行中的操作，
/// 不做部分成功汇报，也不做自动重试
#[derive(Debug, Error)]
pub enum SyncError {
    /// 握手、认证或 SFTP 子系统建立失败
    #[error("连接失败: {0}")]
    Connection(String),

    /// 本地或远端目录枚举失败
    #[error("目录枚举失败: {0}")]
    Enumeration(String),

    /// 文件复制、目录创建或时间戳恢复失败
    #[error("传输失败: {0}")]
    Transfer(String),

    /// 为外部对比工具拉取远端文件失败
    #[error("获取对比文件失败: {0}")]
    PreviewFetch(String),

    /// 在 init 之前调用了需要连接的操作
    #[error("会话尚未连接")]
    NotConnected,
}

impl SyncError {
    pub fn connection(err: impl std::fmt::Display) -> Self {
        SyncError::Connection(err.to_string())
    }

    pub fn enumeration(err: impl std::fmt::Display) -> Self {
        SyncError::Enumeration(err.to_string())
    }

    pub fn transfer(err: impl std::fmt::Display) -> Self {
        SyncError::Transfer(err.to_string())
    }

    pub fn preview(err: impl std::fmt::Display) -> Self {
        SyncError::PreviewFetch(err.to_string())
    }
}
