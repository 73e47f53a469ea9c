#![allow(non_snake_case)]

use serde::{Deserialize, Serialize};

/// 远端目标
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: String,
    pub name: String,
    pub host: String,
    pub username: String,
    /// 空串表示未设置
    #[serde(default)]
    pub password: String,
    /// 空串表示未设置；非空时优先于密码
    #[serde(default)]
    pub keyfilePath: String,
    pub createdAt: i64,
    pub updatedAt: i64,
}

impl Target {
    /// 认证优先级：keyfilePath 非空时用私钥，否则用密码
    pub fn keyfile_path(&self) -> Option<&str> {
        let path = self.keyfilePath.trim();
        if path.is_empty() {
            None
        } else {
            Some(path)
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

/// 同步会话配置
///
/// 对一次连接而言是不可变的：修改配置后需要重新 init
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSession {
    pub id: String,
    pub name: String,
    pub targetId: String,
    pub localPath: String,
    pub remotePath: String,
    pub recursive: bool,
    /// 按行分隔的忽略规则文本
    #[serde(default)]
    pub fileIgnoreList: String,
    pub createdAt: i64,
    pub updatedAt: i64,
}

/// 应用设置（单行，id 固定为 default）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// 外部对比工具命令模板，支持 %file% / %localfile% / %remotefile% 占位符
    pub diffToolInvocation: String,
    /// 暂存目录模板，支持 %appdir% 占位符
    pub tempFolder: String,
    /// 对比结束后是否清理暂存目录
    pub clearTempFolder: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            diffToolInvocation: String::new(),
            tempFolder: "%appdir%/tmp".to_string(),
            clearTempFolder: true,
        }
    }
}

// 数据库表模型
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TargetRow {
    pub id: String,
    pub name: String,
    pub host: String,
    pub username: String,
    pub password: String,
    pub keyfile_path: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<TargetRow> for Target {
    fn from(row: TargetRow) -> Self {
        Target {
            id: row.id,
            name: row.name,
            host: row.host,
            username: row.username,
            password: row.password,
            keyfilePath: row.keyfile_path,
            createdAt: row.created_at,
            updatedAt: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncSessionRow {
    pub id: String,
    pub name: String,
    pub target_id: String,
    pub local_path: String,
    pub remote_path: String,
    pub recursive: bool,
    pub file_ignore_list: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<SyncSessionRow> for SyncSession {
    fn from(row: SyncSessionRow) -> Self {
        SyncSession {
            id: row.id,
            name: row.name,
            targetId: row.target_id,
            localPath: row.local_path,
            remotePath: row.remote_path,
            recursive: row.recursive,
            fileIgnoreList: row.file_ignore_list,
            createdAt: row.created_at,
            updatedAt: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SettingsRow {
    pub diff_tool_invocation: String,
    pub temp_folder: String,
    pub clear_temp_folder: bool,
}

impl From<SettingsRow> for Settings {
    fn from(row: SettingsRow) -> Self {
        Settings {
            diffToolInvocation: row.diff_tool_invocation,
            tempFolder: row.temp_folder,
            clearTempFolder: row.clear_temp_folder,
        }
    }
}
