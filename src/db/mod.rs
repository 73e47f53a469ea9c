#![allow(non_snake_case)]

pub mod models;
pub use models::*;

use anyhow::Result;
pub use sqlx::SqlitePool;

impl Target {
    /// 从数据库加载所有目标
    pub async fn load_all(pool: &SqlitePool) -> Result<Vec<Target>> {
        let rows = sqlx::query_as::<_, TargetRow>("SELECT * FROM targets ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(Target::from).collect())
    }

    /// 从数据库加载单个目标
    pub async fn load(pool: &SqlitePool, id: &str) -> Result<Option<Target>> {
        let row = sqlx::query_as::<_, TargetRow>("SELECT * FROM targets WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Target::from))
    }

    /// 保存到数据库
    pub async fn save(&self, pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO targets (id, name, host, username, password, keyfile_path, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                host = excluded.host,
                username = excluded.username,
                password = excluded.password,
                keyfile_path = excluded.keyfile_path,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.id)
        .bind(&self.name)
        .bind(&self.host)
        .bind(&self.username)
        .bind(&self.password)
        .bind(&self.keyfilePath)
        .bind(self.createdAt)
        .bind(self.updatedAt)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// 从数据库删除
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM targets WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// 创建新目标
    pub fn new(
        name: String,
        host: String,
        username: String,
        password: String,
        keyfilePath: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            host,
            username,
            password,
            keyfilePath,
            createdAt: now,
            updatedAt: now,
        }
    }
}

impl SyncSession {
    /// 从数据库加载所有会话配置
    pub async fn load_all(pool: &SqlitePool) -> Result<Vec<SyncSession>> {
        let rows =
            sqlx::query_as::<_, SyncSessionRow>("SELECT * FROM sessions ORDER BY created_at DESC")
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(SyncSession::from).collect())
    }

    /// 从数据库加载单个会话配置
    pub async fn load(pool: &SqlitePool, id: &str) -> Result<Option<SyncSession>> {
        let row = sqlx::query_as::<_, SyncSessionRow>("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(SyncSession::from))
    }

    /// 保存到数据库
    pub async fn save(&self, pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, name, target_id, local_path, remote_path, recursive, file_ignore_list, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                target_id = excluded.target_id,
                local_path = excluded.local_path,
                remote_path = excluded.remote_path,
                recursive = excluded.recursive,
                file_ignore_list = excluded.file_ignore_list,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.id)
        .bind(&self.name)
        .bind(&self.targetId)
        .bind(&self.localPath)
        .bind(&self.remotePath)
        .bind(self.recursive)
        .bind(&self.fileIgnoreList)
        .bind(self.createdAt)
        .bind(self.updatedAt)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// 从数据库删除
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// 创建新会话配置
    pub fn new(
        name: String,
        targetId: String,
        localPath: String,
        remotePath: String,
        recursive: bool,
        fileIgnoreList: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            targetId,
            localPath,
            remotePath,
            recursive,
            fileIgnoreList,
            createdAt: now,
            updatedAt: now,
        }
    }
}

impl Settings {
    /// 加载设置；数据库中尚未保存过时返回默认值
    pub async fn load(pool: &SqlitePool) -> Result<Settings> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT diff_tool_invocation, temp_folder, clear_temp_folder FROM settings WHERE id = 'default'",
        )
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Settings::from).unwrap_or_default())
    }

    /// 保存设置（单行 upsert）
    pub async fn save(&self, pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (id, diff_tool_invocation, temp_folder, clear_temp_folder)
            VALUES ('default', ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                diff_tool_invocation = excluded.diff_tool_invocation,
                temp_folder = excluded.temp_folder,
                clear_temp_folder = excluded.clear_temp_folder
            "#,
        )
        .bind(&self.diffToolInvocation)
        .bind(&self.tempFolder)
        .bind(self.clearTempFolder)
        .execute(pool)
        .await?;

        Ok(())
    }
}
