//! 同步器：一个实例对应一个会话配置，持有其活跃连接
//!
//! 连接状态封装为实例字段而非进程级全局量，各实例互不串扰，
//! 允许多个会话同时在线。同一实例上的并发调用共享同一条连接，
//! 相互之间不做隔离。

use crate::core::connection::SessionConnection;
use crate::core::diff::compute_plan;
use crate::core::entry::{FileEntry, PlanEntry, SyncDirection};
use crate::core::error::SyncError;
use crate::core::ignore::IgnoreList;
use crate::core::preview;
use crate::core::transfer::{ProgressFn, TransferEngine};
use crate::core::walker::{LocalWalker, RemoteWalker, TreeWalk};
use crate::db::{SyncSession, Target};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

struct ActiveSession {
    session: SyncSession,
    target: Target,
    connection: SessionConnection,
}

#[derive(Default)]
pub struct Synchronizer {
    active: RwLock<Option<ActiveSession>>,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 连接目标并绑定会话配置。已有连接时先关闭旧连接再建新连接；
    /// 连接失败不会留下半可用状态
    pub async fn init(&self, target: Target, session: SyncSession) -> Result<(), SyncError> {
        let mut guard = self.active.write().await;
        if let Some(prev) = guard.take() {
            info!("关闭上一个连接: {}", prev.target.host);
            prev.connection.close().await;
        }

        let connection = SessionConnection::connect(&target).await?;
        *guard = Some(ActiveSession {
            session,
            target,
            connection,
        });
        Ok(())
    }

    /// 断开当前连接（若有）。依赖它的在途操作将以失败结束
    pub async fn close(&self) {
        if let Some(prev) = self.active.write().await.take() {
            prev.connection.close().await;
        }
    }

    /// 取当前会话配置的副本
    pub async fn session(&self) -> Result<SyncSession, SyncError> {
        let guard = self.active.read().await;
        let active = guard.as_ref().ok_or(SyncError::NotConnected)?;
        Ok(active.session.clone())
    }

    /// 枚举本地树
    pub async fn list_local(&self, nested: bool) -> Result<Vec<FileEntry>, SyncError> {
        let (session, _) = self.session_parts().await?;
        let ignore = Arc::new(IgnoreList::parse(&session.fileIgnoreList));
        LocalWalker::new(&session.localPath, session.recursive, ignore)
            .walk(nested)
            .await
    }

    /// 枚举远端树
    pub async fn list_remote(&self, nested: bool) -> Result<Vec<FileEntry>, SyncError> {
        let (session, sftp) = self.session_parts().await?;
        let ignore = Arc::new(IgnoreList::parse(&session.fileIgnoreList));
        RemoteWalker::new(sftp, session.remotePath.clone(), session.recursive, ignore)
            .walk(nested)
            .await
    }

    /// 对比两侧并产出传输计划。两侧的平铺枚举并发进行，
    /// 共享同一份忽略规则
    pub async fn transfer_list(
        &self,
        direction: SyncDirection,
        filter: &HashSet<String>,
    ) -> Result<Vec<PlanEntry>, SyncError> {
        let (session, sftp) = self.session_parts().await?;
        let ignore = Arc::new(IgnoreList::parse(&session.fileIgnoreList));

        let local = LocalWalker::new(&session.localPath, session.recursive, ignore.clone());
        let remote = RemoteWalker::new(
            sftp,
            session.remotePath.clone(),
            session.recursive,
            ignore,
        );
        let (local_entries, remote_entries) =
            tokio::try_join!(local.walk(false), remote.walk(false))?;

        let plan = match direction {
            SyncDirection::Push => {
                compute_plan(direction, &local_entries, &remote_entries, filter)
            }
            SyncDirection::Pull => {
                compute_plan(direction, &remote_entries, &local_entries, filter)
            }
        };
        Ok(plan)
    }

    /// 执行传输计划
    pub async fn execute(
        &self,
        direction: SyncDirection,
        plan: Vec<PlanEntry>,
        on_progress: ProgressFn,
    ) -> Result<(), SyncError> {
        let (session, sftp) = self.session_parts().await?;
        TransferEngine::new(sftp, &session.localPath, session.remotePath.clone())
            .transfer(direction, plan, on_progress)
            .await
    }

    /// 把单个远端文件取到暂存目录，返回暂存路径
    pub async fn fetch_for_diff(
        &self,
        relative: &str,
        scratch_root: &Path,
    ) -> Result<PathBuf, SyncError> {
        let (session, sftp) = self.session_parts().await?;
        preview::fetch_for_diff(&sftp, &session.remotePath, relative, scratch_root).await
    }

    async fn session_parts(
        &self,
    ) -> Result<(SyncSession, Arc<russh_sftp::client::SftpSession>), SyncError> {
        let guard = self.active.read().await;
        let active = guard.as_ref().ok_or(SyncError::NotConnected)?;
        Ok((active.session.clone(), active.connection.sftp()))
    }
}
