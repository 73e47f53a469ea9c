//! 为外部对比工具暂存远端文件
//!
//! 只负责把单个远端文件取到本地暂存目录，保留相对路径结构；
//! 与 push/pull 的计划机制无关，也不恢复时间戳。

use crate::core::error::SyncError;
use russh_sftp::client::SftpSession;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

/// 把 `remote_root/relative` 取到 `scratch_root/relative`，
/// 按需创建中间目录，返回暂存文件的本地路径
pub async fn fetch_for_diff(
    sftp: &SftpSession,
    remote_root: &str,
    relative: &str,
    scratch_root: &Path,
) -> Result<PathBuf, SyncError> {
    let remote_path = format!("{}/{}", remote_root.trim_end_matches('/'), relative);
    let scratch_path = scratch_root.join(relative);

    if let Some(parent) = scratch_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(SyncError::preview)?;
    }

    let mut source = sftp
        .open(remote_path.as_str())
        .await
        .map_err(SyncError::preview)?;
    let mut dest = tokio::fs::File::create(&scratch_path)
        .await
        .map_err(SyncError::preview)?;

    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = source.read(&mut buf).await.map_err(SyncError::preview)?;
        if n == 0 {
            break;
        }
        dest.write_all(&buf[..n]).await.map_err(SyncError::preview)?;
    }
    dest.flush().await.map_err(SyncError::preview)?;

    debug!("已暂存对比文件: {} -> {:?}", remote_path, scratch_path);
    Ok(scratch_path)
}
