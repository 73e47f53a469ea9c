//! 传输计划执行
//!
//! 有界并发执行计划条目：同时在途最多 20 项，超出的条目等待空位。
//! 进度是跨所有在途文件共享的累计字节数，谁先完成一个分块谁就推进
//! 计数器，因此并发期间百分比可能看起来跨文件乱序，这是有意的——
//! 它反映总体吞吐而非单文件进度。

use crate::core::entry::{PlanEntry, SyncDirection, TransferIntent};
use crate::core::error::SyncError;
use async_trait::async_trait;
use filetime::FileTime;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::FileAttributes;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// 同时在途的计划条目上限
pub const MAX_CONCURRENT_TRANSFERS: usize = 20;

/// 流式复制的分块大小
const CHUNK_SIZE: usize = 64 * 1024;

/// 进度回调：(filename, 累计已传输字节, 总字节)
pub type ProgressFn = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

/// 统计一次计划的总字节数：对所有条目的 size 求和，
/// 在整个操作期间固定不变（目录条目 size 为 0，不贡献进度）
pub fn plan_total_bytes(plan: &[PlanEntry]) -> u64 {
    plan.iter().map(|p| p.entry.size).sum()
}

/// 远端目录的探测与创建，从 SFTP 会话上抽出便于单测
#[async_trait]
trait RemoteDirs: Sync {
    async fn dir_exists(&self, path: &str) -> bool;
    async fn make_dir(&self, path: &str) -> Result<(), String>;
}

#[async_trait]
impl RemoteDirs for SftpSession {
    async fn dir_exists(&self, path: &str) -> bool {
        self.metadata(path.to_string()).await.is_ok()
    }

    async fn make_dir(&self, path: &str) -> Result<(), String> {
        self.create_dir(path.to_string())
            .await
            .map_err(|e| e.to_string())
    }
}

/// 幂等建目录。stat 与 mkdir 之间并发在途的其他条目可能已把同一
/// 目录建出，服务器会拒绝第二个 mkdir；此时复查一次，目录已存在
/// 即视为成功，只有复查仍未命中才作为传输错误上报
async fn create_dir_if_absent<D: RemoteDirs + ?Sized>(
    dirs: &D,
    path: &str,
) -> Result<(), SyncError> {
    if dirs.dir_exists(path).await {
        return Ok(());
    }
    match dirs.make_dir(path).await {
        Ok(()) => {
            debug!("已创建远端目录: {}", path);
            Ok(())
        }
        Err(e) => {
            if dirs.dir_exists(path).await {
                Ok(())
            } else {
                Err(SyncError::Transfer(e))
            }
        }
    }
}

/// 逐级补齐远端父目录。计划顺序只是建议性的，并发下文件可能
/// 先于其父目录条目执行，因此复制前总是走一遍父链
async fn ensure_remote_parents<D: RemoteDirs + ?Sized>(
    dirs: &D,
    remote_path: &str,
) -> Result<(), SyncError> {
    let Some((parent, _)) = remote_path.rsplit_once('/') else {
        return Ok(());
    };

    let mut current = String::with_capacity(parent.len());
    for component in parent.split('/') {
        if component.is_empty() {
            current.push('/');
            continue;
        }
        if !current.is_empty() && !current.ends_with('/') {
            current.push('/');
        }
        current.push_str(component);

        create_dir_if_absent(dirs, &current).await?;
    }
    Ok(())
}

/// 分块流式复制。每写完一个分块推进共享计数器并回调一次进度
async fn copy_chunks<R, W>(
    source: &mut R,
    dest: &mut W,
    filename: &str,
    transferred: &AtomicU64,
    total_bytes: u64,
    on_progress: &ProgressFn,
) -> Result<(), SyncError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = source.read(&mut buf).await.map_err(SyncError::transfer)?;
        if n == 0 {
            break;
        }
        dest.write_all(&buf[..n]).await.map_err(SyncError::transfer)?;
        let cumulative = transferred.fetch_add(n as u64, Ordering::SeqCst) + n as u64;
        on_progress(filename, cumulative, total_bytes);
    }
    dest.flush().await.map_err(SyncError::transfer)
}

/// SFTP 属性里的时间戳是 u32 秒；纪元前取 0，2106 年后取上限
fn sftp_timestamp(modified: i64) -> u32 {
    modified.clamp(0, u32::MAX as i64) as u32
}

pub struct TransferEngine {
    sftp: Arc<SftpSession>,
    local_root: PathBuf,
    remote_root: String,
}

impl TransferEngine {
    pub fn new(
        sftp: Arc<SftpSession>,
        local_root: impl Into<PathBuf>,
        remote_root: impl Into<String>,
    ) -> Self {
        Self {
            sftp,
            local_root: local_root.into(),
            remote_root: remote_root.into(),
        }
    }

    /// 执行整个计划。首个错误中止整个操作并作为唯一结果上报，
    /// 不汇报部分成功，也不重试
    pub async fn transfer(
        &self,
        direction: SyncDirection,
        plan: Vec<PlanEntry>,
        on_progress: ProgressFn,
    ) -> Result<(), SyncError> {
        let total_bytes = plan_total_bytes(&plan);
        info!(
            "开始传输 ({:?}): {} 项, 共 {} 字节",
            direction,
            plan.len(),
            total_bytes
        );

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_TRANSFERS));
        let transferred = Arc::new(AtomicU64::new(0));
        let aborted = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(plan.len());

        for item in plan {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(SyncError::transfer)?;
            if aborted.load(Ordering::SeqCst) {
                break;
            }

            let sftp = self.sftp.clone();
            let local_path = self.local_root.join(&item.entry.filename);
            let remote_path = join_remote(&self.remote_root, &item.entry.filename);
            let transferred = transferred.clone();
            let aborted = aborted.clone();
            let on_progress = on_progress.clone();

            handles.push(tokio::spawn(async move {
                let result = match item.intent {
                    TransferIntent::CreateDir => match direction {
                        SyncDirection::Push => Self::create_remote_dir(&sftp, &remote_path).await,
                        SyncDirection::Pull => tokio::fs::create_dir_all(&local_path)
                            .await
                            .map_err(SyncError::transfer),
                    },
                    TransferIntent::CopyFile => match direction {
                        SyncDirection::Push => {
                            Self::push_file(
                                &sftp,
                                &local_path,
                                &remote_path,
                                &item.entry.filename,
                                item.entry.modifiedUnix,
                                &transferred,
                                total_bytes,
                                &on_progress,
                            )
                            .await
                        }
                        SyncDirection::Pull => {
                            Self::pull_file(
                                &sftp,
                                &remote_path,
                                &local_path,
                                &item.entry.filename,
                                item.entry.modifiedUnix,
                                &transferred,
                                total_bytes,
                                &on_progress,
                            )
                            .await
                        }
                    },
                };

                if result.is_err() {
                    aborted.store(true, Ordering::SeqCst);
                }
                drop(permit);
                result
            }));
        }

        let mut first_error: Option<SyncError> = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(SyncError::transfer(e));
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(
                    "传输完成 ({:?}): 共 {} 字节",
                    direction,
                    transferred.load(Ordering::SeqCst)
                );
                Ok(())
            }
        }
    }

    async fn create_remote_dir(sftp: &SftpSession, remote_path: &str) -> Result<(), SyncError> {
        ensure_remote_parents(sftp, remote_path).await?;
        create_dir_if_absent(sftp, remote_path).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn push_file(
        sftp: &SftpSession,
        local_path: &Path,
        remote_path: &str,
        filename: &str,
        modified: i64,
        transferred: &AtomicU64,
        total_bytes: u64,
        on_progress: &ProgressFn,
    ) -> Result<(), SyncError> {
        ensure_remote_parents(sftp, remote_path).await?;

        let mut source = tokio::fs::File::open(local_path)
            .await
            .map_err(SyncError::transfer)?;
        let mut dest = sftp
            .create(remote_path)
            .await
            .map_err(SyncError::transfer)?;

        copy_chunks(
            &mut source,
            &mut dest,
            filename,
            transferred,
            total_bytes,
            on_progress,
        )
        .await?;
        dest.shutdown().await.map_err(SyncError::transfer)?;

        // 复制完成后把远端时间戳恢复为源侧 modifiedUnix
        let stamp = sftp_timestamp(modified);
        let attrs = FileAttributes {
            mtime: Some(stamp),
            atime: Some(stamp),
            ..Default::default()
        };
        sftp.set_metadata(remote_path, attrs)
            .await
            .map_err(SyncError::transfer)?;

        debug!("推送完成: {}", filename);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn pull_file(
        sftp: &SftpSession,
        remote_path: &str,
        local_path: &Path,
        filename: &str,
        modified: i64,
        transferred: &AtomicU64,
        total_bytes: u64,
        on_progress: &ProgressFn,
    ) -> Result<(), SyncError> {
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(SyncError::transfer)?;
        }

        let mut source = sftp
            .open(remote_path)
            .await
            .map_err(SyncError::transfer)?;
        let mut dest = tokio::fs::File::create(local_path)
            .await
            .map_err(SyncError::transfer)?;

        copy_chunks(
            &mut source,
            &mut dest,
            filename,
            transferred,
            total_bytes,
            on_progress,
        )
        .await?;
        drop(dest);

        let stamp = FileTime::from_unix_time(modified, 0);
        filetime::set_file_times(local_path, stamp, stamp).map_err(SyncError::transfer)?;

        debug!("拉取完成: {}", filename);
        Ok(())
    }
}

fn join_remote(root: &str, filename: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::FileEntry;
    use std::collections::HashSet;
    use std::io::Cursor;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[test]
    fn test_total_bytes_sums_all_entries_once() {
        let plan = vec![
            PlanEntry::from_entry(FileEntry::file("a".into(), "a".into(), 100, 0)),
            PlanEntry::from_entry(FileEntry::directory("d".into(), "d".into(), 0, 0)),
            PlanEntry::from_entry(FileEntry::file("d/b".into(), "b".into(), 50, 0)),
        ];
        assert_eq!(plan_total_bytes(&plan), 150);
        assert_eq!(plan_total_bytes(&[]), 0);
    }

    #[test]
    fn test_remote_path_join_handles_trailing_slash() {
        assert_eq!(join_remote("/srv/data/", "docs/a.txt"), "/srv/data/docs/a.txt");
        assert_eq!(join_remote("/srv/data", "a.txt"), "/srv/data/a.txt");
    }

    #[test]
    fn test_sftp_timestamp_clamps_out_of_range_values() {
        assert_eq!(sftp_timestamp(-5), 0);
        assert_eq!(sftp_timestamp(0), 0);
        assert_eq!(sftp_timestamp(1_700_000_000), 1_700_000_000);
        assert_eq!(sftp_timestamp(u32::MAX as i64 + 10), u32::MAX);
    }

    #[tokio::test]
    async fn test_chunk_copy_progress_is_monotonic_and_reaches_total() {
        let data: Vec<u8> = (0..150_000u32).map(|i| (i % 251) as u8).collect();
        let total = data.len() as u64;
        let mut source = Cursor::new(data.clone());
        let mut dest = Cursor::new(Vec::new());

        let transferred = AtomicU64::new(0);
        let seen: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        let on_progress: ProgressFn = Arc::new(move |filename, cumulative, total_bytes| {
            assert_eq!(filename, "big.bin");
            assert_eq!(total_bytes, 150_000);
            seen_cb.lock().unwrap().push(cumulative);
        });

        copy_chunks(
            &mut source,
            &mut dest,
            "big.bin",
            &transferred,
            total,
            &on_progress,
        )
        .await
        .unwrap();

        assert_eq!(dest.into_inner(), data);
        assert_eq!(transferred.load(Ordering::SeqCst), total);

        let seen = seen.lock().unwrap();
        // 150000 字节 = 两个整分块 + 一个尾分块
        assert_eq!(seen.len(), 3);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*seen.last().unwrap(), total);
    }

    #[tokio::test]
    async fn test_shared_counter_accumulates_across_files() {
        let transferred = AtomicU64::new(0);
        let on_progress: ProgressFn = Arc::new(|_, _, _| {});

        for data in [vec![1u8; 1000], vec![2u8; 500]] {
            let mut source = Cursor::new(data);
            let mut dest = Cursor::new(Vec::new());
            copy_chunks(&mut source, &mut dest, "f", &transferred, 1500, &on_progress)
                .await
                .unwrap();
        }

        assert_eq!(transferred.load(Ordering::SeqCst), 1500);
    }

    /// 输掉建目录竞争的轨迹：stat 未命中 → mkdir 被服务器拒绝 →
    /// 复查时目录已被并发条目建出
    struct LostRaceDirs {
        probes: AtomicUsize,
    }

    #[async_trait]
    impl RemoteDirs for LostRaceDirs {
        async fn dir_exists(&self, _path: &str) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst) > 0
        }

        async fn make_dir(&self, _path: &str) -> Result<(), String> {
            Err("SSH_FX_FAILURE".to_string())
        }
    }

    #[tokio::test]
    async fn test_lost_mkdir_race_is_not_an_error() {
        let dirs = LostRaceDirs {
            probes: AtomicUsize::new(0),
        };
        create_dir_if_absent(&dirs, "/srv/data/docs")
            .await
            .unwrap();
        // stat 一次 + 复查一次
        assert_eq!(dirs.probes.load(Ordering::SeqCst), 2);
    }

    /// mkdir 失败且复查仍未命中才是真错误
    struct BrokenDirs;

    #[async_trait]
    impl RemoteDirs for BrokenDirs {
        async fn dir_exists(&self, _path: &str) -> bool {
            false
        }

        async fn make_dir(&self, _path: &str) -> Result<(), String> {
            Err("Permission denied".to_string())
        }
    }

    #[tokio::test]
    async fn test_mkdir_failure_without_existing_dir_surfaces() {
        let err = create_dir_if_absent(&BrokenDirs, "/srv/nope")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Transfer(_)));
    }

    #[derive(Default)]
    struct RecordingDirs {
        existing: Mutex<HashSet<String>>,
        made: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RemoteDirs for RecordingDirs {
        async fn dir_exists(&self, path: &str) -> bool {
            self.existing.lock().unwrap().contains(path)
        }

        async fn make_dir(&self, path: &str) -> Result<(), String> {
            self.existing.lock().unwrap().insert(path.to_string());
            self.made.lock().unwrap().push(path.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_parent_chain_is_created_component_by_component() {
        let dirs = RecordingDirs::default();
        dirs.existing.lock().unwrap().insert("/srv".to_string());

        ensure_remote_parents(&dirs, "/srv/data/docs/a.txt")
            .await
            .unwrap();

        let made = dirs.made.lock().unwrap();
        assert_eq!(*made, vec!["/srv/data".to_string(), "/srv/data/docs".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_parent_creation_converges() {
        let dirs = Arc::new(RecordingDirs::default());
        let a = {
            let dirs = dirs.clone();
            async move { ensure_remote_parents(dirs.as_ref(), "/srv/d/f1.txt").await }
        };
        let b = {
            let dirs = dirs.clone();
            async move { ensure_remote_parents(dirs.as_ref(), "/srv/d/f2.txt").await }
        };
        let (ra, rb) = tokio::join!(a, b);
        ra.unwrap();
        rb.unwrap();
        assert!(dirs.existing.lock().unwrap().contains("/srv/d"));
    }
}
