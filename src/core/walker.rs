//! 目录树枚举
//!
//! 本地与远端各自一套遍历策略，挂在同一个 trait 后面：
//! 本地逐项顺序递归（单次调用延迟可忽略，也避免句柄压力），
//! 远端按子目录并发递归以掩盖网络往返延迟。这种不对称是
//! 刻意的吞吐取舍，两侧不做统一。

use crate::core::entry::{sort_entries, FileEntry};
use crate::core::error::SyncError;
use crate::core::ignore::IgnoreList;
use async_trait::async_trait;
use futures::future::BoxFuture;
use russh_sftp::client::SftpSession;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tokio::task::JoinHandle;
use tracing::debug;

/// 一次完整的树枚举：返回按 filename 升序（忽略大小写）的条目序列。
/// `nested` 为 true 时子目录内容挂在 children 下，否则按先序平铺。
#[async_trait]
pub trait TreeWalk: Send + Sync {
    async fn walk(&self, nested: bool) -> Result<Vec<FileEntry>, SyncError>;
}

/// SFTP 属性 mode 位判定。远端 readdir 不提供 is_file/is_dir 之类的
/// 方法级信号，逐项 stat 在大目录下开销过高，因此直接看 mode 位。
pub fn is_file_mode(mode: u32) -> bool {
    (mode & 0xF000) == 0x8000
}

pub fn is_directory_mode(mode: u32) -> bool {
    (mode & 0xF000) == 0x4000
}

fn join_relative(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

// ============ 本地遍历 ============

pub struct LocalWalker {
    root: PathBuf,
    recursive: bool,
    ignore: Arc<IgnoreList>,
}

impl LocalWalker {
    pub fn new(root: impl Into<PathBuf>, recursive: bool, ignore: Arc<IgnoreList>) -> Self {
        Self {
            root: root.into(),
            recursive,
            ignore,
        }
    }

    fn unix_mtime(meta: &std::fs::Metadata) -> i64 {
        meta.modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    /// 顺序递归枚举一层；任何一处枚举错误中止整个调用
    fn walk_dir<'a>(
        &'a self,
        dir: PathBuf,
        rel_prefix: String,
        nested: bool,
    ) -> BoxFuture<'a, Result<Vec<FileEntry>, SyncError>> {
        Box::pin(async move {
            let mut out = Vec::new();
            let mut read_dir = tokio::fs::read_dir(&dir)
                .await
                .map_err(SyncError::enumeration)?;

            while let Some(dirent) = read_dir
                .next_entry()
                .await
                .map_err(SyncError::enumeration)?
            {
                let name = dirent.file_name().to_string_lossy().to_string();
                let meta = dirent.metadata().await.map_err(SyncError::enumeration)?;
                let rel = join_relative(&rel_prefix, &name);

                if meta.is_file() {
                    if !self.ignore.is_file_ignored(&rel) {
                        out.push(FileEntry::file(
                            rel,
                            name,
                            meta.len(),
                            Self::unix_mtime(&meta),
                        ));
                    }
                } else if meta.is_dir()
                    && self.recursive
                    && !self.ignore.is_directory_ignored(&rel)
                {
                    let mut entry =
                        FileEntry::directory(rel.clone(), name, 0, Self::unix_mtime(&meta));
                    let children = self.walk_dir(dirent.path(), rel, nested).await?;
                    if nested {
                        entry.children = Some(children);
                        out.push(entry);
                    } else {
                        out.push(entry);
                        out.extend(children);
                    }
                }
            }

            Ok(out)
        })
    }
}

#[async_trait]
impl TreeWalk for LocalWalker {
    async fn walk(&self, nested: bool) -> Result<Vec<FileEntry>, SyncError> {
        debug!("枚举本地目录: {:?}", self.root);
        let mut entries = self
            .walk_dir(self.root.clone(), String::new(), nested)
            .await?;
        sort_entries(&mut entries);
        Ok(entries)
    }
}

// ============ 远端遍历 ============

pub struct RemoteWalker {
    sftp: Arc<SftpSession>,
    root: String,
    recursive: bool,
    ignore: Arc<IgnoreList>,
}

impl RemoteWalker {
    pub fn new(
        sftp: Arc<SftpSession>,
        root: impl Into<String>,
        recursive: bool,
        ignore: Arc<IgnoreList>,
    ) -> Self {
        Self {
            sftp,
            root: root.into(),
            recursive,
            ignore,
        }
    }

    /// 并发递归：本层 readdir 后，各子目录的子树枚举各自 spawn，
    /// 多个子目录同时在途。结果仍经最终排序，确定性不受并发影响。
    fn walk_dir(
        sftp: Arc<SftpSession>,
        ignore: Arc<IgnoreList>,
        recursive: bool,
        dir: String,
        rel_prefix: String,
        nested: bool,
    ) -> BoxFuture<'static, Result<Vec<FileEntry>, SyncError>> {
        Box::pin(async move {
            let read_dir = sftp
                .read_dir(dir.clone())
                .await
                .map_err(SyncError::enumeration)?;

            let mut out: Vec<FileEntry> = Vec::new();
            let mut pending: Vec<(usize, JoinHandle<Result<Vec<FileEntry>, SyncError>>)> =
                Vec::new();

            for dirent in read_dir {
                let name = dirent.file_name();
                if name == "." || name == ".." {
                    continue;
                }

                let attrs = dirent.metadata();
                let mode = attrs.permissions.unwrap_or(0);
                let size = attrs.size.unwrap_or(0);
                let modified = attrs.mtime.map(|t| t as i64).unwrap_or(0);
                let rel = join_relative(&rel_prefix, &name);

                if is_file_mode(mode) {
                    if !ignore.is_file_ignored(&rel) {
                        out.push(FileEntry::file(rel, name, size, modified));
                    }
                } else if is_directory_mode(mode)
                    && recursive
                    && !ignore.is_directory_ignored(&rel)
                {
                    out.push(FileEntry::directory(rel.clone(), name.clone(), size, modified));
                    let child_dir = format!("{}/{}", dir.trim_end_matches('/'), name);
                    let handle = tokio::spawn(Self::walk_dir(
                        sftp.clone(),
                        ignore.clone(),
                        recursive,
                        child_dir,
                        rel,
                        nested,
                    ));
                    pending.push((out.len() - 1, handle));
                }
            }

            // 任一子目录失败中止整个调用，丢弃部分结果
            let mut flattened: Vec<(usize, Vec<FileEntry>)> = Vec::new();
            for (parent_index, handle) in pending {
                let children = handle
                    .await
                    .map_err(SyncError::enumeration)??;
                if nested {
                    out[parent_index].children = Some(children);
                } else {
                    flattened.push((parent_index, children));
                }
            }

            // 平铺模式下把子树结果插回父目录条目之后（先序）
            for (parent_index, children) in flattened.into_iter().rev() {
                let tail = out.split_off(parent_index + 1);
                out.extend(children);
                out.extend(tail);
            }

            Ok(out)
        })
    }
}

#[async_trait]
impl TreeWalk for RemoteWalker {
    async fn walk(&self, nested: bool) -> Result<Vec<FileEntry>, SyncError> {
        debug!("枚举远端目录: {}", self.root);
        let mut entries = Self::walk_dir(
            self.sftp.clone(),
            self.ignore.clone(),
            self.recursive,
            self.root.clone(),
            String::new(),
            nested,
        )
        .await?;
        sort_entries(&mut entries);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn walker(root: &Path, recursive: bool, ignores: &str) -> LocalWalker {
        LocalWalker::new(root, recursive, Arc::new(IgnoreList::parse(ignores)))
    }

    fn make_tree(root: &Path) {
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::create_dir_all(root.join("node_modules/dep")).unwrap();
        fs::write(root.join("a.txt"), b"aaa").unwrap();
        fs::write(root.join("B.log"), b"bb").unwrap();
        fs::write(root.join("docs/readme.txt"), b"hello").unwrap();
        fs::write(root.join("node_modules/dep/index.js"), b"x").unwrap();
    }

    #[tokio::test]
    async fn test_flat_enumeration_is_sorted_and_preorder() {
        let tmp = tempfile::tempdir().unwrap();
        make_tree(tmp.path());

        let entries = walker(tmp.path(), true, "").walk(false).await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "a.txt",
                "B.log",
                "docs",
                "docs/readme.txt",
                "node_modules",
                "node_modules/dep",
                "node_modules/dep/index.js",
            ]
        );

        let docs = entries.iter().find(|e| e.filename == "docs").unwrap();
        assert!(docs.isDirectory && !docs.isFile);
        assert!(docs.children.is_none());

        let readme = entries
            .iter()
            .find(|e| e.filename == "docs/readme.txt")
            .unwrap();
        assert!(readme.isFile);
        assert_eq!(readme.shortname, "readme.txt");
        assert_eq!(readme.size, 5);
    }

    #[tokio::test]
    async fn test_nested_enumeration_populates_children() {
        let tmp = tempfile::tempdir().unwrap();
        make_tree(tmp.path());

        let entries = walker(tmp.path(), true, "").walk(true).await.unwrap();
        let docs = entries.iter().find(|e| e.filename == "docs").unwrap();
        let children = docs.children.as_ref().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].filename, "docs/readme.txt");
    }

    #[tokio::test]
    async fn test_non_recursive_omits_directories() {
        let tmp = tempfile::tempdir().unwrap();
        make_tree(tmp.path());

        let entries = walker(tmp.path(), false, "").walk(false).await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "B.log"]);
    }

    #[tokio::test]
    async fn test_ignored_directory_prunes_whole_subtree() {
        let tmp = tempfile::tempdir().unwrap();
        make_tree(tmp.path());

        let entries = walker(tmp.path(), true, "node_modules/")
            .walk(false)
            .await
            .unwrap();
        assert!(entries.iter().all(|e| !e.filename.contains("node_modules")));
        assert!(entries.iter().any(|e| e.filename == "docs/readme.txt"));
    }

    #[tokio::test]
    async fn test_ignored_files_are_excluded_by_wildcard() {
        let tmp = tempfile::tempdir().unwrap();
        make_tree(tmp.path());

        let entries = walker(tmp.path(), true, "*.log").walk(false).await.unwrap();
        assert!(entries.iter().all(|e| e.filename != "B.log"));
        assert!(entries.iter().any(|e| e.filename == "a.txt"));
    }

    #[tokio::test]
    async fn test_enumeration_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        make_tree(tmp.path());

        let w = walker(tmp.path(), true, "");
        let first = w.walk(false).await.unwrap();
        let second = w.walk(false).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_root_aborts_with_error() {
        let tmp = tempfile::tempdir().unwrap();
        let w = walker(&tmp.path().join("absent"), true, "");
        let err = w.walk(false).await.unwrap_err();
        assert!(matches!(err, SyncError::Enumeration(_)));
    }

    #[test]
    fn test_mode_bit_classification() {
        assert!(is_file_mode(0o100644));
        assert!(!is_file_mode(0o040755));
        assert!(is_directory_mode(0o040755));
        assert!(!is_directory_mode(0o120777)); // symlink
    }
}
