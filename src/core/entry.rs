#![allow(non_snake_case)]

use serde::{Deserialize, Serialize};

/// 传输方向
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    /// 本地 -> 远端
    Push,
    /// 远端 -> 本地
    Pull,
}

/// 一条目录枚举结果
///
/// `filename` 始终是相对于配置根目录的路径，分隔符统一为 `/`，
/// 与宿主平台无关。`modifiedUnix` 是唯一用于新旧比较的时间戳。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub filename: String,
    /// 文件系统/协议上报的原始末段名
    pub shortname: String,
    pub isFile: bool,
    pub isDirectory: bool,
    pub size: u64,
    pub modifiedUnix: i64,
    /// 仅嵌套枚举时填充
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileEntry>>,
}

impl FileEntry {
    pub fn file(filename: String, shortname: String, size: u64, modified: i64) -> Self {
        Self {
            filename,
            shortname,
            isFile: true,
            isDirectory: false,
            size,
            modifiedUnix: modified,
            children: None,
        }
    }

    pub fn directory(filename: String, shortname: String, size: u64, modified: i64) -> Self {
        Self {
            filename,
            shortname,
            isFile: false,
            isDirectory: true,
            size,
            modifiedUnix: modified,
            children: None,
        }
    }
}

/// 计划条目的执行意图
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransferIntent {
    /// 整文件复制
    CopyFile,
    /// 在目标侧创建目录（不复制内容、不计进度）
    CreateDir,
}

/// 传输计划条目：携带执行所需的完整枚举信息
/// （size 用于进度，modifiedUnix 用于恢复目标侧时间戳）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntry {
    pub intent: TransferIntent,
    pub entry: FileEntry,
}

impl PlanEntry {
    pub fn from_entry(entry: FileEntry) -> Self {
        let intent = if entry.isDirectory {
            TransferIntent::CreateDir
        } else {
            TransferIntent::CopyFile
        };
        Self { intent, entry }
    }
}

/// 对枚举结果做稳定排序：按 filename 升序，忽略大小写，
/// 嵌套时对每一层 children 递归排序
pub fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| {
        a.filename
            .to_lowercase()
            .cmp(&b.filename.to_lowercase())
            .then_with(|| a.filename.cmp(&b.filename))
    });
    for entry in entries.iter_mut() {
        if let Some(children) = entry.children.as_mut() {
            sort_entries(children);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_is_case_insensitive() {
        let mut entries = vec![
            FileEntry::file("b.txt".into(), "b.txt".into(), 1, 0),
            FileEntry::file("A.txt".into(), "A.txt".into(), 1, 0),
            FileEntry::file("a.txt".into(), "a.txt".into(), 1, 0),
        ];
        sort_entries(&mut entries);

        let names: Vec<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, vec!["A.txt", "a.txt", "b.txt"]);
    }

    #[test]
    fn test_sort_keeps_parent_before_children() {
        let mut entries = vec![
            FileEntry::file("docs/readme.txt".into(), "readme.txt".into(), 5, 0),
            FileEntry::directory("docs".into(), "docs".into(), 0, 0),
        ];
        sort_entries(&mut entries);

        assert_eq!(entries[0].filename, "docs");
        assert_eq!(entries[1].filename, "docs/readme.txt");
    }

    #[test]
    fn test_plan_entry_intent_from_kind() {
        let file = PlanEntry::from_entry(FileEntry::file("a".into(), "a".into(), 1, 0));
        let dir = PlanEntry::from_entry(FileEntry::directory("d".into(), "d".into(), 0, 0));
        assert_eq!(file.intent, TransferIntent::CopyFile);
        assert_eq!(dir.intent, TransferIntent::CreateDir);
    }
}
