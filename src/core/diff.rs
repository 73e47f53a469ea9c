//! 枚举对比，产出传输计划
//!
//! push 与 pull 共用同一套算法，只是源/目标角色互换。
//! 计划顺序沿用源侧先序平铺的顺序，父目录先于其内容；
//! 该顺序仅是建议性的，传输引擎并发执行时不保证严格遵守。

use crate::core::entry::{FileEntry, PlanEntry, SyncDirection};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// 对比两侧的平铺枚举结果，产出需要复制/创建的条目
///
/// 规则：
/// - `filter` 非空时，只考虑 filename 在其中的源条目；空集表示全部
/// - 目标侧不存在的源条目无条件纳入（新文件与新目录都在此列）
/// - 两侧都存在的文件，仅当源侧 modifiedUnix 严格更大时纳入；
///   时间戳相等视为已同步
/// - 两侧都存在的目录从不纳入
pub fn compute_plan(
    direction: SyncDirection,
    source: &[FileEntry],
    destination: &[FileEntry],
    filter: &HashSet<String>,
) -> Vec<PlanEntry> {
    let dest_by_name: HashMap<&str, &FileEntry> = destination
        .iter()
        .map(|e| (e.filename.as_str(), e))
        .collect();

    let mut plan = Vec::new();
    for entry in source {
        if !filter.is_empty() && !filter.contains(&entry.filename) {
            continue;
        }

        match dest_by_name.get(entry.filename.as_str()) {
            None => plan.push(PlanEntry::from_entry(entry.clone())),
            Some(existing) => {
                if entry.isFile && entry.modifiedUnix > existing.modifiedUnix {
                    plan.push(PlanEntry::from_entry(entry.clone()));
                }
            }
        }
    }

    debug!(
        "对比完成 ({:?}): 源 {} 项, 目标 {} 项, 计划 {} 项",
        direction,
        source.len(),
        destination.len(),
        plan.len()
    );
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::TransferIntent;

    fn file(name: &str, mtime: i64) -> FileEntry {
        let short = name.rsplit('/').next().unwrap().to_string();
        FileEntry::file(name.into(), short, 10, mtime)
    }

    fn dir(name: &str) -> FileEntry {
        let short = name.rsplit('/').next().unwrap().to_string();
        FileEntry::directory(name.into(), short, 0, 0)
    }

    fn names(plan: &[PlanEntry]) -> Vec<&str> {
        plan.iter().map(|p| p.entry.filename.as_str()).collect()
    }

    #[test]
    fn test_identical_trees_yield_empty_plan_both_ways() {
        let local = vec![dir("docs"), file("docs/readme.txt", 100), file("a.txt", 50)];
        let remote = local.clone();
        let all = HashSet::new();

        assert!(compute_plan(SyncDirection::Push, &local, &remote, &all).is_empty());
        assert!(compute_plan(SyncDirection::Pull, &remote, &local, &all).is_empty());
    }

    #[test]
    fn test_strictly_newer_source_file_is_included() {
        let local = vec![file("a.txt", 100)];
        let remote = vec![file("a.txt", 50)];
        let all = HashSet::new();

        // push 纳入更新的本地文件，pull 方向上远端并不更新
        let push = compute_plan(SyncDirection::Push, &local, &remote, &all);
        assert_eq!(names(&push), vec!["a.txt"]);
        let pull = compute_plan(SyncDirection::Pull, &remote, &local, &all);
        assert!(pull.is_empty());
    }

    #[test]
    fn test_equal_timestamps_are_in_sync() {
        let local = vec![file("a.txt", 100)];
        let remote = vec![file("a.txt", 100)];
        let plan = compute_plan(SyncDirection::Push, &local, &remote, &HashSet::new());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_absent_entry_is_included_unconditionally() {
        // 时间戳为 0 也照样纳入：缺失即复制
        let local = vec![file("b.txt", 0), dir("newdir")];
        let remote = vec![];
        let plan = compute_plan(SyncDirection::Push, &local, &remote, &HashSet::new());
        assert_eq!(names(&plan), vec!["b.txt", "newdir"]);
        assert_eq!(plan[1].intent, TransferIntent::CreateDir);
    }

    #[test]
    fn test_directory_present_on_both_sides_is_never_reincluded() {
        let local = vec![dir("docs"), file("docs/x.txt", 200)];
        let remote = vec![dir("docs"), file("docs/x.txt", 100)];
        let plan = compute_plan(SyncDirection::Push, &local, &remote, &HashSet::new());
        assert_eq!(names(&plan), vec!["docs/x.txt"]);
    }

    #[test]
    fn test_filter_restricts_plan_to_named_entries() {
        let local = vec![file("readme.txt", 100), file("stale.txt", 100), file("new.txt", 0)];
        let remote = vec![file("readme.txt", 50), file("stale.txt", 50)];
        let filter: HashSet<String> = ["readme.txt".to_string()].into_iter().collect();

        let plan = compute_plan(SyncDirection::Push, &local, &remote, &filter);
        assert_eq!(names(&plan), vec!["readme.txt"]);
    }

    #[test]
    fn test_empty_filter_means_all() {
        let local = vec![file("a.txt", 100), file("b.txt", 100)];
        let remote = vec![];
        let plan = compute_plan(SyncDirection::Push, &local, &remote, &HashSet::new());
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_plan_preserves_source_preorder() {
        let local = vec![dir("docs"), file("docs/readme.txt", 200)];
        let remote = vec![];
        let plan = compute_plan(SyncDirection::Push, &local, &remote, &HashSet::new());
        assert_eq!(names(&plan), vec!["docs", "docs/readme.txt"]);
        assert_eq!(plan[0].intent, TransferIntent::CreateDir);
        assert_eq!(plan[1].intent, TransferIntent::CopyFile);
    }
}
