//! 忽略规则匹配
//!
//! 文件与目录的匹配规则刻意不对称：
//! - 文件：把 `*` 展开为 `.*` 的子串正则，路径任意位置命中即忽略
//! - 目录：仅当「末段名 + `/`」与某条字面规则完全相等时忽略，不做通配展开

use regex::Regex;
use tracing::warn;

/// 每次枚举请求从会话配置的忽略列表构建一次
pub struct IgnoreList {
    /// 规范化后的字面规则（目录匹配用）
    patterns: Vec<String>,
    /// 文件匹配用的展开正则，与 patterns 一一对应构建，无效的会被跳过
    file_regexes: Vec<Regex>,
}

impl IgnoreList {
    /// 按行拆分忽略列表文本，空白输入产生空规则集
    pub fn parse(text: &str) -> Self {
        let mut patterns = Vec::new();
        let mut file_regexes = Vec::new();

        for line in text.trim().lines() {
            let pattern = normalize_separators(line.trim());
            if pattern.is_empty() {
                continue;
            }

            match Regex::new(&expand_wildcards(&pattern)) {
                Ok(re) => file_regexes.push(re),
                Err(e) => {
                    warn!("忽略规则无效，已跳过: {} ({})", pattern, e);
                }
            }

            patterns.push(pattern);
        }

        Self {
            patterns,
            file_regexes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// 文件是否被忽略：任一规则在相对路径中找到子串匹配即忽略
    pub fn is_file_ignored(&self, relative_path: &str) -> bool {
        let candidate = normalize_separators(relative_path);
        self.file_regexes.iter().any(|re| re.is_match(&candidate))
    }

    /// 目录是否被忽略：末段名加尾部分隔符与某条规则字面相等
    pub fn is_directory_ignored(&self, relative_path: &str) -> bool {
        let normalized = normalize_separators(relative_path);
        let basename = normalized.rsplit('/').next().unwrap_or(&normalized);
        let candidate = format!("{}/", basename);
        self.patterns.iter().any(|p| *p == candidate)
    }
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// 转义 `.` `/` `\`，再把字面 `*` 展开为 `.*`
fn expand_wildcards(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    for c in pattern.chars() {
        match c {
            '.' | '/' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '*' => out.push_str(".*"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input_yields_no_patterns() {
        assert!(IgnoreList::parse("").is_empty());
        assert!(IgnoreList::parse("  \n \n").is_empty());
        assert!(!IgnoreList::parse("*.log").is_empty());
    }

    #[test]
    fn test_wildcard_file_match() {
        let list = IgnoreList::parse("*.log");
        assert!(list.is_file_ignored("debug.log"));
        assert!(list.is_file_ignored("build/output.log"));
        assert!(!list.is_file_ignored("readme.txt"));
    }

    #[test]
    fn test_file_match_is_substring_not_anchored() {
        // 子串匹配：规则出现在路径任意位置都算命中
        let list = IgnoreList::parse("tmp");
        assert!(list.is_file_ignored("tmp"));
        assert!(list.is_file_ignored("src/tmpfile.rs"));
        assert!(list.is_file_ignored("a/tmp/b.txt"));
        assert!(!list.is_file_ignored("src/main.rs"));
    }

    #[test]
    fn test_dot_is_escaped_in_file_patterns() {
        let list = IgnoreList::parse("a.b");
        assert!(list.is_file_ignored("a.b"));
        assert!(!list.is_file_ignored("axb"));
    }

    #[test]
    fn test_backslash_separators_are_normalized() {
        let list = IgnoreList::parse("build\\cache");
        assert!(list.is_file_ignored("build/cache/obj.o"));
    }

    #[test]
    fn test_directory_match_is_exact_literal() {
        let list = IgnoreList::parse("node_modules/");
        assert!(list.is_directory_ignored("node_modules"));
        assert!(list.is_directory_ignored("src/node_modules"));
        // 末段名不相等则不忽略
        assert!(!list.is_directory_ignored("node_modules_backup"));
    }

    #[test]
    fn test_directory_match_ignores_wildcards() {
        // 目录匹配不展开通配符
        let list = IgnoreList::parse("node_*/");
        assert!(!list.is_directory_ignored("node_modules"));
        assert!(list.is_directory_ignored("node_*"));
    }

    #[test]
    fn test_pattern_without_trailing_slash_never_matches_directory() {
        let list = IgnoreList::parse("target");
        assert!(!list.is_directory_ignored("target"));
        // 同一规则仍然按文件规则生效
        assert!(list.is_file_ignored("target/debug/app"));
    }
}
