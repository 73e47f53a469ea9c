#![allow(non_snake_case)]

use crate::core::{FileEntry, PlanEntry, ProgressFn, SyncDirection, Synchronizer};
use crate::db::{Settings, SyncSession, Target};
use crate::AppState;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tauri::{AppHandle, Emitter, State};

/// 传输进度事件载荷
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProgress {
    pub sessionId: String,
    pub filename: String,
    pub bytesTransferred: u64,
    pub bytesTotal: u64,
}

/// 传输结束事件载荷
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferComplete {
    pub sessionId: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn load_session(state: &AppState, session_id: &str) -> Result<SyncSession, String> {
    SyncSession::load(&state.db, session_id)
        .await
        .map_err(|e| format!("加载会话失败: {}", e))?
        .ok_or_else(|| format!("会话不存在: {}", session_id))
}

/// 连接会话的远端目标。已连接时先断开旧连接再重连
#[tauri::command]
pub async fn init_sync(sessionId: String, state: State<'_, AppState>) -> Result<(), String> {
    let session = load_session(&state, &sessionId).await?;
    let target = Target::load(&state.db, &session.targetId)
        .await
        .map_err(|e| format!("加载目标失败: {}", e))?
        .ok_or_else(|| format!("目标不存在: {}", session.targetId))?;

    let sync = state.synchronizer(&sessionId).await;
    sync.init(target, session).await.map_err(|e| e.to_string())
}

/// 断开会话连接
#[tauri::command]
pub async fn close_sync(sessionId: String, state: State<'_, AppState>) -> Result<(), String> {
    if let Some(sync) = state.synchronizers.lock().await.remove(&sessionId) {
        sync.close().await;
    }
    Ok(())
}

/// 枚举本地目录树
#[tauri::command]
pub async fn list_local_files(
    sessionId: String,
    nested: Option<bool>,
    state: State<'_, AppState>,
) -> Result<Vec<FileEntry>, String> {
    let sync = state.synchronizer(&sessionId).await;
    sync.list_local(nested.unwrap_or(false))
        .await
        .map_err(|e| e.to_string())
}

/// 枚举远端目录树
#[tauri::command]
pub async fn list_remote_files(
    sessionId: String,
    nested: Option<bool>,
    state: State<'_, AppState>,
) -> Result<Vec<FileEntry>, String> {
    let sync = state.synchronizer(&sessionId).await;
    sync.list_remote(nested.unwrap_or(false))
        .await
        .map_err(|e| e.to_string())
}

fn filter_set(filter: Option<Vec<String>>) -> HashSet<String> {
    filter.unwrap_or_default().into_iter().collect()
}

/// 对比两侧，返回需要推送的条目
#[tauri::command]
pub async fn get_push_list(
    sessionId: String,
    filter: Option<Vec<String>>,
    state: State<'_, AppState>,
) -> Result<Vec<PlanEntry>, String> {
    let sync = state.synchronizer(&sessionId).await;
    sync.transfer_list(SyncDirection::Push, &filter_set(filter))
        .await
        .map_err(|e| e.to_string())
}

/// 对比两侧，返回需要拉取的条目
#[tauri::command]
pub async fn get_pull_list(
    sessionId: String,
    filter: Option<Vec<String>>,
    state: State<'_, AppState>,
) -> Result<Vec<PlanEntry>, String> {
    let sync = state.synchronizer(&sessionId).await;
    sync.transfer_list(SyncDirection::Pull, &filter_set(filter))
        .await
        .map_err(|e| e.to_string())
}

/// 在后台执行传输计划，通过事件上报进度与结果
fn spawn_transfer(
    app: AppHandle,
    sync: Arc<Synchronizer>,
    session_id: String,
    direction: SyncDirection,
    plan: Vec<PlanEntry>,
) {
    let progress_app = app.clone();
    let progress_session = session_id.clone();
    let on_progress: ProgressFn = Arc::new(move |filename, transferred, total| {
        let _ = progress_app.emit(
            "transfer-progress",
            &TransferProgress {
                sessionId: progress_session.clone(),
                filename: filename.to_string(),
                bytesTransferred: transferred,
                bytesTotal: total,
            },
        );
    });

    tokio::spawn(async move {
        let result = sync.execute(direction, plan, on_progress).await;

        let payload = match &result {
            Ok(()) => TransferComplete {
                sessionId: session_id.clone(),
                success: true,
                error: None,
            },
            Err(e) => {
                tracing::error!("传输失败 ({}): {}", session_id, e);
                TransferComplete {
                    sessionId: session_id.clone(),
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        };
        let _ = app.emit("transfer-complete", &payload);
    });
}

/// 推送计划中的条目（本地 -> 远端）
#[tauri::command]
pub async fn push_files(
    sessionId: String,
    plan: Vec<PlanEntry>,
    state: State<'_, AppState>,
    app: AppHandle,
) -> Result<(), String> {
    let sync = state.synchronizer(&sessionId).await;
    spawn_transfer(app, sync, sessionId, SyncDirection::Push, plan);
    Ok(())
}

/// 拉取计划中的条目（远端 -> 本地）
#[tauri::command]
pub async fn pull_files(
    sessionId: String,
    plan: Vec<PlanEntry>,
    state: State<'_, AppState>,
    app: AppHandle,
) -> Result<(), String> {
    let sync = state.synchronizer(&sessionId).await;
    spawn_transfer(app, sync, sessionId, SyncDirection::Pull, plan);
    Ok(())
}

/// 命令模板渲染：先按空白切分成词元，再对每个词元做占位符替换。
/// 替换进来的路径含空格时仍是单个参数，不会被二次切分
fn render_diff_command(
    template: &str,
    local_file: &str,
    remote_file: &str,
) -> Option<(String, Vec<String>)> {
    let mut tokens = template.split_whitespace().map(|token| {
        token
            .replace("%localfile%", local_file)
            .replace("%remotefile%", remote_file)
            .replace("%file%", remote_file)
    });
    let program = tokens.next()?;
    Some((program, tokens.collect()))
}

/// 暂存目录模板解析：%appdir% 展开为应用数据目录
fn resolve_scratch_root(settings: &Settings, config_dir: &std::path::Path) -> PathBuf {
    let rendered = settings
        .tempFolder
        .replace("%appdir%", &config_dir.to_string_lossy());
    PathBuf::from(rendered)
}

/// 取远端文件到暂存目录，用配置的外部对比工具与本地副本比较
///
/// 命令模板占位符：%remotefile% / %file% 替换为暂存路径，
/// %localfile% 替换为本地副本路径。工具退出后按设置清理暂存目录
#[tauri::command]
pub async fn open_remote_diff(
    sessionId: String,
    filename: String,
    state: State<'_, AppState>,
) -> Result<(), String> {
    let settings = Settings::load(&state.db).await.map_err(|e| e.to_string())?;
    if settings.diffToolInvocation.trim().is_empty() {
        return Err("未配置对比工具".to_string());
    }

    let sync = state.synchronizer(&sessionId).await;
    let session = sync.session().await.map_err(|e| e.to_string())?;
    let scratch_root = resolve_scratch_root(&settings, &state.config_dir);

    let scratch_path = sync
        .fetch_for_diff(&filename, &scratch_root)
        .await
        .map_err(|e| e.to_string())?;

    let local_path = PathBuf::from(&session.localPath).join(&filename);
    let (program, args) = render_diff_command(
        &settings.diffToolInvocation,
        &local_path.to_string_lossy(),
        &scratch_path.to_string_lossy(),
    )
    .ok_or_else(|| "对比工具命令为空".to_string())?;

    tracing::info!("启动对比工具: {} {:?}", program, args);

    // 等待工具退出后再清理暂存目录
    tokio::spawn(async move {
        let status = tokio::process::Command::new(&program)
            .args(&args)
            .status()
            .await;
        if let Err(e) = status {
            tracing::error!("对比工具启动失败: {}", e);
        }

        if settings.clearTempFolder {
            if let Err(e) = tokio::fs::remove_dir_all(&scratch_root).await {
                tracing::warn!("清理暂存目录失败: {}", e);
            }
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_command_keeps_paths_with_spaces_as_single_args() {
        let (program, args) = render_diff_command(
            "meld %localfile% %remotefile%",
            "/home/u/My Docs/a.txt",
            "/tmp/sync scratch/a.txt",
        )
        .unwrap();

        assert_eq!(program, "meld");
        assert_eq!(args, vec!["/home/u/My Docs/a.txt", "/tmp/sync scratch/a.txt"]);
    }

    #[test]
    fn test_diff_command_file_placeholder_is_remote_copy() {
        let (_, args) =
            render_diff_command("difftool --right=%file%", "/l/a.txt", "/s/a.txt").unwrap();
        assert_eq!(args, vec!["--right=/s/a.txt"]);
    }

    #[test]
    fn test_empty_diff_command_template_is_rejected() {
        assert!(render_diff_command("   ", "/l", "/r").is_none());
    }

    #[test]
    fn test_scratch_root_expands_appdir_placeholder() {
        let settings = Settings::default();
        let root = resolve_scratch_root(&settings, std::path::Path::new("/data/filesync"));
        assert_eq!(root, PathBuf::from("/data/filesync/tmp"));
    }
}
