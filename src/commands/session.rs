#![allow(non_snake_case)]

use crate::db::SyncSession;
use crate::AppState;
use tauri::State;

/// 获取所有同步会话配置
#[tauri::command]
pub async fn get_sessions(state: State<'_, AppState>) -> Result<Vec<SyncSession>, String> {
    SyncSession::load_all(&state.db)
        .await
        .map_err(|e| e.to_string())
}

/// 获取单个同步会话配置
#[tauri::command]
pub async fn get_session(id: String, state: State<'_, AppState>) -> Result<SyncSession, String> {
    SyncSession::load(&state.db, &id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("会话不存在: {}", id))
}

/// 创建同步会话配置
#[tauri::command]
pub async fn create_session(
    name: String,
    targetId: String,
    localPath: String,
    remotePath: String,
    recursive: Option<bool>,
    fileIgnoreList: Option<String>,
    state: State<'_, AppState>,
) -> Result<SyncSession, String> {
    let session = SyncSession::new(
        name,
        targetId,
        localPath,
        remotePath,
        recursive.unwrap_or(true),
        fileIgnoreList.unwrap_or_default(),
    );
    session.save(&state.db).await.map_err(|e| e.to_string())?;
    Ok(session)
}

/// 更新同步会话配置
///
/// 修改后的配置对已建立的连接不生效，需要重新 init_sync
#[tauri::command]
pub async fn update_session(
    id: String,
    name: Option<String>,
    targetId: Option<String>,
    localPath: Option<String>,
    remotePath: Option<String>,
    recursive: Option<bool>,
    fileIgnoreList: Option<String>,
    state: State<'_, AppState>,
) -> Result<SyncSession, String> {
    let mut session = SyncSession::load(&state.db, &id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("会话不存在: {}", id))?;

    if let Some(n) = name {
        session.name = n;
    }
    if let Some(t) = targetId {
        session.targetId = t;
    }
    if let Some(l) = localPath {
        session.localPath = l;
    }
    if let Some(r) = remotePath {
        session.remotePath = r;
    }
    if let Some(rec) = recursive {
        session.recursive = rec;
    }
    if let Some(list) = fileIgnoreList {
        session.fileIgnoreList = list;
    }
    session.updatedAt = chrono::Utc::now().timestamp();

    session.save(&state.db).await.map_err(|e| e.to_string())?;
    Ok(session)
}

/// 删除同步会话配置
#[tauri::command]
pub async fn delete_session(id: String, state: State<'_, AppState>) -> Result<(), String> {
    // 若该会话还有活跃连接，一并断开
    if let Some(sync) = state.synchronizers.lock().await.remove(&id) {
        sync.close().await;
    }
    SyncSession::delete(&state.db, &id)
        .await
        .map_err(|e| e.to_string())
}
