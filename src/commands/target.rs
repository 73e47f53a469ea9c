#![allow(non_snake_case)]

use crate::db::Target;
use crate::AppState;
use tauri::State;

/// 获取所有远端目标
#[tauri::command]
pub async fn get_targets(state: State<'_, AppState>) -> Result<Vec<Target>, String> {
    Target::load_all(&state.db).await.map_err(|e| e.to_string())
}

/// 获取单个远端目标
#[tauri::command]
pub async fn get_target(id: String, state: State<'_, AppState>) -> Result<Target, String> {
    Target::load(&state.db, &id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("目标不存在: {}", id))
}

/// 创建远端目标
#[tauri::command]
pub async fn create_target(
    name: String,
    host: String,
    username: String,
    password: Option<String>,
    keyfilePath: Option<String>,
    state: State<'_, AppState>,
) -> Result<Target, String> {
    let target = Target::new(
        name,
        host,
        username,
        password.unwrap_or_default(),
        keyfilePath.unwrap_or_default(),
    );
    target.save(&state.db).await.map_err(|e| e.to_string())?;
    Ok(target)
}

/// 更新远端目标
#[tauri::command]
pub async fn update_target(
    id: String,
    name: Option<String>,
    host: Option<String>,
    username: Option<String>,
    password: Option<String>,
    keyfilePath: Option<String>,
    state: State<'_, AppState>,
) -> Result<Target, String> {
    let mut target = Target::load(&state.db, &id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("目标不存在: {}", id))?;

    if let Some(n) = name {
        target.name = n;
    }
    if let Some(h) = host {
        target.host = h;
    }
    if let Some(u) = username {
        target.username = u;
    }
    if let Some(p) = password {
        target.password = p;
    }
    if let Some(k) = keyfilePath {
        target.keyfilePath = k;
    }
    target.updatedAt = chrono::Utc::now().timestamp();

    target.save(&state.db).await.map_err(|e| e.to_string())?;
    Ok(target)
}

/// 删除远端目标
#[tauri::command]
pub async fn delete_target(id: String, state: State<'_, AppState>) -> Result<(), String> {
    Target::delete(&state.db, &id)
        .await
        .map_err(|e| e.to_string())
}
