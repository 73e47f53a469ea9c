// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use filesync_lib::logging::{get_log_dir, LogConfig, SizeRotatingWriter};
use filesync_lib::AppState;
use tracing_subscriber::prelude::*;

/// 初始化日志系统
fn init_logging() {
    let log_dir = get_log_dir();
    let _ = std::fs::create_dir_all(&log_dir);

    let config = LogConfig::load(&log_dir);

    if !config.enabled {
        // 日志已禁用，只初始化一个空的 subscriber
        let subscriber = tracing_subscriber::registry();
        let _ = tracing::subscriber::set_global_default(subscriber);
        return;
    }

    // 创建日志级别过滤器
    let level = config.tracing_level();
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("tao=error".parse().unwrap()) // 隐藏 tao 的警告
        .add_directive("russh=warn".parse().unwrap())
        .add_directive("sqlx=warn".parse().unwrap());

    // 创建文件日志写入器
    if let Ok(file_writer) = SizeRotatingWriter::new(&log_dir, config.max_size_mb) {
        // 文件日志层 - 始终输出到文件
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false);

        // 在 debug 模式下也输出到控制台
        #[cfg(debug_assertions)]
        {
            let console_layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false);

            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(console_layer);

            let _ = tracing::subscriber::set_global_default(subscriber);
        }

        // 在 release 模式下只输出到文件
        #[cfg(not(debug_assertions))]
        {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer);

            let _ = tracing::subscriber::set_global_default(subscriber);
        }
    } else {
        // 文件日志创建失败，回退到控制台
        #[cfg(debug_assertions)]
        {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

#[tokio::main]
async fn main() {
    // 初始化日志系统
    init_logging();

    let state = AppState::new()
        .await
        .expect("Failed to initialize application state");

    tauri::Builder::default()
        .plugin(tauri_plugin_fs::init())
        .plugin(tauri_plugin_dialog::init())
        .manage(state)
        .invoke_handler(tauri::generate_handler![
            filesync_lib::commands::target::get_targets,
            filesync_lib::commands::target::get_target,
            filesync_lib::commands::target::create_target,
            filesync_lib::commands::target::update_target,
            filesync_lib::commands::target::delete_target,
            filesync_lib::commands::session::get_sessions,
            filesync_lib::commands::session::get_session,
            filesync_lib::commands::session::create_session,
            filesync_lib::commands::session::update_session,
            filesync_lib::commands::session::delete_session,
            filesync_lib::commands::settings::get_settings,
            filesync_lib::commands::settings::save_settings,
            filesync_lib::commands::settings::get_log_config,
            filesync_lib::commands::settings::set_log_config,
            filesync_lib::commands::sync::init_sync,
            filesync_lib::commands::sync::close_sync,
            filesync_lib::commands::sync::list_local_files,
            filesync_lib::commands::sync::list_remote_files,
            filesync_lib::commands::sync::get_push_list,
            filesync_lib::commands::sync::get_pull_list,
            filesync_lib::commands::sync::push_files,
            filesync_lib::commands::sync::pull_files,
            filesync_lib::commands::sync::open_remote_diff,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
