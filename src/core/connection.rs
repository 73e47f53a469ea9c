//! SSH 连接与 SFTP 子会话生命周期

use crate::core::error::SyncError;
use crate::db::Target;
use russh::client;
use russh::keys::{load_secret_key, PrivateKeyWithHashAlg, PublicKey};
use russh_sftp::client::SftpSession;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 目标端口固定为 22
const SSH_PORT: u16 = 22;

struct TransportHandler;

impl client::Handler for TransportHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// 到单个远端目标的安全传输会话，含其上的 SFTP 子会话
///
/// 一个同步器实例同一时刻最多持有一个活跃连接；重新 init 会先
/// 关闭旧连接再建立新连接，旧连接上的在途操作不保证完成。
pub struct SessionConnection {
    handle: client::Handle<TransportHandler>,
    sftp: Arc<SftpSession>,
}

impl SessionConnection {
    /// 建立到 `target.host:22` 的会话并打开 SFTP 子会话
    ///
    /// 认证优先级：keyfilePath 非空时用私钥（同步读盘），否则用密码。
    /// 就绪等待不设上限；SFTP 子会话打开失败会使整个 init 失败，
    /// 不留下可用连接。
    pub async fn connect(target: &Target) -> Result<Self, SyncError> {
        let addr = (target.host.as_str(), SSH_PORT);
        info!("连接目标 {} ({}:{})", target.name, target.host, SSH_PORT);

        let config = Arc::new(client::Config::default());
        let mut handle = client::connect(config, addr, TransportHandler)
            .await
            .map_err(SyncError::connection)?;

        let authenticated = match target.keyfile_path() {
            Some(keyfile) => {
                debug!("使用私钥认证: {}", keyfile);
                let key = load_secret_key(keyfile, None).map_err(SyncError::connection)?;
                let hash_alg = handle
                    .best_supported_rsa_hash()
                    .await
                    .map_err(SyncError::connection)?
                    .flatten();
                handle
                    .authenticate_publickey(
                        target.username.as_str(),
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(SyncError::connection)?
            }
            None => {
                debug!("使用密码认证: {}", target.username);
                handle
                    .authenticate_password(target.username.as_str(), target.password())
                    .await
                    .map_err(SyncError::connection)?
            }
        };

        if !authenticated.success() {
            return Err(SyncError::Connection(format!(
                "认证被拒绝: {}@{}",
                target.username, target.host
            )));
        }

        let channel = handle
            .channel_open_session()
            .await
            .map_err(SyncError::connection)?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(SyncError::connection)?;

        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(SyncError::connection)?;

        info!("SFTP 子会话已就绪: {}", target.host);

        Ok(Self {
            handle,
            sftp: Arc::new(sftp),
        })
    }

    /// 共享的 SFTP 子会话；所有枚举/传输调用都复用它
    pub fn sftp(&self) -> Arc<SftpSession> {
        self.sftp.clone()
    }

    /// 主动断开。依赖此连接的在途操作随之失效（以失败结束）
    pub async fn close(&self) {
        if let Err(e) = self
            .handle
            .disconnect(russh::Disconnect::ByApplication, "", "English")
            .await
        {
            warn!("断开连接时出错（忽略）: {}", e);
        }
    }
}
