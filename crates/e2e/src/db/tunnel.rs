//! Local TCP listener forwarded over SSH `direct-tcpip` channels

use async_trait::async_trait;
use russh::client;
use russh::Disconnect;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use playtype_common::config::SshConfig;
use playtype_common::{HarnessError, HarnessResult};

/// How long the SSH handshake and authentication may take
pub const SSH_READY_TIMEOUT: Duration = Duration::from_secs(20);

/// Host keys are not verified
struct TunnelHandler;

#[async_trait]
impl client::Handler for TunnelHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh_keys::key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// An open tunnel. `close` shuts it down in order; dropping it stops the
/// listener and releases the session as well.
pub struct SshTunnel {
    local_addr: SocketAddr,
    session: Arc<client::Handle<TunnelHandler>>,
    accept_task: JoinHandle<()>,
}

impl SshTunnel {
    /// Connect to the SSH host and start forwarding a local port to
    /// `remote_host:remote_port`
    pub async fn open(ssh: &SshConfig, remote_host: &str, remote_port: u16) -> HarnessResult<Self> {
        let session = tokio::time::timeout(SSH_READY_TIMEOUT, connect(ssh))
            .await
            .map_err(|_| {
                HarnessError::SshConnect(format!(
                    "timed out after {}s connecting to {}:{}",
                    SSH_READY_TIMEOUT.as_secs(),
                    ssh.host,
                    ssh.port
                ))
            })??;
        info!("SSH connection established to {}:{}", ssh.host, ssh.port);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| HarnessError::Tunnel(e.to_string()))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| HarnessError::Tunnel(e.to_string()))?;

        let session = Arc::new(session);
        let accept_task = tokio::spawn(accept_loop(
            listener,
            session.clone(),
            remote_host.to_string(),
            remote_port,
        ));

        info!(
            "Tunnel listening on {} -> {}:{}",
            local_addr, remote_host, remote_port
        );

        Ok(Self {
            local_addr,
            session,
            accept_task,
        })
    }

    pub fn local_port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the listener, then end the SSH session
    pub async fn close(mut self) {
        self.accept_task.abort();
        let _ = (&mut self.accept_task).await;
        debug!("Tunnel listener on {} closed", self.local_addr);

        if let Err(e) = self
            .session
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            debug!("SSH disconnect: {}", e);
        }
        debug!("SSH session closed");
    }
}

impl Drop for SshTunnel {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn connect(ssh: &SshConfig) -> HarnessResult<client::Handle<TunnelHandler>> {
    let config = Arc::new(client::Config::default());
    let addr = (ssh.host.as_str(), ssh.port);

    let mut session = client::connect(config, addr, TunnelHandler)
        .await
        .map_err(|e| HarnessError::SshConnect(e.to_string()))?;

    let authenticated = if ssh.private_key_path.is_empty() {
        session
            .authenticate_none(ssh.username.clone())
            .await
            .map_err(|e| HarnessError::SshConnect(e.to_string()))?
    } else {
        let key = russh_keys::load_secret_key(&ssh.private_key_path, None).map_err(|e| {
            HarnessError::SshConnect(format!(
                "cannot load key {}: {}",
                ssh.private_key_path, e
            ))
        })?;
        session
            .authenticate_publickey(ssh.username.clone(), Arc::new(key))
            .await
            .map_err(|e| HarnessError::SshConnect(e.to_string()))?
    };

    if !authenticated {
        return Err(HarnessError::SshConnect(format!(
            "authentication rejected for {}@{}",
            ssh.username, ssh.host
        )));
    }

    Ok(session)
}

async fn accept_loop(
    listener: TcpListener,
    session: Arc<client::Handle<TunnelHandler>>,
    remote_host: String,
    remote_port: u16,
) {
    loop {
        let (mut socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Tunnel server error: {}", e);
                return;
            }
        };
        debug!("Tunnel accepted connection from {}", peer);

        let session = session.clone();
        let remote_host = remote_host.clone();
        tokio::spawn(async move {
            let channel = match session
                .channel_open_direct_tcpip(
                    remote_host.clone(),
                    remote_port as u32,
                    peer.ip().to_string(),
                    peer.port() as u32,
                )
                .await
            {
                Ok(channel) => channel,
                Err(e) => {
                    error!(
                        "Forwarding to {}:{} failed: {}",
                        remote_host, remote_port, e
                    );
                    return;
                }
            };

            let mut stream = channel.into_stream();
            if let Err(e) = tokio::io::copy_bidirectional(&mut socket, &mut stream).await {
                debug!("Tunnel stream from {} ended: {}", peer, e);
            }
        });
    }
}
