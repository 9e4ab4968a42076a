//! Tunnel relaying through an in-process SSH server

use async_trait::async_trait;
use russh::server::{self, Auth, Msg, Session};
use russh::Channel;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use playtype_common::config::{DbConfig, SshConfig};
use playtype_common::HarnessError;
use playtype_e2e::db::SshTunnel;
use playtype_e2e::{DatabaseService, DbKind};

/// Accepts `none` auth and forwards `direct-tcpip` channels to their target
#[derive(Clone)]
struct Forwarder;

#[async_trait]
impl server::Handler for Forwarder {
    type Error = russh::Error;

    async fn auth_none(&mut self, _user: &str) -> Result<Auth, Self::Error> {
        Ok(Auth::Accept)
    }

    async fn channel_open_direct_tcpip(
        &mut self,
        channel: Channel<Msg>,
        host_to_connect: &str,
        port_to_connect: u32,
        _originator_address: &str,
        _originator_port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        let target = format!("{}:{}", host_to_connect, port_to_connect);
        tokio::spawn(async move {
            match TcpStream::connect(target).await {
                Ok(mut upstream) => {
                    let mut stream = channel.into_stream();
                    let _ = tokio::io::copy_bidirectional(&mut upstream, &mut stream).await;
                }
                Err(_) => {
                    let _ = channel.close().await;
                }
            }
        });
        Ok(true)
    }
}

async fn start_ssh_server() -> u16 {
    let config = Arc::new(server::Config {
        keys: vec![russh_keys::key::KeyPair::generate_ed25519().unwrap()],
        ..Default::default()
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let config = config.clone();
            tokio::spawn(async move {
                if let Ok(session) = server::run_stream(config, stream, Forwarder).await {
                    let _ = session.await;
                }
            });
        }
    });
    port
}

/// Echo server standing in for the database
async fn start_echo_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = socket.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });
    port
}

fn ssh_config(port: u16) -> SshConfig {
    SshConfig {
        use_ssh: true,
        host: "127.0.0.1".to_string(),
        port,
        username: "tester".to_string(),
        private_key_path: String::new(),
    }
}

async fn echo_through(addr: SocketAddr, payload: &[u8]) -> Vec<u8> {
    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(payload).await.unwrap();
    let mut received = vec![0u8; payload.len()];
    tokio::time::timeout(Duration::from_secs(5), client.read_exact(&mut received))
        .await
        .unwrap()
        .unwrap();
    received
}

async fn port_released(addr: SocketAddr) -> bool {
    for _ in 0..50 {
        if TcpStream::connect(addr).await.is_err() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn tunnel_relays_bytes_and_releases_port_on_close() {
    let ssh_port = start_ssh_server().await;
    let echo_port = start_echo_server().await;

    let tunnel = SshTunnel::open(&ssh_config(ssh_port), "127.0.0.1", echo_port)
        .await
        .unwrap();
    let addr = tunnel.local_addr();
    assert_ne!(addr.port(), echo_port);

    assert_eq!(echo_through(addr, b"SELECT 1").await, b"SELECT 1");
    // each local connection gets its own channel
    assert_eq!(echo_through(addr, b"second").await, b"second");

    tunnel.close().await;
    assert!(port_released(addr).await, "listener still bound after close");
}

#[tokio::test]
async fn dropped_tunnel_stops_listening() {
    let ssh_port = start_ssh_server().await;
    let echo_port = start_echo_server().await;

    let tunnel = SshTunnel::open(&ssh_config(ssh_port), "127.0.0.1", echo_port)
        .await
        .unwrap();
    let addr = tunnel.local_addr();
    assert_eq!(echo_through(addr, b"ping").await, b"ping");

    drop(tunnel);
    assert!(port_released(addr).await, "listener still bound after drop");
}

#[tokio::test]
async fn query_through_tunnel_to_dead_database_is_a_connect_error() {
    let ssh_port = start_ssh_server().await;
    let db_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut config = DbConfig::default();
    config.enabled = true;
    config.ssh = ssh_config(ssh_port);
    config.pgsql.host = "127.0.0.1".to_string();
    config.pgsql.port = db_port;
    config.pgsql.user = "tester".to_string();
    config.pgsql.name = "playtype".to_string();

    let svc = DatabaseService::new(config);
    let err = svc
        .query(DbKind::Postgres, "SELECT 1", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::DatabaseConnect(_)), "{}", err);
}
