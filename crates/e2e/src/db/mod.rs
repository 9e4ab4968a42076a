//! Database lookups for cross-checking API results
//!
//! Every query opens its own connection (and tunnel, when SSH is enabled)
//! and tears it down before returning. There is no pooling.

pub mod rows;
pub mod tunnel;

use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use playtype_common::config::{DbConfig, DbEndpoint};
use playtype_common::{HarnessError, HarnessResult};

pub use rows::DbRow;
pub use tunnel::SshTunnel;

/// Time allowed for the driver to connect
pub const DB_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Rows are only logged in full up to this count
const MAX_LOGGED_ROWS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    Postgres,
    MySql,
}

impl fmt::Display for DbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbKind::Postgres => f.write_str("pgsql"),
            DbKind::MySql => f.write_str("mysql"),
        }
    }
}

/// A live driver connection
pub enum DbConnection {
    Postgres(PgConnection),
    MySql(MySqlConnection),
}

impl DbConnection {
    async fn connect(kind: DbKind, endpoint: &DbEndpoint, host: &str, port: u16) -> HarnessResult<Self> {
        let connect = async {
            match kind {
                DbKind::Postgres => {
                    let options = PgConnectOptions::new()
                        .host(host)
                        .port(port)
                        .username(&endpoint.user)
                        .password(&endpoint.password)
                        .database(&endpoint.name);
                    PgConnection::connect_with(&options)
                        .await
                        .map(DbConnection::Postgres)
                }
                DbKind::MySql => {
                    let options = MySqlConnectOptions::new()
                        .host(host)
                        .port(port)
                        .username(&endpoint.user)
                        .password(&endpoint.password)
                        .database(&endpoint.name);
                    MySqlConnection::connect_with(&options)
                        .await
                        .map(DbConnection::MySql)
                }
            }
        };

        match tokio::time::timeout(DB_CONNECT_TIMEOUT, connect).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(HarnessError::DatabaseConnect(e.to_string())),
            Err(_) => Err(HarnessError::DatabaseConnect(format!(
                "timed out after {}s connecting to {}:{}",
                DB_CONNECT_TIMEOUT.as_secs(),
                host,
                port
            ))),
        }
    }

    /// Run `sql` with positional parameters and decode every row
    pub async fn fetch(&mut self, sql: &str, params: &[Value]) -> HarnessResult<Vec<DbRow>> {
        match self {
            DbConnection::Postgres(conn) => {
                let query = params
                    .iter()
                    .fold(sqlx::query(sql), |q, p| rows::bind_pg(q, p));
                let fetched = query.fetch_all(&mut *conn).await?;
                Ok(fetched.iter().map(rows::pg_row_to_json).collect())
            }
            DbConnection::MySql(conn) => {
                let query = params
                    .iter()
                    .fold(sqlx::query(sql), |q, p| rows::bind_mysql(q, p));
                let fetched = query.fetch_all(&mut *conn).await?;
                Ok(fetched.iter().map(rows::mysql_row_to_json).collect())
            }
        }
    }

    pub async fn close(self) -> HarnessResult<()> {
        match self {
            DbConnection::Postgres(conn) => conn.close().await?,
            DbConnection::MySql(conn) => conn.close().await?,
        }
        Ok(())
    }
}

/// Connection plus the tunnel it runs through, if any
pub struct DbSession {
    pub connection: DbConnection,
    pub tunnel: Option<SshTunnel>,
}

impl DbSession {
    /// Close the connection, then the tunnel listener and SSH session
    pub async fn close(self) {
        if let Err(e) = self.connection.close().await {
            warn!("Closing database connection failed: {}", e);
        }
        if let Some(tunnel) = self.tunnel {
            tunnel.close().await;
        }
        debug!("Database session closed");
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseService {
    config: DbConfig,
}

impl DatabaseService {
    pub fn new(config: DbConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn endpoint(&self, kind: DbKind) -> &DbEndpoint {
        match kind {
            DbKind::Postgres => &self.config.pgsql,
            DbKind::MySql => &self.config.mysql,
        }
    }

    /// Execute `sql` and return its rows.
    ///
    /// With the database disabled this logs a warning and returns no rows
    /// without touching the network.
    pub async fn query(&self, kind: DbKind, sql: &str, params: &[Value]) -> HarnessResult<Vec<DbRow>> {
        if !self.config.enabled {
            warn!("Database is disabled; skipping {} query: {}", kind, sql);
            return Ok(Vec::new());
        }

        debug!("Executing {} query: {}", kind, sql);
        debug!("Query params: {:?}", params);

        let mut session = match self.open_session(kind).await {
            Ok(session) => session,
            Err(e) => {
                error!("Database query failed: {}", e);
                error!("SQL: {}", sql);
                error!("Params: {:?}", params);
                return Err(e);
            }
        };

        let result = session.connection.fetch(sql, params).await;
        session.close().await;

        match result {
            Ok(rows) => {
                debug!("Query returned {} rows", rows.len());
                if rows.len() <= MAX_LOGGED_ROWS {
                    let logged = Value::Array(rows.iter().cloned().map(Value::Object).collect());
                    debug!("Rows: {}", logged);
                }
                Ok(rows)
            }
            Err(e) => {
                error!("Database query failed: {}", e);
                error!("SQL: {}", sql);
                error!("Params: {:?}", params);
                Err(e)
            }
        }
    }

    /// `query` with each row deserialized into `T`
    pub async fn query_as<T: DeserializeOwned>(
        &self,
        kind: DbKind,
        sql: &str,
        params: &[Value],
    ) -> HarnessResult<Vec<T>> {
        self.query(kind, sql, params)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(Value::Object(row)).map_err(HarnessError::from))
            .collect()
    }

    /// Connect straight to the configured host
    pub async fn connect_direct(&self, kind: DbKind) -> HarnessResult<DbConnection> {
        if !self.config.enabled {
            return Err(HarnessError::DatabaseDisabled);
        }
        let endpoint = self.endpoint(kind);
        let conn = DbConnection::connect(kind, endpoint, &endpoint.host, endpoint.port).await?;
        info!("Connected to {} at {}:{}", kind, endpoint.host, endpoint.port);
        Ok(conn)
    }

    /// Open a tunnel and connect through its local port
    pub async fn connect_with_ssh(&self, kind: DbKind) -> HarnessResult<Option<DbSession>> {
        if !self.config.enabled {
            warn!("Database is disabled; not opening an SSH tunnel");
            return Ok(None);
        }

        let endpoint = self.endpoint(kind);
        let tunnel = SshTunnel::open(&self.config.ssh, &endpoint.host, endpoint.port).await?;

        match DbConnection::connect(kind, endpoint, "127.0.0.1", tunnel.local_port()).await {
            Ok(connection) => {
                info!("Connected to {} through SSH tunnel", kind);
                Ok(Some(DbSession {
                    connection,
                    tunnel: Some(tunnel),
                }))
            }
            Err(e) => {
                tunnel.close().await;
                Err(e)
            }
        }
    }

    async fn open_session(&self, kind: DbKind) -> HarnessResult<DbSession> {
        if self.config.ssh.use_ssh {
            self.connect_with_ssh(kind)
                .await?
                .ok_or(HarnessError::DatabaseDisabled)
        } else {
            Ok(DbSession {
                connection: self.connect_direct(kind).await?,
                tunnel: None,
            })
        }
    }
}
