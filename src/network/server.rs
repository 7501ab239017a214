//! WebSocket Submission Server
//!
//! Async WebSocket server hosting the path validator.
//! Handles authentication, path submissions and balance queries.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{parse_var, ConfigError};
use crate::ledger::{AccountId, FeeLedger, LedgerError};
use crate::network::auth::{authenticate, AuthConfig, AuthError};
use crate::network::protocol::{
    AuthRequest, AuthResult, ClientMessage, ErrorCode, ServerError, ServerMessage,
    ValidateRequest, ValidationResponse,
};
use crate::validator::PathValidator;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Idle time after which a connection is dropped.
    pub connection_timeout: Duration,
    /// Amount credited to accounts the ledger has never seen (development only).
    pub dev_airdrop: Option<u64>,
    /// Identity provider settings. Unconfigured means development mode.
    pub auth: AuthConfig,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            connection_timeout: Duration::from_secs(300),
            dev_airdrop: None,
            auth: AuthConfig::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let auth = AuthConfig::from_vars(&lookup);
        auth.check()?;

        Ok(Self {
            bind_addr: parse_var(&lookup, "SERVER_BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            max_connections: parse_var(&lookup, "SERVER_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            connection_timeout: parse_var(&lookup, "SERVER_CONNECTION_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.connection_timeout),
            dev_airdrop: parse_var(&lookup, "SERVER_DEV_AIRDROP")?,
            auth,
            version: defaults.version,
        })
    }
}

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ValidatorServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Connected client state.
struct ConnectedClient {
    /// Payer account (after auth).
    account: Option<AccountId>,
    /// Connection time.
    connected_at: Instant,
    /// Last activity.
    last_activity: Instant,
}

type ClientMap = Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>;

/// Everything a connection task needs.
struct ConnectionContext<L: FeeLedger + ?Sized> {
    config: Arc<ServerConfig>,
    validator: PathValidator<L>,
    clients: ClientMap,
}

impl<L: FeeLedger + ?Sized> Clone for ConnectionContext<L> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            validator: self.validator.clone(),
            clients: Arc::clone(&self.clients),
        }
    }
}

/// The submission server.
pub struct ValidatorServer<L: FeeLedger + ?Sized + 'static> {
    ctx: ConnectionContext<L>,
    shutdown_tx: broadcast::Sender<()>,
}

impl<L: FeeLedger + ?Sized + 'static> ValidatorServer<L> {
    /// Create a new server around a validator.
    pub fn new(config: ServerConfig, validator: PathValidator<L>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        if !config.auth.is_configured() {
            warn!("Authentication not configured: clients choose their own payer account");
        }

        Self {
            ctx: ConnectionContext {
                config: Arc::new(config),
                validator,
                clients: Arc::new(RwLock::new(BTreeMap::new())),
            },
            shutdown_tx,
        }
    }

    /// Bind and run the server until shutdown.
    pub async fn run(&self) -> Result<(), ValidatorServerError> {
        let listener = TcpListener::bind(&self.ctx.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Run the server on an already bound listener.
    #[instrument(skip_all)]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ValidatorServerError> {
        info!("Path validator listening on {}", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if !self.ctx.try_reserve(addr).await {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection. The slot for `addr` is already reserved.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let ctx = self.ctx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    ctx.release(addr).await;
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            let idle_timeout = ctx.config.connection_timeout;

            loop {
                tokio::select! {
                    msg = timeout(idle_timeout, ws_receiver.next()) => {
                        let msg = match msg {
                            Ok(msg) => msg,
                            Err(_) => {
                                info!("Client {} idle for {:?}, closing", addr, idle_timeout);
                                break;
                            }
                        };

                        if let Some(Ok(_)) = &msg {
                            ctx.touch(addr).await;
                        }

                        let reply = match msg {
                            Some(Ok(Message::Text(text))) => match ClientMessage::from_json(&text) {
                                Ok(client_msg) => ctx.handle_client_message(addr, client_msg).await,
                                Err(e) => {
                                    debug!("Invalid message from {}: {}", addr, e);
                                    Some(error_message(ErrorCode::InvalidInput, "Invalid message format"))
                                }
                            },
                            Some(Ok(Message::Binary(data))) => match ValidateRequest::from_bytes(&data) {
                                Ok(request) => {
                                    ctx.handle_client_message(addr, ClientMessage::Validate(request)).await
                                }
                                Err(e) => {
                                    debug!("Invalid binary frame from {}: {}", addr, e);
                                    Some(error_message(ErrorCode::InvalidInput, "Invalid binary frame"))
                                }
                            },
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            // Ping/pong frames are answered by tungstenite itself.
                            Some(Ok(_)) => None,
                        };

                        if let Some(reply) = reply {
                            if msg_tx.send(reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Let queued replies (including the shutdown notice) drain.
            drop(msg_tx);
            let _ = sender_task.await;

            ctx.release(addr).await;
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.ctx.clients.read().await.len()
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.ctx.config
    }
}

impl ConnectedClient {
    fn new() -> Self {
        let now = Instant::now();
        Self { account: None, connected_at: now, last_activity: now }
    }
}

impl<L: FeeLedger + ?Sized> ConnectionContext<L> {
    /// Claim a connection slot for `addr`. Returns false once the limit is reached.
    ///
    /// Check and insert happen under one write lock, so a burst of accepts
    /// cannot overshoot `max_connections`.
    async fn try_reserve(&self, addr: SocketAddr) -> bool {
        let mut clients = self.clients.write().await;
        if clients.len() >= self.config.max_connections {
            return false;
        }
        clients.insert(addr, ConnectedClient::new());
        true
    }

    /// Free the slot held by `addr`.
    async fn release(&self, addr: SocketAddr) {
        if let Some(client) = self.clients.write().await.remove(&addr) {
            debug!("Client {} cleaned up after {:?}", addr, client.connected_at.elapsed());
        }
    }

    /// Record activity on `addr` and return its bound account.
    ///
    /// A live connection with no entry is re-registered unauthenticated.
    async fn touch(&self, addr: SocketAddr) -> Option<AccountId> {
        let mut clients = self.clients.write().await;
        let client = clients.entry(addr).or_insert_with(|| {
            warn!("No entry for live connection {}, re-registering", addr);
            ConnectedClient::new()
        });
        client.last_activity = Instant::now();
        client.account
    }

    /// Handle a client message and produce the reply, if any.
    async fn handle_client_message(&self, addr: SocketAddr, msg: ClientMessage) -> Option<ServerMessage> {
        let account = self.touch(addr).await;

        let reply = match msg {
            ClientMessage::Auth(auth) => self.handle_auth(addr, auth).await,
            ClientMessage::Validate(request) => match account {
                Some(payer) => self.handle_validate(&payer, request),
                None => not_authenticated(),
            },
            ClientMessage::Balance => match account {
                Some(account) => self.handle_balance(&account),
                None => not_authenticated(),
            },
            ClientMessage::Ping { timestamp } => ServerMessage::Pong {
                timestamp,
                server_time: SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis() as u64,
            },
        };

        Some(reply)
    }

    /// Handle authentication.
    async fn handle_auth(&self, addr: SocketAddr, auth: AuthRequest) -> ServerMessage {
        let account = match resolve_account(&self.config.auth, &auth) {
            Ok(account) => account,
            Err(err) => {
                warn!("Authentication failed for {}: {}", addr, err.message);
                return ServerMessage::Error(err);
            }
        };

        if let Some(amount) = self.config.dev_airdrop {
            self.airdrop(&account, amount);
        }

        if let Some(client) = self.clients.write().await.get_mut(&addr) {
            client.account = Some(account);
        }

        info!("Client {} authenticated as {} ({})", addr, account.short(), auth.client_version);

        ServerMessage::AuthResult(AuthResult {
            success: true,
            account: Some(account.to_string()),
            error: None,
            server_version: self.config.version.clone(),
        })
    }

    /// Fund an account the ledger has never seen.
    fn airdrop(&self, account: &AccountId, amount: u64) {
        let ledger = self.validator.ledger();
        match ledger.balance(account) {
            Err(LedgerError::AccountNotFound(_)) => match ledger.credit(account, amount) {
                Ok(()) => info!("Airdropped {} to {}", amount, account.short()),
                Err(e) => warn!("Airdrop to {} failed: {}", account.short(), e),
            },
            Ok(_) => {}
            Err(e) => warn!("Airdrop balance check for {} failed: {}", account.short(), e),
        }
    }

    /// Handle a path submission.
    fn handle_validate(&self, payer: &AccountId, request: ValidateRequest) -> ServerMessage {
        let result = self.validator.validate(payer, &request.proof, &request.path);
        ServerMessage::ValidationResult(ValidationResponse::from_result(request.request_id, &result))
    }

    /// Handle a balance query.
    fn handle_balance(&self, account: &AccountId) -> ServerMessage {
        match self.validator.ledger().balance(account) {
            Ok(balance) => ServerMessage::Balance { account: account.to_string(), balance },
            Err(LedgerError::AccountNotFound(_)) => {
                error_message(ErrorCode::AccountNotFound, "Account has no balance")
            }
            Err(e) => {
                error!("Balance query for {} failed: {}", account.short(), e);
                error_message(ErrorCode::InternalError, "Ledger unavailable")
            }
        }
    }
}

/// Decide which account an auth request binds to.
///
/// With a provider configured the token is authoritative. Without one the
/// client names its account directly, or has one derived from its token.
fn resolve_account(config: &AuthConfig, auth: &AuthRequest) -> Result<AccountId, ServerError> {
    if config.is_configured() {
        return authenticate(&auth.token, config).map_err(|e| {
            let code = match e {
                AuthError::Expired => ErrorCode::TokenExpired,
                AuthError::NotConfigured | AuthError::DecodeError(_) => ErrorCode::AuthFailed,
                _ => ErrorCode::InvalidToken,
            };
            ServerError::new(code, e.to_string())
        });
    }

    match (&auth.account, auth.token.is_empty()) {
        (Some(hex), _) => hex
            .parse::<AccountId>()
            .map_err(|e| ServerError::new(ErrorCode::AuthFailed, format!("invalid account: {}", e))),
        (None, false) => Ok(AccountId::derive(&auth.token)),
        (None, true) => Err(ServerError::new(ErrorCode::AuthFailed, "account or token required")),
    }
}

fn error_message(code: ErrorCode, message: &str) -> ServerMessage {
    ServerMessage::Error(ServerError::new(code, message))
}

fn not_authenticated() -> ServerMessage {
    error_message(ErrorCode::NotAuthenticated, "Must authenticate first")
}

// =============================================================================
// TESTS
// =============================================================================
