//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::events::EventPublisher;
use crate::application::services::{
    AdminServiceImpl, AuthServiceImpl, ChatServiceImpl, MessageServiceImpl, TokenCodec,
    UserServiceImpl,
};
use crate::config::Settings;
use crate::domain::MediaStore;
use crate::infrastructure::database;
use crate::infrastructure::media::LocalMediaStore;
use crate::infrastructure::repositories::{
    PgChatRepository, PgFriendRequestRepository, PgMessageRepository, PgUserRepository,
};
use crate::presentation::http::handlers::health;
use crate::presentation::http::routes;
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::Gateway;
use crate::shared::error;
use crate::shared::snowflake::SnowflakeGenerator;

pub type PgAuthService = AuthServiceImpl<PgUserRepository, dyn MediaStore>;
pub type PgUserService = UserServiceImpl<PgUserRepository, PgChatRepository, PgFriendRequestRepository>;
pub type PgChatService =
    ChatServiceImpl<PgUserRepository, PgChatRepository, PgMessageRepository, dyn MediaStore>;
pub type PgMessageService =
    MessageServiceImpl<PgUserRepository, PgChatRepository, PgMessageRepository, dyn MediaStore>;
pub type PgAdminService = AdminServiceImpl<PgUserRepository, PgChatRepository, PgMessageRepository>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub snowflake: Arc<SnowflakeGenerator>,
    pub gateway: Arc<Gateway>,
    pub media: Arc<dyn MediaStore>,
    pub tokens: TokenCodec,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(db: PgPool, media: Arc<dyn MediaStore>, settings: Settings) -> Self {
        Self {
            db,
            snowflake: Arc::new(SnowflakeGenerator::new(
                settings.snowflake.machine_id as u64,
                settings.snowflake.epoch,
            )),
            gateway: Arc::new(Gateway::new()),
            media,
            tokens: TokenCodec::new(&settings.jwt),
            settings: Arc::new(settings),
        }
    }

    fn users(&self) -> Arc<PgUserRepository> {
        Arc::new(PgUserRepository::new(self.db.clone()))
    }

    fn chats(&self) -> Arc<PgChatRepository> {
        Arc::new(PgChatRepository::new(self.db.clone()))
    }

    fn messages(&self) -> Arc<PgMessageRepository> {
        Arc::new(PgMessageRepository::new(self.db.clone()))
    }

    fn events(&self) -> Arc<dyn EventPublisher> {
        self.gateway.clone()
    }

    pub fn auth_service(&self) -> PgAuthService {
        AuthServiceImpl::new(
            self.users(),
            self.media.clone(),
            self.snowflake.clone(),
            self.tokens.clone(),
        )
    }

    pub fn user_service(&self) -> PgUserService {
        UserServiceImpl::new(
            self.users(),
            self.chats(),
            Arc::new(PgFriendRequestRepository::new(self.db.clone())),
            self.events(),
            self.snowflake.clone(),
        )
    }

    pub fn chat_service(&self) -> PgChatService {
        ChatServiceImpl::new(
            self.users(),
            self.chats(),
            self.messages(),
            self.media.clone(),
            self.events(),
            self.snowflake.clone(),
        )
    }

    pub fn message_service(&self) -> PgMessageService {
        MessageServiceImpl::new(
            self.users(),
            self.chats(),
            self.messages(),
            self.media.clone(),
            self.events(),
            self.snowflake.clone(),
        )
    }

    pub fn admin_service(&self) -> PgAdminService {
        AdminServiceImpl::new(
            self.users(),
            self.chats(),
            self.messages(),
            self.tokens.clone(),
            &self.settings.admin.secret_key,
        )
    }
}

/// Router with the HTTP trace and CORS layers applied
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);
    routes::create_router(state)
        .layer(logging::create_trace_layer())
        .layer(cors)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();
        error::set_expose_details(settings.is_development());

        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        database::run_migrations(&db).await?;
        tracing::info!("Database migrations applied");

        let media: Arc<dyn MediaStore> = Arc::new(LocalMediaStore::new(&settings.media).await?);

        let addr = settings.server_addr();
        let router = build_router(AppState::new(db, media, settings));

        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
