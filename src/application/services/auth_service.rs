//! Authentication Service
//!
//! Handles registration, credential checks and the signed session tokens
//! carried in cookies (users) and the admin cookie.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtSettings;
use crate::domain::{MediaStore, UploadedFile, User, UserRepository};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

const ROLE_USER: &str = "user";
const ROLE_ADMIN: &str = "admin";

/// Authentication service trait for dependency injection
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account, storing the avatar first.
    async fn register(&self, input: RegisterUser, avatar: Option<UploadedFile>) -> Result<(User, String), AuthError>;

    /// Check credentials and issue a session token.
    async fn login(&self, username: &str, password: &str) -> Result<(User, String), AuthError>;

    /// Resolve a session token to its user.
    async fn current_user(&self, token: &str) -> Result<User, AuthError>;
}

/// Registration input
#[derive(Debug, Clone)]
pub struct RegisterUser {
    pub name: String,
    pub username: String,
    pub password: String,
    pub bio: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID, or "admin")
    pub sub: String,
    /// Token audience role
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Username not found")]
    UsernameNotFound,

    #[error("Invalid Password")]
    InvalidPassword,

    #[error("Please upload avatar")]
    AvatarRequired,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Storage(#[from] AppError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UsernameNotFound | AuthError::UserNotFound => AppError::NotFound(err.to_string()),
            AuthError::AvatarRequired => AppError::BadRequest(err.to_string()),
            AuthError::InvalidPassword | AuthError::TokenExpired | AuthError::InvalidToken => {
                AppError::Unauthorized(err.to_string())
            }
            AuthError::Internal(msg) => AppError::Internal(msg),
            AuthError::Storage(e) => e,
        }
    }
}

/// Signs and checks session tokens for users and the admin.
#[derive(Clone)]
pub struct TokenCodec {
    secret: String,
    user_ttl: Duration,
    admin_ttl: Duration,
}

impl TokenCodec {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            secret: settings.secret.clone(),
            user_ttl: Duration::days(settings.user_token_expiry_days),
            admin_ttl: Duration::minutes(settings.admin_token_expiry_minutes),
        }
    }

    /// Lifetime of a user session.
    pub fn user_ttl(&self) -> Duration {
        self.user_ttl
    }

    /// Lifetime of an admin session.
    pub fn admin_ttl(&self) -> Duration {
        self.admin_ttl
    }

    fn sign(&self, sub: String, role: &str, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub,
            role: role.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))
    }

    fn verify(&self, token: &str, role: &str) -> Result<Claims, AuthError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        if token_data.claims.role != role {
            return Err(AuthError::InvalidToken);
        }
        Ok(token_data.claims)
    }

    /// Issue a user session token.
    pub fn issue_user(&self, user_id: i64) -> Result<String, AuthError> {
        self.sign(user_id.to_string(), ROLE_USER, self.user_ttl)
    }

    /// Validate a user session token and extract the user ID.
    pub fn verify_user(&self, token: &str) -> Result<i64, AuthError> {
        self.verify(token, ROLE_USER)?
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Issue an admin session token.
    pub fn issue_admin(&self) -> Result<String, AuthError> {
        self.sign(ROLE_ADMIN.to_string(), ROLE_ADMIN, self.admin_ttl)
    }

    /// Validate an admin session token.
    pub fn verify_admin(&self, token: &str) -> Result<(), AuthError> {
        self.verify(token, ROLE_ADMIN).map(|_| ())
    }
}

/// AuthService implementation
pub struct AuthServiceImpl<U, M>
where
    U: UserRepository,
    M: MediaStore + ?Sized,
{
    user_repo: Arc<U>,
    media: Arc<M>,
    id_generator: Arc<SnowflakeGenerator>,
    tokens: TokenCodec,
}

impl<U, M> AuthServiceImpl<U, M>
where
    U: UserRepository,
    M: MediaStore + ?Sized,
{
    /// Create a new AuthServiceImpl
    pub fn new(
        user_repo: Arc<U>,
        media: Arc<M>,
        id_generator: Arc<SnowflakeGenerator>,
        tokens: TokenCodec,
    ) -> Self {
        Self {
            user_repo,
            media,
            id_generator,
            tokens,
        }
    }

    /// Hash a password using Argon2id
    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against its hash
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[async_trait]
impl<U, M> AuthService for AuthServiceImpl<U, M>
where
    U: UserRepository + 'static,
    M: MediaStore + ?Sized + 'static,
{
    async fn register(&self, input: RegisterUser, avatar: Option<UploadedFile>) -> Result<(User, String), AuthError> {
        let avatar = avatar.ok_or(AuthError::AvatarRequired)?;

        let password_hash = self.hash_password(&input.password)?;

        let avatar = self
            .media
            .upload(vec![avatar])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::Internal("Avatar upload returned nothing".into()))?;

        let now = Utc::now();
        let user = User {
            id: self.id_generator.generate(),
            name: input.name,
            username: input.username,
            password_hash,
            bio: input.bio,
            avatar,
            created_at: now,
            updated_at: now,
        };

        let created = match self.user_repo.create(&user).await {
            Ok(created) => created,
            Err(e) => {
                if let Err(cleanup) = self.media.delete(vec![user.avatar.public_id.clone()]).await {
                    tracing::warn!(error = %cleanup, "Failed to remove orphaned avatar");
                }
                return Err(e.into());
            }
        };
        let token = self.tokens.issue_user(created.id)?;

        tracing::info!(user_id = created.id, username = %created.username, "User registered");
        Ok((created, token))
    }

    async fn login(&self, username: &str, password: &str) -> Result<(User, String), AuthError> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AuthError::UsernameNotFound)?;

        if !self.verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidPassword);
        }

        let token = self.tokens.issue_user(user.id)?;
        Ok((user, token))
    }

    async fn current_user(&self, token: &str) -> Result<User, AuthError> {
        let user_id = self.tokens.verify_user(token)?;

        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Attachment, MockMediaStore, MockUserRepository};
    use crate::shared::snowflake::DEFAULT_EPOCH;
    use mockall::predicate::eq;

    fn jwt_settings() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-that-is-long-enough-for-hs256".into(),
            user_token_expiry_days: 15,
            admin_token_expiry_minutes: 30,
        }
    }

    fn codec() -> TokenCodec {
        TokenCodec::new(&jwt_settings())
    }

    fn avatar_file() -> UploadedFile {
        UploadedFile {
            file_name: Some("me.png".into()),
            content_type: Some("image/png".into()),
            bytes: vec![1, 2, 3],
        }
    }

    fn service(users: MockUserRepository, media: MockMediaStore) -> AuthServiceImpl<MockUserRepository, MockMediaStore> {
        AuthServiceImpl::new(
            Arc::new(users),
            Arc::new(media),
            Arc::new(SnowflakeGenerator::new(1, DEFAULT_EPOCH)),
            codec(),
        )
    }

    fn input() -> RegisterUser {
        RegisterUser {
            name: "Ada".into(),
            username: "ada".into(),
            password: "hunter22".into(),
            bio: "hello".into(),
        }
    }

    // ==========================================================================
    // Token Tests
    // ==========================================================================

    #[test]
    fn test_user_token_roundtrip() {
        let codec = codec();
        let token = codec.issue_user(42).unwrap();
        assert_eq!(codec.verify_user(&token).unwrap(), 42);
    }

    #[test]
    fn test_admin_token_is_not_a_user_token() {
        let codec = codec();
        let admin = codec.issue_admin().unwrap();

        assert!(codec.verify_admin(&admin).is_ok());
        assert!(matches!(codec.verify_user(&admin), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_user_token_is_not_an_admin_token() {
        let codec = codec();
        let user = codec.issue_user(7).unwrap();
        assert!(matches!(codec.verify_admin(&user), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let mut other = jwt_settings();
        other.secret = "another-secret-that-is-long-enough-too".into();
        let token = TokenCodec::new(&other).issue_user(1).unwrap();

        assert!(matches!(codec().verify_user(&token), Err(AuthError::InvalidToken)));
    }

    // ==========================================================================
    // Register / Login Tests
    // ==========================================================================

    #[tokio::test]
    async fn test_register_requires_avatar() {
        let svc = service(MockUserRepository::new(), MockMediaStore::new());
        let err = svc.register(input(), None).await.unwrap_err();
        assert!(matches!(err, AuthError::AvatarRequired));
    }

    #[tokio::test]
    async fn test_register_stores_avatar_and_hashes_password() {
        let mut media = MockMediaStore::new();
        media.expect_upload().times(1).returning(|_| {
            Ok(vec![Attachment {
                public_id: "abc.png".into(),
                url: "http://localhost:3000/media/abc.png".into(),
            }])
        });

        let mut users = MockUserRepository::new();
        users
            .expect_create()
            .times(1)
            .withf(|u: &User| u.username == "ada" && u.password_hash != "hunter22" && u.avatar.public_id == "abc.png")
            .returning(|u| Ok(u.clone()));

        let svc = service(users, media);
        let (user, token) = svc.register(input(), Some(avatar_file())).await.unwrap();

        assert_eq!(user.name, "Ada");
        assert_eq!(codec().verify_user(&token).unwrap(), user.id);
    }

    #[tokio::test]
    async fn test_failed_insert_removes_uploaded_avatar() {
        let mut media = MockMediaStore::new();
        media.expect_upload().returning(|_| {
            Ok(vec![Attachment {
                public_id: "abc.png".into(),
                url: "http://localhost:3000/media/abc.png".into(),
            }])
        });
        media
            .expect_delete()
            .with(eq(vec!["abc.png".to_string()]))
            .times(1)
            .returning(|_| Ok(()));

        let mut users = MockUserRepository::new();
        users
            .expect_create()
            .returning(|_| Err(AppError::BadRequest("Duplicate field - username".into())));

        let svc = service(users, media);
        let err = svc.register(input(), Some(avatar_file())).await.unwrap_err();

        assert!(matches!(err, AuthError::Storage(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_login_unknown_username() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_username()
            .with(eq("ghost"))
            .returning(|_| Ok(None));

        let svc = service(users, MockMediaStore::new());
        let err = svc.login("ghost", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::UsernameNotFound));
    }

    #[tokio::test]
    async fn test_login_checks_password() {
        let hashed = service(MockUserRepository::new(), MockMediaStore::new())
            .hash_password("correct horse")
            .unwrap();

        let mut users = MockUserRepository::new();
        users.expect_find_by_username().returning(move |_| {
            Ok(Some(User {
                id: 9,
                username: "ada".into(),
                password_hash: hashed.clone(),
                ..User::default()
            }))
        });

        let svc = service(users, MockMediaStore::new());

        assert!(matches!(svc.login("ada", "wrong").await, Err(AuthError::InvalidPassword)));
        let (user, token) = svc.login("ada", "correct horse").await.unwrap();
        assert_eq!(user.id, 9);
        assert_eq!(codec().verify_user(&token).unwrap(), 9);
    }
}
