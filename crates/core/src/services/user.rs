//! User service.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::Set;
use serde::Deserialize;
use shoal_common::{AppError, AppResult, IdGenerator};
use shoal_db::{
    entities::user,
    repositories::{FollowingRepository, UserRepository},
};
use validator::Validate;

use crate::mentions::extract_mentions;
use crate::services::notification::NotificationService;
use crate::services::post::PostService;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[a-z0-9]{1,24}$").unwrap()
});

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    following_repo: FollowingRepository,
    notifications: NotificationService,
    posts: PostService,
    id_gen: IdGenerator,
}

/// Input for registering a new user.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    /// Lowercase alphanumeric, up to 24 chars.
    #[validate(regex(path = *USERNAME_RE, message = "must be lowercase alphanumeric, max 24 chars"))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(length(max = 256))]
    pub name: Option<String>,
}

/// Input for logging in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        following_repo: FollowingRepository,
        notifications: NotificationService,
        posts: PostService,
    ) -> Self {
        Self {
            user_repo,
            following_repo,
            notifications,
            posts,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new account.
    pub async fn register(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let token = self.id_gen.generate_token();

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username),
            email: Set(input.email),
            password_hash: Set(password_hash),
            token: Set(Some(token)),
            name: Set(input.name),
            avatar_url: Set(None),
            followers_count: Set(0),
            following_count: Set(0),
            posts_count: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let created = self.user_repo.create(model).await?;
        tracing::debug!(user_id = %created.id, username = %created.username, "Registered user");
        Ok(created)
    }

    /// Authenticate with username and password.
    pub async fn login(&self, input: LoginInput) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Resolve a bearer token to its user (auth middleware path).
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_username(username).await
    }

    /// Validate every `@username` token in a text body.
    ///
    /// Creation endpoints call this before anything is written; one
    /// aggregated error names all unresolvable tokens.
    pub async fn verify_mentions(&self, text: &str) -> AppResult<()> {
        let mut invalid = Vec::new();

        for username in extract_mentions(text) {
            if self.user_repo.find_by_username(&username).await?.is_none() {
                invalid.push(format!("@{username}"));
            }
        }

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "Invalid mentions: {}",
                invalid.join(", ")
            )))
        }
    }

    /// Delete an account and everything attached to it.
    ///
    /// Content cascades through the regular deletion path (media blobs best
    /// effort), follow relationships are unwound with their counters, and
    /// every notification the user sent or received goes away.
    pub async fn delete_account(&self, user_id: &str) -> AppResult<()> {
        let user = self.user_repo.get_by_id(user_id).await?;

        // Cascade-delete authored content. Entities already removed by an
        // earlier cascade (own comment under own post) surface as NotFound.
        let authored = self.posts.authored_by(user_id).await?;
        for entity in authored {
            match self.posts.delete(&entity.id, user_id).await {
                Ok(_) | Err(AppError::PostNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        // Unwind follow relationships, fixing the counterparties' counters
        let following = self
            .following_repo
            .find_following(user_id, u64::MAX, None)
            .await?;
        for f in following {
            let _ = self
                .user_repo
                .decrement_followers_count(&f.followee_id)
                .await;
        }
        let followers = self
            .following_repo
            .find_followers(user_id, u64::MAX, None)
            .await?;
        for f in followers {
            let _ = self
                .user_repo
                .decrement_following_count(&f.follower_id)
                .await;
        }
        self.following_repo.delete_involving_user(user_id).await?;

        // Notifications where the user is either party
        self.notifications.delete_involving_user(user_id).await?;

        self.user_repo.delete(&user.id).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "Deleted account");
        Ok(())
    }
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
