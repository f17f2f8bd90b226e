// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;

use carwash_api::pb::auth::v1::{Profile, RegisterRequest, UpdateProfileRequest};
use carwash_token::{TokenManager, Tokens};
use tracing::info;

use crate::{
    config::{AuthConfig, SessionBackend},
    error::{AuthError, Result},
    password::{hash_password, verify_password},
    repository::{NewUser, ProfileUpdate, UserRepository},
    session::{MemorySessionStore, RedisSessionStore, SessionStore},
};

/// Role given to accounts registered without one.
pub const DEFAULT_ROLE: &str = "user";

/// Registration, credentials and profile operations shared by the gRPC and
/// REST surfaces.
pub struct AuthService {
    users:       UserRepository,
    sessions:    Arc<dyn SessionStore>,
    tokens:      TokenManager,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        users: UserRepository,
        sessions: Arc<dyn SessionStore>,
        tokens: TokenManager,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            users,
            sessions,
            tokens,
            bcrypt_cost,
        }
    }

    /// Connects the user database and the configured session backend.
    pub async fn open(config: &AuthConfig) -> Result<Self> {
        let users = UserRepository::connect(&config.database_url).await?;
        let sessions: Arc<dyn SessionStore> = match config.session_backend {
            SessionBackend::Redis => Arc::new(RedisSessionStore::connect(&config.redis_url).await?),
            SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
        };
        info!(backend = %config.session_backend, "auth service storage ready");
        Ok(Self::new(
            users,
            sessions,
            TokenManager::new(config.tokens.clone()),
            config.bcrypt_cost,
        ))
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<Profile> {
        if req.email.is_empty() || req.password.is_empty() {
            return Err(AuthError::InvalidRequest {
                reason: "email and password are required".to_string(),
            });
        }
        let password_hash = hash_password(&req.password, self.bcrypt_cost).await?;
        let role = if req.role.is_empty() {
            DEFAULT_ROLE.to_string()
        } else {
            req.role
        };
        let user = self
            .users
            .create(NewUser {
                first_name: req.first_name,
                last_name: req.last_name,
                email: req.email,
                password_hash,
                phone_number: req.phone_number,
                role,
            })
            .await?;
        info!(user_id = %user.id, "registered user");
        Ok(user.into())
    }

    /// Checks credentials and starts a new session, replacing any previous
    /// one for the same user.
    pub async fn login(&self, email: &str, password: &str) -> Result<Tokens> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, &user.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = Tokens {
            access_token:  self.tokens.issue_access(&user.id, &user.role)?,
            refresh_token: self.tokens.issue_refresh(&user.id)?,
        };
        self.sessions
            .put(&user.id, &tokens.refresh_token, self.tokens.refresh_ttl())
            .await?;
        info!(user_id = %user.id, "user logged in");
        Ok(tokens)
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        let user_id = self.current_session(refresh_token).await?;
        self.sessions.remove(&user_id).await?;
        info!(user_id = %user_id, "user logged out");
        Ok(())
    }

    /// Issues a new access token. The refresh token itself is returned
    /// unchanged.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Tokens> {
        let user_id = self.current_session(refresh_token).await?;
        let user = self.users.find_by_id(&user_id).await?;
        Ok(self
            .tokens
            .refreshed_pair(&user.id, &user.role, refresh_token.to_string())?)
    }

    /// Verifies `refresh_token` and requires it to be the stored session.
    /// Returns the owning user id.
    async fn current_session(&self, refresh_token: &str) -> Result<String> {
        let claims = self.tokens.verify_refresh(refresh_token)?;
        match self.sessions.get(&claims.user_id).await? {
            Some(stored) if stored == refresh_token => Ok(claims.user_id),
            _ => Err(AuthError::StaleRefreshToken),
        }
    }

    pub async fn get_profile(&self, id: &str) -> Result<Profile> {
        Ok(self.users.find_by_id(id).await?.into())
    }

    pub async fn list_profiles(&self, limit: i64, offset: i64) -> Result<Vec<Profile>> {
        let users = self.users.list(limit, offset).await?;
        Ok(users.into_iter().map(Profile::from).collect())
    }

    pub async fn update_profile(&self, req: UpdateProfileRequest) -> Result<Profile> {
        let user = self
            .users
            .update(ProfileUpdate {
                id:           req.id,
                first_name:   req.first_name,
                last_name:    req.last_name,
                phone_number: req.phone_number,
                role:         req.role,
            })
            .await?;
        Ok(user.into())
    }

    pub async fn delete_profile(&self, id: &str) -> Result<()> {
        self.users.soft_delete(id).await?;
        info!(user_id = %id, "soft-deleted user");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use carwash_error::{ErrorExt, StatusCode};
    use carwash_token::TokenConfig;

    use super::*;

    pub(crate) async fn service() -> AuthService {
        let tokens = TokenManager::new(
            TokenConfig::builder()
                .access_key("access")
                .refresh_key("refresh")
                .build(),
        );
        AuthService::new(
            UserRepository::in_memory().await.unwrap(),
            Arc::new(MemorySessionStore::new()),
            tokens,
            4,
        )
    }

    pub(crate) fn register_request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "Ada".into(),
            email: email.into(),
            password: password.into(),
            role: "user".into(),
            ..Default::default()
        }
    }

    fn access_manager() -> TokenManager {
        TokenManager::new(
            TokenConfig::builder()
                .access_key("access")
                .refresh_key("refresh")
                .build(),
        )
    }

    #[tokio::test]
    async fn test_register_login_and_profile() {
        let svc = service().await;
        let profile = svc
            .register(register_request("a@b.com", "x"))
            .await
            .unwrap();

        let tokens = svc.login("a@b.com", "x").await.unwrap();
        let claims = access_manager()
            .verify_access(&tokens.access_token)
            .unwrap();
        assert_eq!(claims.user_id, profile.id);
        assert_eq!(claims.role, "user");

        let fetched = svc.get_profile(&claims.user_id).await.unwrap();
        assert_eq!(fetched.email, "a@b.com");
    }

    #[tokio::test]
    async fn test_register_defaults_role() {
        let svc = service().await;
        let mut req = register_request("a@b.com", "x");
        req.role.clear();
        assert_eq!(svc.register(req).await.unwrap().role, DEFAULT_ROLE);
    }

    #[tokio::test]
    async fn test_register_requires_credentials() {
        let svc = service().await;
        let err = svc
            .register(register_request("", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidArgument);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email() {
        let svc = service().await;
        svc.register(register_request("a@b.com", "x"))
            .await
            .unwrap();
        assert!(matches!(
            svc.login("a@b.com", "y").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            svc.login("nobody@b.com", "x").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_deleted_user_cannot_login() {
        let svc = service().await;
        let profile = svc
            .register(register_request("a@b.com", "x"))
            .await
            .unwrap();
        svc.delete_profile(&profile.id).await.unwrap();

        assert!(svc.login("a@b.com", "x").await.is_err());
        assert!(svc.get_profile(&profile.id).await.is_err());
        assert!(svc.list_profiles(0, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_latest_refresh_token_is_accepted() {
        let svc = service().await;
        svc.register(register_request("a@b.com", "x"))
            .await
            .unwrap();
        let first = svc.login("a@b.com", "x").await.unwrap();
        let second = svc.login("a@b.com", "x").await.unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);

        let err = svc.refresh(&first.refresh_token).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::Unauthorized);

        let refreshed = svc.refresh(&second.refresh_token).await.unwrap();
        assert_eq!(refreshed.refresh_token, second.refresh_token);
        assert_eq!(
            access_manager()
                .verify_access(&refreshed.access_token)
                .unwrap()
                .role,
            "user"
        );
    }

    #[tokio::test]
    async fn test_refresh_picks_up_role_change() {
        let svc = service().await;
        let profile = svc
            .register(register_request("a@b.com", "x"))
            .await
            .unwrap();
        let tokens = svc.login("a@b.com", "x").await.unwrap();
        svc.update_profile(UpdateProfileRequest {
            id: profile.id.clone(),
            role: "provider".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        let refreshed = svc.refresh(&tokens.refresh_token).await.unwrap();
        let claims = access_manager()
            .verify_access(&refreshed.access_token)
            .unwrap();
        assert_eq!(claims.role, "provider");
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let svc = service().await;
        svc.register(register_request("a@b.com", "x"))
            .await
            .unwrap();
        let tokens = svc.login("a@b.com", "x").await.unwrap();
        svc.logout(&tokens.refresh_token).await.unwrap();

        assert!(svc.refresh(&tokens.refresh_token).await.is_err());
        assert!(svc.logout(&tokens.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_garbage_refresh_token() {
        let svc = service().await;
        let err = svc.refresh("garbage").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::Unauthorized);
    }
}
