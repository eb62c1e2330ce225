use tracing::{instrument, warn};

use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::user::{NewUser, User};
use crate::infrastructure::security::{JwtKeys, hash_password, verify_password};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: i64,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    repo: UserRepository,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(repo: UserRepository, keys: JwtKeys) -> Self {
        Self { repo, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub async fn get_user(&self, id: &str) -> Result<User, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(id.to_string()))
    }

    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: String,
        email: String,
        password: String,
    ) -> Result<User, DomainError> {
        if username.trim().is_empty() {
            return Err(DomainError::validation("username must not be blank"));
        }
        if !email.contains('@') {
            return Err(DomainError::validation("invalid email"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let hash =
            hash_password(&password).map_err(|err| DomainError::Internal(err.to_string()))?;
        self.repo.create(NewUser::new(username, email, hash)).await
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedToken, DomainError> {
        let user = self
            .repo
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(DomainError::NotAuthenticated)?;

        let valid = verify_password(password, &user.password_hash)
            .map_err(|_| DomainError::NotAuthenticated)?;
        if !valid {
            warn!(user_id = %user.id, "rejected login with wrong password");
            return Err(DomainError::NotAuthenticated);
        }

        self.issue_token(user)
    }

    pub fn issue_token(&self, user: User) -> Result<IssuedToken, DomainError> {
        let access_token = self
            .keys
            .generate_token(&user.id, &user.username)
            .map_err(|err| DomainError::Internal(err.to_string()))?;
        Ok(IssuedToken {
            access_token,
            expires_in: self.keys.ttl_seconds(),
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory_store::MemoryDocumentStore;
    use std::sync::Arc;

    fn service() -> AuthService {
        let repo = UserRepository::new(Arc::new(MemoryDocumentStore::new()), "users");
        AuthService::new(repo, JwtKeys::new("test-secret".into(), 1))
    }

    #[tokio::test]
    async fn register_then_login_issues_a_verifiable_token() {
        let auth = service();
        let user = auth
            .register("Asha".into(), "Asha@Example.com".into(), "password123".into())
            .await
            .unwrap();
        assert_eq!(user.email, "asha@example.com");

        let issued = auth.login("ASHA@example.com", "password123").await.unwrap();
        let claims = auth.keys().verify_token(&issued.access_token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(auth.get_user(&claims.sub).await.unwrap().username, "Asha");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let auth = service();
        auth.register("a".into(), "a@x.io".into(), "password123".into())
            .await
            .unwrap();
        let err = auth
            .register("b".into(), "A@x.io".into(), "password456".into())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_not_authenticated() {
        let auth = service();
        auth.register("a".into(), "a@x.io".into(), "password123".into())
            .await
            .unwrap();
        assert!(matches!(
            auth.login("a@x.io", "nope-nope").await,
            Err(DomainError::NotAuthenticated)
        ));
        assert!(matches!(
            auth.login("b@x.io", "password123").await,
            Err(DomainError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn short_password_fails_validation() {
        let err = service()
            .register("a".into(), "a@x.io".into(), "short".into())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
