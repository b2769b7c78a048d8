use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::identity::{CredentialHasher, Identity, Role};
use crate::models::{check_length, NewUser, User};
use crate::repository::UserRepository;
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Signup and login against the credential store. Token issuance is left to the caller,
/// which receives the verified [`Identity`].
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
    default_role: Role,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn CredentialHasher>,
        default_role: Role,
    ) -> Self {
        Self {
            users,
            hasher,
            default_role,
        }
    }

    pub async fn signup(&self, req: &SignupRequest) -> CoreResult<Identity> {
        let (username, password) = credentials(req.username.as_deref(), req.password.as_deref())?;

        let role = match req.role.as_deref().filter(|r| !r.is_empty()) {
            Some(role) => role.parse::<Role>()?,
            None => self.default_role,
        };

        if self.users.find_by_username(username).await?.is_some() {
            return Err(CoreError::DuplicateUser);
        }

        let password_hash = self.hasher.hash(password).await?;

        let user = self
            .users
            .insert_user(NewUser {
                username: username.to_string(),
                password_hash,
                role,
            })
            .await?;

        info!(user_id = user.id, username = %user.username, role = %user.role, "User registered");
        Ok(identity_of(&user))
    }

    pub async fn login(&self, req: &LoginRequest) -> CoreResult<Identity> {
        let (username, password) = credentials(req.username.as_deref(), req.password.as_deref())?;

        let Some(user) = self.users.find_by_username(username).await? else {
            warn!(username, "Login for unknown user");
            return Err(CoreError::InvalidCredentials);
        };

        if !self.hasher.verify(password, user.password_hash.expose()).await? {
            warn!(username, "Login with wrong password");
            return Err(CoreError::InvalidCredentials);
        }

        Ok(identity_of(&user))
    }
}

fn credentials<'a>(
    username: Option<&'a str>,
    password: Option<&'a str>,
) -> CoreResult<(&'a str, &'a str)> {
    match (username.filter(|u| !u.is_empty()), password.filter(|p| !p.is_empty())) {
        (Some(u), Some(p)) => {
            check_length("username", u)?;
            Ok((u, p))
        }
        _ => Err(CoreError::validation("Username and password are required")),
    }
}

/// The role always comes from the stored record, never from the request.
fn identity_of(user: &User) -> Identity {
    Identity {
        username: user.username.clone(),
        role: user.role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pii::Masked;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Users(Mutex<Vec<User>>);

    #[async_trait]
    impl UserRepository for Users {
        async fn find_by_username(&self, username: &str) -> CoreResult<Option<User>> {
            Ok(self.0.lock().unwrap().iter().find(|u| u.username == username).cloned())
        }

        async fn insert_user(&self, user: NewUser) -> CoreResult<User> {
            let mut users = self.0.lock().unwrap();
            let user = User {
                id: users.len() as i64 + 1,
                username: user.username,
                password_hash: Masked(user.password_hash),
                role: user.role,
            };
            users.push(user.clone());
            Ok(user)
        }

        async fn list_users(&self) -> CoreResult<Vec<User>> {
            Ok(self.0.lock().unwrap().clone())
        }

        async fn purge_users(&self) -> CoreResult<()> {
            self.0.lock().unwrap().clear();
            Ok(())
        }
    }

    /// Reversible stand-in so these tests exercise the flow, not Argon2.
    struct PlainHasher;

    #[async_trait]
    impl CredentialHasher for PlainHasher {
        async fn hash(&self, password: &str) -> CoreResult<String> {
            Ok(format!("plain:{}", password))
        }

        async fn verify(&self, password: &str, hash: &str) -> CoreResult<bool> {
            Ok(hash == format!("plain:{}", password))
        }
    }

    fn service() -> (AccountService, Arc<Users>) {
        let users = Arc::new(Users::default());
        (AccountService::new(users.clone(), Arc::new(PlainHasher), Role::User), users)
    }

    fn signup(username: &str, password: &str, role: Option<&str>) -> SignupRequest {
        SignupRequest {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            role: role.map(str::to_string),
        }
    }

    fn login(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn test_signup_defaults_role_and_hashes() {
        let (service, users) = service();
        let identity = service.signup(&signup("asha", "pw", None)).await.unwrap();

        assert_eq!(identity, Identity { username: "asha".to_string(), role: Role::User });
        let stored = users.find_by_username("asha").await.unwrap().unwrap();
        assert_eq!(stored.password_hash.expose(), "plain:pw");
    }

    #[tokio::test]
    async fn test_signup_rejects_duplicate_without_touching_store() {
        let (service, users) = service();
        service.signup(&signup("asha", "pw", None)).await.unwrap();

        let again = signup("asha", "other", Some("administrator"));
        let err = service.signup(&again).await.unwrap_err();
        assert!(matches!(err, CoreError::DuplicateUser));

        let all = users.list_users().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let (service, users) = service();

        let missing = SignupRequest { username: Some("asha".to_string()), ..Default::default() };
        assert!(matches!(service.signup(&missing).await, Err(CoreError::ValidationError(_))));
        assert!(matches!(
            service.signup(&signup("asha", "pw", Some("root"))).await,
            Err(CoreError::ValidationError(_))
        ));
        assert!(users.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_signup_rejects_overlong_username() {
        let (service, users) = service();
        let long = "a".repeat(crate::models::MAX_NAME_LEN + 1);

        let err = service.signup(&signup(&long, "pw", None)).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
        assert!(users.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_uses_persisted_role() {
        let (service, _) = service();
        service.signup(&signup("ravi", "secret", Some("administrator"))).await.unwrap();

        let identity = service.login(&login("ravi", "secret")).await.unwrap();
        assert_eq!(identity.role, Role::Administrator);
    }

    #[tokio::test]
    async fn test_login_failures_are_generic() {
        let (service, _) = service();
        service.signup(&signup("ravi", "secret", None)).await.unwrap();

        let wrong_password = service.login(&login("ravi", "nope")).await.unwrap_err();
        let unknown_user = service.login(&login("ghost", "secret")).await.unwrap_err();

        assert!(matches!(wrong_password, CoreError::InvalidCredentials));
        assert!(matches!(unknown_user, CoreError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }
}
