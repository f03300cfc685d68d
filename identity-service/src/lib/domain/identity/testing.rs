//! Mocks shared by the provider unit tests.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use mockall::mock;

use crate::identity::errors::RemoteIdentityError;
use crate::identity::errors::RepositoryError;
use crate::identity::models::EmailAddress;
use crate::identity::models::RemoteSession;
use crate::identity::models::RemoteUser;
use crate::identity::models::SignUpOutcome;
use crate::identity::models::Synchronized;
use crate::identity::models::User;
use crate::identity::models::UserId;
use crate::identity::ports::IdentityServiceClient;
use crate::identity::ports::UserRepository;

mock! {
    pub TestUserRepository {}

    #[async_trait]
    impl UserRepository for TestUserRepository {
        async fn create(&self, user: User) -> Result<User, RepositoryError>;
        async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
        async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, RepositoryError>;
        async fn find_by_external_subject(&self, subject_id: &str) -> Result<Option<User>, RepositoryError>;
        async fn upsert_external(&self, email: &EmailAddress, subject_id: &str) -> Result<Synchronized, RepositoryError>;
        async fn set_active(&self, id: &UserId, is_active: bool) -> Result<bool, RepositoryError>;
    }
}

mock! {
    pub TestIdentityServiceClient {}

    #[async_trait]
    impl IdentityServiceClient for TestIdentityServiceClient {
        async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, RemoteIdentityError>;
        async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<RemoteSession, RemoteIdentityError>;
        async fn refresh_session(&self, refresh_token: &str) -> Result<RemoteSession, RemoteIdentityError>;
        async fn get_user(&self, access_token: &str) -> Result<RemoteUser, RemoteIdentityError>;
        async fn sign_out(&self, access_token: &str) -> Result<(), RemoteIdentityError>;
        async fn recover(&self, email: &str) -> Result<(), RemoteIdentityError>;
        async fn update_password(&self, access_token: &str, new_password: &str) -> Result<RemoteUser, RemoteIdentityError>;
    }
}

/// Rows shared between a stateful mock repository and the test body.
pub type UserStore = Arc<Mutex<Vec<User>>>;

pub fn user_store() -> UserStore {
    Arc::new(Mutex::new(Vec::new()))
}

/// Mock repository whose every operation reads and writes `store`, enforcing
/// the same uniqueness rules as the `users` table. Each call holds the lock
/// for its whole duration, which stands in for statement atomicity.
pub fn stateful_repository(store: UserStore) -> MockTestUserRepository {
    let mut repository = MockTestUserRepository::new();

    let users = Arc::clone(&store);
    repository.expect_create().returning(move |user| {
        let mut users = users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::EmailTaken(user.email.to_string()));
        }
        users.push(user.clone());
        Ok(user)
    });

    let users = Arc::clone(&store);
    repository.expect_find_by_id().returning(move |id| {
        Ok(users.lock().unwrap().iter().find(|u| u.id == *id).cloned())
    });

    let users = Arc::clone(&store);
    repository.expect_find_by_email().returning(move |email| {
        Ok(users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == *email)
            .cloned())
    });

    let users = Arc::clone(&store);
    repository
        .expect_find_by_external_subject()
        .returning(move |subject_id| {
            Ok(users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.external_subject_id.as_deref() == Some(subject_id))
                .cloned())
        });

    let users = Arc::clone(&store);
    repository
        .expect_upsert_external()
        .returning(move |email, subject_id| {
            let mut users = users.lock().unwrap();
            if let Some(existing) = users.iter_mut().find(|u| u.email == *email) {
                existing.external_subject_id = Some(subject_id.to_string());
                return Ok(Synchronized {
                    user: existing.clone(),
                    created: false,
                });
            }
            if let Some(existing) = users
                .iter()
                .find(|u| u.external_subject_id.as_deref() == Some(subject_id))
            {
                return Ok(Synchronized {
                    user: existing.clone(),
                    created: false,
                });
            }
            let user = User::new_external(email.clone(), subject_id.to_string());
            users.push(user.clone());
            Ok(Synchronized {
                user,
                created: true,
            })
        });

    let users = Arc::clone(&store);
    repository
        .expect_set_active()
        .returning(move |id, is_active| {
            let mut users = users.lock().unwrap();
            match users.iter_mut().find(|u| u.id == *id) {
                Some(user) => {
                    user.is_active = is_active;
                    Ok(true)
                }
                None => Ok(false),
            }
        });

    repository
}

pub fn remote_user(subject_id: &str, email: &str) -> RemoteUser {
    RemoteUser {
        subject_id: subject_id.to_string(),
        email: Some(email.to_string()),
        email_verified: true,
    }
}

pub fn remote_session(user: RemoteUser) -> RemoteSession {
    RemoteSession {
        access_token: format!("remote-access-{}", user.subject_id),
        refresh_token: Some(format!("remote-refresh-{}", user.subject_id)),
        expires_in: Some(3600),
        user,
    }
}
