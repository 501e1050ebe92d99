use std::sync::Arc;

use futures::{
    stream::{BoxStream, StreamExt},
    TryStreamExt,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    users::{
        dto::{UserRequest, UserResponse},
        mapper,
        repo::{StoreError, UserStore},
        validation::validate,
    },
};

/// User lifecycle: create, read, update, delete, list.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

fn ensure_valid(request: &UserRequest) -> AppResult<()> {
    let violations = validate(request);
    if let Some(first) = violations.first() {
        warn!(field = ?first.field, code = ?first.code, count = violations.len(), "invalid user request");
        return Err(AppError::InvalidInput(violations));
    }
    Ok(())
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_user(&self, request: UserRequest) -> AppResult<UserResponse> {
        ensure_valid(&request)?;

        if self.store.exists_by_email(&request.email).await? {
            warn!("email already registered");
            return Err(AppError::AlreadyExists);
        }

        let record = tokio::task::spawn_blocking(move || mapper::to_record(request)).await??;
        // A concurrent registration can still win between the check and the insert;
        // the store's unique constraint turns that into AlreadyExists.
        let user = self.store.insert(record).await?;

        info!(user_id = %user.id, "user created");
        Ok(mapper::to_response(&user))
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_id(&self, id: Uuid) -> AppResult<UserResponse> {
        let user = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound(id))?;
        Ok(mapper::to_response(&user))
    }

    pub async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserResponse>> {
        let user = self.store.find_by_email(email).await?;
        Ok(user.as_ref().map(mapper::to_response))
    }

    /// Lazily maps every stored record; an empty store yields an empty stream.
    pub fn get_all_users(&self) -> BoxStream<'_, AppResult<UserResponse>> {
        self.store
            .find_all()
            .map_ok(|user| mapper::to_response(&user))
            .map_err(AppError::from)
            .boxed()
    }

    /// Replaces name, email and password. Email uniqueness is only enforced by the store.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn update_user(&self, id: Uuid, request: UserRequest) -> AppResult<UserResponse> {
        ensure_valid(&request)?;

        let mut user = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound(id))?;

        let record = tokio::task::spawn_blocking(move || mapper::to_record(request)).await??;
        user.name = record.name;
        user.email = record.email;
        user.password_hash = record.password_hash;

        let updated = self.store.update(&user).await.map_err(|e| match e {
            StoreError::NotFound => AppError::NotFound(id),
            other => other.into(),
        })?;

        info!(user_id = %updated.id, "user updated");
        Ok(mapper::to_response(&updated))
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> AppResult<()> {
        if self.store.find_by_id(id).await?.is_none() {
            return Err(AppError::NotFound(id));
        }
        // Another request may delete the row between the two calls.
        if !self.store.delete_by_id(id).await? {
            warn!(user_id = %id, "user vanished before delete");
            return Err(AppError::NotFound(id));
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::password::verify_password,
        error::ErrorKind,
        users::{
            memory::InMemoryUserStore,
            repo::StoreResult,
            repo_types::{NewUser, User},
            validation::Field,
        },
    };
    use async_trait::async_trait;

    fn request(name: &str, email: &str, password: &str) -> UserRequest {
        UserRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn service() -> (UserService, InMemoryUserStore) {
        let store = InMemoryUserStore::new();
        (UserService::new(Arc::new(store.clone())), store)
    }

    async fn count(service: &UserService) -> usize {
        service.get_all_users().try_collect::<Vec<_>>().await.unwrap().len()
    }

    #[derive(Clone, Copy)]
    enum Fault {
        /// exists_by_email always answers false, as if a concurrent insert raced us.
        StaleEmailCheck,
        /// find_by_id still sees the row but delete finds nothing.
        LostDelete,
        /// Every call fails.
        Down,
    }

    struct FaultyStore {
        inner: InMemoryUserStore,
        fault: Fault,
    }

    fn down() -> StoreError {
        StoreError::Database(sqlx::Error::PoolClosed)
    }

    #[async_trait]
    impl UserStore for FaultyStore {
        async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
            match self.fault {
                Fault::Down => Err(down()),
                _ => self.inner.find_by_id(id).await,
            }
        }

        async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
            match self.fault {
                Fault::Down => Err(down()),
                _ => self.inner.find_by_email(email).await,
            }
        }

        async fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
            match self.fault {
                Fault::StaleEmailCheck => Ok(false),
                Fault::Down => Err(down()),
                Fault::LostDelete => self.inner.exists_by_email(email).await,
            }
        }

        async fn insert(&self, user: NewUser) -> StoreResult<User> {
            match self.fault {
                Fault::Down => Err(down()),
                _ => self.inner.insert(user).await,
            }
        }

        async fn update(&self, user: &User) -> StoreResult<User> {
            match self.fault {
                Fault::Down => Err(down()),
                _ => self.inner.update(user).await,
            }
        }

        async fn delete_by_id(&self, id: Uuid) -> StoreResult<bool> {
            match self.fault {
                Fault::LostDelete => Ok(false),
                Fault::Down => Err(down()),
                Fault::StaleEmailCheck => self.inner.delete_by_id(id).await,
            }
        }

        fn find_all(&self) -> BoxStream<'_, StoreResult<User>> {
            self.inner.find_all()
        }
    }

    fn faulty(fault: Fault) -> (UserService, InMemoryUserStore) {
        let inner = InMemoryUserStore::new();
        let store = FaultyStore {
            inner: inner.clone(),
            fault,
        };
        (UserService::new(Arc::new(store)), inner)
    }

    #[tokio::test]
    async fn create_returns_public_fields() {
        let (service, store) = service();
        let created = service
            .create_user(request("Ann", "ann@x.com", "password1"))
            .await
            .unwrap();
        assert_eq!(created.name, "Ann");
        assert_eq!(created.email, "ann@x.com");

        let stored = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "password1");
        assert!(verify_password("password1", &stored.password_hash));
    }

    #[tokio::test]
    async fn invalid_requests_persist_nothing() {
        let (service, _) = service();
        let cases = [
            (request("", "ann@x.com", "password1"), Field::Name),
            (request("Al", "ann@x.com", "password1"), Field::Name),
            (request("Ann", "not-an-email", "password1"), Field::Email),
            (request("Ann", "ann@x.com", "short"), Field::Password),
        ];
        for (req, field) in cases {
            match service.create_user(req).await.unwrap_err() {
                AppError::InvalidInput(violations) => assert_eq!(violations[0].field, field),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(count(&service).await, 0);
    }

    #[tokio::test]
    async fn first_violation_follows_field_order() {
        let (service, _) = service();
        let err = service
            .create_user(request("A", "bad", "123"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.to_string(), "Name must be at least 3 characters long.");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (service, _) = service();
        service
            .create_user(request("Ann", "ann@x.com", "password1"))
            .await
            .unwrap();
        let err = service
            .create_user(request("Annie", "ann@x.com", "password2"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(count(&service).await, 1);
    }

    #[tokio::test]
    async fn racing_duplicate_is_caught_by_the_store() {
        let (service, _) = faulty(Fault::StaleEmailCheck);
        service
            .create_user(request("Ann", "ann@x.com", "password1"))
            .await
            .unwrap();
        let err = service
            .create_user(request("Ann", "ann@x.com", "password1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn get_by_id_is_repeatable() {
        let (service, _) = service();
        let created = service
            .create_user(request("Ann", "ann@x.com", "password1"))
            .await
            .unwrap();
        let first = service.get_user_by_id(created.id).await.unwrap();
        let second = service.get_user_by_id(created.id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, created);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let (service, _) = service();
        let id = Uuid::new_v4();
        let err = service.get_user_by_id(id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), format!("User not found with Id: {id}"));
    }

    #[tokio::test]
    async fn list_streams_every_user() {
        let (service, _) = service();
        assert_eq!(count(&service).await, 0);
        for (name, email) in [("Ann", "ann@x.com"), ("Bob", "bob@x.com")] {
            service
                .create_user(request(name, email, "password1"))
                .await
                .unwrap();
        }
        let users: Vec<UserResponse> = service.get_all_users().try_collect().await.unwrap();
        let emails: Vec<&str> = users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["ann@x.com", "bob@x.com"]);
    }

    #[tokio::test]
    async fn update_replaces_fields_and_rehashes() {
        let (service, store) = service();
        let created = service
            .create_user(request("Ann", "ann@x.com", "password1"))
            .await
            .unwrap();
        let before = store.find_by_id(created.id).await.unwrap().unwrap();

        let updated = service
            .update_user(created.id, request("Anna", "anna@x.com", "password1"))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Anna");
        assert_eq!(updated.email, "anna@x.com");

        let after = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_ne!(before.password_hash, after.password_hash);
        assert!(verify_password("password1", &after.password_hash));
    }

    #[tokio::test]
    async fn update_validates_before_lookup() {
        let (service, _) = service();
        let err = service
            .update_user(Uuid::new_v4(), request("Ann", "ann@x.com", "short"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = service
            .update_user(Uuid::new_v4(), request("Ann", "ann@x.com", "password1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn update_onto_taken_email_is_already_exists() {
        let (service, _) = service();
        service
            .create_user(request("Ann", "ann@x.com", "password1"))
            .await
            .unwrap();
        let bob = service
            .create_user(request("Bob", "bob@x.com", "password1"))
            .await
            .unwrap();
        let err = service
            .update_user(bob.id, request("Bob", "ann@x.com", "password1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn delete_twice_is_not_found() {
        let (service, _) = service();
        let ann = service
            .create_user(request("Ann", "ann@x.com", "password1"))
            .await
            .unwrap();
        service.delete_user(ann.id).await.unwrap();
        let err = service.delete_user(ann.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn concurrent_delete_collapses_to_not_found() {
        let (service, inner) = faulty(Fault::LostDelete);
        let ann = inner
            .insert(NewUser {
                name: "Ann".into(),
                email: "ann@x.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        let err = service.delete_user(ann.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn store_outage_is_internal() {
        let (service, _) = faulty(Fault::Down);
        let err = service.get_user_by_id(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        let err = service
            .create_user(request("Ann", "ann@x.com", "password1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
