//! User records and the storage collaborator behind them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use warden_auth::{Role, RoleAssignmentStore, StoreError, Subject};
use warden_core::{UserId, UserUuid};

/// Stored user. The password hash never leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub uuid: UserUuid,
    pub username: String,
    pub nickname: String,
    pub header_img: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Every role the user may act as.
    pub roles: Vec<Role>,
    /// The role the user currently acts as; always one of `roles`.
    pub active_role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Token subject for this user acting as its active role.
    pub fn subject(&self) -> Subject {
        Subject {
            user_id: self.id,
            user_uuid: self.uuid,
            role: self.active_role.clone(),
            username: self.username.clone(),
            nickname: self.nickname.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub nickname: String,
    pub header_img: String,
    pub roles: Vec<Role>,
    /// Defaults to the first of `roles`.
    pub active_role: Option<Role>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub nickname: Option<String>,
    pub header_img: Option<String>,
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
}

impl Page {
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn new(page: u32, page_size: u32) -> Result<Self, StoreError> {
        if page == 0 {
            return Err(StoreError::Rejected("page starts at 1".into()));
        }
        if page_size == 0 || page_size > Self::MAX_PAGE_SIZE {
            return Err(StoreError::Rejected(format!(
                "page size must be between 1 and {}",
                Self::MAX_PAGE_SIZE
            )));
        }
        Ok(Self { page, page_size })
    }

    fn offset(&self) -> usize {
        (self.page as usize - 1) * self.page_size as usize
    }
}

/// Full user storage contract used by the HTTP layer.
#[async_trait]
pub trait UserStore: RoleAssignmentStore {
    async fn create(&self, new: NewUser) -> Result<UserRecord, StoreError>;
    async fn find_by_id(&self, id: UserId) -> Result<UserRecord, StoreError>;
    async fn find_by_uuid(&self, uuid: UserUuid) -> Result<Option<UserRecord>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;
    /// Users ordered by id, plus the total count.
    async fn list(&self, page: Page) -> Result<(Vec<UserRecord>, u64), StoreError>;
    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> Result<UserRecord, StoreError>;
    async fn set_password(&self, id: UserId, password_hash: String) -> Result<(), StoreError>;
    async fn delete(&self, id: UserId) -> Result<(), StoreError>;
    /// Replace the assigned role set. If the active role is dropped, the
    /// first remaining role becomes active.
    async fn set_roles(&self, id: UserId, roles: Vec<Role>) -> Result<UserRecord, StoreError>;
}

/// In-memory user store for tests/dev.
#[derive(Debug)]
pub struct InMemoryUserStore {
    inner: RwLock<HashMap<UserId, UserRecord>>,
    next_id: AtomicU64,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<UserId, UserRecord>>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("user table lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<UserId, UserRecord>>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("user table lock poisoned".into()))
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

fn dedup_roles(roles: Vec<Role>) -> Vec<Role> {
    let mut out: Vec<Role> = Vec::with_capacity(roles.len());
    for role in roles {
        if !out.contains(&role) {
            out.push(role);
        }
    }
    out
}

#[async_trait]
impl RoleAssignmentStore for InMemoryUserStore {
    async fn set_active_role(&self, user: UserId, role: &Role) -> Result<(), StoreError> {
        let mut map = self.write()?;
        let record = map.get_mut(&user).ok_or(StoreError::UserNotFound(user))?;
        if !record.roles.contains(role) {
            return Err(StoreError::RoleNotAssigned {
                user,
                role: role.clone(),
            });
        }
        record.active_role = role.clone();
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn active_role(&self, user: UserId) -> Result<Role, StoreError> {
        let map = self.read()?;
        map.get(&user)
            .map(|u| u.active_role.clone())
            .ok_or(StoreError::UserNotFound(user))
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, new: NewUser) -> Result<UserRecord, StoreError> {
        let username = new.username.trim().to_string();
        if username.is_empty() {
            return Err(StoreError::Rejected("username must not be empty".into()));
        }
        let roles = dedup_roles(new.roles);
        let active_role = match new.active_role {
            Some(role) => role,
            None => roles
                .first()
                .cloned()
                .ok_or_else(|| StoreError::Rejected("a user needs at least one role".into()))?,
        };
        if !roles.contains(&active_role) {
            return Err(StoreError::Rejected(format!(
                "active role '{active_role}' is not among the assigned roles"
            )));
        }

        let mut map = self.write()?;
        if map.values().any(|u| u.username == username) {
            return Err(StoreError::Conflict(format!("username '{username}' is taken")));
        }

        let now = Utc::now();
        let record = UserRecord {
            id: UserId::new(self.next_id.fetch_add(1, Ordering::Relaxed)),
            uuid: UserUuid::new(),
            username,
            nickname: new.nickname,
            header_img: new.header_img,
            password_hash: new.password_hash,
            roles,
            active_role,
            created_at: now,
            updated_at: now,
        };
        map.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: UserId) -> Result<UserRecord, StoreError> {
        let map = self.read()?;
        map.get(&id).cloned().ok_or(StoreError::UserNotFound(id))
    }

    async fn find_by_uuid(&self, uuid: UserUuid) -> Result<Option<UserRecord>, StoreError> {
        let map = self.read()?;
        Ok(map.values().find(|u| u.uuid == uuid).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let username = username.trim();
        let map = self.read()?;
        Ok(map.values().find(|u| u.username == username).cloned())
    }

    async fn list(&self, page: Page) -> Result<(Vec<UserRecord>, u64), StoreError> {
        let map = self.read()?;
        let mut all: Vec<&UserRecord> = map.values().collect();
        all.sort_by_key(|u| u.id);
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(page.offset())
            .take(page.page_size as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }

    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> Result<UserRecord, StoreError> {
        let mut map = self.write()?;
        let record = map.get_mut(&id).ok_or(StoreError::UserNotFound(id))?;
        if let Some(nickname) = update.nickname {
            record.nickname = nickname;
        }
        if let Some(header_img) = update.header_img {
            record.header_img = header_img;
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn set_password(&self, id: UserId, password_hash: String) -> Result<(), StoreError> {
        let mut map = self.write()?;
        let record = map.get_mut(&id).ok_or(StoreError::UserNotFound(id))?;
        record.password_hash = password_hash;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: UserId) -> Result<(), StoreError> {
        let mut map = self.write()?;
        map.remove(&id).map(|_| ()).ok_or(StoreError::UserNotFound(id))
    }

    async fn set_roles(&self, id: UserId, roles: Vec<Role>) -> Result<UserRecord, StoreError> {
        let roles = dedup_roles(roles);
        let Some(first) = roles.first().cloned() else {
            return Err(StoreError::Rejected("a user needs at least one role".into()));
        };

        let mut map = self.write()?;
        let record = map.get_mut(&id).ok_or(StoreError::UserNotFound(id))?;
        if !roles.contains(&record.active_role) {
            record.active_role = first;
        }
        record.roles = roles;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str, roles: &[&'static str]) -> NewUser {
        NewUser {
            username: name.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            nickname: name.to_uppercase(),
            header_img: String::new(),
            roles: roles.iter().map(|r| Role::new(*r)).collect(),
            active_role: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids_and_unique_usernames() {
        let store = InMemoryUserStore::new();
        let a = store.create(new_user("alice", &["admin"])).await.unwrap();
        let b = store.create(new_user("bob", &["viewer"])).await.unwrap();

        assert_eq!(a.id.get(), 1);
        assert_eq!(b.id.get(), 2);
        assert_ne!(a.uuid, b.uuid);
        assert_eq!(a.active_role, Role::new("admin"));

        let dup = store.create(new_user("alice", &["viewer"])).await.unwrap_err();
        assert!(matches!(dup, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_requires_roles_and_consistent_active_role() {
        let store = InMemoryUserStore::new();
        assert!(matches!(
            store.create(new_user("nobody", &[])).await,
            Err(StoreError::Rejected(_))
        ));

        let mut u = new_user("carol", &["viewer"]);
        u.active_role = Some(Role::new("admin"));
        assert!(matches!(store.create(u).await, Err(StoreError::Rejected(_))));
    }

    #[tokio::test]
    async fn active_role_must_be_assigned() {
        let store = InMemoryUserStore::new();
        let u = store
            .create(new_user("dave", &["admin", "editor"]))
            .await
            .unwrap();

        store.set_active_role(u.id, &Role::new("editor")).await.unwrap();
        assert_eq!(store.active_role(u.id).await.unwrap(), Role::new("editor"));

        let err = store
            .set_active_role(u.id, &Role::new("root"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RoleNotAssigned { .. }));
        assert_eq!(store.active_role(u.id).await.unwrap(), Role::new("editor"));

        let missing = store
            .set_active_role(UserId::new(99), &Role::new("admin"))
            .await
            .unwrap_err();
        assert_eq!(missing, StoreError::UserNotFound(UserId::new(99)));
    }

    #[tokio::test]
    async fn set_roles_falls_back_to_first_role_when_active_is_dropped() {
        let store = InMemoryUserStore::new();
        let u = store
            .create(new_user("erin", &["admin", "viewer"]))
            .await
            .unwrap();

        let updated = store
            .set_roles(u.id, vec![Role::new("editor"), Role::new("viewer"), Role::new("editor")])
            .await
            .unwrap();
        assert_eq!(updated.roles, vec![Role::new("editor"), Role::new("viewer")]);
        assert_eq!(updated.active_role, Role::new("editor"));

        assert!(matches!(
            store.set_roles(u.id, vec![]).await,
            Err(StoreError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn list_pages_in_id_order() {
        let store = InMemoryUserStore::new();
        for name in ["u1", "u2", "u3", "u4", "u5"] {
            store.create(new_user(name, &["viewer"])).await.unwrap();
        }

        let (items, total) = store.list(Page::new(2, 2).unwrap()).await.unwrap();
        assert_eq!(total, 5);
        let names: Vec<_> = items.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["u3", "u4"]);

        let (items, _) = store.list(Page::new(3, 2).unwrap()).await.unwrap();
        assert_eq!(items.len(), 1);

        assert!(Page::new(0, 10).is_err());
        assert!(Page::new(1, 0).is_err());
        assert!(Page::new(1, Page::MAX_PAGE_SIZE + 1).is_err());
    }

    #[tokio::test]
    async fn profile_password_and_delete() {
        let store = InMemoryUserStore::new();
        let u = store.create(new_user("frank", &["viewer"])).await.unwrap();

        let updated = store
            .update_profile(
                u.id,
                ProfileUpdate {
                    nickname: Some("Franky".into()),
                    header_img: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.nickname, "Franky");
        assert_eq!(updated.header_img, "");

        store.set_password(u.id, "new-hash".into()).await.unwrap();
        assert_eq!(store.find_by_id(u.id).await.unwrap().password_hash, "new-hash");

        assert!(store.find_by_uuid(u.uuid).await.unwrap().is_some());
        assert!(store.find_by_username(" frank ").await.unwrap().is_some());

        store.delete(u.id).await.unwrap();
        assert_eq!(
            store.delete(u.id).await.unwrap_err(),
            StoreError::UserNotFound(u.id)
        );
        assert!(store.find_by_uuid(u.uuid).await.unwrap().is_none());
    }

    #[test]
    fn serialized_record_hides_password_hash() {
        let now = Utc::now();
        let record = UserRecord {
            id: UserId::new(1),
            uuid: UserUuid::new(),
            username: "gina".into(),
            nickname: "Gina".into(),
            header_img: String::new(),
            password_hash: "secret-hash".into(),
            roles: vec![Role::new("viewer")],
            active_role: Role::new("viewer"),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["activeRole"], "viewer");
    }
}
