//! In-memory identity store
//!
//! Used when no database is configured and by tests. A single `RwLock`
//! guards the map, so the conditional slot write is atomic with respect to
//! every other write.

use super::{IdentityRepository, IdentityUpdate, NewIdentity, RefreshSlot, UserIdentity};
use crate::{Result, Role, StorefrontError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Identity store backed by a process-local map
#[derive(Default)]
pub struct MemoryIdentityStore {
    identities: RwLock<HashMap<Uuid, UserIdentity>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(map: &HashMap<Uuid, UserIdentity>, email: &str, except: Option<Uuid>) -> bool {
    map.values()
        .any(|u| u.email == email && Some(u.id) != except)
}

#[async_trait]
impl IdentityRepository for MemoryIdentityStore {
    async fn create(&self, identity: NewIdentity) -> Result<UserIdentity> {
        let mut map = self.identities.write().await;
        if email_taken(&map, &identity.email, None) {
            return Err(StorefrontError::Conflict("Email already registered".to_string()));
        }

        let now = Utc::now();
        let record = UserIdentity {
            id: Uuid::new_v4(),
            email: identity.email,
            password_hash: identity.password_hash,
            role: identity.role,
            profile: identity.profile,
            refresh_slot: RefreshSlot::Empty,
            created_at: now,
            updated_at: now,
        };
        map.insert(record.id, record.clone());

        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserIdentity>> {
        Ok(self.identities.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>> {
        let map = self.identities.read().await;
        Ok(map.values().find(|u| u.email == email).cloned())
    }

    async fn list(&self) -> Result<Vec<UserIdentity>> {
        let map = self.identities.read().await;
        let mut users: Vec<UserIdentity> = map.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn update(&self, id: Uuid, update: IdentityUpdate) -> Result<UserIdentity> {
        let mut map = self.identities.write().await;

        if let Some(email) = update.email.as_deref() {
            if email_taken(&map, email, Some(id)) {
                return Err(StorefrontError::Conflict("Email already registered".to_string()));
            }
        }

        let record = map
            .get_mut(&id)
            .ok_or_else(|| StorefrontError::NotFound(format!("user {id}")))?;

        update.apply_profile(&mut record.profile);
        if let Some(email) = update.email {
            record.email = email;
        }
        if let Some(hash) = update.password_hash {
            record.password_hash = hash;
        }
        if let Some(role) = update.role {
            record.role = role;
        }
        record.updated_at = Utc::now();

        Ok(record.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.identities.write().await.remove(&id).is_some())
    }

    async fn exists_with_role(&self, role: Role) -> Result<bool> {
        let map = self.identities.read().await;
        Ok(map.values().any(|u| u.role == role))
    }

    async fn set_refresh_slot(&self, id: Uuid, slot: RefreshSlot) -> Result<()> {
        let mut map = self.identities.write().await;
        let record = map
            .get_mut(&id)
            .ok_or_else(|| StorefrontError::NotFound(format!("user {id}")))?;
        record.refresh_slot = slot;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn replace_refresh_slot(
        &self,
        id: Uuid,
        expected_hash: Option<&str>,
        slot: RefreshSlot,
    ) -> Result<bool> {
        let mut map = self.identities.write().await;
        let Some(record) = map.get_mut(&id) else {
            return Ok(false);
        };

        if record.refresh_slot.token_hash() != expected_hash {
            return Ok(false);
        }

        record.refresh_slot = slot;
        record.updated_at = Utc::now();
        Ok(true)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Profile;
    use chrono::Duration;

    fn new_identity(email: &str) -> NewIdentity {
        NewIdentity {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::Customer,
            profile: Profile::default(),
        }
    }

    fn active(hash: &str) -> RefreshSlot {
        RefreshSlot::Active {
            token_hash: hash.to_string(),
            expires_at: Utc::now() + Duration::days(7),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryIdentityStore::new();
        let created = store.create(new_identity("a@example.com")).await.unwrap();

        assert_eq!(created.refresh_slot, RefreshSlot::Empty);
        assert_eq!(created.role, Role::Customer);

        let by_id = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@example.com");

        let by_email = store.find_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        assert!(store.find_by_email("b@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryIdentityStore::new();
        store.create(new_identity("a@example.com")).await.unwrap();

        let result = store.create(new_identity("a@example.com")).await;
        assert!(matches!(result, Err(StorefrontError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_email_conflict_and_not_found() {
        let store = MemoryIdentityStore::new();
        let a = store.create(new_identity("a@example.com")).await.unwrap();
        store.create(new_identity("b@example.com")).await.unwrap();

        let result = store
            .update(
                a.id,
                IdentityUpdate {
                    email: Some("b@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(StorefrontError::Conflict(_))));

        // Re-saving one's own email is not a conflict
        let same = store
            .update(
                a.id,
                IdentityUpdate {
                    email: Some("a@example.com".to_string()),
                    role: Some(Role::Shop),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.role, Role::Shop);

        let missing = store.update(Uuid::new_v4(), IdentityUpdate::default()).await;
        assert!(matches!(missing, Err(StorefrontError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_profile_is_stored_and_patched() {
        let store = MemoryIdentityStore::new();
        let created = store
            .create(NewIdentity {
                profile: Profile {
                    first_name: Some("Ada".to_string()),
                    last_name: Some("Byron".to_string()),
                    photo: None,
                },
                ..new_identity("ada@example.com")
            })
            .await
            .unwrap();
        assert_eq!(created.profile.first_name.as_deref(), Some("Ada"));

        let updated = store
            .update(
                created.id,
                IdentityUpdate {
                    last_name: Some("Lovelace".to_string()),
                    photo: Some("https://cdn.example.com/ada.png".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.profile.first_name.as_deref(), Some("Ada"));
        assert_eq!(updated.profile.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(
            updated.profile.photo.as_deref(),
            Some("https://cdn.example.com/ada.png")
        );
    }

    #[tokio::test]
    async fn test_conditional_slot_replace() {
        let store = MemoryIdentityStore::new();
        let user = store.create(new_identity("a@example.com")).await.unwrap();

        // Empty -> Active
        assert!(store
            .replace_refresh_slot(user.id, None, active("h1"))
            .await
            .unwrap());

        // Stale expectation loses
        assert!(!store
            .replace_refresh_slot(user.id, None, active("h2"))
            .await
            .unwrap());

        // Active(h1) -> Active(h2)
        assert!(store
            .replace_refresh_slot(user.id, Some("h1"), active("h2"))
            .await
            .unwrap());
        assert!(!store
            .replace_refresh_slot(user.id, Some("h1"), active("h3"))
            .await
            .unwrap());

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_slot.token_hash(), Some("h2"));

        // Unknown user
        assert!(!store
            .replace_refresh_slot(Uuid::new_v4(), None, active("h4"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_delete_and_role_lookup() {
        let store = MemoryIdentityStore::new();
        let user = store
            .create(NewIdentity {
                role: Role::Admin,
                ..new_identity("root@example.com")
            })
            .await
            .unwrap();

        assert!(store.exists_with_role(Role::Admin).await.unwrap());
        assert!(!store.exists_with_role(Role::Shop).await.unwrap());

        assert!(store.delete(user.id).await.unwrap());
        assert!(!store.delete(user.id).await.unwrap());
        assert!(!store.exists_with_role(Role::Admin).await.unwrap());
    }
}
