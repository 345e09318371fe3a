use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::keyval::KeyValStore;

/// Storage key for the user directory.
pub const KNOWN_USERS_KEY: &str = "known_users_list";

const KNOWN_USERS_VERSION: u32 = 1;

/// A user the assistant has met, with their direct-message room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownUser {
    pub display_name: String,
    pub dm_room_id: String,
}

/// Versioned envelope for the persisted directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KnownUsersList {
    schema_version: u32,
    /// Keyed by user id; BTreeMap so listings are stable.
    users: BTreeMap<String, KnownUser>,
}

impl Default for KnownUsersList {
    fn default() -> Self {
        Self {
            schema_version: KNOWN_USERS_VERSION,
            users: BTreeMap::new(),
        }
    }
}

/// The user directory, stored as one map under [`KNOWN_USERS_KEY`].
pub struct KnownUsers {
    kv: Arc<dyn KeyValStore>,
}

impl KnownUsers {
    pub fn new(kv: Arc<dyn KeyValStore>) -> Self {
        Self { kv }
    }

    fn load(&self) -> Result<KnownUsersList> {
        match self.kv.get(KNOWN_USERS_KEY)? {
            Some(raw) => Ok(serde_json::from_slice(&raw)?),
            None => Ok(KnownUsersList::default()),
        }
    }

    fn save(&self, list: &KnownUsersList) -> Result<()> {
        self.kv.put(KNOWN_USERS_KEY, &serde_json::to_vec(list)?)?;
        Ok(())
    }

    /// Write an empty versioned directory if none exists yet.
    ///
    /// Returns true when the directory was created by this call.
    pub fn ensure_initialized(&self) -> Result<bool> {
        if self.kv.has_key(KNOWN_USERS_KEY)? {
            return Ok(false);
        }
        self.save(&KnownUsersList::default())?;
        Ok(true)
    }

    /// Insert or update a user record.
    pub fn upsert(&self, user_id: &str, user: KnownUser) -> Result<()> {
        let mut list = self.load()?;
        list.users.insert(user_id.to_string(), user);
        self.save(&list)
    }

    pub fn get(&self, user_id: &str) -> Result<Option<KnownUser>> {
        Ok(self.load()?.users.get(user_id).cloned())
    }

    /// Display name for a user, falling back to the raw id.
    pub fn display_name(&self, user_id: &str) -> Result<String> {
        Ok(self
            .get(user_id)?
            .map(|u| u.display_name)
            .unwrap_or_else(|| user_id.to_string()))
    }

    /// All known users, ordered by user id.
    pub fn list(&self) -> Result<Vec<(String, KnownUser)>> {
        Ok(self.load()?.users.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyval::memory_store;

    fn users() -> KnownUsers {
        KnownUsers::new(Arc::new(memory_store()))
    }

    #[test]
    fn missing_directory_is_empty() {
        let u = users();
        assert!(u.list().unwrap().is_empty());
        assert_eq!(u.display_name("@alice:host").unwrap(), "@alice:host");
    }

    #[test]
    fn upsert_then_lookup() {
        let u = users();
        u.upsert(
            "@alice:host",
            KnownUser {
                display_name: "Alice".into(),
                dm_room_id: "!dm-alice".into(),
            },
        )
        .unwrap();

        assert_eq!(u.display_name("@alice:host").unwrap(), "Alice");
        assert_eq!(u.get("@alice:host").unwrap().unwrap().dm_room_id, "!dm-alice");
    }

    #[test]
    fn listing_is_ordered_by_user_id() {
        let u = users();
        for (id, name) in [("@zoe:host", "Zoe"), ("@amy:host", "Amy")] {
            u.upsert(
                id,
                KnownUser {
                    display_name: name.into(),
                    dm_room_id: format!("!dm-{name}"),
                },
            )
            .unwrap();
        }
        let listed = u.list().unwrap();
        assert_eq!(listed[0].0, "@amy:host");
        assert_eq!(listed[1].0, "@zoe:host");
    }
}
