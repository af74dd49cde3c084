use chrono::{DateTime, Utc};

use crate::model::ids::UserId;
use crate::scoring;

/// Accumulated progress for one user: XP and the level derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    user_id: UserId,
    username: Option<String>,
    xp: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Profile {
    /// A fresh profile at level 1 with no XP.
    #[must_use]
    pub fn new(user_id: UserId, username: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            username: normalize_username(username),
            xp: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn from_persisted(
        user_id: UserId,
        username: Option<String>,
        xp: u64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            username: normalize_username(username),
            xp,
            created_at,
            updated_at,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Name to greet the user with when no username has been set.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("Learner")
    }

    #[must_use]
    pub fn xp(&self) -> u64 {
        self.xp
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        scoring::level_for_xp(self.xp)
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Add XP. XP never decreases; the level follows automatically.
    pub fn add_xp(&mut self, amount: u32, now: DateTime<Utc>) {
        self.xp = self.xp.saturating_add(u64::from(amount));
        self.updated_at = now;
    }
}

fn normalize_username(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
