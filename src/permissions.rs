//! Role-based permission mapping.
//!
//! Roles are open strings carried in token claims; permissions are a closed
//! set. The role map is built once at startup and never mutated afterwards.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Permission names carried in tokens and required by routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    Read,
    Write,
    Delete,
    AdminAccess,
}

/// Static role → permission mapping, immutable after startup.
#[derive(Debug, Clone)]
pub struct RoleMap {
    roles: HashMap<String, BTreeSet<Permission>>,
}

impl RoleMap {
    /// Create an empty role map.
    pub fn new() -> Self {
        Self {
            roles: HashMap::new(),
        }
    }

    /// Add or replace the permission set for a role.
    pub fn insert<I>(&mut self, role: impl Into<String>, permissions: I)
    where
        I: IntoIterator<Item = Permission>,
    {
        self.roles
            .insert(role.into(), permissions.into_iter().collect());
    }

    /// Permission set for a single role. Unknown roles yield the empty set.
    pub fn permissions_for(&self, role: &str) -> BTreeSet<Permission> {
        match self.roles.get(role) {
            Some(permissions) => permissions.clone(),
            None => {
                debug!(role = %role, "No permission mapping for role");
                BTreeSet::new()
            }
        }
    }

    /// Effective permission set for an identity: the union over its roles of
    /// the mapped permissions, plus any explicit grants from the claims.
    pub fn effective_permissions(
        &self,
        roles: &[String],
        explicit: &[Permission],
    ) -> BTreeSet<Permission> {
        let mut effective: BTreeSet<Permission> = roles
            .iter()
            .flat_map(|role| self.permissions_for(role))
            .collect();
        effective.extend(explicit.iter().copied());
        effective
    }
}

impl Default for RoleMap {
    /// Built-in mapping: USER can read and write, ADMIN can do everything.
    fn default() -> Self {
        let mut map = Self::new();
        map.insert("USER", [Permission::Read, Permission::Write]);
        map.insert(
            "ADMIN",
            [
                Permission::Read,
                Permission::Write,
                Permission::Delete,
                Permission::AdminAccess,
            ],
        );
        map
    }
}
