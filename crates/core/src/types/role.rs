//! Role tags and role sets.
//!
//! Roles are persisted as a comma-delimited string (`"USER,ADMIN"`). Parsing
//! matches each token exactly after trimming surrounding whitespace: `Admin`
//! and `admin` are not `ADMIN`.

use core::fmt;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A single role tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular customer: can browse and buy tickets.
    User,
    /// Administrator: manages movies, customers and purchases.
    Admin,
}

/// Error returned when a role token is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role: {0:?}")]
pub struct RoleParseError(pub String);

impl Role {
    /// Wire and database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Self::User),
            "ADMIN" => Ok(Self::Admin),
            other => Err(RoleParseError(other.to_owned())),
        }
    }
}

/// An ordered set of roles held by a customer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// The role set given to newly registered customers.
    #[must_use]
    pub fn user() -> Self {
        Self::from_iter([Role::User])
    }

    /// Customer plus administrator.
    #[must_use]
    pub fn admin() -> Self {
        Self::from_iter([Role::User, Role::Admin])
    }

    /// Parse the persisted comma-delimited form.
    ///
    /// Unknown tokens are dropped with a warning. An empty result falls back
    /// to `{USER}`.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        let mut roles = BTreeSet::new();
        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.parse::<Role>() {
                Ok(role) => {
                    roles.insert(role);
                }
                Err(err) => tracing::warn!(%err, "ignoring unrecognised role token"),
            }
        }
        if roles.is_empty() {
            return Self::user();
        }
        Self(roles)
    }

    /// Whether the set contains `role`.
    #[must_use]
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// Add a role. Returns `false` if it was already present.
    pub fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    /// Remove a role. Returns `false` if it was not present.
    pub fn remove(&mut self, role: Role) -> bool {
        self.0.remove(&role)
    }

    /// Iterate roles in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    /// Number of roles held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no roles are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-delimited form for persistence.
    #[must_use]
    pub fn to_db_string(&self) -> String {
        self.iter().map(Role::as_str).collect::<Vec<_>>().join(",")
    }
}

impl Default for RoleSet {
    fn default() -> Self {
        Self::user()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_db_string())
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for RoleSet {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for RoleSet {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse_lenient(&s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for RoleSet {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.to_db_string(), buf)
    }
}
