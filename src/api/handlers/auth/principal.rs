//! Principals, roles and the shaped view returned to clients.
//!
//! Roles come from three disjoint sets, one per principal kind. The wire form of
//! every role is its kebab-case string, which is also what session tokens carry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// The collection a principal lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    Admin,
    Store,
    User,
}

impl PrincipalKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Store => "store",
            Self::User => "user",
        }
    }

    /// Role given to principals provisioned without an explicit role.
    #[must_use]
    pub const fn default_role(self) -> Role {
        match self {
            Self::Admin => Role::Admin(AdminRole::SubAdmin),
            Self::Store => Role::Store(StoreRole::StoreAdmin),
            Self::User => Role::User(UserRole::NormalUser),
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdminRole {
    SubAdmin,
    NormalAdmin,
    SuperAdmin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreRole {
    StoreAdmin,
    StoreManager,
    StoreStaff,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UserRole {
    NormalUser,
    PremiumUser,
}

impl AdminRole {
    pub const ALL: [Self; 3] = [Self::SubAdmin, Self::NormalAdmin, Self::SuperAdmin];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SubAdmin => "sub-admin",
            Self::NormalAdmin => "normal-admin",
            Self::SuperAdmin => "super-admin",
        }
    }
}

impl StoreRole {
    pub const ALL: [Self; 3] = [Self::StoreAdmin, Self::StoreManager, Self::StoreStaff];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StoreAdmin => "store-admin",
            Self::StoreManager => "store-manager",
            Self::StoreStaff => "store-staff",
        }
    }
}

impl UserRole {
    pub const ALL: [Self; 2] = [Self::NormalUser, Self::PremiumUser];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NormalUser => "normal-user",
            Self::PremiumUser => "premium-user",
        }
    }
}

/// Combined role type. The variant fixes which collection the principal belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Admin(AdminRole),
    Store(StoreRole),
    User(UserRole),
}

impl Role {
    pub const SUPER_ADMIN: Self = Self::Admin(AdminRole::SuperAdmin);
    pub const NORMAL_ADMIN: Self = Self::Admin(AdminRole::NormalAdmin);
    pub const STORE_ADMIN: Self = Self::Store(StoreRole::StoreAdmin);

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin(role) => role.as_str(),
            Self::Store(role) => role.as_str(),
            Self::User(role) => role.as_str(),
        }
    }

    #[must_use]
    pub const fn kind(self) -> PrincipalKind {
        match self {
            Self::Admin(_) => PrincipalKind::Admin,
            Self::Store(_) => PrincipalKind::Store,
            Self::User(_) => PrincipalKind::User,
        }
    }

    /// Every role of every kind.
    pub fn all() -> impl Iterator<Item = Self> {
        AdminRole::ALL
            .into_iter()
            .map(Self::Admin)
            .chain(StoreRole::ALL.into_iter().map(Self::Store))
            .chain(UserRole::ALL.into_iter().map(Self::User))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| UnknownRole(value.to_string()))
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Hashed passcode plus its absolute expiry (unix seconds).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtpRecord {
    pub code_hash: String,
    pub expires_at: i64,
}

/// An admin, store or user as held by the persistence layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub kind: PrincipalKind,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password_hash: Option<String>,
    pub is_email_verified: bool,
    pub google_id: Option<String>,
    pub otp: Option<OtpRecord>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Principal {
    #[must_use]
    pub fn view(&self) -> PrincipalView {
        PrincipalView::from(self)
    }
}

/// Non-sensitive projection of a principal for response bodies.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalView {
    pub id: String,
    pub kind: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub is_email_verified: bool,
}

impl From<&Principal> for PrincipalView {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id.to_string(),
            kind: principal.kind.as_str().to_string(),
            full_name: principal.full_name.clone(),
            email: principal.email.clone(),
            role: principal.role.as_str().to_string(),
            is_email_verified: principal.is_email_verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn role_sets_are_pairwise_disjoint() {
        let admin: HashSet<&str> = AdminRole::ALL.iter().map(|r| r.as_str()).collect();
        let store: HashSet<&str> = StoreRole::ALL.iter().map(|r| r.as_str()).collect();
        let user: HashSet<&str> = UserRole::ALL.iter().map(|r| r.as_str()).collect();

        assert!(admin.is_disjoint(&store));
        assert!(admin.is_disjoint(&user));
        assert!(store.is_disjoint(&user));
        assert_eq!(Role::all().count(), admin.len() + store.len() + user.len());
    }

    #[test]
    fn role_parses_its_own_wire_form() {
        for role in Role::all() {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn role_rejects_unknown_values() {
        assert!("root".parse::<Role>().is_err());
        assert!("Super-Admin".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn role_kind_matches_its_set() {
        assert_eq!(Role::SUPER_ADMIN.kind(), PrincipalKind::Admin);
        assert_eq!(Role::STORE_ADMIN.kind(), PrincipalKind::Store);
        assert_eq!(
            Role::User(UserRole::PremiumUser).kind(),
            PrincipalKind::User
        );
    }

    #[test]
    fn default_role_belongs_to_its_kind() {
        for kind in [PrincipalKind::Admin, PrincipalKind::Store, PrincipalKind::User] {
            assert_eq!(kind.default_role().kind(), kind);
        }
    }

    #[test]
    fn role_serializes_as_string() -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(Role::STORE_ADMIN)?;
        assert_eq!(value, serde_json::json!("store-admin"));
        let decoded: Role = serde_json::from_value(serde_json::json!("normal-user"))?;
        assert_eq!(decoded, Role::User(UserRole::NormalUser));
        assert!(serde_json::from_value::<Role>(serde_json::json!("nobody")).is_err());
        Ok(())
    }

    #[test]
    fn view_omits_secrets() -> Result<(), serde_json::Error> {
        let principal = Principal {
            id: Uuid::nil(),
            kind: PrincipalKind::Store,
            email: "c@x.com".to_string(),
            full_name: "Corner Shop".to_string(),
            role: Role::STORE_ADMIN,
            password_hash: Some("$argon2id$...".to_string()),
            is_email_verified: false,
            google_id: Some("g-1".to_string()),
            otp: Some(OtpRecord {
                code_hash: "$argon2id$...".to_string(),
                expires_at: 10,
            }),
            created_at: 0,
            updated_at: 0,
        };
        let value = serde_json::to_value(principal.view())?;
        assert_eq!(value["email"], "c@x.com");
        assert_eq!(value["role"], "store-admin");
        assert_eq!(value["isEmailVerified"], false);
        assert!(value.get("passwordHash").is_none());
        assert!(value.get("otp").is_none());
        assert!(value.get("googleId").is_none());
        Ok(())
    }
}
