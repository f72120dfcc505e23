//! Core authorization types: roles, principals, decisions and the closed set
//! of actions and subjects the policy understands.
//!
//! # Role hierarchy
//!
//! Roles form a strict order: `ROLE_USER < ROLE_ADMIN < ROLE_SUPER_ADMIN`.
//! Two questions are asked about a principal and they must not be confused:
//!
//! - **holds**: the role is explicitly part of the principal's role set
//!   (the baseline `ROLE_USER` is always held).
//! - **is granted**: the principal holds the role or any role above it.
//!
//! The delete and edit rules use "holds" for `ROLE_SUPER_ADMIN` on the target
//! and "is granted" for the acting principal's admin check.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::AuthzError;

/// A hierarchical permission token.
///
/// Variant order is the hierarchy order, so `Ord` can be used to compare
/// privilege levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
    #[serde(rename = "ROLE_SUPER_ADMIN")]
    SuperAdmin,
}

impl Role {
    /// The role every account carries implicitly.
    pub const BASELINE: Role = Role::User;

    /// All roles, lowest first.
    pub const ALL: [Role; 3] = [Role::User, Role::Admin, Role::SuperAdmin];

    /// The stored token for this role (e.g. `ROLE_ADMIN`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
            Role::Admin => "ROLE_ADMIN",
            Role::SuperAdmin => "ROLE_SUPER_ADMIN",
        }
    }

    /// Human label shown next to a role choice.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Admin => "Administrator",
            Role::SuperAdmin => "Super administrator",
        }
    }

    /// Whether holding `self` implies being granted `other`.
    pub fn includes(self, other: Role) -> bool {
        self >= other
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthzError;

    /// Accepts the stored token (`ROLE_ADMIN`) as well as the short,
    /// case-insensitive form (`admin`, `super_admin`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("ROLE_").unwrap_or(&upper);
        match name {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            _ => Err(AuthzError::UnknownRole(s.to_string())),
        }
    }
}

/// A deduplicated set of roles that always contains the baseline role.
///
/// Serialized as a list of role tokens in hierarchy order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct RoleSet {
    roles: BTreeSet<Role>,
}

impl RoleSet {
    /// A role set holding only the baseline role.
    pub fn new() -> Self {
        Self::from_roles([])
    }

    /// Builds a normalized set from any collection of roles.
    pub fn from_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        let mut roles: BTreeSet<Role> = roles.into_iter().collect();
        roles.insert(Role::BASELINE);
        Self { roles }
    }

    /// Parses role tokens, deduplicating them and adding the baseline role.
    pub fn parse<I, S>(tokens: I) -> crate::error::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let roles = tokens
            .into_iter()
            .map(|token| token.as_ref().parse::<Role>())
            .collect::<crate::error::Result<Vec<_>>>()?;
        Ok(Self::from_roles(roles))
    }

    /// Whether `role` is explicitly in the set.
    pub fn holds(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Whether any role in the set includes `role` through the hierarchy.
    pub fn grants(&self, role: Role) -> bool {
        self.roles.iter().any(|held| held.includes(role))
    }

    /// The highest role in the set.
    pub fn highest(&self) -> Role {
        self.roles.iter().next_back().copied().unwrap_or(Role::BASELINE)
    }

    pub fn insert(&mut self, role: Role) {
        self.roles.insert(role);
    }

    /// Removes a role. The baseline role cannot be removed.
    pub fn remove(&mut self, role: Role) {
        if role != Role::BASELINE {
            self.roles.remove(&role);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.roles.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Always false; a role set contains at least the baseline role.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Role tokens, baseline included, in hierarchy order.
    pub fn tokens(&self) -> Vec<&'static str> {
        self.roles.iter().map(Role::as_str).collect()
    }

    /// The explicitly assigned roles, without the implicit baseline.
    ///
    /// This is what gets persisted.
    pub fn assigned(&self) -> Vec<Role> {
        self.roles
            .iter()
            .copied()
            .filter(|role| *role != Role::BASELINE)
            .collect()
    }
}

impl Default for RoleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        Self::from_roles(iter)
    }
}

impl TryFrom<Vec<String>> for RoleSet {
    type Error = AuthzError;

    fn try_from(tokens: Vec<String>) -> Result<Self, Self::Error> {
        Self::parse(tokens)
    }
}

impl From<RoleSet> for Vec<String> {
    fn from(set: RoleSet) -> Self {
        set.tokens().into_iter().map(str::to_string).collect()
    }
}

/// Opaque identifier of a persisted account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub i64);

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An actor evaluated by policy, or the account a policy is evaluated against.
///
/// `id` is absent for accounts that have not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Option<PrincipalId>,
    pub roles: RoleSet,
}

impl Principal {
    pub fn new(id: Option<PrincipalId>, roles: RoleSet) -> Self {
        Self { id, roles }
    }

    /// A persisted principal with the given id.
    pub fn persisted(id: i64, roles: impl IntoIterator<Item = Role>) -> Self {
        Self::new(Some(PrincipalId(id)), RoleSet::from_roles(roles))
    }

    /// A principal that has no identity yet (e.g. an account being created).
    pub fn transient(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::new(None, RoleSet::from_roles(roles))
    }

    pub fn holds(&self, role: Role) -> bool {
        self.roles.holds(role)
    }

    pub fn is_granted(&self, role: Role) -> bool {
        self.roles.grants(role)
    }

    /// True when both principals have an id and the ids are equal.
    pub fn is_same_account(&self, other: &Principal) -> bool {
        matches!((self.id, other.id), (Some(a), Some(b)) if a == b)
    }
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Granted,
    Denied,
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted)
    }

    /// Collapses a vote into a final decision. With a single policy an
    /// abstention (`None`) is a denial.
    pub fn resolve(vote: Option<Decision>) -> Decision {
        vote.unwrap_or(Decision::Denied)
    }

    pub(crate) fn from_bool(granted: bool) -> Decision {
        if granted {
            Decision::Granted
        } else {
            Decision::Denied
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Granted => f.write_str("granted"),
            Decision::Denied => f.write_str("denied"),
        }
    }
}

/// Actions a caller may ask the policy about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Delete,
    Edit,
    Publish,
}

/// Subjects a caller may ask the policy about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject<'a> {
    /// A user account.
    Account(&'a Principal),
    Article,
    Category,
    Tag,
}

/// A role offered on the user-edit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleChoice {
    pub label: &'static str,
    pub role: Role,
}

impl From<Role> for RoleChoice {
    fn from(role: Role) -> Self {
        Self {
            label: role.label(),
            role,
        }
    }
}

/// The role field of the user-edit form.
///
/// `locked` is a usability hint for clients. It is not a security boundary;
/// submissions are always re-checked with
/// [`AccessDecisionEngine::check_role_submission`](crate::AccessDecisionEngine::check_role_submission).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleChoices {
    pub choices: Vec<RoleChoice>,
    pub locked: bool,
}

impl RoleChoices {
    pub fn offers(&self, role: Role) -> bool {
        self.choices.iter().any(|choice| choice.role == role)
    }
}

/// A rejected role submission, reported against a form field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct RoleViolation {
    pub field: &'static str,
    pub message: String,
}

impl RoleViolation {
    pub const MESSAGE: &'static str = "Role modification is not permitted for this account.";

    pub(crate) fn roles() -> Self {
        Self {
            field: "roles",
            message: Self::MESSAGE.to_string(),
        }
    }
}
