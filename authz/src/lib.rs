//! Access-control policy for the Inklog CMS.
//!
//! This crate holds the two pieces of the application that encode actual
//! policy rather than plumbing:
//!
//! - [`AccessDecisionEngine`] decides whether an acting principal may delete
//!   a user account, which roles it may assign on the user-edit form, and
//!   re-checks submitted role sets before they are persisted.
//! - [`PostAuthenticationRouter`] picks where a freshly authenticated
//!   principal is sent, consuming any stored "return-to" path.
//!
//! Both are pure decision functions. The acting principal and the role-grant
//! predicate are always passed in explicitly; nothing here reads an ambient
//! security context, a database or a session directly.
//!
//! # Decision flow
//!
//! 1. The web layer resolves the acting principal from the session
//! 2. It loads the target account through the user repository
//! 3. [`AccessDecisionEngine::vote`] returns `Some(decision)` or abstains
//! 4. [`Decision::resolve`] turns an abstention into a denial
//!
//! # Example
//!
//! ```rust
//! use authz::{AccessDecisionEngine, Action, Decision, Principal, Role, Subject};
//!
//! let engine = AccessDecisionEngine::new();
//! let admin = Principal::persisted(1, [Role::Admin]);
//! let author = Principal::persisted(2, []);
//!
//! let vote = engine.vote(Some(&admin), Action::Delete, Subject::Account(&author));
//! assert_eq!(vote, Some(Decision::Granted));
//!
//! // Unrecognized pairs abstain.
//! assert_eq!(engine.vote(Some(&admin), Action::Publish, Subject::Article), None);
//! ```

pub mod error;
pub mod router;
pub mod types;

use tracing::{debug, warn};

pub use error::{AuthzError, Result};
pub use router::{
    target_path_key, PostAuthenticationRouter, RedirectTarget, TargetPathStore, DEFAULT_REALM,
};
pub use types::{
    Action, Decision, Principal, PrincipalId, Role, RoleChoice, RoleChoices, RoleSet,
    RoleViolation, Subject,
};

/// Policy for user-account administration.
///
/// Stateless; cheap to construct per request or share behind an `Arc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessDecisionEngine;

impl AccessDecisionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Votes on an action against a subject.
    ///
    /// Only deleting an account is recognized. Any other pair returns `None`
    /// (abstain), whether or not an acting principal is present.
    pub fn vote(
        &self,
        acting: Option<&Principal>,
        action: Action,
        subject: Subject<'_>,
    ) -> Option<Decision> {
        match (action, subject) {
            (Action::Delete, Subject::Account(target)) => Some(self.decide_delete(acting, target)),
            (action, subject) => {
                debug!("Abstaining on {:?} for {:?}", action, subject);
                None
            }
        }
    }

    /// Decides whether `acting` may delete the `target` account.
    ///
    /// Rules, first match wins:
    /// 1. no acting principal: denied
    /// 2. target is the acting account: denied
    /// 3. target holds `ROLE_SUPER_ADMIN` and acting does not: denied
    /// 4. granted iff acting is granted `ROLE_ADMIN`
    pub fn decide_delete(&self, acting: Option<&Principal>, target: &Principal) -> Decision {
        let Some(acting) = acting else {
            warn!("Delete denied: unauthenticated actor");
            return Decision::Denied;
        };

        if target.id.is_some() && target.id == acting.id {
            warn!("Delete denied: account {:?} cannot delete itself", acting.id);
            return Decision::Denied;
        }

        if target.holds(Role::SuperAdmin) && !acting.holds(Role::SuperAdmin) {
            warn!(
                "Delete denied: {:?} is not a super administrator and target {:?} is",
                acting.id, target.id
            );
            return Decision::Denied;
        }

        let decision = Decision::from_bool(acting.is_granted(Role::Admin));
        debug!(
            "Delete of {:?} by {:?}: {}",
            target.id, acting.id, decision
        );
        decision
    }

    /// Computes the role field of the user form.
    ///
    /// The baseline role is never offered; every account has it.
    pub fn assignable_roles(
        &self,
        acting: &Principal,
        target: &Principal,
        is_new_account: bool,
    ) -> RoleChoices {
        let editing_self = !is_new_account && target.is_same_account(acting);
        let editing_super = !is_new_account && target.holds(Role::SuperAdmin);
        let acting_is_super = acting.holds(Role::SuperAdmin);

        if editing_self || (editing_super && !acting_is_super) {
            return RoleChoices {
                choices: vec![Role::Admin.into(), Role::SuperAdmin.into()],
                locked: true,
            };
        }

        let choices = if acting_is_super {
            vec![Role::Admin.into(), Role::SuperAdmin.into()]
        } else {
            vec![Role::Admin.into()]
        };

        RoleChoices {
            choices,
            locked: false,
        }
    }

    /// Re-checks a submitted role set before it is applied to `target`.
    ///
    /// Must run on every submission regardless of what
    /// [`assignable_roles`](Self::assignable_roles) offered, since clients
    /// can submit arbitrary values.
    ///
    /// Rejects the submission when:
    /// - it changes the acting principal's own roles, or
    /// - `ROLE_SUPER_ADMIN` would be assigned to or retained by the target
    ///   while the acting principal does not hold it.
    pub fn check_role_submission(
        &self,
        acting: &Principal,
        target: &Principal,
        is_new_account: bool,
        submitted: &RoleSet,
    ) -> std::result::Result<(), RoleViolation> {
        let editing_self = !is_new_account && target.is_same_account(acting);
        if editing_self && submitted != &target.roles {
            warn!("Role submission rejected: {:?} edited its own roles", acting.id);
            return Err(RoleViolation::roles());
        }

        let touches_super = submitted.holds(Role::SuperAdmin)
            || (!is_new_account && target.holds(Role::SuperAdmin));
        if touches_super && !acting.holds(Role::SuperAdmin) {
            warn!(
                "Role submission rejected: {:?} cannot manage super administrators",
                acting.id
            );
            return Err(RoleViolation::roles());
        }

        Ok(())
    }
}
