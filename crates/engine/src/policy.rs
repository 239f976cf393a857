//! Access policy.
//!
//! Pure decision functions answering "can principal P perform action A on
//! resource R". The engine re-reads the principal and the resource inside each
//! write transaction before asking, so a decision is never based on a stale
//! read.

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Role hierarchy: `Member < Staff < Owner`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Staff,
    Owner,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Staff => "staff",
            Self::Owner => "owner",
        }
    }

    /// Staff and owners see and manage every receipt.
    pub fn is_staff(self) -> bool {
        self >= Self::Staff
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "member" => Ok(Self::Member),
            "staff" => Ok(Self::Staff),
            "owner" => Ok(Self::Owner),
            other => Err(EngineError::InvalidRole(other.to_string())),
        }
    }
}

/// Account state of a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Pending,
    Approved,
    Denied,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }
}

impl TryFrom<&str> for UserStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "denied" => Ok(Self::Denied),
            other => Err(EngineError::InvalidStatus(other.to_string())),
        }
    }
}

/// The authenticated caller as resolved from the users table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    pub status: UserStatus,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role, status: UserStatus) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            status,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == UserStatus::Approved
    }

    fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    fn owns(&self, owner_user_id: &str) -> bool {
        self.user_id == owner_user_id
    }
}

/// An action together with the parts of the resource the decision depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action<'a> {
    /// Submit a receipt owned by `owner_user_id`.
    SubmitReceipt { owner_user_id: &'a str },
    ViewReceipt { owner_user_id: &'a str },
    ViewAllReceipts,
    EditReceipt { owner_user_id: &'a str },
    DeleteReceipt { owner_user_id: &'a str },
    /// Read revisions across all receipts.
    ViewAuditLog,
    PromoteToStaff { target_role: Role },
    DemoteToMember {
        target_user_id: &'a str,
        target_role: Role,
    },
    /// Approve or deny a user account.
    ReviewUser {
        target_user_id: &'a str,
        target_role: Role,
    },
    ListUsers,
    ManageWhitelist,
    ManageCategories,
    ViewCategories,
}

/// Allowed `(actor, from, to)` role changes. Anything else is rejected.
const ROLE_TRANSITIONS: &[(Role, Role, Role)] = &[
    (Role::Owner, Role::Member, Role::Staff),
    (Role::Owner, Role::Staff, Role::Member),
];

/// Returns whether `actor` may move a user from role `from` to role `to`.
pub fn role_transition_allowed(actor: Role, from: Role, to: Role) -> bool {
    ROLE_TRANSITIONS
        .iter()
        .any(|&(a, f, t)| a == actor && f == from && t == to)
}

/// Decides whether `principal` may perform `action`.
///
/// Pending and denied principals may do nothing.
pub fn can_perform(principal: &Principal, action: Action<'_>) -> bool {
    if !principal.is_approved() {
        return false;
    }

    match action {
        Action::ViewReceipt { owner_user_id }
        | Action::EditReceipt { owner_user_id }
        | Action::DeleteReceipt { owner_user_id }
        | Action::SubmitReceipt { owner_user_id } => {
            principal.owns(owner_user_id) || principal.is_staff()
        }
        Action::ViewAllReceipts
        | Action::ViewAuditLog
        | Action::ListUsers
        | Action::ManageCategories => principal.is_staff(),
        Action::PromoteToStaff { target_role } => {
            role_transition_allowed(principal.role, target_role, Role::Staff)
        }
        Action::DemoteToMember {
            target_user_id,
            target_role,
        } => {
            !principal.owns(target_user_id)
                && role_transition_allowed(principal.role, target_role, Role::Member)
        }
        Action::ReviewUser {
            target_user_id,
            target_role,
        } => {
            principal.is_staff()
                && !principal.owns(target_user_id)
                && (target_role == Role::Member || principal.role == Role::Owner)
        }
        Action::ManageWhitelist => principal.role == Role::Owner,
        Action::ViewCategories => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approved(id: &str, role: Role) -> Principal {
        Principal::new(id, role, UserStatus::Approved)
    }

    #[test]
    fn owner_of_receipt_can_edit_regardless_of_role() {
        let alice = approved("alice", Role::Member);
        assert!(can_perform(&alice, Action::EditReceipt { owner_user_id: "alice" }));
        assert!(can_perform(&alice, Action::DeleteReceipt { owner_user_id: "alice" }));
        assert!(can_perform(&alice, Action::ViewReceipt { owner_user_id: "alice" }));
    }

    #[test]
    fn member_cannot_touch_foreign_receipts() {
        let alice = approved("alice", Role::Member);
        assert!(!can_perform(&alice, Action::EditReceipt { owner_user_id: "bob" }));
        assert!(!can_perform(&alice, Action::DeleteReceipt { owner_user_id: "bob" }));
        assert!(!can_perform(&alice, Action::ViewReceipt { owner_user_id: "bob" }));
        assert!(!can_perform(&alice, Action::ViewAllReceipts));
        assert!(!can_perform(&alice, Action::SubmitReceipt { owner_user_id: "bob" }));
    }

    #[test]
    fn staff_and_owner_manage_every_receipt() {
        for role in [Role::Staff, Role::Owner] {
            let p = approved("carol", role);
            assert!(can_perform(&p, Action::EditReceipt { owner_user_id: "bob" }));
            assert!(can_perform(&p, Action::DeleteReceipt { owner_user_id: "bob" }));
            assert!(can_perform(&p, Action::ViewAllReceipts));
            assert!(can_perform(&p, Action::ViewAuditLog));
        }
    }

    #[test]
    fn pending_or_denied_principals_are_locked_out() {
        for status in [UserStatus::Pending, UserStatus::Denied] {
            let p = Principal::new("alice", Role::Owner, status);
            assert!(!can_perform(&p, Action::ViewReceipt { owner_user_id: "alice" }));
            assert!(!can_perform(&p, Action::ViewCategories));
        }
    }

    #[test]
    fn only_owner_promotes_members() {
        let owner = approved("o", Role::Owner);
        let staff = approved("s", Role::Staff);
        assert!(can_perform(&owner, Action::PromoteToStaff { target_role: Role::Member }));
        assert!(!can_perform(&owner, Action::PromoteToStaff { target_role: Role::Staff }));
        assert!(!can_perform(&owner, Action::PromoteToStaff { target_role: Role::Owner }));
        assert!(!can_perform(&staff, Action::PromoteToStaff { target_role: Role::Member }));
    }

    #[test]
    fn demotion_rules() {
        let owner = approved("o", Role::Owner);
        assert!(can_perform(
            &owner,
            Action::DemoteToMember { target_user_id: "s", target_role: Role::Staff }
        ));
        assert!(!can_perform(
            &owner,
            Action::DemoteToMember { target_user_id: "o2", target_role: Role::Owner }
        ));
        assert!(!can_perform(
            &owner,
            Action::DemoteToMember { target_user_id: "o", target_role: Role::Staff }
        ));
        let staff = approved("s", Role::Staff);
        assert!(!can_perform(
            &staff,
            Action::DemoteToMember { target_user_id: "x", target_role: Role::Staff }
        ));
    }

    #[test]
    fn review_rules() {
        let staff = approved("s", Role::Staff);
        let owner = approved("o", Role::Owner);
        let member = approved("m", Role::Member);
        assert!(can_perform(
            &staff,
            Action::ReviewUser { target_user_id: "m", target_role: Role::Member }
        ));
        assert!(!can_perform(
            &staff,
            Action::ReviewUser { target_user_id: "s2", target_role: Role::Staff }
        ));
        assert!(can_perform(
            &owner,
            Action::ReviewUser { target_user_id: "s2", target_role: Role::Staff }
        ));
        assert!(!can_perform(
            &owner,
            Action::ReviewUser { target_user_id: "o", target_role: Role::Owner }
        ));
        assert!(!can_perform(
            &member,
            Action::ReviewUser { target_user_id: "x", target_role: Role::Member }
        ));
    }

    #[test]
    fn whitelist_is_owner_only() {
        assert!(can_perform(&approved("o", Role::Owner), Action::ManageWhitelist));
        assert!(!can_perform(&approved("s", Role::Staff), Action::ManageWhitelist));
        assert!(!can_perform(&approved("m", Role::Member), Action::ManageWhitelist));
    }

    #[test]
    fn roles_are_ordered() {
        assert!(Role::Member < Role::Staff);
        assert!(Role::Staff < Role::Owner);
        assert_eq!(Role::try_from("staff").unwrap(), Role::Staff);
        assert_eq!(
            Role::try_from("admin"),
            Err(EngineError::InvalidRole("admin".to_string()))
        );
    }

    #[test]
    fn unknown_status_is_a_status_error() {
        assert_eq!(UserStatus::try_from("denied").unwrap(), UserStatus::Denied);
        let err = UserStatus::try_from("banned").unwrap_err();
        assert_eq!(err, EngineError::InvalidStatus("banned".to_string()));
        assert_eq!(err.to_string(), "Invalid status: banned");
        assert!(err.is_validation());
    }
}
