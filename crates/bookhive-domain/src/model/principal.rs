use serde::Serialize;

use super::{Account, Role};

/// The authenticated actor attached to a request.
///
/// On the canonical path every field is re-read from the account record.
/// The token-trusting path only knows `id` and `role`; `name` and `email`
/// are then empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: String::new(),
            role,
        }
    }

    /// Returns true if the principal's role is one of `roles`.
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

impl From<&Account> for Principal {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
        }
    }
}
