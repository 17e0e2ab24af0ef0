use crate::error::{DomainError, DomainResult};
use crate::model::{Book, Principal, Role};
use crate::ownership::is_owned_by;

/// Which books a principal sees as "my books".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MyBooksScope {
    /// Books whose author designates the principal, by reference or name.
    Authored(Principal),
    /// Books whose publisher reference is this account id.
    Published(String),
    All,
}

impl MyBooksScope {
    pub fn for_principal(principal: &Principal) -> DomainResult<Self> {
        match principal.role {
            Role::Author => Ok(MyBooksScope::Authored(principal.clone())),
            Role::Publisher => Ok(MyBooksScope::Published(principal.id.clone())),
            Role::Admin => Ok(MyBooksScope::All),
            Role::User => Err(DomainError::forbidden(
                "only authors, publishers and admins have books",
            )),
        }
    }

    pub fn includes(&self, book: &Book) -> bool {
        match self {
            MyBooksScope::Authored(principal) => is_owned_by(&book.author, principal),
            MyBooksScope::Published(id) => book.publisher.as_deref() == Some(id.as_str()),
            MyBooksScope::All => true,
        }
    }
}
