//! Ownership resolution for mutable resources.
//!
//! A principal may mutate a resource if it owns the resource or its role is
//! in the resource's privileged set. Book authorship exists in three
//! encodings (bare reference, expanded reference, free-text name); all
//! matching goes through [`OwnerRef::match_principal`] so the mutation
//! policy and the "my books" query agree.

mod owner_ref;

pub use owner_ref::OwnerRef;

use crate::error::{DomainError, DomainResult};
use crate::model::{Book, Principal, Proposal, Review, Role};

/// How a principal was found to own a resource, in check priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipMatch {
    /// Stored reference equals the principal id.
    Reference,
    /// Expanded reference object whose id equals the principal id.
    ExpandedReference,
    /// Free-text name equal to the principal's name, ignoring case.
    Name,
    /// The principal created the resource.
    Creator,
    /// The principal is the resource's publisher.
    Publisher,
}

/// Why a mutation was allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Owner(OwnershipMatch),
    Privileged(Role),
}

/// Role sets allowed to bypass ownership, per resource class.
pub const BOOK_PRIVILEGED: &[Role] = &[Role::Admin];
pub const PROPOSAL_PRIVILEGED: &[Role] = &[Role::Admin];
pub const REVIEW_PRIVILEGED: &[Role] = &[Role::Admin];

/// Shared predicate: does `owner` designate `principal`?
pub fn is_owned_by(owner: &OwnerRef, principal: &Principal) -> bool {
    owner.match_principal(principal).is_some()
}

/// A resource with a notion of owner.
pub trait OwnedResource {
    /// Resource kind used in denial messages.
    const KIND: &'static str;

    /// First ownership match for `principal`, or `None`.
    fn owner_match(&self, principal: &Principal) -> Option<OwnershipMatch>;
}

impl OwnedResource for Book {
    const KIND: &'static str = "book";

    fn owner_match(&self, principal: &Principal) -> Option<OwnershipMatch> {
        if let Some(found) = self.author.match_principal(principal) {
            return Some(found);
        }
        if self.created_by.as_deref() == Some(principal.id.as_str()) {
            return Some(OwnershipMatch::Creator);
        }
        if self.publisher.as_deref() == Some(principal.id.as_str()) {
            return Some(OwnershipMatch::Publisher);
        }
        None
    }
}

impl OwnedResource for Proposal {
    const KIND: &'static str = "proposal";

    /// The addressed publisher owns a proposal. Legacy documents without a
    /// publisher reference fall back to the display name.
    fn owner_match(&self, principal: &Principal) -> Option<OwnershipMatch> {
        match &self.publisher_id {
            Some(id) if *id == principal.id => Some(OwnershipMatch::Reference),
            Some(_) => None,
            None => names_match(&self.publisher_name, &principal.name).then_some(OwnershipMatch::Name),
        }
    }
}

impl OwnedResource for Review {
    const KIND: &'static str = "review";

    fn owner_match(&self, principal: &Principal) -> Option<OwnershipMatch> {
        (self.user == principal.id).then_some(OwnershipMatch::Reference)
    }
}

/// Resolves whether `principal` may mutate `resource`.
///
/// Ownership is checked first so that an owning admin is reported as an
/// owner.
pub fn resolve_access<R: OwnedResource + ?Sized>(
    resource: &R,
    principal: &Principal,
    privileged: &[Role],
) -> Option<Access> {
    if let Some(found) = resource.owner_match(principal) {
        return Some(Access::Owner(found));
    }
    principal
        .has_any_role(privileged)
        .then_some(Access::Privileged(principal.role))
}

pub fn can_mutate<R: OwnedResource + ?Sized>(
    resource: &R,
    principal: &Principal,
    privileged: &[Role],
) -> bool {
    resolve_access(resource, principal, privileged).is_some()
}

/// Like [`can_mutate`] but fails with `Forbidden`.
pub fn ensure_can_mutate<R: OwnedResource + ?Sized>(
    resource: &R,
    principal: &Principal,
    privileged: &[Role],
) -> DomainResult<Access> {
    resolve_access(resource, principal, privileged).ok_or_else(|| {
        DomainError::forbidden(format!("not authorized to modify this {}", R::KIND))
    })
}

/// Case-insensitive display-name comparison. Empty names never match.
pub fn names_match(stored: &str, candidate: &str) -> bool {
    let stored = stored.trim();
    let candidate = candidate.trim();
    !stored.is_empty() && stored.to_lowercase() == candidate.to_lowercase()
}
