//! Author-to-publisher book proposals.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument};

use bookhive_domain::ownership::PROPOSAL_PRIVILEGED;
use bookhive_domain::{ensure_can_mutate, DomainError, Principal, Proposal, ProposalStatus, Role};
use bookhive_storage::{AccountFilter, DataStore, ProposalFilter};

use super::{required, ServiceResult};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProposal {
    pub title: Option<String>,
    pub content: Option<String>,
    /// Publisher display name.
    pub publisher: Option<String>,
    pub category: Option<String>,
}

pub struct ProposalHandler<S> {
    store: Arc<S>,
}

impl<S: DataStore> ProposalHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Files a proposal with the one publisher whose name matches.
    #[instrument(skip_all, fields(author_id = %principal.id))]
    pub async fn submit(&self, principal: &Principal, request: NewProposal) -> ServiceResult<Proposal> {
        let title = required(request.title.as_deref(), "title")?;
        let content = required(request.content.as_deref(), "content")?;
        let publisher_name = required(request.publisher.as_deref(), "publisher")?;

        let mut matches = self
            .store
            .list_accounts(&AccountFilter {
                role: Some(Role::Publisher),
                name: Some(publisher_name.clone()),
            })
            .await?;
        let publisher = match matches.len() {
            0 => return Err(DomainError::not_found("publisher", publisher_name).into()),
            1 => matches.remove(0),
            n => {
                return Err(DomainError::validation(format!(
                    "publisher name {publisher_name:?} matches {n} accounts"
                ))
                .into())
            }
        };

        let mut proposal = Proposal::new(
            principal.id.as_str(),
            principal.name.as_str(),
            publisher.id,
            publisher.name,
            title,
            content,
        );
        proposal.category = request
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let proposal = self.store.create_proposal(proposal).await?;
        info!(proposal_id = %proposal.id, "proposal submitted");
        Ok(proposal)
    }

    /// Proposals the caller wrote.
    pub async fn mine(&self, principal: &Principal) -> ServiceResult<Vec<Proposal>> {
        Ok(self
            .store
            .list_proposals(&ProposalFilter {
                author_id: Some(principal.id.clone()),
                ..Default::default()
            })
            .await?)
    }

    /// Proposals addressed to the calling publisher.
    pub async fn for_publisher(&self, principal: &Principal) -> ServiceResult<Vec<Proposal>> {
        Ok(self
            .store
            .list_proposals(&ProposalFilter {
                addressed_to: Some(principal.clone()),
                ..Default::default()
            })
            .await?)
    }

    /// Accepts or rejects a proposal. Only the addressed publisher or an
    /// admin may decide.
    #[instrument(skip(self, principal), fields(principal = %principal.id))]
    pub async fn set_status(&self, principal: &Principal, id: &str, status: &str) -> ServiceResult<Proposal> {
        let status = status.parse::<ProposalStatus>()?;
        if status == ProposalStatus::Pending {
            return Err(DomainError::validation("status must be accepted or rejected").into());
        }

        let proposal = self
            .store
            .find_proposal(id)
            .await?
            .ok_or_else(|| DomainError::not_found("proposal", id))?;
        ensure_can_mutate(&proposal, principal, PROPOSAL_PRIVILEGED)?;

        let proposal = self
            .store
            .set_proposal_status(id, status)
            .await?
            .ok_or_else(|| DomainError::not_found("proposal", id))?;
        info!(proposal_id = %id, ?status, "proposal decided");
        Ok(proposal)
    }
}
