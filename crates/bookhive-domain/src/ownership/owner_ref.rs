use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{names_match, OwnershipMatch};
use crate::model::{is_document_id, Principal};

/// The owner field of a book as it may appear in stored documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerRef {
    /// Reference to an account id.
    ById(String),
    /// Reference that was expanded with the account's display name.
    Expanded { id: String, name: String },
    /// Free-text name with no account behind it.
    ByName(String),
}

impl OwnerRef {
    /// Interprets a raw owner string: identifier-shaped values are
    /// references, anything else is a free-text name.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if is_document_id(raw) {
            OwnerRef::ById(raw.to_string())
        } else {
            OwnerRef::ByName(raw.to_string())
        }
    }

    /// Referenced account id, if this is a reference.
    pub fn account_id(&self) -> Option<&str> {
        match self {
            OwnerRef::ById(id) | OwnerRef::Expanded { id, .. } => Some(id),
            OwnerRef::ByName(_) => None,
        }
    }

    /// Expands a reference with a display name; names stay as they are.
    pub fn expanded(&self, name: impl Into<String>) -> Self {
        match self {
            OwnerRef::ById(id) | OwnerRef::Expanded { id, .. } => OwnerRef::Expanded {
                id: id.clone(),
                name: name.into(),
            },
            OwnerRef::ByName(_) => self.clone(),
        }
    }

    /// Collapses an expanded reference back to a bare one for storage.
    pub fn collapsed(self) -> Self {
        match self {
            OwnerRef::Expanded { id, .. } => OwnerRef::ById(id),
            other => other,
        }
    }

    /// Checks reference, expanded reference, then name; first match wins.
    pub fn match_principal(&self, principal: &Principal) -> Option<OwnershipMatch> {
        match self {
            OwnerRef::ById(id) if *id == principal.id => Some(OwnershipMatch::Reference),
            OwnerRef::Expanded { id, .. } if *id == principal.id => {
                Some(OwnershipMatch::ExpandedReference)
            }
            OwnerRef::ByName(name) if names_match(name, &principal.name) => {
                Some(OwnershipMatch::Name)
            }
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawOwner {
    Text(String),
    Object {
        #[serde(rename = "_id", alias = "id")]
        id: String,
        #[serde(default)]
        name: String,
    },
}

impl Serialize for OwnerRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = match self {
            OwnerRef::ById(id) => RawOwner::Text(id.clone()),
            OwnerRef::ByName(name) => RawOwner::Text(name.clone()),
            OwnerRef::Expanded { id, name } => RawOwner::Object {
                id: id.clone(),
                name: name.clone(),
            },
        };
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for OwnerRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawOwner::deserialize(deserializer)? {
            RawOwner::Text(text) => OwnerRef::parse(&text),
            RawOwner::Object { id, name } => OwnerRef::Expanded { id, name },
        })
    }
}
