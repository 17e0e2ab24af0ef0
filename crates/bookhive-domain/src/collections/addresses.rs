use crate::error::{DomainError, DomainResult};
use crate::model::{Account, Address};

impl Account {
    /// Adds an address with a generated id. The first address becomes the
    /// default.
    pub fn add_address(&mut self, text: &str) -> DomainResult<&Address> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::missing_field("address"));
        }
        let is_default = self.addresses.is_empty();
        self.addresses.push(Address {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            is_default,
        });
        self.touch();
        Ok(&self.addresses[self.addresses.len() - 1])
    }

    /// Replaces an address's text. Id and default flag are untouched.
    pub fn edit_address(&mut self, address_id: &str, text: &str) -> DomainResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::missing_field("address"));
        }
        let address = self
            .addresses
            .iter_mut()
            .find(|a| a.id == address_id)
            .ok_or_else(|| DomainError::not_found("address", address_id))?;
        address.text = text.to_string();
        self.touch();
        Ok(())
    }

    /// Deletes an address; absent ids are a no-op. Deleting the default
    /// promotes the first remaining address.
    pub fn delete_address(&mut self, address_id: &str) -> bool {
        let Some(pos) = self.addresses.iter().position(|a| a.id == address_id) else {
            return false;
        };
        let removed = self.addresses.remove(pos);
        if removed.is_default {
            if let Some(first) = self.addresses.first_mut() {
                first.is_default = true;
            }
        }
        self.touch();
        true
    }

    /// Makes one address the default, clearing the flag on all others in
    /// the same pass.
    pub fn set_default_address(&mut self, address_id: &str) -> DomainResult<()> {
        if !self.addresses.iter().any(|a| a.id == address_id) {
            return Err(DomainError::not_found("address", address_id));
        }
        for address in &mut self.addresses {
            address.is_default = address.id == address_id;
        }
        self.touch();
        Ok(())
    }

    pub fn default_address(&self) -> Option<&Address> {
        self.addresses.iter().find(|a| a.is_default)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DomainError;
    use crate::model::{Account, Role};

    fn account() -> Account {
        Account::new("Sam", "sam@example.com", "h", Role::User)
    }

    #[test]
    fn test_first_address_becomes_default() {
        let mut account = account();
        let first = account.add_address("1 Main St").unwrap().id.clone();
        account.add_address("2 Side St").unwrap();

        assert_eq!(account.default_address().unwrap().id, first);
        assert!(!account.addresses[1].is_default);
    }

    #[test]
    fn test_deleting_default_promotes_first_remaining() {
        let mut account = account();
        let first = account.add_address("1 Main St").unwrap().id.clone();
        let second = account.add_address("2 Side St").unwrap().id.clone();
        account.add_address("3 Back St").unwrap();

        assert!(account.delete_address(&first));
        assert_eq!(account.default_address().unwrap().id, second);
    }

    #[test]
    fn test_deleting_non_default_keeps_default() {
        let mut account = account();
        let first = account.add_address("1 Main St").unwrap().id.clone();
        let second = account.add_address("2 Side St").unwrap().id.clone();

        assert!(account.delete_address(&second));
        assert_eq!(account.default_address().unwrap().id, first);
        assert!(!account.delete_address("missing"));
    }

    #[test]
    fn test_set_default_clears_others() {
        let mut account = account();
        account.add_address("1 Main St").unwrap();
        let second = account.add_address("2 Side St").unwrap().id.clone();

        account.set_default_address(&second).unwrap();
        let defaults: Vec<_> = account.addresses.iter().filter(|a| a.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, second);
    }

    #[test]
    fn test_set_default_unknown_is_not_found() {
        let mut account = account();
        account.add_address("1 Main St").unwrap();
        let err = account.set_default_address("nope").unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[test]
    fn test_edit_changes_text_only() {
        let mut account = account();
        let id = account.add_address("1 Main St").unwrap().id.clone();
        account.edit_address(&id, "  9 New Rd ").unwrap();

        assert_eq!(account.addresses[0].text, "9 New Rd");
        assert_eq!(account.addresses[0].id, id);
        assert!(account.addresses[0].is_default);
    }

    #[test]
    fn test_blank_address_is_rejected() {
        let mut account = account();
        assert!(matches!(
            account.add_address("   ").unwrap_err(),
            DomainError::Validation { .. }
        ));
    }
}
