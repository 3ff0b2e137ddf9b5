//! Contact list invariants
//!
//! At most one primary contact. Setting a contact primary demotes every
//! other contact first, in the same update.

use uuid::Uuid;

use super::types::EmergencyContact;
use crate::logic::error::ConfigError;

pub fn validate(contact: &EmergencyContact) -> Result<(), ConfigError> {
    if contact.name.trim().is_empty() {
        return Err(ConfigError::InvalidContact("name is empty".to_string()));
    }
    if contact.phone_number.trim().is_empty() {
        return Err(ConfigError::InvalidContact(format!(
            "'{}' has no phone number",
            contact.name
        )));
    }
    Ok(())
}

fn demote_all(contacts: &mut [EmergencyContact]) {
    for c in contacts.iter_mut() {
        c.is_primary = false;
    }
}

pub fn add(contacts: &mut Vec<EmergencyContact>, mut contact: EmergencyContact) -> Result<(), ConfigError> {
    validate(&contact)?;
    if contact.id.trim().is_empty() {
        contact.id = Uuid::new_v4().to_string();
    }
    if contacts.iter().any(|c| c.id == contact.id) {
        return Err(ConfigError::InvalidContact(format!("duplicate id '{}'", contact.id)));
    }

    if contact.is_primary {
        demote_all(contacts);
    }
    contacts.push(contact);
    Ok(())
}

pub fn update(contacts: &mut [EmergencyContact], contact: EmergencyContact) -> Result<(), ConfigError> {
    validate(&contact)?;
    let index = contacts
        .iter()
        .position(|c| c.id == contact.id)
        .ok_or_else(|| ConfigError::NotFound(contact.id.clone()))?;

    if contact.is_primary {
        demote_all(contacts);
    }
    contacts[index] = contact;
    Ok(())
}

pub fn remove(contacts: &mut Vec<EmergencyContact>, id: &str) -> bool {
    let before = contacts.len();
    contacts.retain(|c| c.id != id);
    contacts.len() != before
}

pub fn primary(contacts: &[EmergencyContact]) -> Option<&EmergencyContact> {
    contacts.iter().find(|c| c.is_primary)
}

/// Repair a loaded list: the last contact flagged primary wins
pub fn enforce_single_primary(contacts: &mut [EmergencyContact]) -> bool {
    let Some(keep) = contacts.iter().rposition(|c| c.is_primary) else {
        return false;
    };
    let mut changed = false;
    for (i, c) in contacts.iter_mut().enumerate() {
        if i != keep && c.is_primary {
            c.is_primary = false;
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primaries(contacts: &[EmergencyContact]) -> Vec<&str> {
        contacts
            .iter()
            .filter(|c| c.is_primary)
            .map(|c| c.name.as_str())
            .collect()
    }

    #[test]
    fn test_second_primary_demotes_first() {
        let mut list = Vec::new();
        add(&mut list, EmergencyContact::new("A", "111").primary()).unwrap();
        add(&mut list, EmergencyContact::new("B", "222").primary()).unwrap();
        assert_eq!(primaries(&list), vec!["B"]);
    }

    #[test]
    fn test_update_to_primary_demotes_others() {
        let mut list = Vec::new();
        add(&mut list, EmergencyContact::new("A", "111").primary()).unwrap();
        let b = EmergencyContact::new("B", "222");
        add(&mut list, b.clone()).unwrap();

        update(&mut list, b.primary()).unwrap();
        assert_eq!(primaries(&list), vec!["B"]);
    }

    #[test]
    fn test_update_unknown_contact() {
        let mut list = Vec::new();
        let err = update(&mut list, EmergencyContact::new("X", "1")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_invalid_contacts_rejected() {
        let mut list = Vec::new();
        assert!(add(&mut list, EmergencyContact::new("", "111")).is_err());
        assert!(add(&mut list, EmergencyContact::new("A", "  ")).is_err());
        assert!(list.is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected_and_empty_id_generated() {
        let mut list = Vec::new();
        let mut a = EmergencyContact::new("A", "111");
        a.id = String::new();
        add(&mut list, a).unwrap();
        assert!(!list[0].id.is_empty());

        let dup = list[0].clone();
        assert!(add(&mut list, dup).is_err());
    }

    #[test]
    fn test_remove_is_filter_by_id() {
        let mut list = Vec::new();
        let a = EmergencyContact::new("A", "111").primary();
        add(&mut list, a.clone()).unwrap();
        assert!(remove(&mut list, &a.id));
        assert!(!remove(&mut list, &a.id));
        assert!(primary(&list).is_none());
    }

    #[test]
    fn test_enforce_single_primary_keeps_last() {
        let mut list = vec![
            EmergencyContact::new("A", "1").primary(),
            EmergencyContact::new("B", "2").primary(),
            EmergencyContact::new("C", "3"),
        ];
        assert!(enforce_single_primary(&mut list));
        assert_eq!(primaries(&list), vec!["B"]);
        assert!(!enforce_single_primary(&mut list));
    }
}
