//! Permission-string access checks
//!
//! Evaluates POSIX-style access masks against the octal permission strings
//! carried in listing records. The requester is classified as owner, group
//! member, or other by comparing the configured local user and group names
//! against the entry's ownership fields.

use mirrorfs_core::domain::entry::Entry;
use mirrorfs_core::domain::errors::DomainError;

/// Evaluates `mask` against `entry`'s permissions for the given requester.
///
/// Mask semantics follow `access(2)`: 0 is a pure existence test and is
/// granted for any populated entry; bits 1 (execute), 2 (write), and
/// 4 (read) must all be present in the requester's permission class.
/// Masks outside `0..=7` and permission strings shorter than three octal
/// digits are rejected as [`DomainError`]s.
pub fn check(entry: &Entry, mask: i32, user: &str, group: &str) -> Result<bool, DomainError> {
    if !(0..=7).contains(&mask) {
        return Err(DomainError::MaskOutOfBounds(mask));
    }
    if mask == 0 {
        return Ok(true);
    }
    let bits = class_bits(entry, user, group)?;
    Ok(bits & mask == mask)
}

/// Parses the three rightmost octal digits of the permission string and
/// picks the digit for the requester's class.
fn class_bits(entry: &Entry, user: &str, group: &str) -> Result<i32, DomainError> {
    let perms = &entry.permissions;
    if perms.len() < 3 || !perms.is_ascii() {
        return Err(DomainError::MalformedPermissions(perms.clone()));
    }
    let mut digits = [0i32; 3];
    for (slot, ch) in perms[perms.len() - 3..].chars().enumerate() {
        match ch.to_digit(8) {
            Some(d) => digits[slot] = d as i32,
            None => return Err(DomainError::MalformedPermissions(perms.clone())),
        }
    }
    if entry.owner == user {
        Ok(digits[0])
    } else if entry.group == group {
        Ok(digits[1])
    } else {
        Ok(digits[2])
    }
}

#[cfg(test)]
mod tests {
    use mirrorfs_core::domain::entry::{EntryKind, SyncStatus};

    use super::*;

    fn entry(perms: &str, owner: &str, group: &str) -> Entry {
        Entry::new(
            "f",
            EntryKind::File,
            perms,
            "0",
            100,
            owner,
            group,
            SyncStatus::Synced,
        )
    }

    #[test]
    fn mask_zero_is_existence_test() {
        let e = entry("0000", "somebody", "nogroup");
        assert!(check(&e, 0, "alice", "staff").unwrap());
    }

    #[test]
    fn owner_class_applies_when_user_matches() {
        let e = entry("0640", "alice", "staff");
        assert!(check(&e, 6, "alice", "staff").unwrap());
        assert!(check(&e, 4, "alice", "staff").unwrap());
        // Execute is not in 6.
        assert!(!check(&e, 1, "alice", "staff").unwrap());
    }

    #[test]
    fn group_class_applies_when_only_group_matches() {
        let e = entry("0640", "bob", "staff");
        assert!(check(&e, 4, "alice", "staff").unwrap());
        assert!(!check(&e, 2, "alice", "staff").unwrap());
    }

    #[test]
    fn other_class_applies_otherwise() {
        let e = entry("0751", "bob", "wheel");
        assert!(check(&e, 1, "alice", "staff").unwrap());
        assert!(!check(&e, 4, "alice", "staff").unwrap());
    }

    #[test]
    fn long_permission_strings_use_rightmost_digits() {
        let e = entry("40755", "bob", "wheel");
        assert!(check(&e, 5, "alice", "staff").unwrap());
    }

    #[test]
    fn mask_out_of_bounds_is_rejected() {
        let e = entry("0777", "alice", "staff");
        assert_eq!(
            check(&e, 8, "alice", "staff"),
            Err(DomainError::MaskOutOfBounds(8))
        );
        assert_eq!(
            check(&e, -1, "alice", "staff"),
            Err(DomainError::MaskOutOfBounds(-1))
        );
    }

    #[test]
    fn malformed_permissions_are_rejected() {
        for bad in ["", "07", "0a7x", "07\u{e9}"] {
            let e = entry(bad, "alice", "staff");
            assert!(matches!(
                check(&e, 4, "alice", "staff"),
                Err(DomainError::MalformedPermissions(_))
            ));
        }
    }
}
