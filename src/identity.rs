//! Identity resolution across the ten exports.
//!
//! Bubble references people by free-text identifiers: the users export carries
//! email addresses, every other export carries usernames in creator, sender,
//! recipient, receiver, subject or user columns. This module turns those strings
//! into stable surrogate keys in two separate namespaces:
//!
//! - **Email map**: one entry per distinct non-empty email in the users export,
//!   registered in file order.
//! - **Username map**: the set union of every person column of every other
//!   export, minus blanks and the `(App admin)` sentinel.
//!
//! The two namespaces are never merged. A person who appears with both an email
//! and a username ends up with two keys; the exports carry nothing that links the
//! two reliably, so the gap is left visible instead of guessed at.
//!
//! Keys are name-based UUIDs, so resolving the same string always yields the same
//! key, within one run and across runs. Once built, an [`IdentityResolver`] is
//! read-only and shared by reference with every transformer.

use crate::models::Relation;
use crate::source::{ExportSet, RawRecord};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use uuid::Uuid;

/// Placeholder Bubble shows for records created by the app itself.
pub const ADMIN_SENTINEL: &str = "(App admin)";

const EMAIL_NAMESPACE: Uuid = Uuid::from_u128(0x8d3a_61f0_2c4b_4e97_b1d2_5a6e_0f93_c7a1);
const USERNAME_NAMESPACE: Uuid = Uuid::from_u128(0x2b7e_c415_9f06_4d38_8e21_d4a7_63b5_f08c);

/// Opaque surrogate key for one person identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResolvedKey(Uuid);

impl ResolvedKey {
    fn for_email(email: &str) -> Self {
        ResolvedKey(Uuid::new_v5(&EMAIL_NAMESPACE, email.as_bytes()))
    }

    fn for_username(username: &str) -> Self {
        ResolvedKey(Uuid::new_v5(&USERNAME_NAMESPACE, username.as_bytes()))
    }

    pub fn uuid(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ResolvedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Trim an identity and reject blanks and the admin sentinel.
fn clean_identity(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == ADMIN_SENTINEL {
        None
    } else {
        Some(trimmed)
    }
}

/// Collects identities before freezing them into an [`IdentityResolver`].
#[derive(Debug, Default)]
pub struct ResolverBuilder {
    emails: Vec<String>,
    usernames: BTreeSet<String>,
}

impl ResolverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every non-empty `email` of the users export, in file order.
    pub fn register_emails(&mut self, users: &[RawRecord]) -> &mut Self {
        for row in users {
            let email = row.text("email");
            if !email.is_empty() {
                self.emails.push(email.to_string());
            }
        }
        self
    }

    /// Add every username found in the person columns of `relation`.
    pub fn collect_usernames(&mut self, relation: Relation, rows: &[RawRecord]) -> &mut Self {
        let columns = relation.person_columns();
        if columns.is_empty() {
            return self;
        }

        let before = self.usernames.len();
        for row in rows {
            for column in columns {
                if let Some(username) = clean_identity(row.text(column)) {
                    self.usernames.insert(username.to_string());
                }
            }
        }

        log::debug!(
            "{}: {} new usernames from columns {:?}",
            relation,
            self.usernames.len() - before,
            columns
        );
        self
    }

    pub fn build(&self) -> IdentityResolver {
        let mut emails = HashMap::with_capacity(self.emails.len());
        for email in &self.emails {
            emails
                .entry(email.clone())
                .or_insert_with(|| ResolvedKey::for_email(email));
        }

        let usernames = self
            .usernames
            .iter()
            .map(|username| (username.clone(), ResolvedKey::for_username(username)))
            .collect();

        IdentityResolver { emails, usernames }
    }
}

/// Read-only identity lookup tables for one migration run.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    emails: HashMap<String, ResolvedKey>,
    usernames: HashMap<String, ResolvedKey>,
}

impl IdentityResolver {
    /// Build both maps from a loaded export set.
    ///
    /// The email map comes from the users export; the username map is the union
    /// over every other relation, so the outcome does not depend on the order the
    /// relations are visited in.
    pub fn from_exports(exports: &ExportSet) -> Self {
        let mut builder = ResolverBuilder::new();
        builder.register_emails(exports.rows(Relation::Users));
        for relation in Relation::ALL {
            builder.collect_usernames(relation, exports.rows(relation));
        }

        let resolver = builder.build();
        log::info!(
            "identity maps built: {} emails, {} usernames",
            resolver.email_count(),
            resolver.username_count()
        );
        resolver
    }

    /// Resolve a username reference. Blank input and the sentinel give `None`.
    pub fn resolve(&self, identity: &str) -> Option<ResolvedKey> {
        clean_identity(identity).and_then(|username| self.usernames.get(username).copied())
    }

    /// Resolve an email from the users export.
    pub fn resolve_email(&self, email: &str) -> Option<ResolvedKey> {
        let email = email.trim();
        if email.is_empty() {
            return None;
        }
        self.emails.get(email).copied()
    }

    pub fn email_count(&self) -> usize {
        self.emails.len()
    }

    pub fn username_count(&self) -> usize {
        self.usernames.len()
    }

    /// Every username with its key, sorted by username.
    pub fn usernames(&self) -> Vec<(&str, ResolvedKey)> {
        let mut entries: Vec<(&str, ResolvedKey)> = self
            .usernames
            .iter()
            .map(|(name, key)| (name.as_str(), *key))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRecord {
        RawRecord::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_same_string_same_key() {
        let rows = vec![
            row(&[("Creator", "alice"), ("Recipient", "bob")]),
            row(&[("Creator", " alice "), ("Recipient", "carol")]),
        ];
        let resolver = ResolverBuilder::new()
            .collect_usernames(Relation::Messages, &rows)
            .build();

        assert_eq!(resolver.username_count(), 3);
        let alice = resolver.resolve("alice").expect("alice resolves");
        assert_eq!(resolver.resolve("alice"), Some(alice));
        assert_eq!(resolver.resolve("  alice"), Some(alice));
        assert_ne!(resolver.resolve("bob"), Some(alice));
    }

    #[test]
    fn test_sentinel_and_blank_never_resolve() {
        let rows = vec![row(&[("Sender", ADMIN_SENTINEL), ("Receiver", "")])];
        let resolver = ResolverBuilder::new()
            .collect_usernames(Relation::Likes, &rows)
            .build();

        assert_eq!(resolver.username_count(), 0);
        assert_eq!(resolver.resolve(ADMIN_SENTINEL), None);
        assert_eq!(resolver.resolve(""), None);
        assert_eq!(resolver.resolve("   "), None);
    }

    #[test]
    fn test_unknown_username_is_none() {
        let resolver = ResolverBuilder::new().build();
        assert_eq!(resolver.resolve("nobody"), None);
    }

    #[test]
    fn test_collection_order_does_not_matter() {
        let messages = vec![row(&[("Creator", "alice"), ("Recipient", "bob")])];
        let likes = vec![row(&[("Sender", "carol"), ("Receiver", "alice")])];

        let forward = ResolverBuilder::new()
            .collect_usernames(Relation::Messages, &messages)
            .collect_usernames(Relation::Likes, &likes)
            .build();
        let backward = ResolverBuilder::new()
            .collect_usernames(Relation::Likes, &likes)
            .collect_usernames(Relation::Messages, &messages)
            .build();

        assert_eq!(forward.usernames(), backward.usernames());
    }

    #[test]
    fn test_relations_without_person_columns_are_ignored() {
        let projects = vec![row(&[("Creator", "alice"), ("Name", "Thing")])];
        let resolver = ResolverBuilder::new()
            .collect_usernames(Relation::Projects, &projects)
            .build();
        assert_eq!(resolver.username_count(), 0);
    }

    #[test]
    fn test_email_and_username_namespaces_stay_apart() {
        let users = vec![row(&[("email", "sam")]), row(&[("email", "")])];
        let links = vec![row(&[("User", "sam")])];
        let resolver = ResolverBuilder::new()
            .register_emails(&users)
            .collect_usernames(Relation::UserLinks, &links)
            .build();

        assert_eq!(resolver.email_count(), 1);
        let by_email = resolver.resolve_email("sam").expect("email resolves");
        let by_username = resolver.resolve("sam").expect("username resolves");
        assert_ne!(by_email, by_username);
        assert_eq!(resolver.resolve_email(""), None);
    }

    #[test]
    fn test_duplicate_emails_share_one_key() {
        let users = vec![row(&[("email", "a@x.io")]), row(&[("email", " a@x.io ")])];
        let resolver = ResolverBuilder::new().register_emails(&users).build();
        assert_eq!(resolver.email_count(), 1);
    }
}
