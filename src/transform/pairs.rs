//! Transformers for relations between two people.
//!
//! Likes are directed: `(a -> b)` and `(b -> a)` are different rows, only exact
//! repeats are dropped. Met-ups are symmetric: the pair is ordered by key before
//! the seen-set check so `(a, b)` and `(b, a)` collapse into one row. Both need
//! both ends resolved. Pairings are kept whether or not their matches resolve,
//! and their ids cover every exported column since nothing else tells two
//! pairings apart.

use super::{SkipReason, Transform};
use crate::identity::{IdentityResolver, ResolvedKey};
use crate::models::{LikeRecord, MetUpRecord, PairingRecord, Relation, record_id};
use crate::normalize::{optional_text, parse_bool, parse_date, parse_list};
use crate::source::RawRecord;
use std::collections::HashSet;

/// The pairings export header carries a trailing space.
const MATCH1_COLUMN: &str = "Match 1 ";

pub struct LikeTransformer<'a> {
    resolver: &'a IdentityResolver,
    seen: HashSet<(ResolvedKey, ResolvedKey)>,
}

impl<'a> LikeTransformer<'a> {
    pub fn new(resolver: &'a IdentityResolver) -> Self {
        Self {
            resolver,
            seen: HashSet::new(),
        }
    }
}

impl Transform for LikeTransformer<'_> {
    type Output = LikeRecord;

    fn apply(&mut self, row: &RawRecord) -> Result<LikeRecord, SkipReason> {
        let sender = self.resolver.resolve(row.text("Sender"));
        let receiver = self.resolver.resolve(row.text("Receiver"));
        let (Some(sender_id), Some(receiver_id)) = (sender, receiver) else {
            return Err(SkipReason::UnresolvedPair);
        };

        if !self.seen.insert((sender_id, receiver_id)) {
            return Err(SkipReason::DuplicatePair);
        }

        Ok(LikeRecord {
            id: LikeRecord::derive_id(sender_id, receiver_id),
            sender_id,
            receiver_id,
            created_at: parse_date(row.text("Creation Date")),
        })
    }
}

pub struct MetUpTransformer<'a> {
    resolver: &'a IdentityResolver,
    seen: HashSet<(ResolvedKey, ResolvedKey)>,
}

impl<'a> MetUpTransformer<'a> {
    pub fn new(resolver: &'a IdentityResolver) -> Self {
        Self {
            resolver,
            seen: HashSet::new(),
        }
    }
}

impl Transform for MetUpTransformer<'_> {
    type Output = MetUpRecord;

    fn apply(&mut self, row: &RawRecord) -> Result<MetUpRecord, SkipReason> {
        let creator = self.resolver.resolve(row.text("Creator"));
        let other = self.resolver.resolve(row.text("User 2"));
        let (Some(a), Some(b)) = (creator, other) else {
            return Err(SkipReason::UnresolvedPair);
        };

        let (user1_id, user2_id) = if a <= b { (a, b) } else { (b, a) };
        if !self.seen.insert((user1_id, user2_id)) {
            return Err(SkipReason::DuplicatePair);
        }

        Ok(MetUpRecord {
            id: MetUpRecord::derive_id(user1_id, user2_id),
            user1_id,
            user2_id,
            created_at: parse_date(row.text("Creation Date")),
        })
    }
}

pub struct PairingTransformer<'a> {
    resolver: &'a IdentityResolver,
}

impl<'a> PairingTransformer<'a> {
    pub fn new(resolver: &'a IdentityResolver) -> Self {
        Self { resolver }
    }
}

impl Transform for PairingTransformer<'_> {
    type Output = PairingRecord;

    fn apply(&mut self, row: &RawRecord) -> Result<PairingRecord, SkipReason> {
        let match1_name = row.text(MATCH1_COLUMN);
        let match2_name = row.text("Match 2");
        let alt_name = row.text("Match 2 Alt name");
        let contact_info = row.text("Contact Info2");
        let description = row.text("Description");
        let here_for = row.text("Here for");
        let anonymous = row.text("Anonymous");

        Ok(PairingRecord {
            id: record_id(
                Relation::Pairings,
                &[
                    match1_name,
                    match2_name,
                    alt_name,
                    contact_info,
                    description,
                    here_for,
                    anonymous,
                ],
            ),
            match1_id: self.resolver.resolve(match1_name),
            match2_id: self.resolver.resolve(match2_name),
            match1_name: optional_text(match1_name),
            match2_name: optional_text(match2_name),
            match2_alt_name: optional_text(alt_name),
            contact_info: optional_text(contact_info),
            description: optional_text(description),
            here_for: parse_list(here_for),
            anonymous: parse_bool(anonymous),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ResolverBuilder;
    use crate::transform::transform_all;

    fn row(pairs: &[(&str, &str)]) -> RawRecord {
        RawRecord::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_likes_are_direction_sensitive() {
        let rows = vec![
            row(&[("Sender", "amy"), ("Receiver", "ben")]),
            row(&[("Sender", "ben"), ("Receiver", "amy")]),
            row(&[("Sender", "amy"), ("Receiver", "ben")]),
        ];
        let resolver = ResolverBuilder::new()
            .collect_usernames(Relation::Likes, &rows)
            .build();

        let report = transform_all(&mut LikeTransformer::new(&resolver), &rows);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.skipped.get(&SkipReason::DuplicatePair), Some(&1));
        assert_ne!(report.records[0].id, report.records[1].id);
    }

    #[test]
    fn test_likes_need_both_ends() {
        let rows = vec![
            row(&[("Sender", "amy"), ("Receiver", "(App admin)")]),
            row(&[("Sender", ""), ("Receiver", "amy")]),
        ];
        let resolver = ResolverBuilder::new()
            .collect_usernames(Relation::Likes, &rows)
            .build();

        let report = transform_all(&mut LikeTransformer::new(&resolver), &rows);
        assert!(report.records.is_empty());
        assert_eq!(report.skipped.get(&SkipReason::UnresolvedPair), Some(&2));
    }

    #[test]
    fn test_met_ups_are_order_insensitive() {
        let rows = vec![
            row(&[("Creator", "amy"), ("User 2", "ben")]),
            row(&[("Creator", "ben"), ("User 2", "amy")]),
        ];
        let resolver = ResolverBuilder::new()
            .collect_usernames(Relation::MetUps, &rows)
            .build();

        let report = transform_all(&mut MetUpTransformer::new(&resolver), &rows);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.skipped.get(&SkipReason::DuplicatePair), Some(&1));

        let met_up = &report.records[0];
        assert!(met_up.user1_id < met_up.user2_id);
    }

    #[test]
    fn test_met_up_with_unknown_partner_is_dropped() {
        let rows = vec![row(&[("Creator", "amy"), ("User 2", "")])];
        let resolver = ResolverBuilder::new()
            .collect_usernames(Relation::MetUps, &rows)
            .build();

        let result = MetUpTransformer::new(&resolver).apply(&rows[0]);
        assert_eq!(result, Err(SkipReason::UnresolvedPair));
    }

    #[test]
    fn test_pairing_keeps_unresolved_matches() {
        let rows = vec![row(&[
            (MATCH1_COLUMN, "amy"),
            ("Match 2", ""),
            ("Match 2 Alt name", "Benny"),
            ("Here for", "friends, collabs"),
            ("Anonymous", "yes"),
        ])];
        let likes = vec![row(&[("Sender", "amy"), ("Receiver", "ben")])];
        let resolver = ResolverBuilder::new()
            .collect_usernames(Relation::Likes, &likes)
            .build();

        let pairing = PairingTransformer::new(&resolver)
            .apply(&rows[0])
            .expect("pairing kept");
        assert_eq!(pairing.match1_id, resolver.resolve("amy"));
        assert_eq!(pairing.match2_id, None);
        assert_eq!(pairing.match1_name.as_deref(), Some("amy"));
        assert_eq!(pairing.match2_name, None);
        assert_eq!(pairing.match2_alt_name.as_deref(), Some("Benny"));
        assert_eq!(pairing.here_for, vec!["friends", "collabs"]);
        assert!(pairing.anonymous);
    }

    #[test]
    fn test_pairing_names_are_not_registered() {
        let rows = vec![row(&[(MATCH1_COLUMN, "dan"), ("Match 2", "eve")])];
        let resolver = ResolverBuilder::new()
            .collect_usernames(Relation::Pairings, &rows)
            .build();
        assert_eq!(resolver.username_count(), 0);

        let pairing = PairingTransformer::new(&resolver)
            .apply(&rows[0])
            .expect("pairing kept");
        assert_eq!(pairing.match1_id, None);
        assert_eq!(pairing.match1_name.as_deref(), Some("dan"));
    }

    #[test]
    fn test_pairings_differing_in_any_column_get_distinct_ids() {
        let base = [
            (MATCH1_COLUMN, "amy"),
            ("Match 2", ""),
            ("Match 2 Alt name", "Benny"),
            ("Contact Info2", ""),
            ("Description", "a pairing"),
            ("Here for", "friends"),
            ("Anonymous", "no"),
        ];
        let resolver = ResolverBuilder::new().build();
        let mut transformer = PairingTransformer::new(&resolver);
        let first = transformer.apply(&row(&base)).expect("pairing kept");

        for index in 0..base.len() {
            let mut changed = base;
            changed[index].1 = "other";
            let second = transformer.apply(&row(&changed)).expect("pairing kept");
            assert_ne!(first.id, second.id, "column {:?} ignored", base[index].0);
        }

        let again = transformer.apply(&row(&base)).expect("pairing kept");
        assert_eq!(first.id, again.id);
    }
}
