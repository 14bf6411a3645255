//! Transformers for messages and testimonials.
//!
//! The body (`Value`) is required; person references may stay null.

use super::{SkipReason, Transform};
use crate::identity::IdentityResolver;
use crate::models::{AppTestimonialRecord, FriendTestimonialRecord, MessageRecord};
use crate::normalize::{optional_text, parse_date};
use crate::source::RawRecord;

fn required_body(row: &RawRecord) -> Result<String, SkipReason> {
    optional_text(row.text("Value")).ok_or(SkipReason::EmptyContent)
}

pub struct MessageTransformer<'a> {
    resolver: &'a IdentityResolver,
}

impl<'a> MessageTransformer<'a> {
    pub fn new(resolver: &'a IdentityResolver) -> Self {
        Self { resolver }
    }
}

impl Transform for MessageTransformer<'_> {
    type Output = MessageRecord;

    fn apply(&mut self, row: &RawRecord) -> Result<MessageRecord, SkipReason> {
        let content = required_body(row)?;
        let sender_id = self.resolver.resolve(row.text("Creator"));
        let recipient_id = self.resolver.resolve(row.text("Recipient"));

        Ok(MessageRecord {
            id: MessageRecord::derive_id(
                sender_id,
                recipient_id,
                &content,
                row.text("Creation Date"),
            ),
            sender_id,
            recipient_id,
            content,
            created_at: parse_date(row.text("Creation Date")),
            updated_at: parse_date(row.text("Modified Date")),
        })
    }
}

pub struct FriendTestimonialTransformer<'a> {
    resolver: &'a IdentityResolver,
}

impl<'a> FriendTestimonialTransformer<'a> {
    pub fn new(resolver: &'a IdentityResolver) -> Self {
        Self { resolver }
    }
}

impl Transform for FriendTestimonialTransformer<'_> {
    type Output = FriendTestimonialRecord;

    fn apply(&mut self, row: &RawRecord) -> Result<FriendTestimonialRecord, SkipReason> {
        let content = required_body(row)?;
        let author_id = self.resolver.resolve(row.text("Creator"));
        let subject_id = self.resolver.resolve(row.text("Subject"));

        Ok(FriendTestimonialRecord {
            id: FriendTestimonialRecord::derive_id(
                author_id,
                subject_id,
                &content,
                row.text("Creation Date"),
            ),
            author_id,
            subject_id,
            content,
            created_at: parse_date(row.text("Creation Date")),
            updated_at: parse_date(row.text("Modified Date")),
        })
    }
}

pub struct AppTestimonialTransformer<'a> {
    resolver: &'a IdentityResolver,
}

impl<'a> AppTestimonialTransformer<'a> {
    pub fn new(resolver: &'a IdentityResolver) -> Self {
        Self { resolver }
    }
}

impl Transform for AppTestimonialTransformer<'_> {
    type Output = AppTestimonialRecord;

    fn apply(&mut self, row: &RawRecord) -> Result<AppTestimonialRecord, SkipReason> {
        let content = required_body(row)?;
        let author_id = self.resolver.resolve(row.text("Creator"));
        let username = optional_text(row.text("Username"));

        Ok(AppTestimonialRecord {
            id: AppTestimonialRecord::derive_id(
                author_id,
                username.as_deref(),
                &content,
                row.text("Creation Date"),
            ),
            author_id,
            username,
            content,
            created_at: parse_date(row.text("Creation Date")),
            updated_at: parse_date(row.text("Modified Date")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ResolverBuilder;
    use crate::models::Relation;

    fn row(pairs: &[(&str, &str)]) -> RawRecord {
        RawRecord::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_message_keeps_unresolved_people() {
        let rows = vec![row(&[
            ("Creator", "amy"),
            ("Recipient", "(App admin)"),
            ("Value", " hey there "),
            ("Creation Date", "Jul 19, 2023 3:11 am"),
        ])];
        let resolver = ResolverBuilder::new()
            .collect_usernames(Relation::Messages, &rows)
            .build();

        let message = MessageTransformer::new(&resolver)
            .apply(&rows[0])
            .expect("message kept");
        assert_eq!(message.sender_id, resolver.resolve("amy"));
        assert_eq!(message.recipient_id, None);
        assert_eq!(message.content, "hey there");
        assert!(message.created_at.is_some());
    }

    #[test]
    fn test_friend_testimonial_requires_body() {
        let resolver = ResolverBuilder::new().build();
        let result = FriendTestimonialTransformer::new(&resolver)
            .apply(&row(&[("Creator", "amy"), ("Subject", "ben")]));
        assert_eq!(result, Err(SkipReason::EmptyContent));
    }

    #[test]
    fn test_repeated_testimonials_on_different_dates_are_distinct() {
        let rows = vec![
            row(&[
                ("Creator", "amy"),
                ("Subject", "ben"),
                ("Value", "great collaborator"),
                ("Creation Date", "Jul 19, 2023 3:11 am"),
            ]),
            row(&[
                ("Creator", "amy"),
                ("Subject", "ben"),
                ("Value", "great collaborator"),
                ("Creation Date", "Aug 2, 2023 5:00 pm"),
            ]),
        ];
        let resolver = ResolverBuilder::new()
            .collect_usernames(Relation::FriendTestimonials, &rows)
            .build();

        let mut friends = FriendTestimonialTransformer::new(&resolver);
        let first = friends.apply(&rows[0]).expect("testimonial kept");
        let second = friends.apply(&rows[1]).expect("testimonial kept");
        assert_ne!(first.id, second.id);

        let mut app = AppTestimonialTransformer::new(&resolver);
        let first = app.apply(&rows[0]).expect("testimonial kept");
        let second = app.apply(&rows[1]).expect("testimonial kept");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_app_testimonial_keeps_free_text_username() {
        let resolver = ResolverBuilder::new().build();
        let testimonial = AppTestimonialTransformer::new(&resolver)
            .apply(&row(&[("Username", " Amy K "), ("Value", "love it")]))
            .expect("testimonial kept");
        assert_eq!(testimonial.author_id, None);
        assert_eq!(testimonial.username.as_deref(), Some("Amy K"));
    }

    #[test]
    fn test_message_ids_are_stable() {
        let rows = vec![row(&[("Creator", "amy"), ("Value", "hi")])];
        let resolver = ResolverBuilder::new()
            .collect_usernames(Relation::Messages, &rows)
            .build();
        let mut transformer = MessageTransformer::new(&resolver);

        let first = transformer.apply(&rows[0]).expect("kept");
        let second = transformer.apply(&rows[0]).expect("kept");
        assert_eq!(first.id, second.id);
    }
}
