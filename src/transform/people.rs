//! Transformers for people and the things they own.

use super::{SkipReason, Transform};
use crate::identity::IdentityResolver;
use crate::models::{
    ProjectRecord, Relation, UserLinkRecord, UserRecord, UsernameRecord, VideoRecord, record_id,
};
use crate::normalize::{
    normalize_video_url, optional_text, parse_age, parse_bool, parse_date, parse_display_order,
    parse_list,
};
use crate::source::RawRecord;

/// Users export rows, keyed by email.
pub struct UserTransformer<'a> {
    resolver: &'a IdentityResolver,
}

impl<'a> UserTransformer<'a> {
    pub fn new(resolver: &'a IdentityResolver) -> Self {
        Self { resolver }
    }
}

impl Transform for UserTransformer<'_> {
    type Output = UserRecord;

    fn apply(&mut self, row: &RawRecord) -> Result<UserRecord, SkipReason> {
        let email = row.text("email");
        let id = self
            .resolver
            .resolve_email(email)
            .ok_or(SkipReason::MissingEmail)?;

        Ok(UserRecord {
            id,
            bubble_id: optional_text(row.text("Additional Links")),
            email: email.to_string(),
            age: parse_age(row.text("Age")),
            short_description: optional_text(row.text("shortdescription")),
            background_color: optional_text(row.text("Background Color")),
            consent: parse_bool(row.text("consent")),
            collaborators: parse_list(row.text("Collabs")),
            communities: parse_list(row.text("Communities")),
        })
    }
}

/// Placeholder user rows for every username the other exports refer to.
///
/// Written before any dependent relation so the references have a target row.
pub fn username_records(resolver: &IdentityResolver) -> Vec<UsernameRecord> {
    resolver
        .usernames()
        .into_iter()
        .map(|(username, id)| UsernameRecord {
            id,
            username: username.to_string(),
        })
        .collect()
}

/// Links require a resolvable owner.
pub struct UserLinkTransformer<'a> {
    resolver: &'a IdentityResolver,
}

impl<'a> UserLinkTransformer<'a> {
    pub fn new(resolver: &'a IdentityResolver) -> Self {
        Self { resolver }
    }
}

impl Transform for UserLinkTransformer<'_> {
    type Output = UserLinkRecord;

    fn apply(&mut self, row: &RawRecord) -> Result<UserLinkRecord, SkipReason> {
        let user_id = self
            .resolver
            .resolve(row.text("User"))
            .ok_or(SkipReason::UnresolvedPerson)?;
        let label = optional_text(row.text("Label")).unwrap_or_else(|| "Link".to_string());
        let url = row.text("Link").to_string();

        Ok(UserLinkRecord {
            id: UserLinkRecord::derive_id(user_id, &label, &url, row.text("Creation Date")),
            user_id,
            label,
            url,
            created_at: parse_date(row.text("Creation Date")),
            updated_at: parse_date(row.text("Modified Date")),
        })
    }
}

/// Projects carry no owner column, so every project is kept unlinked.
#[derive(Default)]
pub struct ProjectTransformer;

impl ProjectTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl Transform for ProjectTransformer {
    type Output = ProjectRecord;

    fn apply(&mut self, row: &RawRecord) -> Result<ProjectRecord, SkipReason> {
        let name = optional_text(row.text("Name")).unwrap_or_else(|| "Untitled".to_string());
        let id = record_id(
            Relation::Projects,
            &[
                &name,
                row.text("Description"),
                row.text("Link"),
                row.text("Photo"),
                row.text("Creation Date"),
            ],
        );

        Ok(ProjectRecord {
            id,
            user_id: None,
            name,
            description: optional_text(row.text("Description")),
            link: optional_text(row.text("Link")),
            photo_url: optional_text(row.text("Photo")),
            display_order: parse_display_order(row.text("Order")),
            created_at: parse_date(row.text("Creation Date")),
            updated_at: parse_date(row.text("Modified Date")),
        })
    }
}

/// Videos keep an unresolved creator as null but need a URL.
pub struct VideoTransformer<'a> {
    resolver: &'a IdentityResolver,
}

impl<'a> VideoTransformer<'a> {
    pub fn new(resolver: &'a IdentityResolver) -> Self {
        Self { resolver }
    }
}

impl Transform for VideoTransformer<'_> {
    type Output = VideoRecord;

    fn apply(&mut self, row: &RawRecord) -> Result<VideoRecord, SkipReason> {
        let url = normalize_video_url(row.text("URL"));
        if url.is_empty() {
            return Err(SkipReason::EmptyUrl);
        }
        let user_id = self.resolver.resolve(row.text("Creator"));

        Ok(VideoRecord {
            id: VideoRecord::derive_id(user_id, &url),
            user_id,
            url,
            created_at: parse_date(row.text("Creation Date")),
            updated_at: parse_date(row.text("Modified Date")),
        })
    }
}
