//! Relations and normalized records.
//!
//! A [`Relation`] names one Bubble export and the target table it lands in. Each
//! normalized record type implements [`TargetRow`], which is everything a sink
//! needs to persist it: the table, the conflict column the hosted API should use,
//! the natural key, and a parameterized Postgres insert.

use crate::identity::ResolvedKey;
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;
use std::fmt;
use uuid::Uuid;

/// Namespace for ids of normalized records (not people).
const RECORD_NAMESPACE: Uuid = Uuid::from_u128(0x4f1c_8a2e_93d7_4b6a_a0e5_71c2_d9b8_3e10);

/// One exported entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    Users,
    Messages,
    Likes,
    FriendTestimonials,
    AppTestimonials,
    MetUps,
    Projects,
    UserLinks,
    Videos,
    Pairings,
}

impl Relation {
    pub const ALL: [Relation; 10] = [
        Relation::Users,
        Relation::Messages,
        Relation::Likes,
        Relation::FriendTestimonials,
        Relation::AppTestimonials,
        Relation::MetUps,
        Relation::Projects,
        Relation::UserLinks,
        Relation::Videos,
        Relation::Pairings,
    ];

    /// Target table name.
    pub fn table(self) -> &'static str {
        match self {
            Relation::Users => "users",
            Relation::Messages => "messages",
            Relation::Likes => "likes",
            Relation::FriendTestimonials => "friend_testimonials",
            Relation::AppTestimonials => "app_testimonials",
            Relation::MetUps => "met_ups",
            Relation::Projects => "projects",
            Relation::UserLinks => "user_links",
            Relation::Videos => "videos",
            Relation::Pairings => "pairings",
        }
    }

    /// File name of the export inside the export directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Relation::Users => "export_All-Users_2026-01-21_02-10-40.csv",
            Relation::Messages => "export_All-Messages_2026-01-21_02-10-58.csv",
            Relation::Likes => "export_All-Likes_2026-01-21_02-12-18.csv",
            Relation::FriendTestimonials => "export_All-FriendTestimonials_2026-01-21_02-12-03.csv",
            Relation::AppTestimonials => "export_All-AppTestimonials_2026-01-21_02-15-32.csv",
            Relation::MetUps => "export_All-Met-Ups_2026-01-21_02-11-44.csv",
            Relation::Projects => "export_All-Projects_2026-01-21_02-12-51.csv",
            Relation::UserLinks => "export_All-UserLinks_2026-01-21_02-13-02.csv",
            Relation::Videos => "export_All-Videos_2026-01-21_02-13-13.csv",
            Relation::Pairings => "export_All-Pairings_2026-01-21_02-12-42.csv",
        }
    }

    /// Columns holding a username in a creator/sender/recipient/subject/user role.
    ///
    /// Pairing matches are free text typed by an admin. They are looked up in the
    /// map but never add to it.
    pub fn person_columns(self) -> &'static [&'static str] {
        match self {
            Relation::Users | Relation::Projects => &[],
            Relation::Messages => &["Creator", "Recipient"],
            Relation::Likes => &["Sender", "Receiver"],
            Relation::FriendTestimonials => &["Creator", "Subject"],
            Relation::AppTestimonials => &["Creator"],
            Relation::MetUps => &["Creator", "User 2"],
            Relation::UserLinks => &["User"],
            Relation::Videos => &["Creator"],
            Relation::Pairings => &[],
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Deterministic id for a normalized record, derived from its defining content.
///
/// The same relation and parts always give the same id, so a re-run produces
/// rows the target already holds and the insert is conflict-skipped.
pub fn record_id(relation: Relation, parts: &[&str]) -> Uuid {
    let mut material = String::from(relation.table());
    for part in parts {
        material.push('\u{1f}');
        material.push_str(part);
    }
    Uuid::new_v5(&RECORD_NAMESPACE, material.as_bytes())
}

fn key_text(key: Option<ResolvedKey>) -> String {
    key.map(|k| k.to_string()).unwrap_or_default()
}

/// A normalized record that a sink can persist.
pub trait TargetRow: Serialize {
    /// Relation (and therefore table) the record belongs to.
    const RELATION: Relation;

    /// Column the hosted API resolves duplicates on.
    const CONFLICT_COLUMN: &'static str = "id";

    /// Value of the natural key; two records with the same key are the same row.
    fn natural_key(&self) -> String;

    /// Parameterized insert with `ON CONFLICT DO NOTHING`.
    fn insert_query(&self) -> Query<'_, Postgres, PgArguments>;
}

/// A user exported with an email address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: ResolvedKey,
    pub bubble_id: Option<String>,
    pub email: String,
    pub age: Option<i32>,
    pub short_description: Option<String>,
    pub background_color: Option<String>,
    pub consent: bool,
    pub collaborators: Vec<String>,
    pub communities: Vec<String>,
}

impl TargetRow for UserRecord {
    const RELATION: Relation = Relation::Users;
    const CONFLICT_COLUMN: &'static str = "email";

    fn natural_key(&self) -> String {
        format!("email:{}", self.email)
    }

    fn insert_query(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            r#"INSERT INTO users (id, bubble_id, email, age, short_description,
                                  background_color, consent, collaborators, communities)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(self.id.uuid())
        .bind(&self.bubble_id)
        .bind(&self.email)
        .bind(self.age)
        .bind(&self.short_description)
        .bind(&self.background_color)
        .bind(self.consent)
        .bind(&self.collaborators)
        .bind(&self.communities)
    }
}

/// A person known only by the username other relations refer to them with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsernameRecord {
    pub id: ResolvedKey,
    pub username: String,
}

impl TargetRow for UsernameRecord {
    const RELATION: Relation = Relation::Users;
    const CONFLICT_COLUMN: &'static str = "username";

    fn natural_key(&self) -> String {
        format!("username:{}", self.username)
    }

    fn insert_query(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query("INSERT INTO users (id, username) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(self.id.uuid())
            .bind(&self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserLinkRecord {
    pub id: Uuid,
    pub user_id: ResolvedKey,
    pub label: String,
    pub url: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl UserLinkRecord {
    pub fn derive_id(user_id: ResolvedKey, label: &str, url: &str, created: &str) -> Uuid {
        record_id(
            Relation::UserLinks,
            &[&user_id.to_string(), label, url, created],
        )
    }
}

impl TargetRow for UserLinkRecord {
    const RELATION: Relation = Relation::UserLinks;

    fn natural_key(&self) -> String {
        self.id.to_string()
    }

    fn insert_query(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            r#"INSERT INTO user_links (id, user_id, label, url, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(self.id)
        .bind(self.user_id.uuid())
        .bind(&self.label)
        .bind(&self.url)
        .bind(self.created_at)
        .bind(self.updated_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectRecord {
    pub id: Uuid,
    /// The projects export has no owner column; linking is manual.
    pub user_id: Option<ResolvedKey>,
    pub name: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub photo_url: Option<String>,
    pub display_order: i32,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl TargetRow for ProjectRecord {
    const RELATION: Relation = Relation::Projects;

    fn natural_key(&self) -> String {
        self.id.to_string()
    }

    fn insert_query(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            r#"INSERT INTO projects (id, user_id, name, description, link, photo_url,
                                     display_order, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(self.id)
        .bind(self.user_id.map(ResolvedKey::uuid))
        .bind(&self.name)
        .bind(&self.description)
        .bind(&self.link)
        .bind(&self.photo_url)
        .bind(self.display_order)
        .bind(self.created_at)
        .bind(self.updated_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoRecord {
    pub id: Uuid,
    pub user_id: Option<ResolvedKey>,
    pub url: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl VideoRecord {
    pub fn derive_id(user_id: Option<ResolvedKey>, url: &str) -> Uuid {
        record_id(Relation::Videos, &[&key_text(user_id), url])
    }
}

impl TargetRow for VideoRecord {
    const RELATION: Relation = Relation::Videos;

    fn natural_key(&self) -> String {
        self.id.to_string()
    }

    fn insert_query(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            r#"INSERT INTO videos (id, user_id, url, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(self.id)
        .bind(self.user_id.map(ResolvedKey::uuid))
        .bind(&self.url)
        .bind(self.created_at)
        .bind(self.updated_at)
    }
}

/// Directed: `sender` liked `receiver`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LikeRecord {
    pub id: Uuid,
    pub sender_id: ResolvedKey,
    pub receiver_id: ResolvedKey,
    pub created_at: Option<NaiveDateTime>,
}

impl LikeRecord {
    pub fn derive_id(sender_id: ResolvedKey, receiver_id: ResolvedKey) -> Uuid {
        record_id(
            Relation::Likes,
            &[&sender_id.to_string(), &receiver_id.to_string()],
        )
    }
}

impl TargetRow for LikeRecord {
    const RELATION: Relation = Relation::Likes;

    fn natural_key(&self) -> String {
        format!("{}->{}", self.sender_id, self.receiver_id)
    }

    fn insert_query(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            r#"INSERT INTO likes (id, sender_id, receiver_id, created_at)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(self.id)
        .bind(self.sender_id.uuid())
        .bind(self.receiver_id.uuid())
        .bind(self.created_at)
    }
}

/// Symmetric: `user1_id` is always the smaller key of the pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetUpRecord {
    pub id: Uuid,
    pub user1_id: ResolvedKey,
    pub user2_id: ResolvedKey,
    pub created_at: Option<NaiveDateTime>,
}

impl MetUpRecord {
    pub fn derive_id(user1_id: ResolvedKey, user2_id: ResolvedKey) -> Uuid {
        record_id(
            Relation::MetUps,
            &[&user1_id.to_string(), &user2_id.to_string()],
        )
    }
}

impl TargetRow for MetUpRecord {
    const RELATION: Relation = Relation::MetUps;

    fn natural_key(&self) -> String {
        format!("{}<>{}", self.user1_id, self.user2_id)
    }

    fn insert_query(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            r#"INSERT INTO met_ups (id, user1_id, user2_id, created_at)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(self.id)
        .bind(self.user1_id.uuid())
        .bind(self.user2_id.uuid())
        .bind(self.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub sender_id: Option<ResolvedKey>,
    pub recipient_id: Option<ResolvedKey>,
    pub content: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl MessageRecord {
    pub fn derive_id(
        sender_id: Option<ResolvedKey>,
        recipient_id: Option<ResolvedKey>,
        content: &str,
        created: &str,
    ) -> Uuid {
        record_id(
            Relation::Messages,
            &[&key_text(sender_id), &key_text(recipient_id), content, created],
        )
    }
}

impl TargetRow for MessageRecord {
    const RELATION: Relation = Relation::Messages;

    fn natural_key(&self) -> String {
        self.id.to_string()
    }

    fn insert_query(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            r#"INSERT INTO messages (id, sender_id, recipient_id, content, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(self.id)
        .bind(self.sender_id.map(ResolvedKey::uuid))
        .bind(self.recipient_id.map(ResolvedKey::uuid))
        .bind(&self.content)
        .bind(self.created_at)
        .bind(self.updated_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendTestimonialRecord {
    pub id: Uuid,
    pub author_id: Option<ResolvedKey>,
    pub subject_id: Option<ResolvedKey>,
    pub content: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl FriendTestimonialRecord {
    pub fn derive_id(
        author_id: Option<ResolvedKey>,
        subject_id: Option<ResolvedKey>,
        content: &str,
        created: &str,
    ) -> Uuid {
        record_id(
            Relation::FriendTestimonials,
            &[&key_text(author_id), &key_text(subject_id), content, created],
        )
    }
}

impl TargetRow for FriendTestimonialRecord {
    const RELATION: Relation = Relation::FriendTestimonials;

    fn natural_key(&self) -> String {
        self.id.to_string()
    }

    fn insert_query(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            r#"INSERT INTO friend_testimonials (id, author_id, subject_id, content, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(self.id)
        .bind(self.author_id.map(ResolvedKey::uuid))
        .bind(self.subject_id.map(ResolvedKey::uuid))
        .bind(&self.content)
        .bind(self.created_at)
        .bind(self.updated_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppTestimonialRecord {
    pub id: Uuid,
    pub author_id: Option<ResolvedKey>,
    /// Free-text name typed into the testimonial form, kept as-is.
    pub username: Option<String>,
    pub content: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl AppTestimonialRecord {
    pub fn derive_id(
        author_id: Option<ResolvedKey>,
        username: Option<&str>,
        content: &str,
        created: &str,
    ) -> Uuid {
        record_id(
            Relation::AppTestimonials,
            &[&key_text(author_id), username.unwrap_or_default(), content, created],
        )
    }
}

impl TargetRow for AppTestimonialRecord {
    const RELATION: Relation = Relation::AppTestimonials;

    fn natural_key(&self) -> String {
        self.id.to_string()
    }

    fn insert_query(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            r#"INSERT INTO app_testimonials (id, author_id, username, content, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(self.id)
        .bind(self.author_id.map(ResolvedKey::uuid))
        .bind(&self.username)
        .bind(&self.content)
        .bind(self.created_at)
        .bind(self.updated_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairingRecord {
    pub id: Uuid,
    pub match1_id: Option<ResolvedKey>,
    pub match2_id: Option<ResolvedKey>,
    pub match1_name: Option<String>,
    pub match2_name: Option<String>,
    pub match2_alt_name: Option<String>,
    pub contact_info: Option<String>,
    pub description: Option<String>,
    pub here_for: Vec<String>,
    pub anonymous: bool,
}

impl TargetRow for PairingRecord {
    const RELATION: Relation = Relation::Pairings;

    fn natural_key(&self) -> String {
        self.id.to_string()
    }

    fn insert_query(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            r#"INSERT INTO pairings (id, match1_id, match2_id, match1_name, match2_name,
                                     match2_alt_name, contact_info, description, here_for, anonymous)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(self.id)
        .bind(self.match1_id.map(ResolvedKey::uuid))
        .bind(self.match2_id.map(ResolvedKey::uuid))
        .bind(&self.match1_name)
        .bind(&self.match2_name)
        .bind(&self.match2_alt_name)
        .bind(&self.contact_info)
        .bind(&self.description)
        .bind(&self.here_for)
        .bind(self.anonymous)
    }
}
