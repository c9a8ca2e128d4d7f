mod schema;

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use uuid::Uuid;

use schema::*;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = media)]
pub struct ContentRecord {
    pub id: Uuid,
    pub filename: Option<String>,
    pub url: String,
    pub alt_text: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub thumbnail_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = media)]
pub struct NewContent {
    pub id: Uuid,
    pub filename: Option<String>,
    pub url: String,
    pub alt_text: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Intended-state changes for a content record.
///
/// Outer `None` means "leave the stored value unchanged"; for nullable columns
/// `Some(None)` clears the value. Callers editing anything that could touch
/// `thumbnail_url` must send it explicitly, even when unchanged.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = media)]
pub struct ContentUpdate {
    pub filename: Option<Option<String>>,
    pub url: Option<String>,
    pub alt_text: Option<Option<String>>,
    pub title: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub thumbnail_url: Option<Option<String>>,
}

impl ContentUpdate {
    pub fn is_noop(&self) -> bool {
        self.filename.is_none()
            && self.url.is_none()
            && self.alt_text.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.thumbnail_url.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = comments)]
pub struct CommentRecord {
    pub id: Uuid,
    pub article_id: Option<Uuid>,
    pub media_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub content: String,
    pub approved: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment {
    pub id: Uuid,
    pub media_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub content: String,
    pub approved: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum SortOrder {
    NewestFirst,
    OldestFirst,
}

/// Builds the process-wide connection pool from a database URL.
///
/// Created once at startup and shared by every handler; panics when the
/// database is unreachable so a misconfigured deployment fails fast.
pub fn build_pool(database_url: &str) -> DbPool {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .build(manager)
        .expect("Failed to create database connection pool")
}

pub fn list_content(pool: &DbPool, order: SortOrder) -> Result<Vec<ContentRecord>, String> {
    let mut conn = get_connection(pool)?;

    let query = media::table.into_boxed();
    let query = match order {
        SortOrder::NewestFirst => query.order(media::created_at.desc()),
        SortOrder::OldestFirst => query.order(media::created_at.asc()),
    };

    query
        .load::<ContentRecord>(&mut conn)
        .map_err(|err| describe_db_error("Error loading content records", err))
}

pub fn get_content_by_id(pool: &DbPool, content_id: Uuid) -> Result<Option<ContentRecord>, String> {
    let mut conn = get_connection(pool)?;

    media::table
        .filter(media::id.eq(content_id))
        .first::<ContentRecord>(&mut conn)
        .optional()
        .map_err(|err| describe_db_error("Error loading content record", err))
}

pub fn create_content(pool: &DbPool, mut new_content: NewContent) -> Result<ContentRecord, String> {
    // legacy rows used "" where NULL was meant; keep new writes canonical
    new_content.filename = normalize_filename(new_content.filename.take());

    let mut conn = get_connection(pool)?;

    diesel::insert_into(media::table)
        .values(&new_content)
        .get_result::<ContentRecord>(&mut conn)
        .map_err(|err| describe_db_error("Error creating content record", err))
}

/// Creates a record for a video hosted on a third-party platform.
///
/// Link-only records carry no filename at all.
pub fn create_external_video(
    pool: &DbPool,
    url: String,
    title: String,
    category: Option<String>,
    description: Option<String>,
) -> Result<ContentRecord, String> {
    create_content(
        pool,
        NewContent {
            id: Uuid::new_v4(),
            filename: None,
            url,
            alt_text: None,
            title: Some(title),
            description,
            category,
            thumbnail_url: None,
        },
    )
}

pub fn update_content(
    pool: &DbPool,
    content_id: Uuid,
    mut changes: ContentUpdate,
) -> Result<Option<ContentRecord>, String> {
    changes.filename = changes.filename.take().map(normalize_filename);

    if changes.is_noop() {
        // an empty changeset is not a valid statement
        return get_content_by_id(pool, content_id);
    }

    let mut conn = get_connection(pool)?;

    diesel::update(media::table.filter(media::id.eq(content_id)))
        .set(&changes)
        .get_result::<ContentRecord>(&mut conn)
        .optional()
        .map_err(|err| describe_db_error("Error updating content record", err))
}

pub fn set_thumbnail_url(
    pool: &DbPool,
    content_id: Uuid,
    thumbnail_url: &str,
) -> Result<Option<ContentRecord>, String> {
    let mut conn = get_connection(pool)?;

    diesel::update(media::table.filter(media::id.eq(content_id)))
        .set(media::thumbnail_url.eq(thumbnail_url))
        .get_result::<ContentRecord>(&mut conn)
        .optional()
        .map_err(|err| describe_db_error("Error updating thumbnail URL", err))
}

/// Deletes a content record together with its comments.
///
/// Returns false when no record with the given id exists.
pub fn delete_content(pool: &DbPool, content_id: Uuid) -> Result<bool, String> {
    let mut conn = get_connection(pool)?;

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(comments::table.filter(comments::media_id.eq(content_id))).execute(conn)?;

        let deleted =
            diesel::delete(media::table.filter(media::id.eq(content_id))).execute(conn)?;
        Ok(deleted > 0)
    })
    .map_err(|err| describe_db_error("Error deleting content record", err))
}

pub fn create_comment(
    pool: &DbPool,
    media_id: Uuid,
    name: String,
    email: String,
    content: String,
) -> Result<CommentRecord, String> {
    let mut conn = get_connection(pool)?;

    let new_comment = NewComment {
        id: Uuid::new_v4(),
        media_id: Some(media_id),
        name,
        email,
        content,
        approved: false, // held for moderation
    };

    diesel::insert_into(comments::table)
        .values(&new_comment)
        .get_result::<CommentRecord>(&mut conn)
        .map_err(|err| describe_db_error("Error creating comment", err))
}

pub fn comments_for_media(
    pool: &DbPool,
    media_id: Uuid,
    include_unapproved: bool,
) -> Result<Vec<CommentRecord>, String> {
    let mut conn = get_connection(pool)?;

    let query = comments::table
        .filter(comments::media_id.eq(media_id))
        .order(comments::created_at.asc())
        .into_boxed();

    let query = if include_unapproved {
        query
    } else {
        query.filter(comments::approved.eq(true))
    };

    query
        .load::<CommentRecord>(&mut conn)
        .map_err(|err| describe_db_error("Error loading comments", err))
}

pub fn approve_comment(pool: &DbPool, comment_id: Uuid) -> Result<bool, String> {
    let mut conn = get_connection(pool)?;

    diesel::update(comments::table.filter(comments::id.eq(comment_id)))
        .set(comments::approved.eq(true))
        .execute(&mut conn)
        .map(|updated| updated > 0)
        .map_err(|err| describe_db_error("Error approving comment", err))
}

pub fn delete_comment(pool: &DbPool, comment_id: Uuid) -> Result<bool, String> {
    let mut conn = get_connection(pool)?;

    diesel::delete(comments::table.filter(comments::id.eq(comment_id)))
        .execute(&mut conn)
        .map(|deleted| deleted > 0)
        .map_err(|err| describe_db_error("Error deleting comment", err))
}

fn get_connection(
    pool: &DbPool,
) -> Result<PooledConnection<ConnectionManager<PgConnection>>, String> {
    pool.get()
        .map_err(|err| format!("Error checking out database connection: {}", err))
}

// empty string is the legacy stand-in for a missing filename
fn normalize_filename(filename: Option<String>) -> Option<String> {
    filename.filter(|name| !name.is_empty())
}

/// Formats a backend error verbatim, logging a pointed diagnostic for the
/// failure modes that keep coming back in production.
fn describe_db_error(context: &str, err: diesel::result::Error) -> String {
    let message = format!("{}: {}", context, err);

    if message.contains("violates not-null constraint") {
        // databases predating the nullable-filename migration still reject NULL here
        tracing::warn!("Not-null constraint reported by the database: {}", message);
    } else if message.contains("row-level security") {
        tracing::warn!("Row-level security denial: {}", message);
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify_record, ContentKind};

    #[test]
    fn normalize_filename_maps_empty_to_none() {
        assert_eq!(normalize_filename(None), None);
        assert_eq!(normalize_filename(Some("".to_string())), None);
        assert_eq!(
            normalize_filename(Some("clip.mp4".to_string())),
            Some("clip.mp4".to_string())
        );
    }

    #[test]
    fn empty_update_is_a_noop() {
        assert!(ContentUpdate::default().is_noop());

        let update = ContentUpdate {
            title: Some(Some("New title".to_string())),
            ..Default::default()
        };
        assert!(!update.is_noop());
    }

    fn test_pool() -> DbPool {
        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for database tests");
        build_pool(&database_url)
    }

    fn external_insert(pool: &DbPool) -> ContentRecord {
        create_external_video(
            pool,
            "https://youtube.com/watch?v=abc".to_string(),
            "Test".to_string(),
            None,
            None,
        )
        .expect("Failed to create external video")
    }

    #[test]
    #[ignore = "needs a migrated database via DATABASE_URL"]
    fn external_video_round_trip_classifies_external() {
        let pool = test_pool();

        let created = external_insert(&pool);
        let fetched = get_content_by_id(&pool, created.id)
            .expect("Failed to read content record back")
            .expect("Created record not found");

        assert_eq!(fetched.filename, None);
        assert_eq!(classify_record(&fetched), ContentKind::ExternalVideo);

        delete_content(&pool, created.id).expect("Failed to clean up record");
    }

    #[test]
    #[ignore = "needs a migrated database via DATABASE_URL"]
    fn empty_string_filename_is_stored_as_null() {
        let pool = test_pool();

        let created = create_content(
            &pool,
            NewContent {
                id: Uuid::new_v4(),
                filename: Some("".to_string()),
                url: "https://youtube.com/watch?v=abc".to_string(),
                alt_text: None,
                title: Some("Test".to_string()),
                description: None,
                category: None,
                thumbnail_url: None,
            },
        )
        .expect("Failed to create content record");

        assert_eq!(created.filename, None);
        assert_eq!(classify_record(&created), ContentKind::ExternalVideo);

        delete_content(&pool, created.id).expect("Failed to clean up record");
    }

    #[test]
    #[ignore = "needs a migrated database via DATABASE_URL"]
    fn uploaded_clip_classifies_uploaded() {
        let pool = test_pool();

        let created = create_content(
            &pool,
            NewContent {
                id: Uuid::new_v4(),
                filename: Some("clip.mp4".to_string()),
                url: "https://cdn/x.mp4".to_string(),
                alt_text: None,
                title: Some("Clip".to_string()),
                description: None,
                category: None,
                thumbnail_url: None,
            },
        )
        .expect("Failed to create content record");

        assert_eq!(classify_record(&created), ContentKind::UploadedVideo);

        delete_content(&pool, created.id).expect("Failed to clean up record");
    }

    #[test]
    #[ignore = "needs a migrated database via DATABASE_URL"]
    fn repeated_update_leaves_record_identical() {
        let pool = test_pool();

        let created = external_insert(&pool);
        let changes = ContentUpdate {
            title: Some(Some("Renamed".to_string())),
            thumbnail_url: Some(Some("https://example/thumb.jpg".to_string())),
            ..Default::default()
        };

        let first = update_content(&pool, created.id, changes.clone())
            .expect("First update failed")
            .expect("Record disappeared");
        let second = update_content(&pool, created.id, changes)
            .expect("Second update failed")
            .expect("Record disappeared");

        assert_eq!(first, second);

        delete_content(&pool, created.id).expect("Failed to clean up record");
    }

    #[test]
    #[ignore = "needs a migrated database via DATABASE_URL"]
    fn omitted_thumbnail_is_preserved_across_updates() {
        let pool = test_pool();

        let created = external_insert(&pool);
        let with_thumb = update_content(
            &pool,
            created.id,
            ContentUpdate {
                thumbnail_url: Some(Some("https://example/thumb.jpg".to_string())),
                ..Default::default()
            },
        )
        .expect("Thumbnail update failed")
        .expect("Record disappeared");
        assert_eq!(
            with_thumb.thumbnail_url.as_deref(),
            Some("https://example/thumb.jpg")
        );

        // unrelated edit without the thumbnail key must not clear it
        let renamed = update_content(
            &pool,
            created.id,
            ContentUpdate {
                title: Some(Some("Renamed".to_string())),
                ..Default::default()
            },
        )
        .expect("Title update failed")
        .expect("Record disappeared");

        assert_eq!(
            renamed.thumbnail_url.as_deref(),
            Some("https://example/thumb.jpg")
        );

        delete_content(&pool, created.id).expect("Failed to clean up record");
    }

    #[test]
    #[ignore = "needs a migrated database via DATABASE_URL"]
    fn deleting_content_removes_its_comments() {
        let pool = test_pool();

        let created = external_insert(&pool);
        let comment = create_comment(
            &pool,
            created.id,
            "Visitor".to_string(),
            "visitor@example.com".to_string(),
            "Nice one".to_string(),
        )
        .expect("Failed to create comment");
        assert!(!comment.approved);

        assert!(delete_content(&pool, created.id).expect("Delete failed"));

        let remaining =
            comments_for_media(&pool, created.id, true).expect("Failed to list comments");
        assert!(remaining.is_empty());
    }
}
