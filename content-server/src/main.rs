mod classify;
mod db;
mod model;
mod thumbnail;

use std::env;

use tower::ServiceBuilder;
use tracing_subscriber::filter;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Extension, Json, Multipart, Path, Query},
    http::StatusCode,
    middleware::from_fn,
    response::IntoResponse,
    routing::{delete, get, post, put},
};

use uuid::Uuid;

use admin_gate::{UserInfo, admin_gate_middleware};

use db::{DbPool, SortOrder};

#[derive(Debug, serde::Deserialize)]
struct ListParams {
    order: Option<String>,
    filter: Option<String>,
}

fn sort_order(order: Option<&str>) -> SortOrder {
    match order {
        Some("asc") => SortOrder::OldestFirst,
        _ => SortOrder::NewestFirst,
    }
}

/// List every content record.
///
/// Returns a JSON array ordered by creation time, newest first unless
/// `?order=asc` is given.
async fn list_content(
    Extension(pool): Extension<DbPool>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    match db::list_content(&pool, sort_order(params.order.as_deref())) {
        Ok(records) => {
            let records: Vec<model::Content> =
                records.into_iter().map(model::Content::from).collect();
            (StatusCode::OK, Json(records)).into_response()
        }
        Err(err) => {
            tracing::error!("Error listing content: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
        }
    }
}

/// List the records that are videos: uploads with a video suffix and
/// link-only external videos.
async fn list_videos(
    Extension(pool): Extension<DbPool>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    match db::list_content(&pool, sort_order(params.order.as_deref())) {
        Ok(records) => {
            let videos: Vec<model::Content> = classify::video_records(records)
                .into_iter()
                .map(model::Content::from)
                .collect();
            (StatusCode::OK, Json(videos)).into_response()
        }
        Err(err) => {
            tracing::error!("Error listing videos: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
        }
    }
}

async fn get_content(
    Extension(pool): Extension<DbPool>,
    Path(content_id): Path<Uuid>,
) -> impl IntoResponse {
    match db::get_content_by_id(&pool, content_id) {
        Ok(Some(record)) => (StatusCode::OK, Json(model::Content::from(record))).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "content record not found").into_response(),
        Err(err) => {
            tracing::error!("Error loading content record {}: {}", content_id, err);
            (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
        }
    }
}

async fn list_comments(
    Extension(pool): Extension<DbPool>,
    Path(content_id): Path<Uuid>,
) -> impl IntoResponse {
    match db::comments_for_media(&pool, content_id, false) {
        Ok(records) => {
            let comments: Vec<model::Comment> =
                records.into_iter().map(model::Comment::from).collect();
            (StatusCode::OK, Json(comments)).into_response()
        }
        Err(err) => {
            tracing::error!("Error listing comments for {}: {}", content_id, err);
            (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
        }
    }
}

/// Accept a visitor comment on a content record.
///
/// Comments are held for moderation and only appear publicly once approved.
async fn submit_comment(
    Extension(pool): Extension<DbPool>,
    Path(content_id): Path<Uuid>,
    Json(payload): Json<model::CommentRequest>,
) -> impl IntoResponse {
    if payload.name.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.content.trim().is_empty()
    {
        return (StatusCode::BAD_REQUEST, "name, email and content are required").into_response();
    }

    match db::get_content_by_id(&pool, content_id) {
        Ok(Some(_)) => {}
        Ok(None) => return (StatusCode::NOT_FOUND, "content record not found").into_response(),
        Err(err) => {
            tracing::error!("Error loading content record {}: {}", content_id, err);
            return (StatusCode::INTERNAL_SERVER_ERROR, err).into_response();
        }
    }

    match db::create_comment(
        &pool,
        content_id,
        payload.name,
        payload.email,
        payload.content,
    ) {
        Ok(record) => (StatusCode::CREATED, Json(model::CommentDetail::from(record))).into_response(),
        Err(err) => {
            tracing::error!("Error creating comment on {}: {}", content_id, err);
            (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
        }
    }
}

/// Management listing: every record, annotated with its classification.
///
/// `?filter=videos` narrows the listing through the same filter the public
/// video view uses.
async fn admin_list_content(
    Extension(pool): Extension<DbPool>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    match db::list_content(&pool, sort_order(params.order.as_deref())) {
        Ok(records) => {
            let records = match params.filter.as_deref() {
                Some("videos") => classify::video_records(records),
                _ => records,
            };
            let records: Vec<model::Content> =
                records.into_iter().map(model::Content::from).collect();
            (StatusCode::OK, Json(records)).into_response()
        }
        Err(err) => {
            tracing::error!("Error listing content: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
        }
    }
}

async fn create_content(
    Extension(pool): Extension<DbPool>,
    Extension(admin): Extension<UserInfo>,
    Json(payload): Json<model::CreateContentRequest>,
) -> impl IntoResponse {
    if payload.url.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "url is required").into_response();
    }

    let new_content = db::NewContent {
        id: Uuid::new_v4(),
        filename: payload.filename,
        url: payload.url,
        alt_text: payload.alt_text,
        title: payload.title,
        description: payload.description,
        category: payload.category,
        thumbnail_url: payload.thumbnail_url,
    };

    match db::create_content(&pool, new_content) {
        Ok(record) => {
            tracing::info!("Content record {} created by {}", record.id, admin.email);
            (StatusCode::CREATED, Json(model::Content::from(record))).into_response()
        }
        Err(err) => {
            tracing::error!("Error creating content record: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
        }
    }
}

/// Create a record for a video hosted on a third-party platform.
async fn create_external_video(
    Extension(pool): Extension<DbPool>,
    Extension(admin): Extension<UserInfo>,
    Json(payload): Json<model::CreateExternalVideoRequest>,
) -> impl IntoResponse {
    if payload.url.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "url is required").into_response();
    }

    match db::create_external_video(
        &pool,
        payload.url,
        payload.title,
        payload.category,
        payload.description,
    ) {
        Ok(record) => {
            tracing::info!(
                "External video record {} created by {}",
                record.id,
                admin.email
            );
            (StatusCode::CREATED, Json(model::Content::from(record))).into_response()
        }
        Err(err) => {
            tracing::error!("Error creating external video record: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
        }
    }
}

async fn update_content(
    Extension(pool): Extension<DbPool>,
    Path(content_id): Path<Uuid>,
    Json(payload): Json<model::UpdateContentRequest>,
) -> impl IntoResponse {
    match db::update_content(&pool, content_id, payload.into()) {
        Ok(Some(record)) => (StatusCode::OK, Json(model::Content::from(record))).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "content record not found").into_response(),
        Err(err) => {
            tracing::error!("Error updating content record {}: {}", content_id, err);
            (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
        }
    }
}

async fn delete_content(
    Extension(pool): Extension<DbPool>,
    Extension(admin): Extension<UserInfo>,
    Path(content_id): Path<Uuid>,
) -> impl IntoResponse {
    match db::delete_content(&pool, content_id) {
        Ok(true) => {
            tracing::info!("Content record {} deleted by {}", content_id, admin.email);
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => (StatusCode::NOT_FOUND, "content record not found").into_response(),
        Err(err) => {
            tracing::error!("Error deleting content record {}: {}", content_id, err);
            (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
        }
    }
}

/// Store an uploaded thumbnail image and persist its public URL on the record.
async fn upload_thumbnail(
    Extension(pool): Extension<DbPool>,
    Path(content_id): Path<Uuid>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    match db::get_content_by_id(&pool, content_id) {
        Ok(Some(_)) => {}
        Ok(None) => return (StatusCode::NOT_FOUND, "content record not found").into_response(),
        Err(err) => {
            tracing::error!("Error loading content record {}: {}", content_id, err);
            return (StatusCode::INTERNAL_SERVER_ERROR, err).into_response();
        }
    }

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                return (
                    StatusCode::BAD_REQUEST,
                    format!("Error reading upload: {}", err),
                )
                    .into_response();
            }
        };

        let content_type = field.content_type().map(|ct| ct.to_string());
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(err) => {
                return (
                    StatusCode::BAD_REQUEST,
                    format!("Error reading upload: {}", err),
                )
                    .into_response();
            }
        };

        let url = match thumbnail::store_thumbnail(bytes, content_type).await {
            Ok(url) => url,
            Err(err) => {
                tracing::error!("Error storing thumbnail for {}: {}", content_id, err);
                return (StatusCode::INTERNAL_SERVER_ERROR, err).into_response();
            }
        };

        return match db::set_thumbnail_url(&pool, content_id, &url) {
            Ok(Some(record)) => {
                (StatusCode::OK, Json(model::Content::from(record))).into_response()
            }
            Ok(None) => (StatusCode::NOT_FOUND, "content record not found").into_response(),
            Err(err) => {
                tracing::error!("Error persisting thumbnail URL for {}: {}", content_id, err);
                (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
            }
        };
    }

    (StatusCode::BAD_REQUEST, "no file field in upload").into_response()
}

async fn admin_list_comments(
    Extension(pool): Extension<DbPool>,
    Path(content_id): Path<Uuid>,
) -> impl IntoResponse {
    match db::comments_for_media(&pool, content_id, true) {
        Ok(records) => {
            let comments: Vec<model::CommentDetail> =
                records.into_iter().map(model::CommentDetail::from).collect();
            (StatusCode::OK, Json(comments)).into_response()
        }
        Err(err) => {
            tracing::error!("Error listing comments for {}: {}", content_id, err);
            (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
        }
    }
}

async fn approve_comment(
    Extension(pool): Extension<DbPool>,
    Path(comment_id): Path<Uuid>,
) -> impl IntoResponse {
    match db::approve_comment(&pool, comment_id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "comment not found").into_response(),
        Err(err) => {
            tracing::error!("Error approving comment {}: {}", comment_id, err);
            (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
        }
    }
}

async fn delete_comment(
    Extension(pool): Extension<DbPool>,
    Path(comment_id): Path<Uuid>,
) -> impl IntoResponse {
    match db::delete_comment(&pool, comment_id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "comment not found").into_response(),
        Err(err) => {
            tracing::error!("Error deleting comment {}: {}", comment_id, err);
            (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_level(true)
        .pretty()
        .with_max_level(filter::LevelFilter::INFO)
        .init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = db::build_pool(&database_url);

    let admin_routes = Router::new()
        .route("/admin/content/list", get(admin_list_content))
        .route("/admin/content", post(create_content))
        .route("/admin/content/external", post(create_external_video))
        .route(
            "/admin/content/{id}",
            put(update_content).delete(delete_content),
        )
        .route("/admin/content/{id}/thumbnail", post(upload_thumbnail))
        .route("/admin/content/{id}/comments", get(admin_list_comments))
        .route("/admin/comments/{id}/approve", post(approve_comment))
        .route("/admin/comments/{id}", delete(delete_comment))
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(16 * 1024 * 1024)) // thumbnail images only
                .layer(from_fn(admin_gate_middleware)),
        );

    let app = Router::new()
        .route("/content/health", get(|| async { "OK" }))
        .route("/content/list", get(list_content))
        .route("/content/videos", get(list_videos))
        .route("/content/{id}", get(get_content))
        .route(
            "/content/{id}/comments",
            get(list_comments).post(submit_comment),
        )
        .merge(admin_routes)
        .layer(Extension(pool));

    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .expect("Failed to bind TCP listener");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
