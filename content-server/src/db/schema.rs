
// content records: one row per uploaded file or external link
diesel::table! {
    media (id) {
        id -> Uuid,
        filename -> Nullable<Varchar>,
        url -> Varchar,
        alt_text -> Nullable<Varchar>,
        title -> Nullable<Varchar>,
        description -> Nullable<Text>,
        category -> Nullable<Varchar>,
        thumbnail_url -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

// a comment belongs to exactly one of an article or a media record
diesel::table! {
    comments (id) {
        id -> Uuid,
        article_id -> Nullable<Uuid>,
        media_id -> Nullable<Uuid>,
        name -> Varchar,
        email -> Varchar,
        content -> Text,
        approved -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(media, comments);
