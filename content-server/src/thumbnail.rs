use std::env;

use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use uuid::Uuid;

/// Stores a thumbnail image in the public bucket and returns its URL.
///
/// Thumbnails are small, so a single put is enough; the object key is a fresh
/// UUID with an extension derived from the uploaded content type.
pub async fn store_thumbnail(
    bytes: Vec<u8>,
    content_type: Option<String>,
) -> Result<String, String> {
    let bucket =
        env::var("THUMBNAIL_BUCKET").map_err(|_| "THUMBNAIL_BUCKET not set".to_string())?;
    let public_base = env::var("THUMBNAIL_PUBLIC_BASE_URL")
        .map_err(|_| "THUMBNAIL_PUBLIC_BASE_URL not set".to_string())?;

    let config = aws_config::load_from_env().await;
    let client = s3::Client::new(&config);

    let client = if let Ok(var) = env::var("USE_PATH_STYLE_BUCKETS") {
        if var.to_lowercase() == "true" {
            tracing::info!("Using path-style buckets");
            let config_builder = client.config().clone().to_builder();
            s3::Client::from_conf(config_builder.force_path_style(true).build())
        } else {
            client
        }
    } else {
        client
    };

    let object_name = format!(
        "{}{}",
        Uuid::new_v4(),
        extension_for(content_type.as_deref())
    );
    tracing::info!("Uploading thumbnail with object name: {}", object_name);

    client
        .put_object()
        .bucket(&bucket)
        .key(&object_name)
        .content_type(content_type.unwrap_or_else(|| "application/octet-stream".to_string()))
        .body(ByteStream::from(bytes))
        .send()
        .await
        .map_err(|err| format!("Error uploading thumbnail: {}", err))?;

    Ok(format!(
        "{}/{}",
        public_base.trim_end_matches('/'),
        object_name
    ))
}

fn extension_for(content_type: Option<&str>) -> &'static str {
    match content_type {
        Some("image/jpeg") => ".jpg",
        Some("image/png") => ".png",
        Some("image/webp") => ".webp",
        Some("image/gif") => ".gif",
        _ => "",
    }
}
