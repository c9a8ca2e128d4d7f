use crate::db::ContentRecord;

/// File suffixes that mark a record as a locally uploaded video.
pub const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "avi", "mov", "wmv", "flv", "webm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    UploadedVideo,
    ExternalVideo,
    NotVideo,
}

impl ContentKind {
    pub fn as_str(&self) -> &str {
        match self {
            ContentKind::UploadedVideo => "uploaded",
            ContentKind::ExternalVideo => "external",
            ContentKind::NotVideo => "not_video",
        }
    }

    pub fn is_video(&self) -> bool {
        !matches!(self, ContentKind::NotVideo)
    }
}

/// Decides what a content record represents.
///
/// A missing filename and an empty-string filename are equivalent: older rows
/// were written with "" standing in for NULL, and both forms must classify the
/// same way forever after.
///
/// # Arguments
/// * `filename` - The stored filename, if any
/// * `url` - The stored locator; empty counts as absent
///
/// Returns exactly one `ContentKind` for every input combination.
pub fn classify(filename: Option<&str>, url: &str) -> ContentKind {
    match filename {
        Some(name) if !name.is_empty() => {
            if has_video_extension(name) {
                ContentKind::UploadedVideo
            } else {
                ContentKind::NotVideo
            }
        }
        _ => {
            if url.is_empty() {
                ContentKind::NotVideo
            } else {
                ContentKind::ExternalVideo
            }
        }
    }
}

pub fn classify_record(record: &ContentRecord) -> ContentKind {
    classify(record.filename.as_deref(), &record.url)
}

/// The one video filter.
///
/// Both the public listing and the management listing select videos through
/// this function, so the two views cannot drift apart.
pub fn video_records(records: Vec<ContentRecord>) -> Vec<ContentRecord> {
    records
        .into_iter()
        .filter(|record| classify_record(record).is_video())
        .collect()
}

fn has_video_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, extension)) => VIDEO_EXTENSIONS
            .iter()
            .any(|candidate| extension.eq_ignore_ascii_case(candidate)),
        None => false,
    }
}
