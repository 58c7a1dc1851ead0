use std::path::Path;

use postsignal_common::Post;
use tracing::info;

/// Write `posts` to `path` as a pretty-printed JSON array, replacing any
/// existing file.
pub fn write_posts(path: &Path, posts: &[Post]) -> std::io::Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(posts)?)?;
    info!(path = %path.display(), count = posts.len(), "Saved posts");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post(id: &str) -> Post {
        Post {
            id: id.into(),
            url: format!("https://www.linkedin.com/feed/update/urn:li:activity:{id}/"),
            author_name: "Jane Doe".into(),
            author_profile_url: "https://www.linkedin.com/in/jane-doe".into(),
            author_job_title: "Engineer".into(),
            posted_at: "2d".into(),
            content: "Hello".into(),
            reaction_count: 1200,
            comment_count: 3,
            impression_count: 0,
            collected_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn writes_json_array_with_legacy_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.json");
        write_posts(&path, &[post("1"), post("2")]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let arr = value.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0]["Post_ID"], "1");
        assert_eq!(arr[0]["Post_Reactions"], 1200);
        assert_eq!(arr[1]["Date_Collected"], "2025-03-01 12:00:00");
    }

    #[test]
    fn empty_result_is_an_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.json");
        write_posts(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_posts(&dir.path().join("nope/posts.json"), &[]).is_err());
    }
}
