//! Object key derivation

use chrono::{Datelike, NaiveDate};
use std::path::Path;

use crate::{Error, Result};

/// Build `<folder>/<year>/<month0>/<day>/<file name>` for an upload.
///
/// The month is zero-based (January is `0`). Only the final path component
/// of `original_name` is kept.
pub fn object_key(folder: Option<&str>, date: NaiveDate, original_name: &str) -> Result<String> {
    let file_name = Path::new(original_name)
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::InvalidImage(format!("no file name in {:?}", original_name)))?;

    let mut segments = Vec::with_capacity(3);
    if let Some(folder) = folder.and_then(normalize_folder) {
        segments.push(folder);
    }
    segments.push(format!("{}/{}/{}", date.year(), date.month0(), date.day()));
    segments.push(file_name.to_string());

    Ok(segments.join("/"))
}

/// Collapse a folder prefix to plain `/`-separated segments.
///
/// Empty and `.` segments are dropped and `..` cancels the segment before it.
/// A `..` with nothing left to cancel is kept. Returns `None` when nothing remains.
fn normalize_folder(folder: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in folder.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Map a request path onto an object key by dropping one leading and one trailing `/`.
pub fn key_from_request_path(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn march_7() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    #[test]
    fn test_month_is_zero_based() {
        assert_eq!(object_key(None, march_7(), "photo.png").unwrap(), "2024/2/7/photo.png");

        let jan = NaiveDate::from_ymd_opt(2023, 1, 31).unwrap();
        assert_eq!(object_key(None, jan, "a.jpg").unwrap(), "2023/0/31/a.jpg");
    }

    #[test]
    fn test_folder_prefix() {
        assert_eq!(
            object_key(Some("blog/images/"), march_7(), "photo.png").unwrap(),
            "blog/images/2024/2/7/photo.png"
        );
        assert_eq!(
            object_key(Some("/"), march_7(), "photo.png").unwrap(),
            "2024/2/7/photo.png"
        );
    }

    #[test]
    fn test_folder_is_normalized() {
        let key = |folder| object_key(Some(folder), march_7(), "p.png").unwrap();

        assert_eq!(key("./blog"), "blog/2024/2/7/p.png");
        assert_eq!(key("blog//sub"), "blog/sub/2024/2/7/p.png");
        assert_eq!(key("a/../b"), "b/2024/2/7/p.png");
        assert_eq!(key("blog/./sub/"), "blog/sub/2024/2/7/p.png");
        assert_eq!(key("a/.."), "2024/2/7/p.png");
        assert_eq!(key("../shared"), "../shared/2024/2/7/p.png");
    }

    #[test]
    fn test_only_basename_is_kept() {
        assert_eq!(
            object_key(None, march_7(), "uploads/tmp/photo.png").unwrap(),
            "2024/2/7/photo.png"
        );
        assert!(object_key(None, march_7(), "").is_err());
        assert!(object_key(None, march_7(), "..").is_err());
    }

    #[test]
    fn test_request_path_to_key() {
        assert_eq!(key_from_request_path("/2024/2/7/photo.png"), "2024/2/7/photo.png");
        assert_eq!(key_from_request_path("/2024/2/7/photo.png/"), "2024/2/7/photo.png");
        assert_eq!(key_from_request_path("2024/2/7/photo.png"), "2024/2/7/photo.png");
        assert_eq!(key_from_request_path("//double//"), "/double/");
    }
}
