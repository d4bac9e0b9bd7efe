//! Recovery of media file names mangled by the Takeout exporter.
//!
//! Takeout caps a file name (stem + extension) at 50 characters and truncates
//! the media file and its sidecar independently. When a duplicate counter is
//! involved the `(n)` token lands in different places:
//!
//! ```text
//! title:    61585423862__BBC9F10B-72CB-4825-BF07-C9D52B3FE9E6.JPG
//! sidecar:  61585423862__BBC9F10B-72CB-4825-BF07-C9D52B3FE(1).json
//! on disk:  61585423862__BBC9F10B-72CB-4825-BF07-C9D52B3FE9(1).JPG
//! ```

use std::path::{Path, PathBuf};

use crate::bundle::MediaBundle;

/// Stem plus extension length the exporter never exceeds.
pub const MAX_EXPORT_NAME_LEN: usize = 50;

/// Trailing `(n)` token of `name`, or `""`.
///
/// Only the outermost balanced group at the very end counts, so
/// `a(b)(1)` yields `(1)` and `a((1))` yields `((1))`. A name that does not
/// end in `)` or whose trailing group never opens yields an empty suffix.
pub fn duplicate_suffix(name: &str) -> &str {
    if !name.ends_with(')') {
        return "";
    }
    let mut depth = 0usize;
    for (idx, ch) in name.char_indices().rev() {
        match ch {
            ')' => depth += 1,
            '(' => {
                depth -= 1;
                if depth == 0 {
                    return &name[idx..];
                }
            }
            _ => {}
        }
    }
    ""
}

/// Sidecar file name without its `.json` extension.
fn metadata_stem(metadata_path: &Path) -> &str {
    metadata_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
}

/// Media name as the exporter would have written it next to this sidecar.
///
/// Truncates the title's stem to the export length ceiling, then appends the
/// sidecar's duplicate suffix. Returns the title unchanged when neither applies.
pub fn alternate_name(title: &str, metadata_path: &Path) -> String {
    let title_path = Path::new(title);
    let stem = title_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(title);
    let ext = title_path.extension().and_then(|s| s.to_str());
    let ext_len = ext.map_or(0, |e| e.chars().count());
    let stem_len = stem.chars().count();

    let mut name: String = if stem_len + ext_len > MAX_EXPORT_NAME_LEN {
        let drop = stem_len - MAX_EXPORT_NAME_LEN.saturating_sub(ext_len);
        stem.chars().take(stem_len - drop).collect()
    } else {
        stem.to_string()
    };
    name.push_str(duplicate_suffix(metadata_stem(metadata_path)));

    match ext {
        Some(ext) => format!("{}.{}", name, ext),
        None => name,
    }
}

/// Fallback candidate for a bundle whose expected media path is missing.
pub fn alternate_media_path(bundle: &MediaBundle) -> PathBuf {
    let dir = bundle
        .metadata_path
        .parent()
        .unwrap_or_else(|| Path::new(""));
    dir.join(alternate_name(&bundle.record.title, &bundle.metadata_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::MediaRecord;

    fn bundle(title: &str, json: &str) -> MediaBundle {
        let record = MediaRecord {
            title: title.to_string(),
            creation_time: None,
            photo_taken_time: None,
            photo_last_modified_time: None,
        };
        MediaBundle::new(record, PathBuf::from("/takeout/Photos from 2021").join(json)).unwrap()
    }

    #[test]
    fn test_suffix_absent_without_trailing_paren() {
        assert_eq!(duplicate_suffix("IMG_0001.JPG"), "");
        assert_eq!(duplicate_suffix("IMG(1)_0001"), "");
        assert_eq!(duplicate_suffix(""), "");
    }

    #[test]
    fn test_suffix_simple_counter() {
        assert_eq!(duplicate_suffix("IMG_0001(1)"), "(1)");
        assert_eq!(duplicate_suffix("IMG_0001.JPG(12)"), "(12)");
    }

    #[test]
    fn test_suffix_takes_outermost_trailing_group() {
        assert_eq!(duplicate_suffix("a((1))"), "((1))");
        assert_eq!(duplicate_suffix("a(b)(1)"), "(1)");
        assert_eq!(duplicate_suffix("a(x(2))"), "(x(2))");
    }

    #[test]
    fn test_suffix_empty_group_and_unbalanced() {
        assert_eq!(duplicate_suffix("a()"), "()");
        assert_eq!(duplicate_suffix("a1)"), "");
        assert_eq!(duplicate_suffix("a(1))"), "");
    }

    #[test]
    fn test_short_name_is_unchanged() {
        let b = bundle("a.jpg", "a.jpg.json");
        assert_eq!(alternate_media_path(&b), b.media_path);
    }

    #[test]
    fn test_short_name_gets_duplicate_suffix() {
        let b = bundle("IMG_0001.JPG", "IMG_0001.JPG(1).json");
        assert_eq!(
            alternate_media_path(&b),
            PathBuf::from("/takeout/Photos from 2021/IMG_0001(1).JPG")
        );
    }

    #[test]
    fn test_long_name_drops_exactly_the_overflow() {
        let stem = "a".repeat(47) + "12345678";
        assert_eq!(stem.len(), 55);
        let title = format!("{}.JPG", stem);

        let name = alternate_name(&title, Path::new("x.json"));
        assert_eq!(name, format!("{}.JPG", "a".repeat(47)));
    }

    #[test]
    fn test_truncated_duplicate_is_recovered() {
        let b = bundle(
            "61585423862__BBC9F10B-72CB-4825-BF07-C9D52B3FE9E6.JPG",
            "61585423862__BBC9F10B-72CB-4825-BF07-C9D52B3FE(1).json",
        );
        assert_eq!(
            alternate_media_path(&b),
            Path::new("/takeout/Photos from 2021")
                .join("61585423862__BBC9F10B-72CB-4825-BF07-C9D52B3FE9(1).JPG")
        );
    }

    #[test]
    fn test_truncated_without_duplicate() {
        let b = bundle(
            "62225750180__674A9E40-E82A-4F89-86AC-8DD52EBEBBCB.JPG",
            "62225750180__674A9E40-E82A-4F89-86AC-8DD52EBEB.json",
        );
        assert_eq!(
            alternate_media_path(&b),
            Path::new("/takeout/Photos from 2021")
                .join("62225750180__674A9E40-E82A-4F89-86AC-8DD52EBEBB.JPG")
        );
    }

    #[test]
    fn test_title_without_extension() {
        let name = alternate_name("README(2)", Path::new("README(2).json"));
        assert_eq!(name, "README(2)(2)");
        assert_eq!(alternate_name("notes", Path::new("notes.json")), "notes");
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let stem = "é".repeat(48);
        let title = format!("{}.jpg", stem);
        let name = alternate_name(&title, Path::new("x.json"));
        assert_eq!(name, format!("{}.jpg", "é".repeat(47)));
    }
}
