//! Fixed-format naming rules for entries inside the container.
//!
//! Split packages are published as `<package>-<version>-<token>-...` and the
//! third `-` separated token of the file name is the split's identity. The
//! rule is positional: the convention is imposed by the publisher
//! and is not inferred or repaired here.

use crate::APK_EXTENSION;

/// Extract the filename from a URL.
///
/// # Example
///
/// ```
/// use xapk_schema::filename_from_url;
///
/// assert_eq!(filename_from_url("https://cdn.example/a/b/file-1-x.apk"), "file-1-x.apk");
/// assert_eq!(filename_from_url(""), "");
/// ```
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}

/// Return the split identity token of a source URL (index 2 of the final
/// path segment split on `-`), or `None` if that token is absent or empty.
pub fn split_token(source_url: &str) -> Option<&str> {
    filename_from_url(source_url)
        .split('-')
        .nth(2)
        .filter(|token| !token.is_empty())
}

/// Derive the in-archive name of a split from its source URL.
pub fn canonical_split_name(source_url: &str) -> Option<String> {
    split_token(source_url).map(|token| format!("{token}.{APK_EXTENSION}"))
}
