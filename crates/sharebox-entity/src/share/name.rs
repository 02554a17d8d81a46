//! Name-safety validation for shares and items.
//!
//! Both predicates are pure and must run in every backend method that takes
//! a name, before any storage I/O.

/// True iff the name is non-empty and every character is in `[A-Za-z0-9_-]`.
///
/// Separators and dot-segments are excluded by construction, so a safe
/// share name can never traverse outside the storage root.
pub fn is_share_name_safe(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// True iff the name is non-empty and does not start with `.`, protecting
/// the reserved `.metadata` record and other dotfiles.
///
/// Item names are otherwise unrestricted; separators are handled by
/// [`item_storage_path`], not rejected here.
pub fn is_item_name_safe(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.')
}

/// Lexically resolve `.` and `..` segments against a virtual root.
///
/// Item names may contain `/`; resolving them before joining under a share
/// keeps the final path inside that share no matter how many `..` segments
/// the name carries.
pub fn clamp_item_path(name: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// Resolve an item name to its relative storage path within a share.
///
/// Returns `None` when the name is unsafe, resolves to nothing, or any
/// resolved segment starts with `.` (dotfiles are reserved at every level,
/// and listings never show them).
pub fn item_storage_path(name: &str) -> Option<String> {
    if !is_item_name_safe(name) {
        return None;
    }
    let clamped = clamp_item_path(name);
    if clamped.is_empty() || clamped.split('/').any(|s| s.starts_with('.')) {
        return None;
    }
    Some(clamped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_name_accepts_safe_charset() {
        for name in ["abc", "ABC-123", "under_score", "a", "0-_"] {
            assert!(is_share_name_safe(name), "{name} should be safe");
        }
    }

    #[test]
    fn test_share_name_rejects_separators_and_dots() {
        for name in ["", "a/b", "a\\b", ".", "..", "a.b", "../etc", "a b", "é"] {
            assert!(!is_share_name_safe(name), "{name} should be rejected");
        }
    }

    #[test]
    fn test_item_name_rejects_dotfiles() {
        assert!(!is_item_name_safe(""));
        assert!(!is_item_name_safe(".metadata"));
        assert!(!is_item_name_safe(".hidden"));
        assert!(is_item_name_safe("report.pdf"));
        assert!(is_item_name_safe("nested/file.txt"));
    }

    #[test]
    fn test_clamp_resolves_traversal() {
        assert_eq!(clamp_item_path("a/../../b"), "b");
        assert_eq!(clamp_item_path("../escape"), "escape");
        assert_eq!(clamp_item_path("a/./b//c"), "a/b/c");
        assert_eq!(clamp_item_path(".."), "");
        assert_eq!(clamp_item_path("plain.txt"), "plain.txt");
    }

    #[test]
    fn test_storage_path_guards_reserved_names() {
        assert_eq!(item_storage_path("doc.pdf").as_deref(), Some("doc.pdf"));
        assert_eq!(item_storage_path("sub/doc.pdf").as_deref(), Some("sub/doc.pdf"));
        assert_eq!(item_storage_path("a/../b").as_deref(), Some("b"));
        // Resolving to a dotfile would shadow the metadata record.
        assert_eq!(item_storage_path("foo/../.metadata"), None);
        assert_eq!(item_storage_path(".."), None);
        assert_eq!(item_storage_path(".metadata"), None);
        // Dotfiles are reserved at every level, not just the top.
        assert_eq!(item_storage_path("sub/.hidden"), None);
    }
}
