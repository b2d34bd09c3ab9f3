//! Path helpers. Canonical paths start with `/`, never end with `/`
//! (except the root) and contain no empty segments.

pub const ROOT: &str = "/";

/// Normalize a user-supplied path: `Geometry//2D Flow Areas/` becomes
/// `/Geometry/2D Flow Areas`.
pub fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        ROOT.to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

pub fn join(parent: &str, name: &str) -> String {
    if parent == ROOT {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Parent of a canonical path; `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(i) => Some(&path[..i]),
        None => Some(ROOT),
    }
}

/// Last segment of a canonical path (`""` for the root).
pub fn leaf(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_variants() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("Geometry"), "/Geometry");
        assert_eq!(
            normalize("Geometry//2D Flow Areas/"),
            "/Geometry/2D Flow Areas"
        );
    }

    #[test]
    fn parent_and_leaf() {
        assert_eq!(parent("/"), None);
        assert_eq!(parent("/Geometry"), Some("/"));
        assert_eq!(parent("/Geometry/2D Flow Areas"), Some("/Geometry"));
        assert_eq!(leaf("/Geometry/2D Flow Areas"), "2D Flow Areas");
        assert_eq!(leaf("/"), "");
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b"), "/a/b");
    }
}
