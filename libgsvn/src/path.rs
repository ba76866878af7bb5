//! Path validation for editor-command arguments (§4.3 "Editor drive"):
//! rejects anything that could escape the working tree or that the wire
//! grammar's string framing would otherwise let through silently (embedded
//! NULs, `..` components, empty segments from doubled `/`, a trailing
//! `/.`, or a leading `/` since every path the editor stream carries is
//! already relative to the edit root).

use crate::error::GsvnError;

pub fn validate_path(path: &str) -> Result<(), GsvnError> {
    if path.is_empty() {
        return Err(GsvnError::Path(path.to_string(), "path is empty"));
    }
    if path.contains('\0') {
        return Err(GsvnError::Path(path.to_string(), "path contains a NUL byte"));
    }
    if path.starts_with('/') {
        return Err(GsvnError::Path(path.to_string(), "path must not be absolute"));
    }
    if path.ends_with('/') {
        return Err(GsvnError::Path(path.to_string(), "path must not have a trailing slash"));
    }
    for component in path.split('/') {
        match component {
            "" => return Err(GsvnError::Path(path.to_string(), "path contains a doubled `/`")),
            "." => return Err(GsvnError::Path(path.to_string(), "path contains a `.` component")),
            ".." => return Err(GsvnError::Path(path.to_string(), "path contains a `..` component")),
            _ => {}
        }
    }
    Ok(())
}

/// joins an svn server path (`/trunk`, `/branches/x`) with a relative
/// component, normalising the doubled-slash that a bare `""` path
/// (repository root) would otherwise introduce
pub fn join_svn_path(base: &str, component: &str) -> String {
    if base.is_empty() || base == "/" {
        format!("/{}", component)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_relative_paths() {
        assert!(validate_path("trunk/src/main.rs").is_ok());
        assert!(validate_path("a").is_ok());
    }

    #[test]
    fn rejects_nul_byte() {
        assert!(validate_path("trunk/\0evil").is_err());
    }

    #[test]
    fn rejects_dotdot_component() {
        assert!(validate_path("trunk/../etc/passwd").is_err());
    }

    #[test]
    fn rejects_leading_slash() {
        assert!(validate_path("/trunk").is_err());
    }

    #[test]
    fn rejects_doubled_slash() {
        assert!(validate_path("trunk//src").is_err());
    }

    #[test]
    fn rejects_trailing_slash() {
        assert!(validate_path("trunk/").is_err());
    }

    #[test]
    fn rejects_trailing_dot_component() {
        assert!(validate_path("trunk/.").is_err());
    }

    #[test]
    fn join_handles_repository_root() {
        assert_eq!(join_svn_path("", "trunk"), "/trunk");
        assert_eq!(join_svn_path("/", "trunk"), "/trunk");
        assert_eq!(join_svn_path("/trunk", "src"), "/trunk/src");
    }
}
