//! Authors-file parsing (§6): `<user> = Full Name <email>` lines, `#`
//! comments, blank lines ignored, an optional `user:password` form on the
//! left supplying a stored credential. Grounded on `remote-svn.c`'s
//! `parse_authors`/`svn_to_ident`, reproduced without the hand-rolled
//! `strcspn` scanning — line-oriented parsing is all the format needs.

use crate::error::{GsvnError, GsvnResult};
use crate::model::Credential;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorEntry {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AuthorsFile {
    by_username: HashMap<String, AuthorEntry>,
}

impl AuthorsFile {
    pub fn parse(contents: &str) -> GsvnResult<Self> {
        let mut by_username = HashMap::new();
        for (lineno, raw_line) in contents.lines().enumerate() {
            let line = match raw_line.split_once('#') {
                Some((before, _)) => before,
                None => raw_line,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (user_part, ident_part) = line.split_once('=').ok_or_else(|| {
                GsvnError::protocol(format!("authors file line {}: missing `=`", lineno + 1))
            })?;
            let user_part = user_part.trim();
            let (username, password) = match user_part.split_once(':') {
                Some((u, p)) => (u.trim(), Some(p.trim().to_string())),
                None => (user_part, None),
            };
            let ident_part = ident_part.trim();
            let (name, email) = parse_ident(ident_part).ok_or_else(|| {
                GsvnError::protocol(format!(
                    "authors file line {}: expected `Full Name <email>`",
                    lineno + 1
                ))
            })?;
            by_username.insert(username.to_string(), AuthorEntry { name, email, password });
        }
        Ok(Self { by_username })
    }

    pub fn get(&self, username: &str) -> Option<&AuthorEntry> {
        self.by_username.get(username)
    }

    /// resolves a svn username to a git identity string (`Name <email>`);
    /// falls back to `username@<uuid>` when no authors file entry exists,
    /// mirroring `svn_to_ident`'s synthesized identity for the common
    /// no-authors-file case rather than failing the whole sync
    pub fn to_ident(&self, username: &str, uuid: &str) -> String {
        match self.by_username.get(username) {
            Some(entry) => format!("{} <{}>", entry.name, entry.email),
            None => format!("{} <{}@{}>", username, username, uuid),
        }
    }

    pub fn credential_for(&self, username: &str) -> Option<Credential> {
        self.by_username.get(username).map(|entry| Credential {
            username: Some(username.to_string()),
            password: entry.password.clone(),
        })
    }
}

/// parses `Full Name <email>`, trimming surrounding whitespace from both
fn parse_ident(s: &str) -> Option<(String, String)> {
    let open = s.find('<')?;
    let close = s.rfind('>')?;
    if close < open {
        return None;
    }
    let name = s[..open].trim().to_string();
    let email = s[open + 1..close].trim().to_string();
    if name.is_empty() || email.is_empty() {
        return None;
    }
    Some((name, email))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_entries() {
        let file = AuthorsFile::parse(
            "# comment\n\nalice = Alice Example <alice@example.com>\nbob=Bob B<bob@example.com>\n",
        )
        .unwrap();
        assert_eq!(file.get("alice").unwrap().name, "Alice Example");
        assert_eq!(file.get("alice").unwrap().email, "alice@example.com");
        assert_eq!(file.get("bob").unwrap().name, "Bob B");
    }

    #[test]
    fn parses_user_password_form() {
        let file = AuthorsFile::parse("alice:s3cret = Alice Example <alice@example.com>\n").unwrap();
        let cred = file.credential_for("alice").unwrap();
        assert_eq!(cred.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn to_ident_falls_back_when_username_unknown() {
        let file = AuthorsFile::default();
        assert_eq!(file.to_ident("carol", "repo-uuid"), "carol <carol@repo-uuid>");
    }

    #[test]
    fn rejects_line_missing_equals() {
        assert!(AuthorsFile::parse("not a valid line").is_err());
    }

    #[test]
    fn ignores_trailing_comment_after_entry() {
        let file = AuthorsFile::parse("alice = Alice <a@example.com> # trusted\n").unwrap();
        assert_eq!(file.get("alice").unwrap().email, "a@example.com");
    }
}
