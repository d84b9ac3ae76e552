//! Path flattening and directory emulation.
//!
//! An entry's identity is a single string such as `docs/note.txt`. Directories
//! are entries with the directory flag set; containment is a prefix relation
//! on identities, never a stored tree.

use alloc::string::String;

use crate::config::*;
use crate::{Error, Result};

/// Flattens `name` against the current directory `cwd` into the identity
/// stored in the file table.
///
/// - `/a/b` is absolute and resolves to `a/b`.
/// - At root, relative names are kept unchanged.
/// - Elsewhere the result is `cwd/name`.
///
/// The identity is truncated to `MAX_NAME_LEN` bytes.
pub fn resolve(name: &str, cwd: &str) -> Result<String> {
    if name.is_empty() || name.contains('\0') {
        return Err(Error::InvalidName);
    }

    let mut identity = String::new();
    if let Some(absolute) = name.strip_prefix(SEPARATOR) {
        identity.push_str(absolute);
    } else if cwd == ROOT_DIR {
        identity.push_str(name);
    } else {
        identity.push_str(cwd);
        if !identity.ends_with(SEPARATOR) {
            identity.push(SEPARATOR);
        }
        identity.push_str(name);
    }

    truncate(&mut identity, MAX_NAME_LEN);
    if identity.is_empty() {
        return Err(Error::InvalidName);
    }
    Ok(identity)
}

/// Cuts `s` to at most `max` bytes without splitting a character.
fn truncate(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

/// Last component of an identity.
pub fn leaf(identity: &str) -> &str {
    identity.rsplit(SEPARATOR).next().unwrap_or(identity)
}

/// Identity of the directory holding `identity`; `/` for top-level entries.
pub fn parent(identity: &str) -> &str {
    match identity.trim_end_matches(SEPARATOR).rsplit_once(SEPARATOR) {
        Some((dir, _)) if !dir.is_empty() => dir,
        _ => ROOT_DIR,
    }
}

/// Name to display for `identity` when listing `cwd`, or `None` if the entry
/// is not shown there.
///
/// At root only identities without a separator are shown. In a subdirectory
/// every identity under the `cwd/` prefix is shown with that prefix stripped,
/// so `docs/sub/x.txt` lists as `sub/x.txt` inside `docs`.
pub fn child_name<'a>(identity: &'a str, cwd: &str) -> Option<&'a str> {
    if cwd == ROOT_DIR {
        return (!identity.is_empty() && !identity.contains(SEPARATOR)).then_some(identity);
    }
    strip_dir(identity, cwd).filter(|rest| !rest.is_empty())
}

/// Whether `identity` sits anywhere below directory `dir`.
pub fn is_within(identity: &str, dir: &str) -> bool {
    strip_dir(identity, dir).is_some_and(|rest| !rest.is_empty())
}

fn strip_dir<'a>(identity: &'a str, dir: &str) -> Option<&'a str> {
    let rest = identity.strip_prefix(dir)?;
    if dir.ends_with(SEPARATOR) {
        Some(rest)
    } else {
        rest.strip_prefix(SEPARATOR)
    }
}
