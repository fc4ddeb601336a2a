//! Virtual path resolution.
//!
//! Paths are `/`-separated and matched segment by segment against the
//! directory tree, exactly and case-sensitively. The empty path names the
//! root directory. Empty segments (from leading, trailing or doubled `/`)
//! never match anything, and `.`/`..` are ordinary names.

use std::collections::VecDeque;

use crate::error::{Error, Result};

use super::structures::Entry;

/// Maximum number of links followed while resolving one path
pub const MAX_LINK_HOPS: usize = 32;

/// Resolved entry together with its link-free path
#[derive(Debug, Clone)]
pub struct Canonical<'a> {
    pub entry: &'a Entry,
    pub path: String,
}

/// Split a virtual path into segments. The empty path has no segments.
pub fn segments(path: &str) -> std::str::Split<'_, char> {
    let mut split = path.split('/');
    if path.is_empty() {
        split.next();
    }
    split
}

/// Join a parent path and a child name
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Walk `root` along `path`.
///
/// Links on intermediate segments are always followed. A link on the final
/// segment is followed only when `follow_last` is set; otherwise the link
/// entry itself is returned.
pub fn resolve<'a>(root: &'a Entry, path: &str, follow_last: bool) -> Result<Canonical<'a>> {
    let mut pending: VecDeque<String> = segments(path).map(str::to_string).collect();
    let mut current = root;
    let mut walked: Vec<String> = Vec::new();
    let mut hops = 0;

    while let Some(segment) = pending.pop_front() {
        let dir = match current {
            Entry::Directory(dir) => dir,
            _ => return Err(Error::NotFound(path.to_string())),
        };

        let child = dir
            .get(&segment)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;

        if let Entry::Link(link) = child {
            if follow_last || !pending.is_empty() {
                hops += 1;
                if hops > MAX_LINK_HOPS {
                    return Err(Error::LinkLoop(path.to_string()));
                }

                // Link targets are relative to the archive root
                for target in segments(&link.link).rev() {
                    pending.push_front(target.to_string());
                }
                current = root;
                walked.clear();
                continue;
            }
        }

        walked.push(segment);
        current = child;
    }

    Ok(Canonical {
        entry: current,
        path: walked.join("/"),
    })
}
