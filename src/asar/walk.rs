use std::collections::btree_map;

use super::path::join;
use super::structures::{Directory, Entry};

/// Depth-first, pre-order traversal of a directory tree.
///
/// Yields `(path, entry)` for every node below the starting directory; a
/// directory is yielded before its children. Links are yielded but never
/// followed, so every node is visited exactly once.
pub struct Walk<'a> {
    stack: Vec<(String, btree_map::Iter<'a, String, Entry>)>,
}

impl<'a> Walk<'a> {
    pub fn new(root: &'a Directory) -> Self {
        Self {
            stack: vec![(String::new(), root.files.iter())],
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = (String, &'a Entry);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (prefix, children) = self.stack.last_mut()?;
            match children.next() {
                Some((name, entry)) => {
                    let path = join(prefix, name);
                    if let Entry::Directory(dir) = entry {
                        self.stack.push((path.clone(), dir.files.iter()));
                    }
                    return Some((path, entry));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Every path in the tree; directories carry a trailing `/`
pub struct Paths<'a> {
    walk: Walk<'a>,
}

impl<'a> Paths<'a> {
    pub fn new(root: &'a Directory) -> Self {
        Self {
            walk: Walk::new(root),
        }
    }
}

impl Iterator for Paths<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let (path, entry) = self.walk.next()?;
        if entry.is_directory() {
            Some(path + "/")
        } else {
            Some(path)
        }
    }
}
