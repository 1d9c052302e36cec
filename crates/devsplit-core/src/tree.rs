use std::cmp::Ordering;

use ahash::AHashMap;
use serde::Serialize;

use crate::path;

pub type NodeId = usize;

/// A folder in the hierarchy. Children are arena indices.
#[derive(Debug, Clone, Serialize)]
pub struct FolderNode {
    /// Decoded last segment, for display only.
    pub name: String,
    /// Canonical raw path, used as the key everywhere.
    pub path: String,
    pub children: Vec<NodeId>,
    /// Points at or beneath this folder.
    pub point_count: usize,
}

/// Folder hierarchy built from flat point paths.
///
/// Arena of nodes indexed by canonical path. Built once per upload and never
/// patched; new data means a new tree.
#[derive(Debug, Clone)]
pub struct FolderTree {
    root_label: String,
    nodes: Vec<FolderNode>,
    index: AHashMap<String, NodeId>,
}

impl FolderTree {
    pub const ROOT: NodeId = 0;

    pub fn empty(root_label: &str) -> Self {
        let root = FolderNode {
            name: root_label.to_string(),
            path: root_label.to_string(),
            children: Vec::new(),
            point_count: 0,
        };
        let mut index = AHashMap::new();
        index.insert(root_label.to_string(), Self::ROOT);
        Self {
            root_label: root_label.to_string(),
            nodes: vec![root],
            index,
        }
    }

    /// Build the folder hierarchy. The leaf segment of each path is the point
    /// itself and contributes no folder.
    pub fn build<'a, I>(point_paths: I, root_label: &str) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut tree = Self::empty(root_label);

        for raw in point_paths {
            let segs = path::folder_segments(raw, root_label);
            let Some((_leaf, folders)) = segs.split_last() else {
                continue;
            };

            tree.nodes[Self::ROOT].point_count += 1;
            let mut parent = Self::ROOT;
            let mut current = root_label.to_string();

            for segment in folders {
                current.push('/');
                current.push_str(segment);

                let id = match tree.index.get(&current) {
                    Some(&id) => id,
                    None => tree.insert_child(parent, segment, &current),
                };
                tree.nodes[id].point_count += 1;
                parent = id;
            }
        }

        tree.sort_children();
        tree
    }

    fn insert_child(&mut self, parent: NodeId, segment: &str, full_path: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(FolderNode {
            name: path::decode_segment(segment),
            path: full_path.to_string(),
            children: Vec::new(),
            point_count: 0,
        });
        self.index.insert(full_path.to_string(), id);
        self.nodes[parent].children.push(id);
        id
    }

    fn sort_children(&mut self) {
        for id in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[id].children);
            children.sort_by(|&a, &b| compare_names(&self.nodes[a].name, &self.nodes[b].name));
            self.nodes[id].children = children;
        }
    }

    pub fn root_label(&self) -> &str {
        &self.root_label
    }

    pub fn root(&self) -> &FolderNode {
        &self.nodes[Self::ROOT]
    }

    pub fn node(&self, id: NodeId) -> Option<&FolderNode> {
        self.nodes.get(id)
    }

    /// Look up a folder by any spelling of its path.
    pub fn get(&self, raw_path: &str) -> Option<&FolderNode> {
        let key = path::canonical_path(raw_path, &self.root_label);
        self.index.get(&key).map(|&id| &self.nodes[id])
    }

    pub fn contains(&self, raw_path: &str) -> bool {
        self.get(raw_path).is_some()
    }

    pub fn children<'a>(&'a self, node: &'a FolderNode) -> impl Iterator<Item = &'a FolderNode> + 'a {
        node.children.iter().map(move |&id| &self.nodes[id])
    }

    /// Number of folders, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Pre-order traversal with depth (root at 0), children in display order.
    pub fn walk(&self) -> Vec<(usize, &FolderNode)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(0usize, Self::ROOT)];
        while let Some((depth, id)) = stack.pop() {
            let node = &self.nodes[id];
            out.push((depth, node));
            for &child in node.children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        out
    }
}

/// Locale-like ordering: case-insensitive first, lowercase before uppercase
/// on ties.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}
