//! Name hierarchies with aggregated id sets.
//!
//! A [`Tree`] is built once from `(path, id)` pairs and then read only.
//! Each node knows the ids attached to it and, lazily, the union of
//! those with all of its descendants' ids.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use crate::entity::{Entity, EntityKind};
use crate::import::MemoryStore;

/// A named node.
#[derive(Debug, Default)]
pub struct Node {
    name: String,
    own_ids: Vec<u64>,
    children: Vec<Node>,
    by_name: HashMap<String, usize>,
    ids: OnceLock<BTreeSet<u64>>,
}

impl Node {
    fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Default::default() }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ids attached directly to this node, in insertion order.
    #[inline]
    pub fn own_ids(&self) -> &[u64] {
        &self.own_ids
    }

    /// Children in first-seen order.
    #[inline]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Direct child called `name`.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.by_name.get(name).map(|&i| &self.children[i])
    }

    /// Descendant at `path` (relative to this node).
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&Node> {
        path.iter().try_fold(self, |node, name| node.child(name.as_ref()))
    }

    /// Own ids plus every descendant's, computed on first call.
    pub fn ids(&self) -> &BTreeSet<u64> {
        self.ids.get_or_init(|| {
            let mut ids: BTreeSet<u64> = self.own_ids.iter().copied().collect();
            for child in &self.children {
                ids.extend(child.ids());
            }
            ids
        })
    }

    fn child_mut(&mut self, name: &str) -> (&mut Node, bool) {
        let (index, created) = match self.by_name.get(name) {
            Some(&i) => (i, false),
            None => {
                self.children.push(Node::new(name));
                let i = self.children.len() - 1;
                self.by_name.insert(name.to_string(), i);
                (i, true)
            }
        };
        (&mut self.children[index], created)
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}

/// An immutable hierarchy under an unnamed root.
#[derive(Debug, Default)]
pub struct Tree {
    root: Node,
    len: usize,
}

impl Tree {
    /// Build from `(path, id)` pairs. Nodes are shared by name at each
    /// level; the id (if any) attaches to the last node of its path. An
    /// empty path attaches the id to the root.
    pub fn build<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = (P, Option<u64>)>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let mut root = Node::default();
        let mut created = 0;
        for (path, id) in paths {
            let mut node = &mut root;
            for name in path {
                let (child, new) = node.child_mut(name.as_ref());
                created += usize::from(new);
                node = child;
            }
            if let Some(id) = id {
                node.own_ids.push(id);
            }
        }
        debug_assert_eq!(created + 1, root.count());
        Self { root, len: created + 1 }
    }

    /// Category -> family -> element-row hierarchy of an import.
    ///
    /// Ids are element row indices. Elements without a named category are
    /// left out; elements without a named family hang off their category.
    pub fn by_category(store: &MemoryStore) -> Self {
        let paths = store
            .records(EntityKind::Element)
            .iter()
            .enumerate()
            .filter_map(|(row, entity)| {
                let Entity::Element(element) = entity else {
                    return None;
                };
                let category = name_of(store, EntityKind::Category, element.category)?;
                let mut path = vec![category];
                path.extend(name_of(store, EntityKind::Family, element.family));
                Some((path, Some(row as u64)))
            });
        Self::build(paths)
    }

    #[inline]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Number of nodes, root included.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the tree holds only the root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 1
    }

    /// Node at `path` from the root.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&Node> {
        self.root.find(path)
    }
}

fn name_of(store: &MemoryStore, kind: EntityKind, row: Option<usize>) -> Option<&str> {
    match store.records(kind).get(row?)? {
        Entity::Category(c) => c.name.as_deref(),
        Entity::Family(f) => f.name.as_deref(),
        _ => None,
    }
}
