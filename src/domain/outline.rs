use generational_arena::{Arena, Index};
use serde_json::Value;
use std::fmt;
use std::io::{self, Write};
use tracing::instrument;

use crate::domain::document::EntryDocument;
use crate::domain::error::{DomainError, DomainResult};

/// Handle to an entry stored in an [`Outline`].
///
/// Non-owning: the outline owns every node, handles only point at them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(Index);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "#{}.{}", slot, generation)
    }
}

/// Tree node in the arena-based outline.
#[derive(Debug, Clone)]
pub struct EntryNode {
    /// Display label, also the file stem on save
    pub title: String,
    /// Containing entry, None for roots
    parent: Option<EntryId>,
    /// Owned children in insertion order
    children: Vec<EntryId>,
}

impl EntryNode {
    pub fn parent(&self) -> Option<EntryId> {
        self.parent
    }

    pub fn children(&self) -> &[EntryId] {
        &self.children
    }
}

/// Arena holding any number of entry trees.
///
/// Parent links are maintained by [`Outline::attach_child`] and never
/// serialized; they are rebuilt when a tree is decoded.
#[derive(Debug, Default, Clone)]
pub struct Outline {
    arena: Arena<EntryNode>,
}

impl Outline {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.arena.contains(id.0)
    }

    /// Create a detached entry without children.
    pub fn create_entry(&mut self, title: impl AsRef<str>) -> EntryId {
        EntryId(self.arena.insert(EntryNode {
            title: title.as_ref().to_string(),
            parent: None,
            children: Vec::new(),
        }))
    }

    /// Create an entry and attach `children` to it in order.
    ///
    /// A child that already has a parent is moved under the new entry.
    pub fn create_entry_with_children(
        &mut self,
        title: impl AsRef<str>,
        children: impl IntoIterator<Item = EntryId>,
    ) -> DomainResult<EntryId> {
        let children: Vec<EntryId> = children.into_iter().collect();
        if let Some(missing) = children.iter().find(|&&c| !self.contains(c)) {
            return Err(DomainError::UnknownEntry(missing.to_string()));
        }

        let id = self.create_entry(title);
        for child in children {
            self.attach_child(id, child)?;
        }
        Ok(id)
    }

    pub fn get(&self, id: EntryId) -> Option<&EntryNode> {
        self.arena.get(id.0)
    }

    fn node(&self, id: EntryId) -> DomainResult<&EntryNode> {
        self.get(id)
            .ok_or_else(|| DomainError::UnknownEntry(id.to_string()))
    }

    fn node_mut(&mut self, id: EntryId) -> DomainResult<&mut EntryNode> {
        self.arena
            .get_mut(id.0)
            .ok_or_else(|| DomainError::UnknownEntry(id.to_string()))
    }

    /// Borrowed view of one entry.
    pub fn entry(&self, id: EntryId) -> DomainResult<EntryRef<'_>> {
        let node = self.node(id)?;
        Ok(EntryRef {
            outline: self,
            id,
            node,
        })
    }

    /// Append `child` to `parent`'s children and point it back at `parent`.
    ///
    /// If `child` was attached elsewhere it is removed from the old parent's
    /// children first, so every entry keeps exactly one position in the tree.
    /// Attaching an entry below itself fails with `CycleDetected`.
    #[instrument(level = "trace", skip(self))]
    pub fn attach_child(&mut self, parent: EntryId, child: EntryId) -> DomainResult<()> {
        self.node(parent)?;
        let previous = self.node(child)?.parent;

        if self.is_ancestor_or_self(child, parent) {
            return Err(DomainError::CycleDetected(format!(
                "'{}' cannot be attached below itself",
                self.node(child)?.title
            )));
        }

        if let Some(old_parent) = previous {
            self.node_mut(old_parent)?.children.retain(|&c| c != child);
        }
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// True when `ancestor` is `id` or lies on `id`'s parent chain.
    pub fn is_ancestor_or_self(&self, ancestor: EntryId, id: EntryId) -> bool {
        let mut current = Some(id);
        while let Some(idx) = current {
            if idx == ancestor {
                return true;
            }
            current = self.get(idx).and_then(|n| n.parent);
        }
        false
    }

    /// Entries without a parent, in arena slot order.
    pub fn roots(&self) -> Vec<EntryId> {
        self.arena
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(idx, _)| EntryId(idx))
            .collect()
    }

    /// Pre-order iterator starting at `id`.
    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self, id: EntryId) -> PreOrderIterator<'_> {
        PreOrderIterator::new(self, id)
    }

    /// Number of levels below and including `id`.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self, id: EntryId) -> usize {
        if let Some(node) = self.get(id) {
            1 + node
                .children
                .iter()
                .map(|&child| self.depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Titles of all leaf entries below `id`, left to right.
    #[instrument(level = "debug", skip(self))]
    pub fn leaf_titles(&self, id: EntryId) -> Vec<String> {
        self.iter(id)
            .filter(|(_, node)| node.children.is_empty())
            .map(|(_, node)| node.title.clone())
            .collect()
    }

    /// Typed serialized form of the tree rooted at `id`.
    pub fn to_document(&self, id: EntryId) -> DomainResult<EntryDocument> {
        let node = self.node(id)?;
        let entries = node
            .children
            .iter()
            .map(|&child| self.to_document(child))
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(EntryDocument {
            title: node.title.clone(),
            entries,
        })
    }

    /// Ordered `{ "title": .., "entries": [..] }` mapping of the tree at `id`.
    pub fn to_json(&self, id: EntryId) -> DomainResult<Value> {
        Ok(self.to_document(id)?.to_value())
    }

    /// Insert a decoded tree and return its new root.
    pub fn from_document(&mut self, document: &EntryDocument) -> EntryId {
        let id = self.create_entry(&document.title);
        for child_doc in &document.entries {
            let child = self.from_document(child_doc);
            // Both nodes are fresh, so no reparenting or cycle is possible.
            self.arena[child.0].parent = Some(id);
            self.arena[id.0].children.push(child);
        }
        id
    }

    /// Decode a JSON object and insert it as a new root.
    pub fn from_json(&mut self, value: &Value) -> DomainResult<EntryId> {
        let document = EntryDocument::from_value(value)?;
        Ok(self.from_document(&document))
    }
}

/// Borrowed view of one entry; displays as its title.
#[derive(Debug, Clone, Copy)]
pub struct EntryRef<'a> {
    outline: &'a Outline,
    id: EntryId,
    node: &'a EntryNode,
}

impl<'a> EntryRef<'a> {
    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn title(&self) -> &'a str {
        &self.node.title
    }

    pub fn is_root(&self) -> bool {
        self.node.parent.is_none()
    }

    pub fn parent(&self) -> Option<EntryRef<'a>> {
        self.node
            .parent
            .and_then(|p| self.outline.entry(p).ok())
    }

    pub fn children(&self) -> impl Iterator<Item = EntryRef<'a>> + 'a {
        let outline = self.outline;
        let node = self.node;
        node.children
            .iter()
            .filter_map(move |&c| outline.entry(c).ok())
    }

    pub fn child_count(&self) -> usize {
        self.node.children.len()
    }

    /// Titles of this entry and all descendants in pre-order.
    pub fn titles_preorder(&self) -> Vec<&'a str> {
        self.outline
            .iter(self.id)
            .map(|(_, node)| node.title.as_str())
            .collect()
    }

    /// Write one line per entry, pre-order, prefixed by `indent` repeated
    /// once per level starting at `depth`.
    pub fn print_tree<W: Write>(&self, depth: usize, out: &mut W, indent: &str) -> io::Result<()> {
        writeln!(out, "{}{}", indent.repeat(depth), self)?;
        for child in self.children() {
            child.print_tree(depth + 1, out, indent)?;
        }
        Ok(())
    }
}

impl fmt::Display for EntryRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.node.title)
    }
}

pub struct PreOrderIterator<'a> {
    outline: &'a Outline,
    stack: Vec<EntryId>,
}

impl<'a> PreOrderIterator<'a> {
    fn new(outline: &'a Outline, start: EntryId) -> Self {
        let mut stack = Vec::new();
        if outline.contains(start) {
            stack.push(start);
        }
        Self { outline, stack }
    }
}

impl<'a> Iterator for PreOrderIterator<'a> {
    type Item = (EntryId, &'a EntryNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.outline.get(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    //      Root
    //      /   \
    // Entry 1  Entry 2
    //    |
    // Subentry 1
    fn sample(outline: &mut Outline) -> EntryId {
        let sub = outline.create_entry("Subentry 1");
        let entry1 = outline.create_entry_with_children("Entry 1", [sub]).unwrap();
        let entry2 = outline.create_entry("Entry 2");
        outline
            .create_entry_with_children("Root", [entry1, entry2])
            .unwrap()
    }

    #[test]
    fn given_children_when_constructing_then_parents_point_back() {
        let mut outline = Outline::new();
        let a = outline.create_entry("a");
        let b = outline.create_entry("b");
        let root = outline.create_entry_with_children("root", [a, b]).unwrap();

        assert_eq!(outline.get(a).unwrap().parent(), Some(root));
        assert_eq!(outline.get(b).unwrap().parent(), Some(root));
        assert_eq!(outline.get(root).unwrap().children(), &[a, b]);
        assert_eq!(outline.get(root).unwrap().parent(), None);
    }

    #[test]
    fn given_entry_when_attaching_then_child_is_last_and_parent_set() {
        let mut outline = Outline::new();
        let root = sample(&mut outline);
        let extra = outline.create_entry("Entry 3");

        outline.attach_child(root, extra).unwrap();

        let node = outline.get(root).unwrap();
        assert_eq!(node.children().last(), Some(&extra));
        assert_eq!(outline.get(extra).unwrap().parent(), Some(root));
    }

    #[test]
    fn given_attached_entry_when_reattaching_then_moves_out_of_old_parent() {
        let mut outline = Outline::new();
        let old_parent = outline.create_entry("old");
        let new_parent = outline.create_entry("new");
        let child = outline.create_entry("child");
        outline.attach_child(old_parent, child).unwrap();

        outline.attach_child(new_parent, child).unwrap();

        assert!(outline.get(old_parent).unwrap().children().is_empty());
        assert_eq!(outline.get(new_parent).unwrap().children(), &[child]);
        assert_eq!(outline.get(child).unwrap().parent(), Some(new_parent));
    }

    #[test]
    fn given_same_parent_when_reattaching_then_moves_to_end() {
        let mut outline = Outline::new();
        let a = outline.create_entry("a");
        let b = outline.create_entry("b");
        let root = outline.create_entry_with_children("root", [a, b]).unwrap();

        outline.attach_child(root, a).unwrap();

        assert_eq!(outline.get(root).unwrap().children(), &[b, a]);
    }

    #[test]
    fn given_ancestor_when_attaching_below_descendant_then_cycle_detected() {
        let mut outline = Outline::new();
        let root = sample(&mut outline);
        let sub = outline
            .iter(root)
            .find(|(_, n)| n.title == "Subentry 1")
            .map(|(id, _)| id)
            .unwrap();

        let err = outline.attach_child(sub, root).unwrap_err();
        assert!(matches!(err, DomainError::CycleDetected(_)));

        let err = outline.attach_child(root, root).unwrap_err();
        assert!(matches!(err, DomainError::CycleDetected(_)));
        // Structure is untouched
        assert_eq!(
            outline.entry(root).unwrap().titles_preorder(),
            vec!["Root", "Entry 1", "Subentry 1", "Entry 2"]
        );
    }

    #[test]
    fn given_unknown_child_when_constructing_then_errors_without_inserting() {
        let mut outline = Outline::new();
        let mut other = Outline::new();
        let foreign = other.create_entry("x");
        let _ = other.create_entry("y");
        let also_foreign = other.create_entry("z");

        let result = outline.create_entry_with_children("root", [foreign, also_foreign]);

        assert!(matches!(result, Err(DomainError::UnknownEntry(_))));
        assert!(outline.is_empty());
    }

    #[test]
    fn given_tree_when_to_json_then_ordered_mapping() {
        let mut outline = Outline::new();
        let root = sample(&mut outline);

        let value = outline.to_json(root).unwrap();

        assert_eq!(
            value,
            json!({
                "title": "Root",
                "entries": [
                    {"title": "Entry 1", "entries": [{"title": "Subentry 1", "entries": []}]},
                    {"title": "Entry 2", "entries": []}
                ]
            })
        );
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["title", "entries"]);
    }

    #[test]
    fn given_unmodified_tree_when_to_json_twice_then_identical() {
        let mut outline = Outline::new();
        let root = sample(&mut outline);
        assert_eq!(outline.to_json(root).unwrap(), outline.to_json(root).unwrap());
    }

    #[test]
    fn given_tree_when_round_tripping_json_then_structure_and_parents_restored() {
        let mut outline = Outline::new();
        let root = sample(&mut outline);
        let value = outline.to_json(root).unwrap();

        let mut restored = Outline::new();
        let copy = restored.from_json(&value).unwrap();

        assert_eq!(restored.to_document(copy).unwrap(), outline.to_document(root).unwrap());
        for (id, node) in restored.iter(copy) {
            for &child in node.children() {
                assert_eq!(restored.get(child).unwrap().parent(), Some(id));
            }
        }
        assert_eq!(restored.get(copy).unwrap().parent(), None);
    }

    /// Insert `document` through the public constructors.
    fn build(outline: &mut Outline, document: &EntryDocument) -> EntryId {
        let children: Vec<EntryId> = document
            .entries
            .iter()
            .map(|child| build(outline, child))
            .collect();
        outline
            .create_entry_with_children(&document.title, children)
            .unwrap()
    }

    fn chain(levels: usize) -> EntryDocument {
        (1..levels).rev().fold(EntryDocument::new(format!("level {}", levels)), |inner, i| {
            EntryDocument::new(format!("level {}", i)).with_entries(vec![inner])
        })
    }

    #[rstest]
    #[case::escaped_titles(EntryDocument::new("Новая запись").with_entries(vec![
        EntryDocument::new("say \"hi\""),
        EntryDocument::new("line\nbreak\ttab \\ slash"),
        EntryDocument::new("🌲 emoji"),
        EntryDocument::new(""),
    ]))]
    #[case::duplicate_siblings(EntryDocument::new("Dup").with_entries(vec![
        EntryDocument::new("same").with_entries(vec![EntryDocument::new("inner")]),
        EntryDocument::new("same"),
        EntryDocument::new("same"),
    ]))]
    #[case::childless_root(EntryDocument::new("Lonely"))]
    #[case::deep_chain(chain(50))]
    #[case::wide_node(EntryDocument::new("Wide").with_entries(
        (0..200).map(|i| EntryDocument::new(format!("child {}", i))).collect()
    ))]
    fn given_any_tree_when_round_tripping_json_then_identical_with_parents(
        #[case] document: EntryDocument,
    ) {
        // Arrange
        let mut outline = Outline::new();
        let root = build(&mut outline, &document);

        // Act
        let value = outline.to_json(root).unwrap();
        let mut restored = Outline::new();
        let copy = restored.from_json(&value).unwrap();

        // Assert
        assert_eq!(restored.to_document(copy).unwrap(), document);
        assert_eq!(restored.len(), outline.len());
        assert_eq!(restored.get(copy).unwrap().parent(), None);
        for (id, node) in restored.iter(copy) {
            for &child in node.children() {
                assert_eq!(restored.get(child).unwrap().parent(), Some(id));
            }
        }
    }

    #[test]
    fn given_json_without_title_when_from_json_then_malformed() {
        let mut outline = Outline::new();
        let err = outline.from_json(&json!({"entries": []})).unwrap_err();
        assert!(matches!(err, DomainError::Malformed { .. }));
        assert!(outline.is_empty());
    }

    #[test]
    fn given_tree_when_printing_then_indented_preorder() {
        let mut outline = Outline::new();
        let root = sample(&mut outline);
        let mut out = Vec::new();

        outline.entry(root).unwrap().print_tree(0, &mut out, "\t").unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Root\n\tEntry 1\n\t\tSubentry 1\n\tEntry 2\n"
        );
    }

    #[test]
    fn given_start_depth_when_printing_then_offsets_indentation() {
        let mut outline = Outline::new();
        let root = outline.create_entry("only");
        let mut out = Vec::new();

        outline.entry(root).unwrap().print_tree(2, &mut out, "  ").unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "    only\n");
    }

    #[test]
    fn given_entry_when_displayed_then_title() {
        let mut outline = Outline::new();
        let root = outline.create_entry("Groceries");
        assert_eq!(outline.entry(root).unwrap().to_string(), "Groceries");
    }

    #[test]
    fn given_tree_when_measuring_then_depth_and_leaves() {
        let mut outline = Outline::new();
        let root = sample(&mut outline);
        assert_eq!(outline.depth(root), 3);
        assert_eq!(outline.leaf_titles(root), vec!["Subentry 1", "Entry 2"]);
        assert_eq!(outline.roots(), vec![root]);
    }
}
