//! Box-drawing rendering of entry trees via `termtree`.

use termtree::Tree;
use tracing::instrument;

use crate::domain::error::DomainResult;
use crate::domain::outline::{EntryId, EntryRef, Outline};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeNodeConvert for EntryRef<'_> {
    #[instrument(level = "trace", skip(self), fields(title = %self))]
    fn to_tree_string(&self) -> Tree<String> {
        let leaves: Vec<_> = self.children().map(|c| c.to_tree_string()).collect();
        Tree::new(self.title().to_string()).with_leaves(leaves)
    }
}

impl Outline {
    /// Render the tree at `id` with box-drawing guides.
    pub fn render_tree(&self, id: EntryId) -> DomainResult<String> {
        Ok(self.entry(id)?.to_tree_string().to_string())
    }
}
