//! The tree operations slotting needs, independent of any particular DOM implementation.
//!
//! [`web::WebDom`](`crate::web::WebDom`) implements [`Dom`] over [`web_sys::Node`],
//! but any DOM-like tree with markup (de)serialisation can take its place.

use crate::Result;
use core::fmt::Debug;

/// A handle-based document tree.
///
/// [`Dom::Node`]s are cheap handles: cloning one must **not** copy the tree behind it. Use [`Dom::clone_tree`] for that.
pub trait Dom {
	type Node: Clone + Debug;

	/// The element children of `node` in document order.
	///
	/// Text, comments and other non-element nodes are skipped. Non-elements have no children.
	fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

	/// Removes `node` from its parent, if it has one.
	fn detach(&self, node: &Self::Node) -> Result<()>;

	/// Creates a deep copy of `node` that shares no structure with it.
	fn clone_tree(&self, node: &Self::Node) -> Result<Self::Node>;

	/// [`None`] if `node` isn't an element or doesn't carry the attribute.
	fn get_attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

	/// The serialised child nodes of `node`, or [`None`] if `node` isn't an element.
	fn inner_markup(&self, node: &Self::Node) -> Option<String>;

	/// Replaces the child nodes of `node` with `markup`, parsed in the context of `node`.
	fn set_inner_markup(&self, node: &Self::Node, markup: &str) -> Result<()>;

	/// Puts `replacements` where `old` currently is, then removes `old`.
	///
	/// Returns `Ok(false)` without touching anything if `old` has no parent.
	fn replace_in_document(&self, old: &Self::Node, replacements: &[Self::Node]) -> Result<bool>;

	/// Depth-first, in document order, collects each of `roots` and their element descendants that satisfy `predicate`.
	///
	/// Unlike a plain descendant query, the roots themselves are candidates too.
	fn find_self_or_descendants(&self, roots: &[Self::Node], predicate: &mut dyn FnMut(&Self::Node) -> bool) -> Vec<Self::Node> {
		let mut found = Vec::new();
		let mut stack: Vec<Self::Node> = roots.iter().rev().cloned().collect();
		while let Some(node) = stack.pop() {
			if predicate(&node) {
				found.push(node.clone());
			}
			stack.extend(self.children(&node).into_iter().rev());
		}
		found
	}
}

/// Finds each of `roots` and their descendants carrying `attribute`, optionally with exactly `value`.
pub fn find_all<D: Dom + ?Sized>(dom: &D, roots: &[D::Node], attribute: &str, value: Option<&str>) -> Vec<D::Node> {
	dom.find_self_or_descendants(roots, &mut |node| match (dom.get_attribute(node, attribute), value) {
		(Some(_), None) => true,
		(Some(actual), Some(value)) => actual == value,
		(None, _) => false,
	})
}
