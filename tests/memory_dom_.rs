#![allow(dead_code)]

use futures::{
	channel::oneshot,
	future::{self, LocalBoxFuture},
	FutureExt as _,
};
use lignin_temple::{
	collaborators::{Fetch, Parse},
	dom::Dom,
	Error, Result,
};
use std::{
	cell::{Cell, RefCell},
	collections::HashMap,
	fmt::{self, Debug, Formatter},
	rc::{Rc, Weak},
};

enum Kind {
	Element { tag: String, attributes: Vec<(String, String)> },
	Text(String),
}

struct Data {
	kind: Kind,
	parent: Weak<RefCell<Data>>,
	children: Vec<MemNode>,
}

/// A minimal document tree node. Clones are handles to the same node.
#[derive(Clone)]
pub struct MemNode(Rc<RefCell<Data>>);
impl MemNode {
	fn new(kind: Kind) -> Self {
		Self(Rc::new(RefCell::new(Data {
			kind,
			parent: Weak::new(),
			children: Vec::new(),
		})))
	}

	pub fn element(tag: &str) -> Self {
		Self::new(Kind::Element {
			tag: tag.to_owned(),
			attributes: Vec::new(),
		})
	}

	pub fn text(text: &str) -> Self {
		Self::new(Kind::Text(text.to_owned()))
	}

	pub fn tag(&self) -> Option<String> {
		match &self.0.borrow().kind {
			Kind::Element { tag, .. } => Some(tag.clone()),
			Kind::Text(_) => None,
		}
	}

	pub fn parent(&self) -> Option<MemNode> {
		self.0.borrow().parent.upgrade().map(MemNode)
	}

	pub fn is(&self, other: &MemNode) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub fn append(&self, child: &MemNode) {
		detach(child);
		child.0.borrow_mut().parent = Rc::downgrade(&self.0);
		self.0.borrow_mut().children.push(child.clone());
	}

	pub fn child_nodes(&self) -> Vec<MemNode> {
		self.0.borrow().children.clone()
	}

	pub fn inner(&self) -> String {
		self.0.borrow().children.iter().map(MemNode::outer).collect()
	}

	pub fn outer(&self) -> String {
		let data = self.0.borrow();
		match &data.kind {
			Kind::Text(text) => text.clone(),
			Kind::Element { tag, attributes } => {
				let mut markup = format!("<{}", tag);
				for (name, value) in attributes {
					markup.push_str(&format!(" {}=\"{}\"", name, value));
				}
				markup.push('>');
				for child in &data.children {
					markup.push_str(&child.outer());
				}
				markup.push_str(&format!("</{}>", tag));
				markup
			}
		}
	}
}
impl Debug for MemNode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		DEBUG_FORMATS.with(|count| count.set(count.get() + 1));
		f.write_str(&self.outer())
	}
}

thread_local! {
	static DEBUG_FORMATS: Cell<usize> = Cell::new(0);
}

/// How often a [`MemNode`] (and with it, its markup) was [`Debug`]-formatted on this thread.
pub fn debug_formats() -> usize {
	DEBUG_FORMATS.with(Cell::get)
}

fn detach(node: &MemNode) {
	if let Some(parent) = node.parent() {
		parent.0.borrow_mut().children.retain(|child| !child.is(node));
	}
	node.0.borrow_mut().parent = Weak::new();
}

fn deep_clone(node: &MemNode) -> MemNode {
	let data = node.0.borrow();
	let clone = MemNode::new(match &data.kind {
		Kind::Element { tag, attributes } => Kind::Element {
			tag: tag.clone(),
			attributes: attributes.clone(),
		},
		Kind::Text(text) => Kind::Text(text.clone()),
	});
	for child in &data.children {
		clone.append(&deep_clone(child));
	}
	clone
}

/// Parses a strict subset of HTML: elements with quoted or bare attributes, self-closing tags and text.
pub fn parse(markup: &str) -> Result<Vec<MemNode>, String> {
	let mut roots = Vec::new();
	let mut open: Vec<MemNode> = Vec::new();
	let mut rest = markup;

	let mut attach = |open: &[MemNode], node: &MemNode| match open.last() {
		Some(parent) => parent.append(node),
		None => roots.push(node.clone()),
	};

	while !rest.is_empty() {
		if let Some(after) = rest.strip_prefix("</") {
			let end = after.find('>').ok_or("Unterminated closing tag")?;
			let tag = after[..end].trim();
			let element = open.pop().ok_or_else(|| format!("Unexpected </{}>", tag))?;
			if element.tag().as_deref() != Some(tag) {
				return Err(format!("Expected </{}> but found </{}>", element.tag().unwrap_or_default(), tag));
			}
			rest = &after[end + 1..];
		} else if let Some(after) = rest.strip_prefix('<') {
			let end = after.find('>').ok_or("Unterminated tag")?;
			let (head, self_closing) = match after[..end].strip_suffix('/') {
				Some(head) => (head, true),
				None => (&after[..end], false),
			};
			let element = parse_open_tag(head)?;
			attach(open.as_slice(), &element);
			if !self_closing {
				open.push(element);
			}
			rest = &after[end + 1..];
		} else {
			let end = rest.find('<').unwrap_or_else(|| rest.len());
			attach(open.as_slice(), &MemNode::text(&rest[..end]));
			rest = &rest[end..];
		}
	}

	match open.last() {
		Some(unclosed) => Err(format!("Unclosed <{}>", unclosed.tag().unwrap_or_default())),
		None => Ok(roots),
	}
}

fn parse_open_tag(head: &str) -> Result<MemNode, String> {
	let head = head.trim();
	let tag_end = head.find(char::is_whitespace).unwrap_or_else(|| head.len());
	let tag = &head[..tag_end];
	if tag.is_empty() {
		return Err("Empty tag name".to_owned());
	}

	let mut attributes = Vec::new();
	let mut rest = head[tag_end..].trim_start();
	while !rest.is_empty() {
		let name_end = rest.find(|c: char| c == '=' || c.is_whitespace()).unwrap_or_else(|| rest.len());
		let name = rest[..name_end].to_owned();
		rest = &rest[name_end..];
		let value = if let Some(after) = rest.strip_prefix('=') {
			let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'');
			match quote {
				Some(quote) => {
					let after = &after[1..];
					let end = after.find(quote).ok_or_else(|| format!("Unterminated value of {}", name))?;
					rest = &after[end + 1..];
					after[..end].to_owned()
				}
				None => {
					let end = after.find(char::is_whitespace).unwrap_or_else(|| after.len());
					rest = &after[end..];
					after[..end].to_owned()
				}
			}
		} else {
			String::new()
		};
		attributes.push((name, value));
		rest = rest.trim_start();
	}

	Ok(MemNode::new(Kind::Element {
		tag: tag.to_owned(),
		attributes,
	}))
}

/// Parses `markup` into a detached `<div>`, for convenient test setup.
pub fn div(markup: &str) -> MemNode {
	let div = MemNode::element("div");
	for node in parse(markup).expect("Invalid test markup") {
		div.append(&node);
	}
	div
}

#[derive(Debug, Default)]
pub struct MemDom;
impl Dom for MemDom {
	type Node = MemNode;

	fn children(&self, node: &MemNode) -> Vec<MemNode> {
		node.child_nodes().into_iter().filter(|child| child.tag().is_some()).collect()
	}

	fn detach(&self, node: &MemNode) -> Result<()> {
		detach(node);
		Ok(())
	}

	fn clone_tree(&self, node: &MemNode) -> Result<MemNode> {
		Ok(deep_clone(node))
	}

	fn get_attribute(&self, node: &MemNode, name: &str) -> Option<String> {
		match &node.0.borrow().kind {
			Kind::Element { attributes, .. } => attributes.iter().find(|(n, _)| n == name).map(|(_, value)| value.clone()),
			Kind::Text(_) => None,
		}
	}

	fn inner_markup(&self, node: &MemNode) -> Option<String> {
		node.tag().map(|_| node.inner())
	}

	fn set_inner_markup(&self, node: &MemNode, markup: &str) -> Result<()> {
		if node.tag().is_none() {
			return Err(Error::Dom("not an element".to_owned()));
		}
		let nodes = parse(markup).map_err(Error::Dom)?;
		for child in node.child_nodes() {
			detach(&child);
		}
		for child in &nodes {
			node.append(child);
		}
		Ok(())
	}

	fn replace_in_document(&self, old: &MemNode, replacements: &[MemNode]) -> Result<bool> {
		let parent = match old.parent() {
			Some(parent) => parent,
			None => return Ok(false),
		};
		for replacement in replacements {
			detach(replacement);
			replacement.0.borrow_mut().parent = Rc::downgrade(&parent.0);
		}
		let mut data = parent.0.borrow_mut();
		let index = data.children.iter().position(|child| child.is(old)).expect("Parent without child");
		data.children.splice(index..=index, replacements.iter().cloned());
		drop(data);
		old.0.borrow_mut().parent = Weak::new();
		Ok(true)
	}
}

pub struct MemParser;
impl Parse<MemNode> for MemParser {
	fn parse(&self, markup: &str) -> Result<Vec<MemNode>> {
		parse(markup).map_err(|message| Error::Parse { url: String::new(), message })
	}
}

/// Serves fixed bodies and counts requests per URL.
#[derive(Default)]
pub struct MapFetch {
	bodies: HashMap<String, Result<String, String>>,
	calls: RefCell<Vec<String>>,
}
impl MapFetch {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn serve(mut self, url: &str, body: &str) -> Self {
		self.bodies.insert(url.to_owned(), Ok(body.to_owned()));
		self
	}

	pub fn fail(mut self, url: &str, message: &str) -> Self {
		self.bodies.insert(url.to_owned(), Err(message.to_owned()));
		self
	}

	pub fn calls(&self, url: &str) -> usize {
		self.calls.borrow().iter().filter(|called| *called == url).count()
	}
}
impl Fetch for MapFetch {
	fn get(&self, url: &str) -> LocalBoxFuture<'static, Result<String>> {
		self.calls.borrow_mut().push(url.to_owned());
		let result = match self.bodies.get(url) {
			Some(Ok(body)) => Ok(body.clone()),
			Some(Err(message)) => Err(Error::Fetch {
				url: String::new(),
				message: message.clone(),
			}),
			None => Err(Error::Fetch {
				url: String::new(),
				message: "404".to_owned(),
			}),
		};
		future::ready(result).boxed_local()
	}
}

/// Holds back a single response until [`GateFetch::open`] is called.
pub struct GateFetch {
	sender: RefCell<Option<oneshot::Sender<Result<String>>>>,
	receiver: RefCell<Option<oneshot::Receiver<Result<String>>>>,
	calls: Cell<usize>,
}
impl GateFetch {
	pub fn new() -> Self {
		let (sender, receiver) = oneshot::channel();
		Self {
			sender: RefCell::new(Some(sender)),
			receiver: RefCell::new(Some(receiver)),
			calls: Cell::new(0),
		}
	}

	pub fn open(&self, response: Result<String>) {
		let sender = self.sender.borrow_mut().take().expect("Gate opened twice");
		sender.send(response).expect("Gate receiver dropped");
	}

	pub fn calls(&self) -> usize {
		self.calls.get()
	}
}
impl Fetch for GateFetch {
	fn get(&self, _url: &str) -> LocalBoxFuture<'static, Result<String>> {
		self.calls.set(self.calls.get() + 1);
		let receiver = self.receiver.borrow_mut().take().expect("GateFetch serves only one request");
		receiver
			.map(|received| {
				received.unwrap_or_else(|_| {
					Err(Error::Fetch {
						url: String::new(),
						message: "cancelled".to_owned(),
					})
				})
			})
			.boxed_local()
	}
}
