//! [`web_sys`] implementations of the DOM and collaborator seams, for use in the browser.

use crate::{
	collaborators::{Compile, Fetch, Parse},
	dom::Dom,
	load::TemplateCache,
	Error, Result, Temple,
};
use core::future::Future;
use futures::{future::LocalBoxFuture, FutureExt as _};
use js_sys::Promise;
use std::rc::Rc;
use tracing::{debug, error, instrument, trace};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{Document, Element, HtmlTemplateElement, Node, Response, Window};

fn js_message(value: &JsValue) -> String {
	value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn dom_error(value: &JsValue) -> Error {
	Error::Dom(js_message(value))
}

/// [`Dom`] over live (or detached) [`web_sys::Node`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebDom;
impl Dom for WebDom {
	type Node = Node;

	fn children(&self, node: &Node) -> Vec<Node> {
		match node.dyn_ref::<Element>() {
			Some(element) => {
				let children = element.children();
				(0..children.length()).filter_map(|i| children.item(i)).map(Node::from).collect()
			}
			None => Vec::new(),
		}
	}

	fn detach(&self, node: &Node) -> Result<()> {
		if let Some(parent) = node.parent_node() {
			parent.remove_child(node).map_err(|error| dom_error(&error))?;
		}
		Ok(())
	}

	fn clone_tree(&self, node: &Node) -> Result<Node> {
		node.clone_node_with_deep(true).map_err(|error| dom_error(&error))
	}

	fn get_attribute(&self, node: &Node, name: &str) -> Option<String> {
		node.dyn_ref::<Element>()?.get_attribute(name)
	}

	fn inner_markup(&self, node: &Node) -> Option<String> {
		node.dyn_ref::<Element>().map(Element::inner_html)
	}

	fn set_inner_markup(&self, node: &Node, markup: &str) -> Result<()> {
		match node.dyn_ref::<Element>() {
			Some(element) => {
				element.set_inner_html(markup);
				Ok(())
			}
			None => Err(Error::Dom("Can't set the markup of a non-element node".to_owned())),
		}
	}

	fn replace_in_document(&self, old: &Node, replacements: &[Node]) -> Result<bool> {
		let parent = match old.parent_node() {
			Some(parent) => parent,
			None => return Ok(false),
		};
		for replacement in replacements {
			parent.insert_before(replacement, Some(old)).map_err(|error| dom_error(&error))?;
		}
		parent.remove_child(old).map_err(|error| dom_error(&error))?;
		Ok(true)
	}
}

/// Parses markup through an inert `<template>` element, so that scripts don't run and resources aren't loaded.
#[derive(Debug, Clone)]
pub struct WebParser {
	document: Document,
}
impl WebParser {
	#[must_use]
	pub fn new(document: Document) -> Self {
		Self { document }
	}
}
impl Parse<Node> for WebParser {
	fn parse(&self, markup: &str) -> Result<Vec<Node>> {
		let parse_error = |message: String| Error::Parse { url: String::new(), message };

		let template = self
			.document
			.create_element("template")
			.map_err(|error| parse_error(js_message(&error)))?
			.dyn_into::<HtmlTemplateElement>()
			.map_err(|element| parse_error(format!("Expected <template> but created {:?}", element)))?;
		template.set_inner_html(markup);

		let content = template.content();
		let child_nodes = content.child_nodes();
		let roots: Vec<Node> = (0..child_nodes.length()).filter_map(|i| child_nodes.item(i)).collect();
		for root in &roots {
			content.remove_child(root).map_err(|error| parse_error(js_message(&error)))?;
		}
		Ok(roots)
	}
}

/// Fetches templates with [***fetch***](https://developer.mozilla.org/en-US/docs/Web/API/fetch).
///
/// Responses with a status outside of 200-299 are failures.
#[derive(Debug, Clone)]
pub struct WebFetch {
	window: Window,
}
impl WebFetch {
	#[must_use]
	pub fn new(window: Window) -> Self {
		Self { window }
	}
}
impl Fetch for WebFetch {
	#[instrument(skip(self))]
	fn get(&self, url: &str) -> LocalBoxFuture<'static, Result<String>> {
		let request: Promise = self.window.fetch_with_str(url);
		let url = url.to_owned();
		async move {
			let fetch_error = |message: String| Error::Fetch { url: url.clone(), message };

			let response = JsFuture::from(request).await.map_err(|error| fetch_error(js_message(&error)))?;
			let response = response
				.dyn_into::<Response>()
				.map_err(|value| fetch_error(format!("Expected Response but got {:?}", value)))?;
			if !response.ok() {
				return Err(fetch_error(format!("HTTP {} {}", response.status(), response.status_text())));
			}
			trace!(url = url.as_str(), status = response.status(), "Fetched template.");

			let text: Promise = response.text().map_err(|error| fetch_error(js_message(&error)))?;
			let text = JsFuture::from(text).await.map_err(|error| fetch_error(js_message(&error)))?;
			text.as_string().ok_or_else(|| fetch_error("Response body is not text".to_owned()))
		}
		.boxed_local()
	}
}

/// Wires a [`Temple`] to the current window's document, with a fresh [`TemplateCache`].
///
/// # Errors
///
/// Iff there is no global `window` or it has no `document`.
pub fn temple<C: Compile<Node> + 'static>(compiler: C) -> Result<Temple<WebDom, C>> {
	let window = web_sys::window().ok_or_else(|| Error::Dom("No global `window` found".to_owned()))?;
	let document = window.document().ok_or_else(|| Error::Dom("No `document` found on `window`".to_owned()))?;
	Ok(Temple::new(
		Rc::new(WebDom),
		Rc::new(WebFetch::new(window)),
		Rc::new(WebParser::new(document)),
		compiler,
		TemplateCache::new(),
	))
}

/// Drives a [link phase](`crate::compose::Link::link`) on the browser's event loop.
///
/// There is no one to hand failures to at that point, so they are logged as errors instead.
pub fn spawn_link(link: impl 'static + Future<Output = Result<bool>>) {
	spawn_local(async move {
		match link.await {
			Ok(true) => trace!("Placeholder replaced."),
			Ok(false) => debug!("Placeholder was detached before its template was ready."),
			Err(error) => error!("Template slotting failed: {}", error),
		}
	});
}
