//! Seams to the host environment: fetching, parsing and binding are not done by this crate.

use crate::{dom::Dom, Result};
use core::marker::PhantomData;
use futures::future::LocalBoxFuture;
use std::rc::Rc;

/// Retrieves the raw body of a template document.
///
/// Implementations may cache, but [`TemplateLoader`](`crate::load::TemplateLoader`) already guarantees at most one request per URL per [`TemplateCache`](`crate::load::TemplateCache`).
pub trait Fetch {
	fn get(&self, url: &str) -> LocalBoxFuture<'static, Result<String>>;
}

/// Turns raw markup into detached root nodes.
pub trait Parse<N> {
	fn parse(&self, markup: &str) -> Result<Vec<N>>;
}

/// Instantiates a composed template against a binding scope, producing the nodes that replace the placeholder.
pub type RenderFn<N, S> = Rc<dyn Fn(&S) -> Result<Vec<N>>>;

/// Prepares composed template nodes for binding.
///
/// `compile` may read `template` but must not assume it stays untouched afterwards.
/// Binding only happens once the returned [`RenderFn`] is called.
pub trait Compile<N> {
	type Scope: ?Sized + 'static;

	fn compile(&self, template: Vec<N>) -> RenderFn<N, Self::Scope>;
}

/// A [`Compile`] implementation that doesn't bind anything.
///
/// Each instantiation receives its own deep copy of the composed template, so the same [`RenderFn`] can be used for any number of placeholders.
pub struct Verbatim<D>(Rc<D>);
impl<D> Verbatim<D> {
	#[must_use]
	pub fn new(dom: Rc<D>) -> Self {
		Self(dom)
	}
}

impl<D: Dom + 'static> Compile<D::Node> for Verbatim<D>
where
	D::Node: 'static,
{
	type Scope = ();

	fn compile(&self, template: Vec<D::Node>) -> RenderFn<D::Node, ()> {
		let dom = Rc::clone(&self.0);
		Rc::new(move |_: &()| -> Result<Vec<D::Node>> { template.iter().map(|node| dom.clone_tree(node)).collect() })
	}
}

/// Wraps a closure as [`Compile`] implementation.
pub struct CompileFn<N, S: ?Sized, F>(F, PhantomData<fn(&S) -> N>);
impl<N, S: ?Sized, F> CompileFn<N, S, F>
where
	F: Fn(Vec<N>) -> RenderFn<N, S>,
{
	pub fn new(compile: F) -> Self {
		Self(compile, PhantomData)
	}
}
impl<N, S: ?Sized + 'static, F> Compile<N> for CompileFn<N, S, F>
where
	F: Fn(Vec<N>) -> RenderFn<N, S>,
{
	type Scope = S;

	fn compile(&self, template: Vec<N>) -> RenderFn<N, S> {
		(self.0)(template)
	}
}
