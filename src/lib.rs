#![doc(html_root_url = "https://docs.rs/lignin-temple/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Template slotting: a placeholder's named pegs are poured into the matching holes of a shared template,
//! and the bound result takes the placeholder's place.
//!
//! ```html
//! <!-- card.html -->
//! <section class="card">
//!   <h2 ng-hole="title">Untitled</h2>
//!   <div ng-hole="body"></div>
//! </section>
//!
//! <!-- page -->
//! <div id="placeholder">
//!   <span ng-peg="title">Hello</span>
//!   <p ng-peg="body">Slotted <em>content</em>.</p>
//! </div>
//! ```
//!
//! A [`Temple`] loads each template URL once (per [`TemplateCache`](`load::TemplateCache`)).
//! [`Temple::directive`] then yields a [`Directive`] whose [setup](`Directive::setup`) detaches the pegs right away,
//! and whose [`Link`](`compose::Link`) replaces the placeholder once the template is composed and compiled.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod collaborators;
pub mod compose;
pub mod dom;
mod error;
pub mod load;
pub mod web;

pub use error::{Error, Result};

use collaborators::{Compile, Fetch, Parse};
use compose::{Compositor, Link, Markers};
use dom::Dom;
use load::{PendingTemplate, TemplateCache, TemplateLoader};
use std::rc::Rc;
use tracing::instrument;

/// Hands out slotting [`Directive`]s, wired to explicitly provided collaborators.
pub struct Temple<D: Dom, C> {
	loader: TemplateLoader<D::Node>,
	compositor: Compositor<D, C>,
}
impl<D, C> Temple<D, C>
where
	D: Dom + 'static,
	D::Node: 'static,
	C: Compile<D::Node> + 'static,
{
	#[must_use]
	pub fn new(dom: Rc<D>, fetch: Rc<dyn Fetch>, parser: Rc<dyn Parse<D::Node>>, compiler: C, cache: TemplateCache<D::Node>) -> Self {
		Self {
			loader: TemplateLoader::new(fetch, parser, cache),
			compositor: Compositor::new(dom, Rc::new(compiler), Markers::default()),
		}
	}

	/// Replaces the marker attribute names used by [`Directive`]s created afterwards.
	#[must_use]
	pub fn with_markers(self, markers: Markers) -> Self {
		Self {
			compositor: self.compositor.with_markers(markers),
			..self
		}
	}

	#[must_use]
	pub fn loader(&self) -> &TemplateLoader<D::Node> {
		&self.loader
	}

	#[must_use]
	pub fn cache(&self) -> &TemplateCache<D::Node> {
		self.loader.cache()
	}

	#[must_use]
	pub fn markers(&self) -> &Markers {
		self.compositor.markers()
	}

	/// Starts loading `template_url` (unless it's already cached) and returns a [`Directive`] for it.
	#[instrument(skip(self))]
	pub fn directive(&self, template_url: &str) -> Directive<D, C> {
		Directive {
			template: self.loader.load(template_url),
			compositor: self.compositor.clone(),
		}
	}
}

/// Slots placeholders into one particular template.
pub struct Directive<D: Dom, C> {
	template: PendingTemplate<D::Node>,
	compositor: Compositor<D, C>,
}
impl<D: Dom, C> Clone for Directive<D, C> {
	fn clone(&self) -> Self {
		Self {
			template: self.template.clone(),
			compositor: self.compositor.clone(),
		}
	}
}
impl<D, C> Directive<D, C>
where
	D: Dom + 'static,
	D::Node: 'static,
	C: Compile<D::Node> + 'static,
{
	#[must_use]
	pub fn template(&self) -> PendingTemplate<D::Node> {
		self.template.clone()
	}

	/// See [`Compositor::setup`].
	///
	/// # Errors
	///
	/// Iff the pegs can't be detached from `placeholder`.
	pub fn setup(&self, placeholder: D::Node) -> Result<Link<D, C::Scope>> {
		self.compositor.setup(placeholder, self.template.clone())
	}
}
