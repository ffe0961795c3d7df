//! Hole/peg substitution and the two directive phases built on it.

use crate::{
	collaborators::{Compile, RenderFn},
	dom::{find_all, Dom},
	load::PendingTemplate,
	Error, Result,
};
use core::fmt::{self, Debug, Formatter};
use futures::{
	future::{LocalBoxFuture, Shared},
	FutureExt as _,
};
use hashbrown::HashSet;
use std::rc::Rc;
use tracing::{debug, instrument, trace, trace_span, warn};

/// The attribute names that mark holes in templates and pegs in placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
	pub hole: String,
	pub peg: String,
}
impl Default for Markers {
	fn default() -> Self {
		Self {
			hole: "ng-hole".to_owned(),
			peg: "ng-peg".to_owned(),
		}
	}
}

/// A render function that settles exactly once. Late observers receive the already-settled result.
pub type PendingRender<N, S> = Shared<LocalBoxFuture<'static, Result<RenderFn<N, S>>>>;

/// Deep-clones `template` and fills the clone's holes from `pegs`.
///
/// `template` itself is left untouched.
///
/// # Errors
///
/// Iff cloning or setting a hole's markup fails.
#[instrument(skip(dom, template, pegs))]
pub fn compose<D: Dom + ?Sized>(dom: &D, template: &[D::Node], pegs: &[D::Node], markers: &Markers) -> Result<Vec<D::Node>> {
	let clone = template.iter().map(|root| dom.clone_tree(root)).collect::<Result<Vec<_>>>()?;
	let filled = fill_holes(dom, &clone, pegs, markers)?;
	trace!("Filled {} hole(s).", filled);
	Ok(clone)
}

/// Replaces the inner markup of each hole in (or among) `roots` with that of the first peg in (or among) `pegs` of the same name.
///
/// Holes without a matching peg keep their content. Pegs without a matching hole are ignored.
/// Markup is copied as string, so that it's parsed in the context of the hole rather than that of the peg.
///
/// Returns how many holes were filled.
///
/// # Errors
///
/// Iff setting a hole's markup fails. Holes before it in document order may have been filled already.
pub fn fill_holes<D: Dom + ?Sized>(dom: &D, roots: &[D::Node], pegs: &[D::Node], markers: &Markers) -> Result<usize> {
	let holes = find_all(dom, roots, &markers.hole, None);
	let mut hole_names = HashSet::with_capacity(holes.len());
	let mut filled = 0;

	for hole in &holes {
		let name = match dom.get_attribute(hole, &markers.hole) {
			Some(name) => name,
			None => continue,
		};
		let span = trace_span!("Filling hole", name = name.as_str());
		let _enter = span.enter();

		if name.is_empty() {
			warn!("Skipping hole with empty name.");
			if cfg!(feature = "dangerous-logging") {
				trace!(?hole, "Skipped hole.");
			}
			continue;
		}

		let mut matches = find_all(dom, pegs, &markers.peg, Some(&name)).into_iter();
		let peg = match matches.next() {
			Some(peg) => peg,
			None => {
				debug!("No matching peg. Keeping the template's content.");
				hole_names.insert(name);
				continue;
			}
		};
		if matches.next().is_some() {
			warn!("Multiple pegs are named {:?}. Using the first one in document order.", name);
		}

		let markup = match dom.inner_markup(&peg) {
			Some(markup) => markup,
			None => {
				warn!("Matching peg is not an element. Keeping the template's content.");
				if cfg!(feature = "dangerous-logging") {
					trace!(?peg, "Skipped peg.");
				}
				continue;
			}
		};
		if cfg!(feature = "dangerous-logging") {
			trace!(markup = markup.as_str(), "Substituting peg content.");
		}
		dom.set_inner_markup(hole, &markup)?;
		hole_names.insert(name);
		filled += 1;
	}

	for peg in find_all(dom, pegs, &markers.peg, None) {
		match dom.get_attribute(&peg, &markers.peg) {
			Some(name) if !hole_names.contains(&name) => debug!("Discarding peg {:?} without matching hole.", name),
			_ => (),
		}
	}

	Ok(filled)
}

/// Runs the setup phase of slotting directives.
///
/// Clones are handles to the same DOM, compiler and [`Markers`].
pub struct Compositor<D, C> {
	dom: Rc<D>,
	compiler: Rc<C>,
	markers: Rc<Markers>,
}
impl<D, C> Clone for Compositor<D, C> {
	fn clone(&self) -> Self {
		Self {
			dom: Rc::clone(&self.dom),
			compiler: Rc::clone(&self.compiler),
			markers: Rc::clone(&self.markers),
		}
	}
}
impl<D, C> Debug for Compositor<D, C> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Compositor").field("markers", &self.markers).finish_non_exhaustive()
	}
}
impl<D, C> Compositor<D, C>
where
	D: Dom + 'static,
	D::Node: 'static,
	C: Compile<D::Node> + 'static,
{
	#[must_use]
	pub fn new(dom: Rc<D>, compiler: Rc<C>, markers: Markers) -> Self {
		Self {
			dom,
			compiler,
			markers: Rc::new(markers),
		}
	}

	/// A [`Compositor`] sharing this one's DOM and compiler, but looking for different marker attributes.
	#[must_use]
	pub fn with_markers(&self, markers: Markers) -> Self {
		Self {
			markers: Rc::new(markers),
			..self.clone()
		}
	}

	#[must_use]
	pub fn markers(&self) -> &Markers {
		&self.markers
	}

	#[must_use]
	pub fn dom(&self) -> &Rc<D> {
		&self.dom
	}

	/// Takes the pegs out of `placeholder` right away, then composes and compiles once `template` is available.
	///
	/// The pegs are detached synchronously so that later changes to the placeholder's content can't affect them.
	///
	/// # Errors
	///
	/// Iff a peg can't be detached. Pegs before it in document order stay detached and are dropped,
	/// the failing one and those after it stay in `placeholder`.
	///
	/// Template and compilation failures settle the returned [`Link`]'s render function instead.
	#[instrument(skip(self, placeholder, template))]
	pub fn setup(&self, placeholder: D::Node, template: PendingTemplate<D::Node>) -> Result<Link<D, C::Scope>> {
		let pegs = self.dom.children(&placeholder);
		for peg in &pegs {
			self.dom.detach(peg)?;
		}
		trace!("Detached {} peg candidate(s).", pegs.len());

		let dom = Rc::clone(&self.dom);
		let compiler = Rc::clone(&self.compiler);
		let markers = Rc::clone(&self.markers);
		let render = async move {
			let template = template.await?;
			let composed = compose(&*dom, &template, &pegs, &markers)?;
			Ok::<_, Error>(compiler.compile(composed))
		}
		.boxed_local()
		.shared();

		Ok(Link {
			dom: Rc::clone(&self.dom),
			placeholder,
			render,
		})
	}
}

/// The link phase of one slotting directive instance.
pub struct Link<D: Dom, S: ?Sized> {
	dom: Rc<D>,
	placeholder: D::Node,
	render: PendingRender<D::Node, S>,
}
impl<D: Dom, S: ?Sized> Clone for Link<D, S> {
	fn clone(&self) -> Self {
		Self {
			dom: Rc::clone(&self.dom),
			placeholder: self.placeholder.clone(),
			render: self.render.clone(),
		}
	}
}
impl<D: Dom, S: ?Sized> Debug for Link<D, S> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Link").field("placeholder", &self.placeholder).finish_non_exhaustive()
	}
}
impl<D, S> Link<D, S>
where
	D: Dom + 'static,
	D::Node: 'static,
	S: ?Sized + 'static,
{
	#[must_use]
	pub fn placeholder(&self) -> &D::Node {
		&self.placeholder
	}

	/// The compiled render function, once composition is done.
	#[must_use]
	pub fn render(&self) -> PendingRender<D::Node, S> {
		self.render.clone()
	}

	/// Instantiates the template against `scope` once it's compiled, and swaps it in for the placeholder.
	///
	/// Resolves to `Ok(false)` if the placeholder was no longer part of a tree at that point, in which case nothing is replaced.
	///
	/// # Errors
	///
	/// Loading, composition, compilation and instantiation failures are passed through. No replacement happens in that case.
	pub fn link(&self, scope: Rc<S>) -> LocalBoxFuture<'static, Result<bool>> {
		let dom = Rc::clone(&self.dom);
		let placeholder = self.placeholder.clone();
		let render = self.render.clone();
		async move {
			let render = render.await?;
			let instance = render(&*scope)?;
			let replaced = dom.replace_in_document(&placeholder, &instance)?;
			if replaced {
				trace!("Replaced placeholder with {} node(s).", instance.len());
			} else {
				debug!("Placeholder is detached. Nothing to replace.");
			}
			if cfg!(feature = "dangerous-logging") {
				trace!(?placeholder, "Linked placeholder.");
			}
			Ok(replaced)
		}
		.boxed_local()
	}
}
