//! Fetching, parsing and caching template documents.

use crate::{
	collaborators::{Fetch, Parse},
	Error, Result,
};
use core::fmt::{self, Debug, Formatter};
use futures::{
	future::{self, LocalBoxFuture, Shared},
	FutureExt as _,
};
use hashbrown::HashMap;
use std::{cell::RefCell, rc::Rc};
use tracing::{debug, instrument, trace};

/// The parsed root nodes of a template document.
///
/// This is shared by every consumer of the same URL and must never be modified. Clone the nodes (deeply) before writing to them.
pub type Template<N> = Rc<[N]>;

/// A template that settles exactly once. Late observers receive the already-settled result.
pub type PendingTemplate<N> = Shared<LocalBoxFuture<'static, Result<Template<N>>>>;

/// Pending templates by URL.
///
/// Clones of a [`TemplateCache`] are handles to the same storage.
/// Entries (including failed ones) stay until they are [evicted](`TemplateCache::evict`), so each URL is fetched at most once per cache lifetime.
pub struct TemplateCache<N>(Rc<RefCell<HashMap<String, PendingTemplate<N>>>>);
impl<N> TemplateCache<N> {
	#[must_use]
	pub fn new() -> Self {
		Self(Rc::default())
	}

	#[must_use]
	pub fn get(&self, url: &str) -> Option<PendingTemplate<N>> {
		self.0.borrow().get(url).cloned()
	}

	/// Returns the cached entry for `url`, or caches and returns the result of `create`.
	///
	/// `create` runs without the cache being borrowed, so it may read from the cache itself.
	pub fn get_or_insert_with(&self, url: &str, create: impl FnOnce() -> PendingTemplate<N>) -> PendingTemplate<N> {
		if let Some(pending) = self.get(url) {
			return pending;
		}
		let pending = create();
		self.0.borrow_mut().entry(url.to_owned()).or_insert(pending).clone()
	}

	/// Forgets `url`, so that the next load fetches it again.
	///
	/// Consumers already holding the evicted [`PendingTemplate`] are unaffected.
	pub fn evict(&self, url: &str) -> Option<PendingTemplate<N>> {
		self.0.borrow_mut().remove(url)
	}

	pub fn clear(&self) {
		self.0.borrow_mut().clear();
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.borrow().is_empty()
	}
}
impl<N> Clone for TemplateCache<N> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}
impl<N> Default for TemplateCache<N> {
	fn default() -> Self {
		Self::new()
	}
}
impl<N> Debug for TemplateCache<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.0.borrow().keys()).finish()
	}
}

/// Loads templates through a [`Fetch`] and [`Parse`] pair, deduplicated by a [`TemplateCache`].
pub struct TemplateLoader<N> {
	fetch: Rc<dyn Fetch>,
	parser: Rc<dyn Parse<N>>,
	cache: TemplateCache<N>,
}
impl<N: 'static> TemplateLoader<N> {
	#[must_use]
	pub fn new(fetch: Rc<dyn Fetch>, parser: Rc<dyn Parse<N>>, cache: TemplateCache<N>) -> Self {
		Self { fetch, parser, cache }
	}

	#[must_use]
	pub fn cache(&self) -> &TemplateCache<N> {
		&self.cache
	}

	/// Starts loading the template at `url`, or joins the load already in progress (or finished) for it.
	///
	/// The fetch is requested immediately. Failures are not retried; they settle the returned future (and the cache entry) as [`Err`].
	#[instrument(skip(self))]
	pub fn load(&self, url: &str) -> PendingTemplate<N> {
		if url.is_empty() {
			debug!("Refusing to load an empty URL.");
			return future::ready(Err::<Template<N>, _>(Error::EmptyUrl)).boxed_local().shared();
		}

		self.cache.get_or_insert_with(url, || {
			trace!("Template cache miss. Fetching.");
			let fetched = self.fetch.get(url);
			let parser = Rc::clone(&self.parser);
			let url = url.to_owned();
			async move {
				let markup = fetched.await.map_err(|error| error.with_url(&url))?;
				let roots = parser.parse(&markup).map_err(|error| error.with_url(&url))?;
				debug!(url = url.as_str(), roots = roots.len(), "Parsed template.");
				Ok::<_, Error>(Template::from(roots))
			}
			.boxed_local()
			.shared()
		})
	}
}
