use thiserror::Error;

/// Failures of a template slotting chain.
///
/// The type is [`Clone`] so that a single rejection can be observed by every consumer of a
/// [`PendingTemplate`](`crate::load::PendingTemplate`) or [`PendingRender`](`crate::compose::PendingRender`).
///
/// Missing hole or peg matches are not errors, and neither is a placeholder that was removed before its replacement arrived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
	#[error("Template URL is empty")]
	EmptyUrl,

	#[error("Failed to fetch template {url:?}: {message}")]
	Fetch { url: String, message: String },

	#[error("Failed to parse template {url:?}: {message}")]
	Parse { url: String, message: String },

	#[error("DOM operation failed: {0}")]
	Dom(String),

	#[error("Failed to instantiate template: {0}")]
	Render(String),
}

impl Error {
	pub(crate) fn with_url(self, url: &str) -> Self {
		match self {
			Error::Fetch { message, .. } => Error::Fetch { url: url.to_owned(), message },
			Error::Parse { message, .. } => Error::Parse { url: url.to_owned(), message },
			other => other,
		}
	}
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
