//! In-flight deduplication for logical requests.
//!
//! A logical request is identified by its endpoint path plus the parameters that change the
//! answer (currently the report language). Cache-busting parameters are excluded, so two calls
//! that differ only in `_t` collide.

// self
use crate::_prelude::*;

/// Stable identity of a logical request.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RequestIdentity(String);
impl RequestIdentity {
	/// Builds an identity from a path and its significant parameters.
	pub fn new<'a>(path: &str, significant: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
		let mut id = path.to_owned();
		let mut params = significant.into_iter().collect::<Vec<_>>();

		params.sort_unstable();

		for (idx, (key, value)) in params.into_iter().enumerate() {
			id.push(if idx == 0 { '?' } else { '&' });
			id.push_str(key);
			id.push('=');
			id.push_str(value);
		}

		Self(id)
	}

	/// Identity string (`path?key=value`).
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Debug for RequestIdentity {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "RequestIdentity({})", self.0)
	}
}
impl Display for RequestIdentity {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Set of identities currently in flight; clones share the same set.
#[derive(Clone, Debug, Default)]
pub struct InFlightSet(Arc<Mutex<HashSet<RequestIdentity>>>);
impl InFlightSet {
	/// Marks `id` in flight, returning `false` if it already was.
	pub fn try_start(&self, id: &RequestIdentity) -> bool {
		self.0.lock().insert(id.clone())
	}

	/// Clears the in-flight mark for `id`.
	pub fn finish(&self, id: &RequestIdentity) {
		self.0.lock().remove(id);
	}

	/// Returns `true` if `id` is currently in flight.
	pub fn contains(&self, id: &RequestIdentity) -> bool {
		self.0.lock().contains(id)
	}

	/// Marks `id` in flight and returns a guard that clears the mark on drop.
	pub fn begin(&self, id: RequestIdentity) -> Result<InFlightGuard> {
		if !self.try_start(&id) {
			return Err(Error::DuplicateInFlight { identity: id.0 });
		}

		Ok(InFlightGuard { set: self.clone(), id })
	}
}

/// Releases its identity when dropped, including on error and cancellation paths.
#[derive(Debug)]
pub struct InFlightGuard {
	set: InFlightSet,
	id: RequestIdentity,
}
impl InFlightGuard {
	/// Identity held by this guard.
	pub fn identity(&self) -> &RequestIdentity {
		&self.id
	}
}
impl Drop for InFlightGuard {
	fn drop(&mut self) {
		self.set.finish(&self.id);
	}
}
