//! URL matching for locating popup pages.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

type UrlPredicate = dyn Fn(&str) -> bool + Send + Sync;

/// Pattern a page URL must satisfy to count as a match.
#[derive(Clone)]
pub enum UrlPattern {
	/// URL contains the given substring.
	Contains(String),
	/// URL starts with the given prefix.
	Prefix(String),
	/// URL matches the regular expression anywhere.
	Regex(Regex),
	/// Arbitrary predicate, with a label for logs and errors.
	Custom { label: String, predicate: Arc<UrlPredicate> },
}

impl UrlPattern {
	pub fn contains(fragment: impl Into<String>) -> Self {
		Self::Contains(fragment.into())
	}

	pub fn prefix(prefix: impl Into<String>) -> Self {
		Self::Prefix(prefix.into())
	}

	/// Compiles `pattern` into a regex matcher.
	pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
		Regex::new(pattern).map(Self::Regex)
	}

	pub fn custom<F>(label: impl Into<String>, predicate: F) -> Self
	where
		F: Fn(&str) -> bool + Send + Sync + 'static,
	{
		Self::Custom {
			label: label.into(),
			predicate: Arc::new(predicate),
		}
	}

	pub fn matches(&self, url: &str) -> bool {
		match self {
			UrlPattern::Contains(fragment) => url.contains(fragment.as_str()),
			UrlPattern::Prefix(prefix) => url.starts_with(prefix.as_str()),
			UrlPattern::Regex(re) => re.is_match(url),
			UrlPattern::Custom { predicate, .. } => predicate(url),
		}
	}
}

impl fmt::Display for UrlPattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			UrlPattern::Contains(fragment) => write!(f, "*{fragment}*"),
			UrlPattern::Prefix(prefix) => write!(f, "{prefix}*"),
			UrlPattern::Regex(re) => write!(f, "/{}/", re.as_str()),
			UrlPattern::Custom { label, .. } => f.write_str(label),
		}
	}
}

impl fmt::Debug for UrlPattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "UrlPattern({self})")
	}
}

impl From<&str> for UrlPattern {
	fn from(fragment: &str) -> Self {
		Self::contains(fragment)
	}
}

impl From<String> for UrlPattern {
	fn from(fragment: String) -> Self {
		Self::Contains(fragment)
	}
}
