//! Pending request set and its reducer
//!
//! The set of URLs with a request in flight. Every transition produces a new
//! container (or hands back the same one for untracked actions), so callers
//! can detect changes with [`PendingSet::ptr_eq`] instead of comparing contents.

use pending_requests_types::Action;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// URLs with a begun, not yet completed request.
///
/// Serializes as `{ "<url>": true }`. Entries mapped to `false` are dropped on
/// deserialization since absence is the only "not pending" state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, bool>", into = "BTreeMap<String, bool>")]
pub struct PendingSet(Arc<BTreeSet<String>>);

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.contains(url)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// A new set with `url` added.
    pub fn with(&self, url: &str) -> Self {
        let mut urls = BTreeSet::clone(&self.0);
        urls.insert(url.to_string());
        Self(Arc::new(urls))
    }

    /// A new set with `url` removed.
    pub fn without(&self, url: &str) -> Self {
        let mut urls = BTreeSet::clone(&self.0);
        urls.remove(url);
        Self(Arc::new(urls))
    }

    /// True when both handles point at the same container.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<BTreeMap<String, bool>> for PendingSet {
    fn from(map: BTreeMap<String, bool>) -> Self {
        Self(Arc::new(
            map.into_iter()
                .filter_map(|(url, pending)| pending.then_some(url))
                .collect(),
        ))
    }
}

impl From<PendingSet> for BTreeMap<String, bool> {
    fn from(set: PendingSet) -> Self {
        set.0.iter().map(|url| (url.clone(), true)).collect()
    }
}

impl<S: Into<String>> FromIterator<S> for PendingSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(Arc::new(iter.into_iter().map(Into::into).collect()))
    }
}

/// Apply one action to the pending set.
///
/// Untagged actions return `current` itself. A begin tag adds the url, a done
/// tag removes it; both return a fresh container.
pub fn requests_reducer(current: &PendingSet, action: &Action) -> PendingSet {
    match action.request_tag() {
        None => current.clone(),
        Some(tag) if tag.done => current.without(&tag.url),
        Some(tag) => current.with(&tag.url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pending_requests_types::RequestTag;
    use serde_json::json;

    fn begin(url: &str) -> Action {
        Action::new("ANYTHING").with_request_tag(RequestTag::begin(url))
    }

    fn done(url: &str) -> Action {
        Action::new("ANYTHING").with_request_tag(RequestTag::done(url))
    }

    #[test]
    fn test_initial_state_is_empty() {
        let state = requests_reducer(&PendingSet::default(), &Action::new("ANYTHING"));
        assert!(state.is_empty());
        assert_eq!(serde_json::to_value(&state).unwrap(), json!({}));
    }

    #[test]
    fn test_begin_then_done() {
        let empty = PendingSet::new();

        let pending = requests_reducer(&empty, &begin("testUrl"));
        assert_eq!(serde_json::to_value(&pending).unwrap(), json!({ "testUrl": true }));

        let cleared = requests_reducer(&pending, &done("testUrl"));
        assert_eq!(serde_json::to_value(&cleared).unwrap(), json!({}));
    }

    #[test]
    fn test_begin_is_idempotent() {
        let once = requests_reducer(&PendingSet::new(), &begin("testUrl"));
        let twice = requests_reducer(&once, &begin("testUrl"));
        assert_eq!(once, twice);
        assert_eq!(twice.len(), 1);
    }

    #[test]
    fn test_done_for_absent_url_is_noop() {
        let state: PendingSet = ["other"].into_iter().collect();
        let next = requests_reducer(&state, &done("testUrl"));
        assert_eq!(next, state);
    }

    #[test]
    fn test_done_only_removes_its_url() {
        let state: PendingSet = ["a", "b"].into_iter().collect();
        let next = requests_reducer(&state, &done("a"));
        assert!(!next.contains("a"));
        assert!(next.contains("b"));
    }

    #[test]
    fn test_untagged_actions_are_identity() {
        let state: PendingSet = ["testUrl"].into_iter().collect();

        let untouched = requests_reducer(&state, &Action::new("ANYTHING"));
        assert!(untouched.ptr_eq(&state));

        let malformed = Action::new("ANYTHING").with_request_tag(RequestTag::begin(""));
        assert!(requests_reducer(&state, &malformed).ptr_eq(&state));
    }

    #[test]
    fn test_tagged_actions_never_mutate_in_place() {
        let state: PendingSet = ["testUrl"].into_iter().collect();

        let readded = requests_reducer(&state, &begin("testUrl"));
        assert_eq!(readded, state);
        assert!(!readded.ptr_eq(&state));

        let removed = requests_reducer(&state, &done("testUrl"));
        assert!(state.contains("testUrl"));
        assert!(!removed.contains("testUrl"));
    }

    #[test]
    fn test_deserialize_drops_false_entries() {
        let state: PendingSet =
            serde_json::from_value(json!({ "a": true, "b": false })).unwrap();
        assert_eq!(state.urls().collect::<Vec<_>>(), vec!["a"]);
    }
}
