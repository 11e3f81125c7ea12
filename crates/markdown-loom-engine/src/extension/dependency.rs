use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::sync::Arc;

use log::debug;

use crate::error::LoomError;

/// Sentinel key. In `after_dependents` it means "run after every other
/// item"; in `before_dependents`, "run before every other item".
pub const EVERYTHING: &str = "*";

/// Ordering contract shared by every registrable hook.
pub trait Dependent {
    /// Unique key other items refer to in their dependency lists.
    fn dependency_key(&self) -> &'static str;

    /// Keys this item must run after.
    fn after_dependents(&self) -> Option<Vec<&'static str>> {
        None
    }

    /// Keys this item must run before.
    fn before_dependents(&self) -> Option<Vec<&'static str>> {
        None
    }

    /// Whether the item runs once over the whole document rather than per
    /// matched node. Global items each get a stage of their own.
    fn affects_global_scope(&self) -> bool {
        false
    }
}

impl<T: Dependent + ?Sized> Dependent for Box<T> {
    fn dependency_key(&self) -> &'static str {
        (**self).dependency_key()
    }
    fn after_dependents(&self) -> Option<Vec<&'static str>> {
        (**self).after_dependents()
    }
    fn before_dependents(&self) -> Option<Vec<&'static str>> {
        (**self).before_dependents()
    }
    fn affects_global_scope(&self) -> bool {
        (**self).affects_global_scope()
    }
}

impl<T: Dependent + ?Sized> Dependent for Arc<T> {
    fn dependency_key(&self) -> &'static str {
        (**self).dependency_key()
    }
    fn after_dependents(&self) -> Option<Vec<&'static str>> {
        (**self).after_dependents()
    }
    fn before_dependents(&self) -> Option<Vec<&'static str>> {
        (**self).before_dependents()
    }
    fn affects_global_scope(&self) -> bool {
        (**self).affects_global_scope()
    }
}

/// Items in execution order, grouped into stages.
///
/// Consecutive non-global items share a stage; a global-scope item always
/// sits alone in its stage.
#[derive(Debug)]
pub struct ResolvedDependencies<T> {
    stages: Vec<Vec<T>>,
}

impl<T> ResolvedDependencies<T> {
    pub fn stages(&self) -> &[Vec<T>] {
        &self.stages
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.stages.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_order(self) -> Vec<T> {
        self.stages.into_iter().flatten().collect()
    }

    pub fn into_stages(self) -> Vec<Vec<T>> {
        self.stages
    }
}

impl<T> Default for ResolvedDependencies<T> {
    fn default() -> Self {
        Self { stages: Vec::new() }
    }
}

/// Staged topological sort over registered hooks.
///
/// Kahn's algorithm, choosing among ready items by effective priority: an
/// item's registration index, lowered to the earliest index among everything
/// that must run after it. Items without constraints therefore keep their
/// registration order, and a late item declared "before X" lands right
/// before X.
pub struct DependencyResolver;

impl DependencyResolver {
    pub fn resolve<T: Dependent>(items: Vec<T>) -> Result<ResolvedDependencies<T>, LoomError> {
        let n = items.len();
        let mut index: HashMap<&'static str, usize> = HashMap::with_capacity(n);
        for (i, item) in items.iter().enumerate() {
            let key = item.dependency_key();
            if index.insert(key, i).is_some() {
                return Err(LoomError::DuplicateRegistration {
                    key: key.to_string(),
                });
            }
        }

        let after: Vec<Vec<&'static str>> = items
            .iter()
            .map(|it| it.after_dependents().unwrap_or_default())
            .collect();
        let before: Vec<Vec<&'static str>> = items
            .iter()
            .map(|it| it.before_dependents().unwrap_or_default())
            .collect();

        // succ[i] holds items that must run after i.
        let mut succ: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        for i in 0..n {
            for key in &after[i] {
                if *key == EVERYTHING {
                    for j in (0..n).filter(|&j| j != i && !after[j].contains(&EVERYTHING)) {
                        succ[j].insert(i);
                    }
                } else if let Some(&j) = index.get(key)
                    && j != i
                {
                    succ[j].insert(i);
                }
            }
            for key in &before[i] {
                if *key == EVERYTHING {
                    for j in (0..n).filter(|&j| j != i && !before[j].contains(&EVERYTHING)) {
                        succ[i].insert(j);
                    }
                } else if let Some(&j) = index.get(key)
                    && j != i
                {
                    succ[i].insert(j);
                }
            }
        }

        let mut priority: Vec<usize> = (0..n).collect();
        let mut changed = true;
        while changed {
            changed = false;
            for i in 0..n {
                for &j in &succ[i] {
                    if priority[j] < priority[i] {
                        priority[i] = priority[j];
                        changed = true;
                    }
                }
            }
        }

        let mut indegree = vec![0usize; n];
        for edges in &succ {
            for &j in edges {
                indegree[j] += 1;
            }
        }
        let mut ready: BinaryHeap<Reverse<(usize, usize)>> = (0..n)
            .filter(|&i| indegree[i] == 0)
            .map(|i| Reverse((priority[i], i)))
            .collect();
        let mut order = Vec::with_capacity(n);
        while let Some(Reverse((_, i))) = ready.pop() {
            order.push(i);
            for &j in &succ[i] {
                indegree[j] -= 1;
                if indegree[j] == 0 {
                    ready.push(Reverse((priority[j], j)));
                }
            }
        }

        if order.len() < n {
            let mut residual: BTreeSet<usize> = (0..n).filter(|i| indegree[*i] > 0).collect();
            // Drop items that merely hang off a cycle.
            loop {
                let dangling: Vec<usize> = residual
                    .iter()
                    .copied()
                    .filter(|&i| !succ[i].iter().any(|j| residual.contains(j)))
                    .collect();
                if dangling.is_empty() {
                    break;
                }
                for i in dangling {
                    residual.remove(&i);
                }
            }
            let members = residual
                .into_iter()
                .map(|i| items[i].dependency_key().to_string())
                .collect();
            return Err(LoomError::DependencyCycle { members });
        }

        let keys: Vec<&'static str> = order.iter().map(|&i| items[i].dependency_key()).collect();
        debug!("resolved hook order: {}", keys.join(", "));

        let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
        let mut stages: Vec<Vec<T>> = Vec::new();
        let mut current: Vec<T> = Vec::new();
        for i in order {
            let Some(item) = slots[i].take() else {
                continue;
            };
            if item.affects_global_scope() {
                if !current.is_empty() {
                    stages.push(std::mem::take(&mut current));
                }
                stages.push(vec![item]);
            } else {
                current.push(item);
            }
        }
        if !current.is_empty() {
            stages.push(current);
        }
        Ok(ResolvedDependencies { stages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default)]
    struct Hook {
        key: &'static str,
        after: Vec<&'static str>,
        before: Vec<&'static str>,
        global: bool,
    }

    impl Hook {
        fn new(key: &'static str) -> Self {
            Self {
                key,
                ..Self::default()
            }
        }
        fn after(mut self, keys: &[&'static str]) -> Self {
            self.after = keys.to_vec();
            self
        }
        fn before(mut self, keys: &[&'static str]) -> Self {
            self.before = keys.to_vec();
            self
        }
        fn global(mut self) -> Self {
            self.global = true;
            self
        }
    }

    impl Dependent for Hook {
        fn dependency_key(&self) -> &'static str {
            self.key
        }
        fn after_dependents(&self) -> Option<Vec<&'static str>> {
            (!self.after.is_empty()).then(|| self.after.clone())
        }
        fn before_dependents(&self) -> Option<Vec<&'static str>> {
            (!self.before.is_empty()).then(|| self.before.clone())
        }
        fn affects_global_scope(&self) -> bool {
            self.global
        }
    }

    fn keys(items: Vec<Hook>) -> Vec<&'static str> {
        DependencyResolver::resolve(items)
            .unwrap()
            .into_order()
            .iter()
            .map(|h| h.key)
            .collect()
    }

    #[test]
    fn unconstrained_items_keep_registration_order() {
        assert_eq!(
            keys(vec![Hook::new("a"), Hook::new("b"), Hook::new("c")]),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn before_moves_late_item_just_ahead_of_target() {
        let items = vec![
            Hook::new("quote"),
            Hook::new("heading"),
            Hook::new("list"),
            Hook::new("ext").before(&["heading"]),
        ];
        assert_eq!(keys(items), vec!["quote", "ext", "heading", "list"]);
    }

    #[test]
    fn after_pulls_prerequisite_forward() {
        let items = vec![Hook::new("a").after(&["c"]), Hook::new("b"), Hook::new("c")];
        assert_eq!(keys(items), vec!["c", "a", "b"]);
    }

    #[test]
    fn everything_sentinels() {
        let items = vec![
            Hook::new("last").after(&[EVERYTHING]),
            Hook::new("mid"),
            Hook::new("first").before(&[EVERYTHING]),
        ];
        assert_eq!(keys(items), vec!["first", "mid", "last"]);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        assert_eq!(keys(vec![Hook::new("a").after(&["missing"])]), vec!["a"]);
    }

    #[test]
    fn cycle_reports_only_members() {
        let items = vec![
            Hook::new("a").after(&["b"]),
            Hook::new("b").after(&["a"]),
            Hook::new("tail").after(&["a"]),
            Hook::new("free"),
        ];
        match DependencyResolver::resolve(items) {
            Err(LoomError::DependencyCycle { members }) => assert_eq!(members, vec!["a", "b"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_keys_rejected() {
        let err = DependencyResolver::resolve(vec![Hook::new("x"), Hook::new("x")]).unwrap_err();
        assert!(matches!(err, LoomError::DuplicateRegistration { key } if key == "x"));
    }

    #[test]
    fn global_items_get_own_stage() {
        let items = vec![
            Hook::new("a"),
            Hook::new("b"),
            Hook::new("g").global(),
            Hook::new("c"),
        ];
        let resolved = DependencyResolver::resolve(items).unwrap();
        let shape: Vec<Vec<&str>> = resolved
            .stages()
            .iter()
            .map(|s| s.iter().map(|h| h.key).collect())
            .collect();
        assert_eq!(shape, vec![vec!["a", "b"], vec!["g"], vec!["c"]]);
    }
}
