//! Generic set-reconcile primitive shared by secondary-address handling
//! and startup convergence.

use std::collections::HashSet;

/// Diff `current` against `desired`, mutating `current` in place.
/// Removals run before adds, in a single pass, so a same-cycle swap
/// between two keys never has both present at once.
///
/// Duplicate keys in `desired` are logged once and ignored; the first
/// occurrence wins.
pub fn reconcile<F, A>(
    desired: &[String],
    current: &mut HashSet<String>,
    mut on_remove: F,
    mut on_add: A,
) where
    F: FnMut(&str),
    A: FnMut(&str),
{
    let mut wanted: Vec<&str> = Vec::with_capacity(desired.len());
    let mut seen: HashSet<&str> = HashSet::with_capacity(desired.len());
    for key in desired {
        if !seen.insert(key.as_str()) {
            log::warn!("duplicate address '{key}' in desired set, keeping first");
            continue;
        }
        wanted.push(key.as_str());
    }

    let to_remove: Vec<String> = current
        .iter()
        .filter(|k| !seen.contains(k.as_str()))
        .cloned()
        .collect();
    for key in &to_remove {
        on_remove(key);
        current.remove(key);
    }

    for key in wanted {
        if !current.contains(key) {
            on_add(key);
            current.insert(key.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_then_adds_in_order() {
        let mut current: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let desired = vec!["b".to_string(), "c".to_string()];
        let mut ops = Vec::new();
        reconcile(
            &desired,
            &mut current,
            |k| ops.push(("del", k.to_string())),
            |k| ops.push(("add", k.to_string())),
        );
        assert_eq!(ops, vec![("del", "a".to_string()), ("add", "c".to_string())]);
        assert_eq!(current, desired.into_iter().collect());
    }

    #[test]
    fn duplicate_desired_keeps_first_and_adds_once() {
        let mut current = HashSet::new();
        let desired = vec!["a".to_string(), "a".to_string()];
        let mut adds = Vec::new();
        reconcile(&desired, &mut current, |_| {}, |k| adds.push(k.to_string()));
        assert_eq!(adds, vec!["a".to_string()]);
        assert_eq!(current.len(), 1);
    }

    #[test]
    fn empty_desired_clears_current() {
        let mut current: HashSet<String> = ["a".to_string()].into_iter().collect();
        reconcile(&[], &mut current, |_| {}, |_| {});
        assert!(current.is_empty());
    }

    #[test]
    fn no_change_emits_no_callbacks() {
        let mut current: HashSet<String> = ["a".to_string()].into_iter().collect();
        let desired = vec!["a".to_string()];
        let mut calls = 0;
        reconcile(&desired, &mut current, |_| calls += 1, |_| calls += 1);
        assert_eq!(calls, 0);
    }
}
