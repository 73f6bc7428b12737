//! Dependency Resolver - parent-first ordering of milestones
//!
//! A parent that is not in the input set makes its child a root. Cycles
//! are broken where the walk first meets a milestone already on the
//! current ancestor chain.

use std::borrow::Borrow;
use std::collections::HashMap;

use shared::Milestone;

fn parent_indices<M: Borrow<Milestone>>(milestones: &[M]) -> Vec<Option<usize>> {
    let index: HashMap<&str, usize> = milestones
        .iter()
        .enumerate()
        .map(|(i, m)| (m.borrow().id.as_str(), i))
        .collect();

    milestones
        .iter()
        .map(|m| {
            m.borrow()
                .parent
                .as_ref()
                .and_then(|p| index.get(p.as_str()).copied())
        })
        .collect()
}

/// Order `milestones` so every parent precedes its children
///
/// Each input appears exactly once. Ties keep input order.
pub fn sort_topologically<M: Borrow<Milestone>>(milestones: &[M]) -> Vec<&M> {
    let parents = parent_indices(milestones);
    let mut emitted = vec![false; milestones.len()];
    let mut on_chain = vec![false; milestones.len()];
    let mut order = Vec::with_capacity(milestones.len());

    for start in 0..milestones.len() {
        let mut chain = Vec::new();
        let mut cursor = Some(start);
        while let Some(i) = cursor {
            if emitted[i] || on_chain[i] {
                break;
            }
            on_chain[i] = true;
            chain.push(i);
            cursor = parents[i];
        }
        for i in chain.into_iter().rev() {
            on_chain[i] = false;
            emitted[i] = true;
            order.push(&milestones[i]);
        }
    }
    order
}

/// Milestones whose declared parent is not in the set
pub fn orphans<M: Borrow<Milestone>>(milestones: &[M]) -> Vec<&M> {
    let parents = parent_indices(milestones);
    milestones
        .iter()
        .zip(parents)
        .filter(|(m, parent)| Borrow::<Milestone>::borrow(*m).parent.is_some() && parent.is_none())
        .map(|(m, _)| m)
        .collect()
}

/// Milestones that sit on a parent cycle
pub fn cyclic<M: Borrow<Milestone>>(milestones: &[M]) -> Vec<&M> {
    let parents = parent_indices(milestones);
    let n = milestones.len();
    (0..n)
        .filter(|&start| {
            let mut cursor = parents[start];
            for _ in 0..n {
                match cursor {
                    Some(i) if i == start => return true,
                    Some(i) => cursor = parents[i],
                    None => return false,
                }
            }
            false
        })
        .map(|i| &milestones[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::MilestoneKind;

    fn m(id: &str, parent: Option<&str>) -> Milestone {
        let milestone = Milestone::new(id, MilestoneKind::OneTime, id);
        match parent {
            Some(p) => milestone.with_parent(p),
            None => milestone,
        }
    }

    fn ids(sorted: &[&Milestone]) -> Vec<String> {
        sorted.iter().map(|m| m.id.to_string()).collect()
    }

    fn position(sorted: &[&Milestone], id: &str) -> usize {
        sorted.iter().position(|m| m.id.as_str() == id).unwrap()
    }

    // ============== Ordering Tests ==============

    #[test]
    fn test_children_declared_before_parents() {
        let input = vec![
            m("grandchild", Some("child")),
            m("child", Some("root")),
            m("root", None),
            m("other", None),
        ];
        let sorted = sort_topologically(&input);
        assert_eq!(ids(&sorted), vec!["root", "child", "grandchild", "other"]);
    }

    #[test]
    fn test_missing_parent_is_root() {
        let input = vec![m("a", Some("ghost")), m("b", Some("a"))];
        let sorted = sort_topologically(&input);
        assert_eq!(ids(&sorted), vec!["a", "b"]);
        assert_eq!(orphans(&input).len(), 1);
    }

    #[test]
    fn test_parent_always_precedes_child() {
        let input = vec![
            m("e", Some("d")),
            m("c", Some("a")),
            m("d", Some("b")),
            m("b", Some("a")),
            m("a", None),
            m("f", Some("c")),
        ];
        let sorted = sort_topologically(&input);
        assert_eq!(sorted.len(), input.len());
        for milestone in &input {
            if let Some(parent) = &milestone.parent {
                assert!(position(&sorted, parent.as_str()) < position(&sorted, milestone.id.as_str()));
            }
        }
    }

    #[test]
    fn test_works_with_shared_pointers() {
        let input: Vec<std::sync::Arc<Milestone>> =
            vec![std::sync::Arc::new(m("b", Some("a"))), std::sync::Arc::new(m("a", None))];
        let sorted = sort_topologically(&input);
        assert_eq!(sorted[0].id.as_str(), "a");
    }

    mod red_team {
        use super::*;

        #[test]
        fn test_self_parent_terminates() {
            let input = vec![m("loop", Some("loop"))];
            let sorted = sort_topologically(&input);
            assert_eq!(ids(&sorted), vec!["loop"]);
            assert_eq!(cyclic(&input).len(), 1);
        }

        #[test]
        fn test_mutual_cycle_emits_each_once() {
            let input = vec![m("a", Some("b")), m("b", Some("a")), m("c", Some("a"))];
            let sorted = sort_topologically(&input);
            let mut seen = ids(&sorted);
            seen.sort();
            assert_eq!(seen, vec!["a", "b", "c"]);
            assert!(position(&sorted, "a") < position(&sorted, "c"));
            assert_eq!(cyclic(&input).len(), 2);
        }

        #[test]
        fn test_long_chain_does_not_overflow() {
            let mut input = Vec::new();
            for i in (1..20_000).rev() {
                input.push(m(&format!("n{}", i), Some(&format!("n{}", i - 1))));
            }
            input.push(m("n0", None));
            let sorted = sort_topologically(&input);
            assert_eq!(sorted.len(), 20_000);
            assert_eq!(sorted[0].id.as_str(), "n0");
            assert_eq!(sorted[19_999].id.as_str(), "n19999");
        }
    }
}
