use crate::element::Element;
use crate::unit::{Effect, Unit, UnitId, UnitTree};

/// Builds the next generation's children of `parent` from `elements`,
/// walking the alternate's child chain in lockstep.
///
/// Matching is purely positional: slot `i` of the new list is compared with
/// the `i`-th old child and reused only when their types agree. Nothing is
/// keyed, so a reordered list shows up as deletions plus placements.
pub(crate) fn reconcile_children(
    units: &mut UnitTree,
    deletions: &mut Vec<UnitId>,
    parent: UnitId,
    elements: &[Element],
    pass: u64,
) {
    let mut old_cursor = units[parent].alternate.and_then(|alt| units[alt].child);
    let mut previous: Option<UnitId> = None;
    let mut index = 0;

    while index < elements.len() || old_cursor.is_some() {
        let element = elements.get(index);
        let same_type = match (old_cursor, element) {
            (Some(old), Some(element)) => units[old].kind.matches(element.ty()),
            _ => false,
        };

        let produced = match (old_cursor, element) {
            (Some(old), Some(element)) if same_type => {
                let unit = Unit::update(&units[old], old, element, parent, pass);
                Some(units.insert(unit))
            }
            (_, Some(element)) => Some(units.insert(Unit::placement(element, parent, pass))),
            (_, None) => None,
        };

        if let Some(old) = old_cursor {
            if !same_type {
                units[old].effect = Effect::Deletion;
                deletions.push(old);
            }
            old_cursor = units[old].sibling;
        }

        if let Some(unit) = produced {
            if index == 0 {
                units[parent].child = Some(unit);
            } else if let Some(prev) = previous {
                units[prev].sibling = Some(unit);
            }
        }

        previous = produced;
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::element::{host, Props};
    use crate::unit::UnitKind;

    fn root(units: &mut UnitTree, alternate: Option<UnitId>, pass: u64) -> UnitId {
        units.insert(Unit::root(0, Rc::new(Props::new()), alternate, pass))
    }

    fn labels(units: &UnitTree, parent: UnitId) -> Vec<(String, Effect)> {
        units
            .children(parent)
            .map(|id| (units[id].kind().label().to_string(), units[id].effect()))
            .collect()
    }

    fn elements(tags: &[&str]) -> Vec<Element> {
        tags.iter().map(|tag| host(tag).build()).collect()
    }

    #[test]
    fn fresh_parent_places_every_child() {
        let mut units = UnitTree::new();
        let mut deletions = Vec::new();
        let parent = root(&mut units, None, 1);

        reconcile_children(&mut units, &mut deletions, parent, &elements(&["a", "b"]), 1);

        assert_eq!(
            labels(&units, parent),
            vec![
                ("a".to_string(), Effect::Placement),
                ("b".to_string(), Effect::Placement),
            ]
        );
        assert!(deletions.is_empty());
        for child in units.children(parent) {
            assert_eq!(units[child].parent(), Some(parent));
            assert_eq!(units[child].alternate(), None);
        }
    }

    #[test]
    fn matching_is_positional_and_by_type() {
        let mut units = UnitTree::new();
        let mut deletions = Vec::new();
        let old_root = root(&mut units, None, 1);
        reconcile_children(&mut units, &mut deletions, old_root, &elements(&["div", "span"]), 1);
        let old: Vec<UnitId> = units.children(old_root).collect();

        let new_root = root(&mut units, Some(old_root), 2);
        deletions.clear();
        reconcile_children(&mut units, &mut deletions, new_root, &elements(&["span", "span"]), 2);

        assert_eq!(
            labels(&units, new_root),
            vec![
                ("span".to_string(), Effect::Placement),
                ("span".to_string(), Effect::Update),
            ]
        );
        assert_eq!(deletions, vec![old[0]]);
        assert_eq!(units[old[0]].effect(), Effect::Deletion);
        let second = units.children(new_root).nth(1).unwrap();
        assert_eq!(units[second].alternate(), Some(old[1]));
    }

    #[test]
    fn reused_units_keep_the_host_node() {
        let mut units = UnitTree::new();
        let mut deletions = Vec::new();
        let old_root = root(&mut units, None, 1);
        reconcile_children(&mut units, &mut deletions, old_root, &elements(&["p"]), 1);
        let old_p = units[old_root].child().unwrap();
        units[old_p].host_node = Some(41);

        let new_root = root(&mut units, Some(old_root), 2);
        reconcile_children(&mut units, &mut deletions, new_root, &elements(&["p"]), 2);

        let new_p = units[new_root].child().unwrap();
        assert_ne!(new_p, old_p);
        assert_eq!(units[new_p].host_node(), Some(41));
        assert!(matches!(units[new_p].kind(), UnitKind::Host(tag) if &**tag == "p"));
    }

    #[test]
    fn leftover_old_children_are_queued_for_deletion() {
        let mut units = UnitTree::new();
        let mut deletions = Vec::new();
        let old_root = root(&mut units, None, 1);
        reconcile_children(&mut units, &mut deletions, old_root, &elements(&["a", "b", "c"]), 1);
        let old: Vec<UnitId> = units.children(old_root).collect();

        let new_root = root(&mut units, Some(old_root), 2);
        reconcile_children(&mut units, &mut deletions, new_root, &elements(&["a"]), 2);

        assert_eq!(labels(&units, new_root), vec![("a".to_string(), Effect::Update)]);
        assert_eq!(deletions, vec![old[1], old[2]]);
    }

    #[test]
    fn empty_children_delete_everything() {
        let mut units = UnitTree::new();
        let mut deletions = Vec::new();
        let old_root = root(&mut units, None, 1);
        reconcile_children(&mut units, &mut deletions, old_root, &elements(&["a", "b"]), 1);

        let new_root = root(&mut units, Some(old_root), 2);
        reconcile_children(&mut units, &mut deletions, new_root, &[], 2);

        assert_eq!(units[new_root].child(), None);
        assert_eq!(deletions.len(), 2);
    }

    #[test]
    fn preorder_walk_visits_children_before_siblings() {
        let mut units = UnitTree::new();
        let mut deletions = Vec::new();
        let top = root(&mut units, None, 1);
        reconcile_children(&mut units, &mut deletions, top, &elements(&["a", "b"]), 1);
        let a = units[top].child().unwrap();
        reconcile_children(&mut units, &mut deletions, a, &elements(&["a1"]), 1);

        let mut order = Vec::new();
        let mut cursor = Some(top);
        while let Some(id) = cursor {
            order.push(units[id].kind().label().to_string());
            cursor = units.next_in_preorder(id, top);
        }

        assert_eq!(order, vec!["#root", "a", "a1", "b"]);
    }
}
