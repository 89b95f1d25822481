use crate::host::{Host, HostError};
use crate::props::apply_prop_diff;
use crate::unit::{Effect, UnitId, UnitTree};

/// Effect counts of one committed generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub placements: usize,
    pub updates: usize,
    pub deletions: usize,
}

/// Applies a finished generation to the host: queued deletions first, then
/// a pre-order walk over the new tree. Never yields.
pub(crate) fn commit_root<H: Host + ?Sized>(
    host: &mut H,
    units: &UnitTree,
    root: UnitId,
    deletions: &[UnitId],
) -> Result<CommitSummary, HostError> {
    let mut summary = CommitSummary {
        deletions: deletions.len(),
        ..CommitSummary::default()
    };

    for &unit in deletions {
        commit_deletion(host, units, unit)?;
    }

    let mut cursor = units[root].child;
    while let Some(unit) = cursor {
        match commit_work(host, units, unit)? {
            Effect::Placement => summary.placements += 1,
            Effect::Update => summary.updates += 1,
            Effect::None | Effect::Deletion => {}
        }
        cursor = units.next_in_preorder(unit, root);
    }

    Ok(summary)
}

fn commit_work<H: Host + ?Sized>(
    host: &mut H,
    units: &UnitTree,
    id: UnitId,
) -> Result<Effect, HostError> {
    let unit = &units[id];
    match (unit.effect, unit.host_node) {
        (Effect::Placement, Some(node)) => {
            if let Some(parent) = units.host_parent(id) {
                host.append_child(parent, node)?;
            }
        }
        (Effect::Update, Some(node)) => {
            if let Some(alternate) = unit.alternate {
                apply_prop_diff(host, node, &units[alternate].props, &unit.props)?;
            }
        }
        _ => {}
    }
    Ok(unit.effect)
}

/// Removes the host presence of a deleted unit. A component has none of its
/// own, so the first host node below it is removed instead.
fn commit_deletion<H: Host + ?Sized>(
    host: &mut H,
    units: &UnitTree,
    id: UnitId,
) -> Result<(), HostError> {
    let (Some(parent), Some(node)) = (units.host_parent(id), units.nearest_host_node(id)) else {
        log::trace!("deleted unit {id} had no host node to remove");
        return Ok(());
    };
    host.remove_child(parent, node)
}
