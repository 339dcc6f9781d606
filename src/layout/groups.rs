//! Group nesting validation

use super::error::LayoutError;
use super::types::LayoutGroup;

/// Every two groups must be disjoint or one must contain the other.
///
/// Identical member sets count as nested.
pub fn validate_group_nesting(groups: &[LayoutGroup]) -> Result<(), LayoutError> {
    for (i, first) in groups.iter().enumerate() {
        for second in &groups[i + 1..] {
            let shared: Vec<String> = first
                .node_ids
                .iter()
                .filter(|n| second.contains(n))
                .cloned()
                .collect();
            if shared.is_empty() {
                continue;
            }
            if first.is_subgroup_of(second) || second.is_subgroup_of(first) {
                continue;
            }
            return Err(LayoutError::group_overlap(
                first.name.clone(),
                second.name.clone(),
                shared,
            ));
        }
    }
    Ok(())
}
