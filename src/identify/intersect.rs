// Candidate-set intersection across size groups
//
// A chip that truly matches the measurements should appear in the candidate
// list of every size group that produced one. Groups without candidates do
// not constrain the intersection: a missing measurement is not evidence
// against a chip.

/// Intersect per-group candidate lists for one operation.
///
/// The first non-empty list seeds the result; a JEDEC survives when every
/// other non-empty list also contains it. Seed order is preserved so the
/// output stays deterministic in catalogue order. Returns an empty vector
/// when no group has candidates or nothing survives.
pub fn intersect_candidates(per_group: &[&[String]]) -> Vec<String> {
    let Some(seed_pos) = per_group.iter().position(|list| !list.is_empty()) else {
        return Vec::new();
    };

    per_group[seed_pos]
        .iter()
        .filter(|jedec| {
            per_group
                .iter()
                .enumerate()
                .filter(|(i, list)| *i != seed_pos && !list.is_empty())
                .all(|(_, list)| list.contains(jedec))
        })
        .cloned()
        .collect()
}
