//! Broad-phase collision detection: three-axis sweep-and-prune over object
//! AABBs (§4.4).
//!
//! The algorithm sweeps the x axis first, then re-sweeps every resulting
//! group of more than one object on y, then z. An object's final island is
//! the set of objects it shares an AABB overlap with on all three axes.

use std::collections::HashSet;

use azrael_core::{ObjectId, Vec3};

/// One object's bounding sphere, as seen by the broad phase.
#[derive(Clone, Copy, Debug)]
pub struct BoundingSphere {
    pub id: ObjectId,
    pub position: Vec3,
    pub radius: f64,
}

/// Runs one axis of the sweep over `indices` into `spheres`, returning the
/// groups of indices whose extents overlap on that axis.
///
/// Events are sorted by position; when two events share a position, the
/// interval-opening event is processed first so two AABBs that touch at a
/// single point are treated as overlapping.
fn sweep_axis(indices: &[usize], bounds: impl Fn(usize) -> (f64, f64)) -> Vec<Vec<usize>> {
    #[derive(Clone, Copy)]
    struct Event {
        pos: f64,
        opens: bool,
        idx: usize,
    }

    let mut events = Vec::with_capacity(indices.len() * 2);
    for &i in indices {
        let (lo, hi) = bounds(i);
        events.push(Event { pos: lo, opens: true, idx: i });
        events.push(Event { pos: hi, opens: false, idx: i });
    }
    events.sort_by(|a, b| {
        a.pos
            .partial_cmp(&b.pos)
            .expect("AABB bounds must be finite")
            .then_with(|| b.opens.cmp(&a.opens))
    });

    let mut out = Vec::new();
    let mut depth: i64 = 0;
    let mut current: HashSet<usize> = HashSet::new();

    for ev in events {
        depth += if ev.opens { 1 } else { -1 };
        current.insert(ev.idx);
        if depth == 0 {
            out.push(current.drain().collect());
        }
        debug_assert!(depth >= 0, "sweep depth went negative");
    }
    out
}

/// Computes the disjoint collision islands among `spheres`: groups of
/// objects whose AABBs mutually overlap on all three axes (§4.4, P3).
/// Objects in different islands are guaranteed not to overlap; every
/// returned island is internally a connected overlap chain, not necessarily
/// a fully pairwise-overlapping clique (§4.4, S3).
pub fn compute_collision_sets(spheres: &[BoundingSphere]) -> Vec<Vec<ObjectId>> {
    let indices: Vec<usize> = (0..spheres.len()).collect();

    let stage_x = sweep_axis(&indices, |i| {
        let s = &spheres[i];
        (s.position.x - s.radius, s.position.x + s.radius)
    });

    let mut stage_y = Vec::new();
    for group in stage_x {
        if group.len() <= 1 {
            stage_y.push(group);
            continue;
        }
        stage_y.extend(sweep_axis(&group, |i| {
            let s = &spheres[i];
            (s.position.y - s.radius, s.position.y + s.radius)
        }));
    }

    let mut stage_z = Vec::new();
    for group in stage_y {
        if group.len() <= 1 {
            stage_z.push(group);
            continue;
        }
        stage_z.extend(sweep_axis(&group, |i| {
            let s = &spheres[i];
            (s.position.z - s.radius, s.position.z + s.radius)
        }));
    }

    stage_z
        .into_iter()
        .map(|group| group.into_iter().map(|i| spheres[i].id).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(n: u64) -> ObjectId {
        ObjectId::new(n).unwrap()
    }

    fn sphere(id: u64, x: f64, y: f64, z: f64, r: f64) -> BoundingSphere {
        BoundingSphere {
            id: oid(id),
            position: Vec3::new(x, y, z),
            radius: r,
        }
    }

    fn sorted_islands(mut islands: Vec<Vec<ObjectId>>) -> Vec<Vec<u64>> {
        for island in islands.iter_mut() {
            island.sort();
        }
        let mut raw: Vec<Vec<u64>> = islands
            .into_iter()
            .map(|is| is.into_iter().map(|i| i.get()).collect())
            .collect();
        raw.sort();
        raw
    }

    #[test]
    fn test_two_disjoint_objects_form_separate_islands() {
        let spheres = vec![sphere(1, 0.0, 0.0, 0.0, 1.0), sphere(2, 100.0, 0.0, 0.0, 1.0)];
        let islands = sorted_islands(compute_collision_sets(&spheres));
        assert_eq!(islands, vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_two_overlapping_objects_form_one_island() {
        let spheres = vec![sphere(1, 0.0, 0.0, 0.0, 1.0), sphere(2, 1.5, 0.0, 0.0, 1.0)];
        let islands = sorted_islands(compute_collision_sets(&spheres));
        assert_eq!(islands, vec![vec![1, 2]]);
    }

    #[test]
    fn test_overlap_on_x_but_not_y_stays_separate() {
        // Overlap in x, but y extents never touch: must not be grouped.
        let spheres = vec![sphere(1, 0.0, 0.0, 0.0, 1.0), sphere(2, 0.5, 100.0, 0.0, 1.0)];
        let islands = sorted_islands(compute_collision_sets(&spheres));
        assert_eq!(islands, vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_three_object_chain_groups_as_one_island_without_full_clique() {
        // A and B overlap, B and C overlap, but A and C do not touch.
        // The sweep must still report one island containing all three (S3).
        let spheres = vec![
            sphere(1, 0.0, 0.0, 0.0, 1.0),
            sphere(2, 1.5, 0.0, 0.0, 1.0),
            sphere(3, 3.0, 0.0, 0.0, 1.0),
        ];
        let islands = sorted_islands(compute_collision_sets(&spheres));
        assert_eq!(islands, vec![vec![1, 2, 3]]);
    }

    #[test]
    fn test_islands_partition_all_objects_exactly_once() {
        // P3: every object appears in exactly one returned island.
        let spheres = vec![
            sphere(1, 0.0, 0.0, 0.0, 1.0),
            sphere(2, 1.5, 0.0, 0.0, 1.0),
            sphere(3, 50.0, 0.0, 0.0, 1.0),
            sphere(4, 50.5, 0.0, 0.0, 1.0),
            sphere(5, 200.0, 0.0, 0.0, 1.0),
        ];
        let islands = compute_collision_sets(&spheres);
        let mut all: Vec<u64> = islands.iter().flatten().map(|i| i.get()).collect();
        all.sort();
        assert_eq!(all, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_touching_at_a_single_point_counts_as_overlap() {
        let spheres = vec![sphere(1, 0.0, 0.0, 0.0, 1.0), sphere(2, 2.0, 0.0, 0.0, 1.0)];
        let islands = sorted_islands(compute_collision_sets(&spheres));
        assert_eq!(islands, vec![vec![1, 2]]);
    }

    #[test]
    fn test_empty_input_yields_no_islands() {
        assert!(compute_collision_sets(&[]).is_empty());
    }

    #[test]
    fn test_single_object_forms_its_own_island() {
        let spheres = vec![sphere(1, 0.0, 0.0, 0.0, 1.0)];
        let islands = sorted_islands(compute_collision_sets(&spheres));
        assert_eq!(islands, vec![vec![1]]);
    }
}
