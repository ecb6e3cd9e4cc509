//! Grouping of above-threshold match coordinates
//!
//! Neighbouring placements of a template all score highly around a true
//! on-screen instance. Clustering collapses them so each instance yields one
//! detection. The policy is first-fit bucketing: candidates are visited best
//! score first and join the first group (in creation order) whose most
//! recently added member lies strictly within the radius on both axes. This
//! can under-merge when matches are sparse; it is kept as-is because click
//! points depend on it.

use crate::traits::ScoreSurface;

/// Default clustering radius in pixels
pub const CLUSTER_RADIUS: u32 = 5;

/// Placement of the template's top-left corner with its score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

impl Candidate {
    pub fn new(x: u32, y: u32, score: f32) -> Self {
        Self { x, y, score }
    }

    fn near(&self, other: &Candidate, radius: u32) -> bool {
        self.x.abs_diff(other.x) < radius && self.y.abs_diff(other.y) < radius
    }
}

/// Candidates believed to be the same on-screen instance
#[derive(Debug, Clone, PartialEq)]
pub struct MatchGroup {
    members: Vec<Candidate>,
}

impl MatchGroup {
    fn start(first: Candidate) -> Self {
        Self {
            members: vec![first],
        }
    }

    pub fn members(&self) -> &[Candidate] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Most recently added member
    pub fn last(&self) -> &Candidate {
        &self.members[self.members.len() - 1]
    }

    /// Integer mean of member coordinates
    pub fn anchor(&self) -> (u32, u32) {
        let n = self.members.len() as u64;
        let sx: u64 = self.members.iter().map(|c| c.x as u64).sum();
        let sy: u64 = self.members.iter().map(|c| c.y as u64).sum();
        ((sx / n) as u32, (sy / n) as u32)
    }

    /// Score of the first member, which is the best one
    pub fn best_score(&self) -> f32 {
        self.members[0].score
    }
}

/// All placements scoring at least `threshold`, best first.
///
/// Ties keep row-major order.
pub fn candidates(surface: &ScoreSurface, threshold: f32) -> Vec<Candidate> {
    let mut found: Vec<Candidate> = surface
        .scores
        .iter()
        .enumerate()
        .filter(|&(_, &score)| score >= threshold)
        .map(|(i, &score)| {
            let i = i as u32;
            Candidate::new(i % surface.width, i / surface.width, score)
        })
        .collect();
    found.sort_by(|a, b| b.score.total_cmp(&a.score));
    found
}

/// First-fit clustering of candidates already sorted best first
pub fn cluster(candidates: &[Candidate], radius: u32) -> Vec<MatchGroup> {
    let mut groups: Vec<MatchGroup> = Vec::new();

    for candidate in candidates {
        match groups.iter_mut().find(|g| g.last().near(candidate, radius)) {
            Some(group) => group.members.push(*candidate),
            None => groups.push(MatchGroup::start(*candidate)),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_matches_merge() {
        let found = vec![Candidate::new(100, 100, 0.99), Candidate::new(103, 103, 0.95)];
        let groups = cluster(&found, CLUSTER_RADIUS);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].anchor(), (101, 101));
        assert_eq!(groups[0].best_score(), 0.99);
    }

    #[test]
    fn test_distant_matches_split() {
        let found = vec![Candidate::new(100, 100, 0.99), Candidate::new(110, 100, 0.95)];
        assert_eq!(cluster(&found, CLUSTER_RADIUS).len(), 2);

        let found = vec![Candidate::new(100, 100, 0.99), Candidate::new(100, 110, 0.95)];
        assert_eq!(cluster(&found, CLUSTER_RADIUS).len(), 2);
    }

    #[test]
    fn test_radius_is_strict() {
        let found = vec![Candidate::new(0, 0, 0.99), Candidate::new(5, 0, 0.95)];
        assert_eq!(cluster(&found, CLUSTER_RADIUS).len(), 2);
    }

    #[test]
    fn test_compares_against_last_member_not_centroid() {
        // chain drifts away from the first member but keeps joining
        let found = vec![
            Candidate::new(0, 0, 0.99),
            Candidate::new(4, 0, 0.98),
            Candidate::new(8, 0, 0.97),
            Candidate::new(12, 0, 0.96),
        ];
        let groups = cluster(&found, CLUSTER_RADIUS);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].anchor(), (6, 0));
    }

    #[test]
    fn test_first_fit_in_creation_order() {
        // third candidate is near both groups' last members and joins the older one
        let found = vec![
            Candidate::new(0, 0, 0.99),
            Candidate::new(6, 0, 0.98),
            Candidate::new(3, 0, 0.97),
        ];
        let groups = cluster(&found, CLUSTER_RADIUS);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn test_candidates_sorted_stable() {
        let surface = ScoreSurface {
            width: 3,
            height: 2,
            scores: vec![0.5, 0.95, 0.95, 0.1, 0.99, 0.2],
        };
        let found = candidates(&surface, 0.9);
        let coords: Vec<(u32, u32)> = found.iter().map(|c| (c.x, c.y)).collect();
        assert_eq!(coords, vec![(1, 1), (1, 0), (2, 0)]);
    }
}
