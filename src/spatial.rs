use std::cmp::Ordering;

use crate::event::valid_coordinates;
use crate::gazetteer::ReferencePoint;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance between two lat/lon points in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

fn unit_vector(latitude: f64, longitude: f64) -> [f64; 3] {
    let lat = latitude.to_radians();
    let lon = longitude.to_radians();
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

fn chord_squared(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (0..3).map(|axis| (a[axis] - b[axis]).powi(2)).sum()
}

#[derive(Debug, Clone)]
struct KdNode {
    point: usize,
    position: [f64; 3],
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct NearestMatch<'a> {
    pub point: &'a ReferencePoint,
    pub distance_km: f64,
}

/// Static nearest-neighbor index over reference points.
///
/// Points live on the unit sphere as 3-D vectors inside a k-d tree. Chord
/// length grows with great-circle angle, so the Euclidean nearest neighbor
/// is also the haversine nearest neighbor; the reported distance is the
/// haversine distance to the winning point. The tree is never mutated after
/// [`SpatialIndex::build`], so shared references can be queried from any
/// number of threads.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    points: Vec<ReferencePoint>,
    nodes: Vec<KdNode>,
    root: Option<usize>,
    excluded: usize,
}

impl SpatialIndex {
    pub fn build(points: &[ReferencePoint]) -> Self {
        let snapshot = points.to_vec();
        let mut items: Vec<(usize, [f64; 3])> = snapshot
            .iter()
            .enumerate()
            .filter(|(_, point)| valid_coordinates(point.latitude, point.longitude))
            .map(|(idx, point)| (idx, unit_vector(point.latitude, point.longitude)))
            .collect();
        let excluded = snapshot.len() - items.len();

        let mut nodes = Vec::with_capacity(items.len());
        let root = build_subtree(&mut items, &mut nodes);

        Self {
            points: snapshot,
            nodes,
            root,
            excluded,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded
    }

    /// Nearest indexed point to the coordinate, or `None` for missing,
    /// non-finite or out-of-range input and for an empty index.
    pub fn nearest(&self, latitude: f64, longitude: f64) -> Option<NearestMatch<'_>> {
        if !valid_coordinates(latitude, longitude) {
            return None;
        }
        let root = self.root?;

        let target = unit_vector(latitude, longitude);
        let mut best: Option<(f64, usize)> = None;
        self.search(root, &target, &mut best);

        let (_, node_idx) = best?;
        let point = &self.points[self.nodes[node_idx].point];
        Some(NearestMatch {
            point,
            distance_km: haversine_km(latitude, longitude, point.latitude, point.longitude),
        })
    }

    fn search(&self, node_idx: usize, target: &[f64; 3], best: &mut Option<(f64, usize)>) {
        let node = &self.nodes[node_idx];
        let dist = chord_squared(&node.position, target);

        let better = match *best {
            None => true,
            Some((best_dist, best_idx)) => match dist.total_cmp(&best_dist) {
                Ordering::Less => true,
                Ordering::Equal => node.point < self.nodes[best_idx].point,
                Ordering::Greater => false,
            },
        };
        if better {
            *best = Some((dist, node_idx));
        }

        let diff = target[node.axis] - node.position[node.axis];
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near {
            self.search(near, target, best);
        }
        if let Some(far) = far {
            // equal distances stay eligible so ties resolve to gazetteer order
            let within = best.is_none_or(|(best_dist, _)| diff * diff <= best_dist);
            if within {
                self.search(far, target, best);
            }
        }
    }
}

fn build_subtree(items: &mut [(usize, [f64; 3])], nodes: &mut Vec<KdNode>) -> Option<usize> {
    if items.is_empty() {
        return None;
    }

    let axis = widest_axis(items);
    let median = items.len() / 2;
    items.select_nth_unstable_by(median, |a, b| {
        a.1[axis].total_cmp(&b.1[axis]).then(a.0.cmp(&b.0))
    });

    let (point, position) = items[median];
    let node_idx = nodes.len();
    nodes.push(KdNode {
        point,
        position,
        axis,
        left: None,
        right: None,
    });

    let (lower, rest) = items.split_at_mut(median);
    let upper = &mut rest[1..];
    let left = build_subtree(lower, nodes);
    let right = build_subtree(upper, nodes);

    nodes[node_idx].left = left;
    nodes[node_idx].right = right;
    Some(node_idx)
}

fn widest_axis(items: &[(usize, [f64; 3])]) -> usize {
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    for (_, position) in items {
        for axis in 0..3 {
            min[axis] = min[axis].min(position[axis]);
            max[axis] = max[axis].max(position[axis]);
        }
    }

    (0..3)
        .max_by(|&a, &b| (max[a] - min[a]).total_cmp(&(max[b] - min[b])).then(b.cmp(&a)))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(name: &str, admin_region: &str, latitude: f64, longitude: f64) -> ReferencePoint {
        ReferencePoint {
            name: name.to_string(),
            country: "Indonesia".to_string(),
            admin_region: admin_region.to_string(),
            latitude,
            longitude,
        }
    }

    fn indonesian_cities() -> Vec<ReferencePoint> {
        vec![
            point("Jakarta", "Jakarta", -6.1750, 106.8275),
            point("Bandung", "Jawa Barat", -6.9147, 107.6098),
            point("Yogyakarta", "Yogyakarta", -7.8014, 110.3644),
            point("Surabaya", "Jawa Timur", -7.2458, 112.7378),
            point("Denpasar", "Bali Province", -8.6500, 115.2167),
            point("Makassar", "Sulawesi Selatan", -5.1331, 119.4136),
            point("Manado", "Sulawesi Utara", 1.4931, 124.8413),
            point("Medan", "Sumatera Utara", 3.5894, 98.6739),
            point("Jayapura", "Papua", -2.5330, 140.7170),
            point("Ambon", "Maluku", -3.6950, 128.1814),
        ]
    }

    fn brute_force(points: &[ReferencePoint], latitude: f64, longitude: f64) -> (usize, f64) {
        points
            .iter()
            .enumerate()
            .map(|(idx, p)| (idx, haversine_km(latitude, longitude, p.latitude, p.longitude)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .expect("non-empty")
    }

    #[test]
    fn haversine_matches_known_distances() {
        assert_eq!(haversine_km(-6.2, 106.8, -6.2, 106.8), 0.0);

        let jakarta_bandung = haversine_km(-6.1750, 106.8275, -6.9147, 107.6098);
        assert!((jakarta_bandung - 119.0).abs() < 3.0, "{jakarta_bandung}");

        let quarter = haversine_km(0.0, 0.0, 0.0, 90.0);
        assert!((quarter - EARTH_RADIUS_KM * std::f64::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn nearest_agrees_with_brute_force() {
        let points = indonesian_cities();
        let index = SpatialIndex::build(&points);
        assert_eq!(index.len(), points.len());

        for lat_step in -12..=8 {
            for lon_step in 0..=22 {
                let latitude = f64::from(lat_step) * 1.1;
                let longitude = 94.0 + f64::from(lon_step) * 2.2;

                let found = index.nearest(latitude, longitude).expect("in range");
                let (expected_idx, expected_km) = brute_force(&points, latitude, longitude);

                assert_eq!(found.point, &points[expected_idx], "at {latitude},{longitude}");
                assert!((found.distance_km - expected_km).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn far_away_event_reports_true_distance() {
        let index = SpatialIndex::build(&[point("Bandung", "Jawa Barat", -6.9, 107.6)]);
        let found = index.nearest(-8.4, 115.2).expect("in range");

        assert_eq!(found.point.name, "Bandung");
        assert!(found.distance_km > 800.0 && found.distance_km < 900.0);
    }

    #[test]
    fn invalid_points_are_excluded_at_build() {
        let points = vec![
            point("Broken", "Nowhere", f64::NAN, 107.0),
            point("Pole", "Nowhere", 91.0, 0.0),
            point("Inf", "Nowhere", 0.0, f64::INFINITY),
            point("Bandung", "Jawa Barat", -6.9, 107.6),
        ];
        let index = SpatialIndex::build(&points);

        assert_eq!(index.len(), 1);
        assert_eq!(index.excluded_count(), 3);
        assert_eq!(
            index.nearest(-6.0, 106.0).map(|found| found.point.name.as_str()),
            Some("Bandung")
        );
    }

    #[test]
    fn degenerate_queries_return_none() {
        let index = SpatialIndex::build(&indonesian_cities());
        assert!(index.nearest(f64::NAN, 107.0).is_none());
        assert!(index.nearest(-6.0, f64::NAN).is_none());
        assert!(index.nearest(95.0, 107.0).is_none());
        assert!(index.nearest(-6.0, f64::NEG_INFINITY).is_none());

        let empty = SpatialIndex::build(&[]);
        assert!(empty.is_empty());
        assert!(empty.nearest(-6.0, 107.0).is_none());
    }

    #[test]
    fn exact_ties_resolve_to_first_gazetteer_entry() {
        let points = vec![
            point("First", "B", -6.9, 107.6),
            point("Second", "A", -6.9, 107.6),
        ];
        let index = SpatialIndex::build(&points);
        let found = index.nearest(-6.9, 107.6).expect("in range");
        assert_eq!(found.point.name, "First");
        assert_eq!(found.distance_km, 0.0);
    }

    #[test]
    fn index_handles_antimeridian_neighbors() {
        let points = vec![
            point("West", "Fiji", -17.0, 179.9),
            point("Far", "Elsewhere", -17.0, 170.0),
        ];
        let index = SpatialIndex::build(&points);
        let found = index.nearest(-17.0, -179.9).expect("in range");
        assert_eq!(found.point.name, "West");
        assert!(found.distance_km < 30.0);
    }

    #[test]
    fn index_is_shareable_across_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<SpatialIndex>();
    }
}
