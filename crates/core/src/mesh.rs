//! Hierarchical Triangular Mesh (HTM) spatial indexing.
//!
//! The sphere is split into 8 root triangles (S0–S3, N0–N3). Each level
//! splits every triangle into 4 by connecting its edge midpoints, so depth `d`
//! has `8 * 4^d` trixels. Trixel numbers are the HTM ids shifted down so that
//! the first trixel of every depth is 0.

/// Maps a sky position to a trixel id at a given mesh depth. Must be pure.
pub trait SpatialIndexer: Send + Sync {
    fn trixel_of(&self, ra_deg: f64, dec_deg: f64, depth: u8) -> i64;
}

type Vec3 = [f64; 3];

const V0: Vec3 = [0.0, 0.0, 1.0];
const V1: Vec3 = [1.0, 0.0, 0.0];
const V2: Vec3 = [0.0, 1.0, 0.0];
const V3: Vec3 = [-1.0, 0.0, 0.0];
const V4: Vec3 = [0.0, -1.0, 0.0];
const V5: Vec3 = [0.0, 0.0, -1.0];

/// Root triangles in HTM id order (8..=15), vertices counter-clockwise.
const ROOTS: [(i64, [Vec3; 3]); 8] = [
    (8, [V1, V5, V2]),  // S0
    (9, [V2, V5, V3]),  // S1
    (10, [V3, V5, V4]), // S2
    (11, [V4, V5, V1]), // S3
    (12, [V1, V0, V4]), // N0
    (13, [V4, V0, V3]), // N1
    (14, [V3, V0, V2]), // N2
    (15, [V2, V0, V1]), // N3
];

/// Deepest supported level; ids must fit in an i64.
pub const MAX_DEPTH: u8 = 25;

/// Number of trixels at `depth`.
pub fn trixel_count(depth: u8) -> i64 {
    8 * 4i64.pow(depth.min(MAX_DEPTH) as u32)
}

/// Convert (RA, Dec) in degrees to a unit vector.
pub fn radec_to_xyz(ra_deg: f64, dec_deg: f64) -> Vec3 {
    let (ra, dec) = (ra_deg.to_radians(), dec_deg.to_radians());
    let cos_dec = dec.cos();
    [cos_dec * ra.cos(), cos_dec * ra.sin(), dec.sin()]
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn midpoint(a: Vec3, b: Vec3) -> Vec3 {
    let m = [a[0] + b[0], a[1] + b[1], a[2] + b[2]];
    let inv = 1.0 / dot(m, m).sqrt();
    [m[0] * inv, m[1] * inv, m[2] * inv]
}

/// Signed containment margin: non-negative iff `p` lies inside the triangle.
fn containment(tri: &[Vec3; 3], p: Vec3) -> f64 {
    let [a, b, c] = *tri;
    dot(cross(a, b), p)
        .min(dot(cross(b, c), p))
        .min(dot(cross(c, a), p))
}

/// Pick the candidate with the largest containment margin. Points on a shared
/// edge resolve to the first candidate, which keeps the mapping deterministic
/// even when rounding pushes a point slightly outside every candidate.
fn best<'a, T>(candidates: impl Iterator<Item = (T, &'a [Vec3; 3])>, p: Vec3) -> Option<T> {
    let mut winner: Option<(T, f64)> = None;
    for (item, tri) in candidates {
        let margin = containment(tri, p);
        if margin >= 0.0 {
            return Some(item);
        }
        match &winner {
            Some((_, m)) if *m >= margin => {}
            _ => winner = Some((item, margin)),
        }
    }
    winner.map(|(item, _)| item)
}

fn children(tri: &[Vec3; 3]) -> [[Vec3; 3]; 4] {
    let [a, b, c] = *tri;
    let w0 = midpoint(b, c);
    let w1 = midpoint(a, c);
    let w2 = midpoint(a, b);
    [[a, w2, w1], [b, w0, w2], [c, w1, w0], [w0, w1, w2]]
}

/// Full HTM id (root ids start at 8) of the trixel containing `p`.
pub fn htm_id(p: Vec3, depth: u8) -> i64 {
    let depth = depth.min(MAX_DEPTH);
    let (mut id, mut tri) = best(ROOTS.iter().map(|(id, tri)| ((*id, *tri), tri)), p)
        .unwrap_or((ROOTS[0].0, ROOTS[0].1));

    for _ in 0..depth {
        let kids = children(&tri);
        let child = best(kids.iter().enumerate(), p).unwrap_or(0);
        id = id * 4 + child as i64;
        tri = kids[child];
    }
    id
}

/// The default [`SpatialIndexer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HtMesh;

impl SpatialIndexer for HtMesh {
    fn trixel_of(&self, ra_deg: f64, dec_deg: f64, depth: u8) -> i64 {
        let p = radec_to_xyz(ra_deg, dec_deg);
        htm_id(p, depth) - trixel_count(depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trixel_count() {
        assert_eq!(trixel_count(0), 8);
        assert_eq!(trixel_count(1), 32);
        assert_eq!(trixel_count(3), 512);
    }

    #[test]
    fn test_root_octants() {
        let mesh = HtMesh;
        // N3 spans RA 0..90 in the north, S0 the same range in the south.
        assert_eq!(mesh.trixel_of(45.0, 45.0, 0), 7);
        assert_eq!(mesh.trixel_of(45.0, -45.0, 0), 0);
        // N0 spans RA 270..360 in the north.
        assert_eq!(mesh.trixel_of(315.0, 45.0, 0), 4);
        assert_eq!(mesh.trixel_of(135.0, -45.0, 0), 1);
    }

    #[test]
    fn test_child_ids_extend_parent() {
        let p = radec_to_xyz(123.4, -56.7);
        let parent = htm_id(p, 2);
        let child = htm_id(p, 3);
        assert_eq!(child / 4, parent);
    }

    #[test]
    fn test_trixels_in_range() {
        let mesh = HtMesh;
        for depth in [0u8, 1, 3, 6] {
            let count = trixel_count(depth);
            let mut ra = 0.0;
            while ra < 360.0 {
                let mut dec = -90.0;
                while dec <= 90.0 {
                    let t = mesh.trixel_of(ra, dec, depth);
                    assert!((0..count).contains(&t), "ra={ra} dec={dec} depth={depth} t={t}");
                    dec += 7.5;
                }
                ra += 11.25;
            }
        }
    }

    #[test]
    fn test_deterministic_and_local() {
        let mesh = HtMesh;
        assert_eq!(mesh.trixel_of(10.0, 20.0, 3), mesh.trixel_of(10.0, 20.0, 3));
        assert_eq!(mesh.trixel_of(10.0, 20.0, 3), mesh.trixel_of(10.0001, 20.0001, 3));
        assert_ne!(mesh.trixel_of(10.0, 20.0, 3), mesh.trixel_of(190.0, -20.0, 3));
    }

    #[test]
    fn test_poles_and_edges() {
        let mesh = HtMesh;
        for (ra, dec) in [(0.0, 90.0), (0.0, -90.0), (0.0, 0.0), (90.0, 0.0), (360.0, 0.0)] {
            let t = mesh.trixel_of(ra, dec, 5);
            assert!((0..trixel_count(5)).contains(&t));
        }
    }
}
