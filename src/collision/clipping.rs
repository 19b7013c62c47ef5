use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Whether a contact feature is a polygon vertex or an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FeatureType {
    #[default]
    Vertex,
    Face,
}

/// Identifies which features of the two shapes produced a manifold point,
/// so impulses can be carried across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ContactFeature {
    pub index_a: u8,
    pub index_b: u8,
    pub type_a: FeatureType,
    pub type_b: FeatureType,
}

impl ContactFeature {
    pub fn flipped(self) -> Self {
        Self {
            index_a: self.index_b,
            index_b: self.index_a,
            type_a: self.type_b,
            type_b: self.type_a,
        }
    }
}

/// Incident-edge endpoint carried through clipping.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClipVertex {
    pub point: Vec2,
    pub id: ContactFeature,
}

/// Clips a segment against the half-plane `dot(normal, p) <= offset`.
///
/// Returns the surviving points and how many are valid. A new point created
/// on the clipping line is tagged with `vertex_index_a`.
pub fn clip_segment_to_line(
    input: &[ClipVertex; 2],
    normal: Vec2,
    offset: f32,
    vertex_index_a: u8,
) -> ([ClipVertex; 2], usize) {
    let mut output = [ClipVertex::default(); 2];
    let mut count = 0;

    let distance0 = normal.dot(input[0].point) - offset;
    let distance1 = normal.dot(input[1].point) - offset;

    if distance0 <= 0.0 {
        output[count] = input[0];
        count += 1;
    }
    if distance1 <= 0.0 {
        output[count] = input[1];
        count += 1;
    }

    if distance0 * distance1 < 0.0 && count < 2 {
        let t = distance0 / (distance0 - distance1);
        output[count] = ClipVertex {
            point: input[0].point + t * (input[1].point - input[0].point),
            id: ContactFeature {
                index_a: vertex_index_a,
                index_b: input[0].id.index_b,
                type_a: FeatureType::Vertex,
                type_b: FeatureType::Face,
            },
        };
        count += 1;
    }

    (output, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(a: Vec2, b: Vec2) -> [ClipVertex; 2] {
        [
            ClipVertex {
                point: a,
                id: ContactFeature::default(),
            },
            ClipVertex {
                point: b,
                id: ContactFeature::default(),
            },
        ]
    }

    #[test]
    fn crossing_segment_is_cut_at_the_line() {
        let (out, count) =
            clip_segment_to_line(&segment(Vec2::new(-1.0, 0.0), Vec2::new(3.0, 0.0)), Vec2::X, 1.0, 4);
        assert_eq!(count, 2);
        assert_eq!(out[0].point, Vec2::new(-1.0, 0.0));
        assert_eq!(out[1].point, Vec2::new(1.0, 0.0));
        assert_eq!(out[1].id.index_a, 4);
        assert_eq!(out[1].id.type_b, FeatureType::Face);
    }

    #[test]
    fn segment_fully_outside_is_dropped() {
        let (_, count) =
            clip_segment_to_line(&segment(Vec2::new(2.0, 0.0), Vec2::new(3.0, 1.0)), Vec2::X, 1.0, 0);
        assert_eq!(count, 0);
    }
}
