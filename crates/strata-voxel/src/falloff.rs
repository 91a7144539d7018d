//! Brush falloff curves shared by the height and density brushes.

use std::f32::consts::PI;

/// Maps normalized distance from a brush center to a strength multiplier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Falloff {
    /// `1 - t`
    #[default]
    Linear,
    /// `(1 - t)^2`
    Exponential,
    /// `0.5 * (1 + cos(pi * t))`
    Cosine,
}

impl Falloff {
    /// Weight at normalized distance `t`, clamped to `[0, 1]` first.
    pub fn weight(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Falloff::Linear => 1.0 - t,
            Falloff::Exponential => (1.0 - t) * (1.0 - t),
            Falloff::Cosine => 0.5 * (1.0 + (PI * t).cos()),
        }
    }

    /// Weight at `distance` from the center of a brush of `radius`.
    ///
    /// A non-positive radius has full weight at the center and none elsewhere.
    pub fn at_distance(self, distance: f32, radius: f32) -> f32 {
        if radius <= 0.0 {
            return if distance <= 0.0 { 1.0 } else { 0.0 };
        }
        self.weight(distance / radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Falloff; 3] = [Falloff::Linear, Falloff::Exponential, Falloff::Cosine];

    #[test]
    fn test_center_weight_is_one() {
        for f in ALL {
            assert_eq!(f.at_distance(0.0, 5.0), 1.0, "{f:?}");
        }
    }

    #[test]
    fn test_boundary_weight_is_zero() {
        for f in ALL {
            assert!(f.at_distance(5.0, 5.0).abs() < 1e-6, "{f:?}");
            assert!(f.at_distance(7.5, 5.0).abs() < 1e-6, "{f:?}");
        }
    }

    #[test]
    fn test_weights_decrease_with_distance() {
        for f in ALL {
            let mut prev = f.weight(0.0);
            for step in 1..=20 {
                let w = f.weight(step as f32 / 20.0);
                assert!(w <= prev + 1e-6, "{f:?} not monotone at step {step}");
                assert!((0.0..=1.0).contains(&w));
                prev = w;
            }
        }
    }

    #[test]
    fn test_known_midpoints() {
        assert!((Falloff::Linear.weight(0.5) - 0.5).abs() < 1e-6);
        assert!((Falloff::Exponential.weight(0.5) - 0.25).abs() < 1e-6);
        assert!((Falloff::Cosine.weight(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_zero_radius() {
        assert_eq!(Falloff::Cosine.at_distance(0.0, 0.0), 1.0);
        assert_eq!(Falloff::Cosine.at_distance(0.1, 0.0), 0.0);
    }
}
