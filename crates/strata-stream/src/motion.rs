//! Viewpoint motion smoothing and the adaptive ring radii derived from it.

use glam::Vec3;
use strata_config::{RingConfig, RingsConfig};

/// Smoothed frame time, speed and heading of the viewpoint.
#[derive(Clone, Debug)]
pub struct MotionTracker {
    last_pos: Option<Vec3>,
    avg_dt: f32,
    speed: f32,
    /// Last non-zero horizontal heading, normalized.
    direction: Vec3,
    dt_smoothing: f32,
    speed_smoothing: f32,
}

impl MotionTracker {
    pub fn new(config: &RingsConfig) -> Self {
        Self {
            last_pos: None,
            avg_dt: 1.0 / config.fps_target.max(1.0),
            speed: 0.0,
            direction: Vec3::ZERO,
            dt_smoothing: config.dt_smoothing.clamp(0.0, 1.0),
            speed_smoothing: config.speed_smoothing.clamp(0.0, 1.0),
        }
    }

    /// Feed one step. Returns the distance moved since the previous step,
    /// or infinity on the first.
    pub fn update(&mut self, pos: Vec3, dt: f32) -> f32 {
        let valid_dt = dt.is_finite() && dt > 0.0;
        if valid_dt {
            self.avg_dt += (dt - self.avg_dt) * self.dt_smoothing;
        }

        let Some(last) = self.last_pos.replace(pos) else {
            return f32::INFINITY;
        };
        let moved = pos.distance(last);
        if valid_dt {
            let instant = moved / dt;
            self.speed += (instant - self.speed) * self.speed_smoothing;
        }
        let horizontal = Vec3::new(pos.x - last.x, 0.0, pos.z - last.z);
        if let Some(direction) = horizontal.try_normalize() {
            self.direction = direction;
        }
        moved
    }

    pub fn fps(&self) -> f32 {
        if self.avg_dt > 0.0 { 1.0 / self.avg_dt } else { 0.0 }
    }

    /// Smoothed speed in world units per second.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Where the viewpoint will be after `lookahead` seconds at the current
    /// heading and speed.
    pub fn predicted(&self, pos: Vec3, lookahead: f32) -> Vec3 {
        pos + self.direction * self.speed * lookahead
    }
}

/// Inputs to [`compute_radii`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadiusInputs {
    /// Smoothed viewpoint speed, world units per second.
    pub speed_mps: f32,
    /// Biome density at the viewpoint, `0..=1`.
    pub density: f32,
    /// Smoothed frame rate.
    pub fps: f32,
}

/// Radii of the three rings, each in chunks of its own ring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RingRadii {
    pub editable: i32,
    pub read_only: i32,
    pub low_lod: i32,
}

/// Fraction by which `fps` falls short of `target`.
pub fn perf_deficit(target: f32, fps: f32) -> f32 {
    if target <= 0.0 || !fps.is_finite() {
        return 0.0;
    }
    ((target - fps) / target).clamp(0.0, 1.0)
}

fn clamp_radius(value: f32, ring: &RingConfig) -> i32 {
    let (min, max) = (ring.min_radius, ring.max_radius.max(ring.min_radius));
    // NaN lands on `min` through f32::max.
    value.round().max(min as f32).min(max as f32) as i32
}

/// Adapt each ring's base radius to speed, biome density and frame rate.
/// Every result lies within its ring's configured bounds.
pub fn compute_radii(config: &RingsConfig, inputs: &RadiusInputs) -> RingRadii {
    let speed_chunks = inputs.speed_mps.max(0.0) * config.speed_to_chunk_scale;
    let density = inputs.density.clamp(0.0, 1.0);
    let deficit = perf_deficit(config.fps_target, inputs.fps);
    let density_term = ((density - 0.5) * config.density_penalty).round();

    let mut editable = config.editable.base_radius as f32;
    if speed_chunks > 3.0 {
        editable += 1.0;
    }

    let read_only = config.read_only.base_radius as f32 + speed_chunks.round()
        - density_term
        - (deficit * 3.0).round();
    let read_only = clamp_radius(read_only, &config.read_only);

    let low_lod = config.low_lod.base_radius as f32 + (speed_chunks * 2.0).round()
        - density_term
        - (deficit * 5.0).round();
    let low_lod = low_lod.max(read_only as f32 + 1.0);

    RingRadii {
        editable: clamp_radius(editable, &config.editable),
        read_only,
        low_lod: clamp_radius(low_lod, &config.low_lod),
    }
}
