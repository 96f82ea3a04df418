//! Floating particle cloud animated on the CPU.
//!
//! The cloud keeps an immutable `source` snapshot and rebuilds `live` from it
//! every frame, so jitter never accumulates.

use glam::{Mat4, Vec3};
use rand::Rng;

use crate::error::{Error, Result};

/// How the jitter is laid over the flat `[x, y, z, x, y, z, ...]` buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrideMode {
    /// Walk the flat buffer two slots at a time: even slots get the sine
    /// term, odd slots the cosine term. Axis assignment drifts from point to
    /// point because a point has three slots.
    #[default]
    Interleaved,
    /// Jitter every point on all three axes with (sin, cos, sin).
    PerPoint,
}

#[derive(Debug, Clone)]
pub struct ParticleCloud {
    source: Vec<f32>,
    live: Vec<f32>,
    phases: Vec<f32>,
    rotation_y: f32,
}

impl ParticleCloud {
    pub fn new(source: Vec<f32>, phases: Vec<f32>) -> Result<Self> {
        if source.len() % 3 != 0 {
            return Err(Error::RaggedParticleSource(source.len()));
        }
        let points = source.len() / 3;
        if phases.len() != points {
            return Err(Error::PhaseCountMismatch {
                expected: points,
                actual: phases.len(),
            });
        }
        if let Some((index, &value)) = phases
            .iter()
            .enumerate()
            .find(|(_, p)| !(0.0..1.0).contains(*p))
        {
            return Err(Error::PhaseOutOfRange { index, value });
        }

        Ok(Self {
            live: source.clone(),
            source,
            phases,
            rotation_y: 0.0,
        })
    }

    /// Scatter `count` points uniformly in a box of size `extent` centred on
    /// `center`, each with a random phase in [0, 1).
    pub fn scatter<R: Rng>(count: usize, extent: Vec3, center: Vec3, rng: &mut R) -> Self {
        let mut source = Vec::with_capacity(count * 3);
        let mut phases = Vec::with_capacity(count);
        for _ in 0..count {
            let p = center
                + Vec3::new(
                    (rng.random::<f32>() - 0.5) * extent.x,
                    (rng.random::<f32>() - 0.5) * extent.y,
                    (rng.random::<f32>() - 0.5) * extent.z,
                );
            source.extend_from_slice(&[p.x, p.y, p.z]);
            phases.push(rng.random::<f32>());
        }
        Self {
            live: source.clone(),
            source,
            phases,
            rotation_y: 0.0,
        }
    }

    pub fn point_count(&self) -> usize {
        self.phases.len()
    }

    pub fn source(&self) -> &[f32] {
        &self.source
    }

    pub fn live(&self) -> &[f32] {
        &self.live
    }

    pub fn phases(&self) -> &[f32] {
        &self.phases
    }

    pub fn rotation_y(&self) -> f32 {
        self.rotation_y
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_y(self.rotation_y)
    }
}

/// Per-frame jitter and spin for a [`ParticleCloud`].
#[derive(Debug, Clone)]
pub struct ParticleAnimator {
    pub stride: StrideMode,
    pub amplitude: f32,
    /// Radians per second about the vertical axis.
    pub rotation_rate: f32,
}

impl Default for ParticleAnimator {
    fn default() -> Self {
        Self {
            stride: StrideMode::Interleaved,
            amplitude: 1.0 / 1000.0,
            rotation_rate: 5.0,
        }
    }
}

impl ParticleAnimator {
    pub fn apply(&self, cloud: &mut ParticleCloud, elapsed: f32, dt: f32) {
        let amp = self.amplitude;
        let ParticleCloud { source, live, phases, .. } = cloud;

        match self.stride {
            StrideMode::Interleaved => {
                for i in (0..source.len()).step_by(2) {
                    live[i] = source[i] + (elapsed + phases[i / 3]).sin() * amp;
                    if let Some(next) = source.get(i + 1) {
                        live[i + 1] = next + (elapsed + phases[(i + 1) / 3]).cos() * amp;
                    }
                }
            }
            StrideMode::PerPoint => {
                for (p, phase) in phases.iter().enumerate() {
                    let t = elapsed + phase;
                    let (s, c) = t.sin_cos();
                    let base = p * 3;
                    live[base] = source[base] + s * amp;
                    live[base + 1] = source[base + 1] + c * amp;
                    live[base + 2] = source[base + 2] + s * amp;
                }
            }
        }

        cloud.rotation_y += self.rotation_rate * dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    fn grid_cloud(points: usize) -> ParticleCloud {
        let source: Vec<f32> = (0..points * 3).map(|i| i as f32).collect();
        ParticleCloud::new(source, vec![0.0; points]).unwrap()
    }

    #[test]
    fn new_rejects_ragged_source() {
        let err = ParticleCloud::new(vec![0.0; 4], vec![0.0]).unwrap_err();
        assert!(matches!(err, Error::RaggedParticleSource(4)));
    }

    #[test]
    fn new_rejects_phase_count_mismatch() {
        let err = ParticleCloud::new(vec![0.0; 6], vec![0.0]).unwrap_err();
        assert!(matches!(err, Error::PhaseCountMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn new_rejects_phase_of_one() {
        let err = ParticleCloud::new(vec![0.0; 3], vec![1.0]).unwrap_err();
        assert!(matches!(err, Error::PhaseOutOfRange { index: 0, .. }));
    }

    #[test]
    fn scatter_respects_invariants() {
        let mut rng = SmallRng::seed_from_u64(7);
        let cloud = ParticleCloud::scatter(500, Vec3::new(10.0, 4.0, 10.0), Vec3::new(0.0, 20.0, 0.0), &mut rng);
        assert_eq!(cloud.point_count(), 500);
        assert_eq!(cloud.source().len(), 1500);
        assert_eq!(cloud.live(), cloud.source());
        assert!(cloud.phases().iter().all(|p| (0.0..1.0).contains(p)));
        for point in cloud.source().chunks(3) {
            assert!(point[0].abs() <= 5.0);
            assert!((point[1] - 20.0).abs() <= 2.0);
            assert!(point[2].abs() <= 5.0);
        }
    }

    #[test]
    fn interleaved_at_time_zero_alternates_sin_and_cos() {
        let mut cloud = grid_cloud(4);
        ParticleAnimator::default().apply(&mut cloud, 0.0, 0.0);
        for (i, (live, src)) in cloud.live().iter().zip(cloud.source()).enumerate() {
            let expected = if i % 2 == 0 { *src } else { src + 0.001 };
            assert!(close(*live, expected), "slot {i}: {live} vs {expected}");
        }
    }

    #[test]
    fn interleaved_reaches_every_slot() {
        let mut cloud = grid_cloud(3);
        ParticleAnimator::default().apply(&mut cloud, 1.0, 0.0);
        for (i, (live, src)) in cloud.live().iter().zip(cloud.source()).enumerate() {
            assert!(!close(*live, *src), "slot {i} left untouched");
        }
    }

    #[test]
    fn interleaved_slots_use_their_point_phase() {
        let mut cloud = ParticleCloud::new(vec![0.0; 6], vec![0.0, 0.5]).unwrap();
        ParticleAnimator::default().apply(&mut cloud, 0.0, 0.0);
        let live = cloud.live();
        // slot 2 closes point 0, slots 3 and 4 open point 1
        assert!(close(live[2], 0.0));
        assert!(close(live[3], 0.5f32.cos() / 1000.0));
        assert!(close(live[4], 0.5f32.sin() / 1000.0));
    }

    #[test]
    fn per_point_at_time_zero_offsets_only_y() {
        let mut cloud = grid_cloud(3);
        let animator = ParticleAnimator { stride: StrideMode::PerPoint, ..Default::default() };
        animator.apply(&mut cloud, 0.0, 0.0);
        for (live, src) in cloud.live().chunks(3).zip(cloud.source().chunks(3)) {
            assert!(close(live[0], src[0]));
            assert!(close(live[1], src[1] + 0.001));
            assert!(close(live[2], src[2]));
        }
    }

    #[test]
    fn jitter_does_not_accumulate() {
        let mut cloud = grid_cloud(2);
        let animator = ParticleAnimator::default();
        for _ in 0..100 {
            animator.apply(&mut cloud, 1.3, 0.016);
        }
        let once = {
            let mut fresh = grid_cloud(2);
            animator.apply(&mut fresh, 1.3, 0.016);
            fresh.live().to_vec()
        };
        assert_eq!(cloud.live(), once.as_slice());
        assert_eq!(cloud.source(), grid_cloud(2).source());
    }

    #[test]
    fn phase_shifts_the_wave() {
        let mut cloud = ParticleCloud::new(vec![0.0; 3], vec![0.5]).unwrap();
        ParticleAnimator::default().apply(&mut cloud, 0.25, 0.0);
        assert!(close(cloud.live()[0], 0.75f32.sin() / 1000.0));
        assert!(close(cloud.live()[1], 0.75f32.cos() / 1000.0));
        assert_eq!(cloud.live()[2], 0.0);
    }

    #[test]
    fn rotation_grows_with_rate_times_dt() {
        let mut cloud = grid_cloud(1);
        let animator = ParticleAnimator::default();
        animator.apply(&mut cloud, 0.0, 0.1);
        animator.apply(&mut cloud, 0.1, 0.1);
        assert!(close(cloud.rotation_y(), 1.0));
    }
}
