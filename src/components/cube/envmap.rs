//! One-shot environment map generation
//!
//! The widget surrounds the scene with a dark sphere and bakes it into a
//! small pre-filtered equirectangular map once at startup. Materials sample
//! it as their reflection term. The generator's scratch buffers only live
//! for the duration of the bake.

use glam::Vec3;

/// Color of the enclosing environment sphere
pub const SPHERE_COLOR: Vec3 = Vec3::ZERO;

const MAP_WIDTH: usize = 64;
const MAP_HEIGHT: usize = 32;
/// Box-blur passes applied while pre-filtering
const FILTER_PASSES: usize = 3;

/// Baked equirectangular radiance map, static after startup
pub struct EnvironmentMap {
    width: usize,
    height: usize,
    texels: Vec<Vec3>,
}

impl EnvironmentMap {
    /// Sample the map in the given world-space direction.
    pub fn sample(&self, dir: Vec3) -> Vec3 {
        let d = dir.normalize_or_zero();
        if d == Vec3::ZERO {
            return Vec3::ZERO;
        }
        let u = d.z.atan2(d.x) / (2.0 * std::f32::consts::PI) + 0.5;
        let v = d.y.clamp(-1.0, 1.0).acos() / std::f32::consts::PI;
        let x = ((u * self.width as f32) as usize).min(self.width - 1);
        let y = ((v * self.height as f32) as usize).min(self.height - 1);
        self.texels[y * self.width + x]
    }
}

/// Scoped generator for the environment map.
///
/// Owns the working buffers for the bake; consumed by [`bake`], which
/// releases everything except the finished map.
///
/// [`bake`]: EnvMapGenerator::bake
pub struct EnvMapGenerator {
    width: usize,
    height: usize,
    radiance: Vec<Vec3>,
    scratch: Vec<Vec3>,
}

impl EnvMapGenerator {
    pub fn new() -> Self {
        Self {
            width: MAP_WIDTH,
            height: MAP_HEIGHT,
            radiance: vec![Vec3::ZERO; MAP_WIDTH * MAP_HEIGHT],
            scratch: vec![Vec3::ZERO; MAP_WIDTH * MAP_HEIGHT],
        }
    }

    /// Render the enclosing sphere into the map and pre-filter it.
    ///
    /// Every direction hits the sphere's inside, so the raw render is the
    /// sphere color everywhere; the blur passes make the result usable as a
    /// soft reflection source if the sphere color ever becomes non-uniform.
    pub fn bake(mut self, sphere_color: Vec3) -> EnvironmentMap {
        for texel in self.radiance.iter_mut() {
            *texel = sphere_color;
        }
        for _ in 0..FILTER_PASSES {
            self.blur_pass();
        }
        EnvironmentMap {
            width: self.width,
            height: self.height,
            texels: self.radiance,
        }
        // self.scratch dropped here; no intermediate resources survive
    }

    /// 3x3 box blur, wrapping horizontally (the map is periodic in azimuth)
    /// and clamping at the poles.
    fn blur_pass(&mut self) {
        let (w, h) = (self.width, self.height);
        for y in 0..h {
            for x in 0..w {
                let mut sum = Vec3::ZERO;
                let mut count = 0.0;
                for dy in -1i32..=1 {
                    let sy = y as i32 + dy;
                    if sy < 0 || sy >= h as i32 {
                        continue;
                    }
                    for dx in -1i32..=1 {
                        let sx = (x as i32 + dx).rem_euclid(w as i32);
                        sum += self.radiance[sy as usize * w + sx as usize];
                        count += 1.0;
                    }
                }
                self.scratch[y * w + x] = sum / count;
            }
        }
        std::mem::swap(&mut self.radiance, &mut self.scratch);
    }
}

impl Default for EnvMapGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_sphere_bakes_black() {
        let map = EnvMapGenerator::new().bake(SPHERE_COLOR);
        assert!(map.texels.iter().all(|t| *t == Vec3::ZERO));
        assert_eq!(map.sample(Vec3::new(0.3, -0.8, 0.2)), Vec3::ZERO);
    }

    #[test]
    fn test_uniform_sphere_survives_filtering() {
        let gray = Vec3::splat(0.25);
        let map = EnvMapGenerator::new().bake(gray);
        for texel in &map.texels {
            assert!((*texel - gray).length() < 1e-5);
        }
    }

    #[test]
    fn test_map_dimensions() {
        let map = EnvMapGenerator::new().bake(SPHERE_COLOR);
        assert_eq!(map.texels.len(), MAP_WIDTH * MAP_HEIGHT);
        assert_eq!(map.width, MAP_WIDTH);
        assert_eq!(map.height, MAP_HEIGHT);
    }

    #[test]
    fn test_sample_direction_mapping() {
        // Paint the top row and check that straight-up sampling hits it.
        let mut map = EnvMapGenerator::new().bake(SPHERE_COLOR);
        for x in 0..map.width {
            map.texels[x] = Vec3::ONE;
        }
        assert_eq!(map.sample(Vec3::Y), Vec3::ONE);
        assert_eq!(map.sample(-Vec3::Y), Vec3::ZERO);
        assert_eq!(map.sample(Vec3::X), Vec3::ZERO);
    }

    #[test]
    fn test_sample_zero_direction_is_black() {
        let map = EnvMapGenerator::new().bake(Vec3::ONE);
        assert_eq!(map.sample(Vec3::ZERO), Vec3::ZERO);
    }
}
