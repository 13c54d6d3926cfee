//! Static scene content for the cube widget
//!
//! Everything here is built once at attach time: the 3x3x3 grid of cells,
//! the two steel materials, the light rig and the camera. The only things
//! mutated afterwards are the group rotation (via the controller) and the
//! orbiting light position.

use glam::{Mat4, Vec3};

use super::envmap::EnvironmentMap;

/// Edge length of a single cell, in scene units
pub const CELL_SIZE: f32 = 0.9;
/// Gap between neighbouring cells
pub const CELL_GAP: f32 = 0.06;
/// Constant z tilt applied to the whole cube group at render time
pub const GROUP_TILT_Z: f32 = -0.2;
/// Reference viewport size for the scale policy
pub const REFERENCE_SIZE: f64 = 500.0;

/// Corner indices for the 6 quad faces of a cell
pub const FACES: [[usize; 4]; 6] = [
    [0, 1, 2, 3],
    [5, 4, 7, 6],
    [4, 0, 3, 7],
    [1, 5, 6, 2],
    [4, 5, 1, 0],
    [3, 2, 6, 7],
];

/// Corner index pairs for the 12 outline edges of a cell
pub const EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Convert a 0xRRGGBB hex color to a linear-ish [0, 1] RGB vector
pub fn rgb(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

/// Surface parameters for a cell
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub color: Vec3,
    pub metalness: f32,
    pub roughness: f32,
    pub env_map_intensity: f32,
}

impl Material {
    /// Brushed-steel material used by the outward-facing cells
    pub fn steel() -> Self {
        Self {
            color: rgb(0xbababa),
            metalness: 0.95,
            roughness: 0.18,
            env_map_intensity: 2.5,
        }
    }

    /// Darker steel used by the center cell and the corner pattern
    pub fn dark_steel() -> Self {
        Self {
            color: rgb(0x505050),
            metalness: 0.95,
            roughness: 0.22,
            env_map_intensity: 2.2,
        }
    }
}

/// One cuboid cell of the 3x3x3 grid
#[derive(Clone, Copy, Debug)]
pub struct Cell {
    pub center: Vec3,
    pub material: Material,
}

impl Cell {
    /// The 8 corners of the cell in group-local space.
    ///
    /// Corner order matches the [`FACES`]/[`EDGES`] index tables.
    pub fn corners(&self) -> [Vec3; 8] {
        let h = CELL_SIZE / 2.0;
        let c = self.center;
        [
            c + Vec3::new(-h, -h, -h),
            c + Vec3::new(h, -h, -h),
            c + Vec3::new(h, h, -h),
            c + Vec3::new(-h, h, -h),
            c + Vec3::new(-h, -h, h),
            c + Vec3::new(h, -h, h),
            c + Vec3::new(h, h, h),
            c + Vec3::new(-h, h, h),
        ]
    }
}

/// A light in the fixed rig
#[derive(Clone, Copy, Debug)]
pub enum Light {
    Ambient {
        color: Vec3,
        intensity: f32,
    },
    /// Parallel light shining from `position` toward the origin
    Directional {
        color: Vec3,
        intensity: f32,
        position: Vec3,
    },
    Point {
        color: Vec3,
        intensity: f32,
        range: f32,
        position: Vec3,
    },
    /// Cone light aimed at the origin
    Spot {
        color: Vec3,
        intensity: f32,
        range: f32,
        angle: f32,
        penumbra: f32,
        position: Vec3,
    },
}

/// The one light whose position is animated every tick
#[derive(Clone, Copy, Debug)]
pub struct OrbitLight {
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub position: Vec3,
}

/// Invisible shadow-catching plane below the cube.
///
/// Kept in the scene graph for completeness; the rasterizer never writes
/// color for it.
#[derive(Clone, Copy, Debug)]
pub struct Ground {
    pub size: f32,
    pub y: f32,
}

/// Perspective camera with a fixed pose
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            fov_y_deg: 50.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(3.0, 3.0, 5.5),
            target: Vec3::ZERO,
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_deg.to_radians(), aspect, self.near, self.far)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

/// The full static scene
pub struct Scene {
    pub cells: Vec<Cell>,
    pub lights: Vec<Light>,
    pub orbit: OrbitLight,
    pub ground: Ground,
    pub environment: Option<EnvironmentMap>,
    /// Uniform group scale, from the fit policy (never above 1)
    pub scale: f32,
}

impl Scene {
    /// Build the fixed scene content for a host element of the given CSS size.
    pub fn build(css_width: f64, css_height: f64) -> Self {
        Self {
            cells: build_cells(),
            lights: light_rig(),
            orbit: OrbitLight {
                color: rgb(0x60a5fa),
                intensity: 2.0,
                range: 12.0,
                position: Vec3::new(4.0, 2.0, 0.0),
            },
            ground: Ground { size: 30.0, y: -2.5 },
            environment: None,
            scale: fit_scale(css_width, css_height),
        }
    }
}

/// Uniform scale so the cube fits a reference viewport; shrinks on small
/// hosts, never grows past 1 on large ones.
pub fn fit_scale(css_width: f64, css_height: f64) -> f32 {
    (css_width.min(css_height) / REFERENCE_SIZE).min(1.0) as f32
}

/// 27 cells on a 3x3x3 grid centered at the origin.
///
/// A cell gets the dark material if it is the exact center or if none of its
/// grid coordinates is the center index. Purely cosmetic alternation; there
/// is no puzzle meaning.
fn build_cells() -> Vec<Cell> {
    let pitch = CELL_SIZE + CELL_GAP;
    let mut cells = Vec::with_capacity(27);
    for x in 0..3i32 {
        for y in 0..3i32 {
            for z in 0..3i32 {
                let dark = (x == 1 && y == 1 && z == 1) || (x != 1 && y != 1 && z != 1);
                let material = if dark {
                    Material::dark_steel()
                } else {
                    Material::steel()
                };
                cells.push(Cell {
                    center: Vec3::new(
                        (x - 1) as f32 * pitch,
                        (y - 1) as f32 * pitch,
                        (z - 1) as f32 * pitch,
                    ),
                    material,
                });
            }
        }
    }
    cells
}

/// The fixed light rig (the animated orbit light lives separately on the
/// scene).
fn light_rig() -> Vec<Light> {
    vec![
        Light::Ambient {
            color: rgb(0x3d5a7a),
            intensity: 0.4,
        },
        // Key light
        Light::Directional {
            color: rgb(0xffeaa7),
            intensity: 2.0,
            position: Vec3::new(5.0, 6.0, 4.0),
        },
        // Fill light
        Light::Directional {
            color: rgb(0x74b9ff),
            intensity: 1.4,
            position: Vec3::new(-6.0, 3.0, 3.0),
        },
        // Rim light
        Light::Spot {
            color: rgb(0x60a5fa),
            intensity: 4.8,
            range: 15.0,
            angle: std::f32::consts::FRAC_PI_4,
            penumbra: 0.3,
            position: Vec3::new(-3.0, 4.0, -5.0),
        },
        Light::Point {
            color: rgb(0x3b82f6),
            intensity: 4.0,
            range: 10.0,
            position: Vec3::new(-4.0, 0.0, 4.0),
        },
        Light::Point {
            color: rgb(0xffa726),
            intensity: 2.5,
            range: 10.0,
            position: Vec3::new(5.0, 2.0, 3.0),
        },
        Light::Point {
            color: rgb(0xdfe6e9),
            intensity: 1.0,
            range: 12.0,
            position: Vec3::new(0.0, 8.0, 0.0),
        },
        // Front light
        Light::Directional {
            color: rgb(0xb2bec3),
            intensity: 0.8,
            position: Vec3::new(0.0, 2.0, 6.0),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_has_27_cells() {
        assert_eq!(build_cells().len(), 27);
    }

    #[test]
    fn test_material_pattern() {
        let cells = build_cells();
        let dark = cells
            .iter()
            .filter(|c| c.material == Material::dark_steel())
            .count();
        let light = cells
            .iter()
            .filter(|c| c.material == Material::steel())
            .count();
        // center + the 8 corners
        assert_eq!(dark, 9);
        assert_eq!(light, 18);
    }

    #[test]
    fn test_center_cell_is_dark() {
        let cells = build_cells();
        let center = cells
            .iter()
            .find(|c| c.center.length() < 1e-6)
            .expect("center cell");
        assert_eq!(center.material, Material::dark_steel());
    }

    #[test]
    fn test_cell_spacing() {
        let cells = build_cells();
        let pitch = CELL_SIZE + CELL_GAP;
        let max_x = cells.iter().map(|c| c.center.x).fold(f32::MIN, f32::max);
        let min_x = cells.iter().map(|c| c.center.x).fold(f32::MAX, f32::min);
        assert!((max_x - pitch).abs() < 1e-6);
        assert!((min_x + pitch).abs() < 1e-6);
    }

    #[test]
    fn test_fit_scale_caps_at_one() {
        assert_eq!(fit_scale(2000.0, 1500.0), 1.0);
        assert!((fit_scale(250.0, 600.0) - 0.5).abs() < 1e-6);
        assert!((fit_scale(600.0, 250.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_cell_corners_span_cell_size() {
        let cell = Cell {
            center: Vec3::new(1.0, 2.0, 3.0),
            material: Material::steel(),
        };
        let corners = cell.corners();
        let min = corners.iter().copied().fold(Vec3::MAX, Vec3::min);
        let max = corners.iter().copied().fold(Vec3::MIN, Vec3::max);
        assert!(((max - min) - Vec3::splat(CELL_SIZE)).length() < 1e-6);
        assert!((((max + min) / 2.0) - cell.center).length() < 1e-6);
    }

    #[test]
    fn test_light_rig_composition() {
        let rig = light_rig();
        assert_eq!(rig.len(), 8);
        let ambient = rig
            .iter()
            .filter(|l| matches!(l, Light::Ambient { .. }))
            .count();
        let directional = rig
            .iter()
            .filter(|l| matches!(l, Light::Directional { .. }))
            .count();
        let spot = rig.iter().filter(|l| matches!(l, Light::Spot { .. })).count();
        let point = rig.iter().filter(|l| matches!(l, Light::Point { .. })).count();
        assert_eq!(ambient, 1);
        assert_eq!(directional, 3);
        assert_eq!(spot, 1);
        assert_eq!(point, 3);
    }
}
