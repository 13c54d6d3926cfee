//! Software rasterizer for the cube widget
//!
//! Draws the scene into an RGBA pixel buffer that the glue layer blits to
//! the canvas with `putImageData`. Triangles are filled with edge-function
//! barycentric coverage and a depth buffer; cell outlines are depth-tested
//! lines on top.

use glam::{Mat3, Vec2, Vec3};
use wasm_bindgen::JsValue;
use web_sys::ImageData;

use super::scene::{rgb, Camera, Light, Material, Scene, EDGES, FACES, GROUP_TILT_Z};

/// Tone-mapping exposure applied to the final radiance
const EXPOSURE: f32 = 1.5;
/// Depth bias so outline lines win against their own face
const LINE_DEPTH_BIAS: f32 = 1e-3;

/// RGBA8 pixel buffer
pub struct PixelBuffer {
    pub data: Vec<u8>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width * height * 4) as usize;
        Self {
            data: vec![0; size],
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Clear to fully transparent so the page background shows through.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.resize((width * height * 4) as usize, 0);
        self.clear();
    }

    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = ((y as u32 * self.width + x as u32) * 4) as usize;
        self.data[idx] = r;
        self.data[idx + 1] = g;
        self.data[idx + 2] = b;
        self.data[idx + 3] = 255;
    }

    pub fn to_image_data(&self) -> Result<ImageData, JsValue> {
        let clamped = wasm_bindgen::Clamped(&self.data[..]);
        ImageData::new_with_u8_clamped_array_and_sh(clamped, self.width, self.height)
    }
}

/// A projected vertex: world position, screen position and NDC depth
#[derive(Clone, Copy, Debug)]
pub struct RasterVertex {
    pub world: Vec3,
    pub screen: Vec2,
    pub depth: f32,
}

/// Signed parallelogram area used for coverage and barycentrics
#[inline]
pub fn edge_function(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (c.x - a.x) * (b.y - a.y) - (c.y - a.y) * (b.x - a.x)
}

fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}

/// Shade a surface point against the full light rig plus the environment
/// reflection term.
fn shade(scene: &Scene, camera_pos: Vec3, point: Vec3, normal: Vec3, material: &Material) -> Vec3 {
    let view_dir = (camera_pos - point).normalize_or_zero();
    let shininess = 8.0 + (1.0 - material.roughness) * 56.0;
    let mut radiance = Vec3::ZERO;

    let lit = |radiance: &mut Vec3, color: Vec3, intensity: f32, light_dir: Vec3, attenuation: f32| {
        let n_dot_l = normal.dot(light_dir).max(0.0);
        if n_dot_l <= 0.0 || attenuation <= 0.0 {
            return;
        }
        let diffuse = material.color * n_dot_l;
        let half = (light_dir + view_dir).normalize_or_zero();
        let specular = normal.dot(half).max(0.0).powf(shininess) * material.metalness;
        *radiance += color * intensity * attenuation * (diffuse + Vec3::splat(specular));
    };

    for light in &scene.lights {
        match *light {
            Light::Ambient { color, intensity } => {
                radiance += color * intensity * material.color;
            }
            Light::Directional {
                color,
                intensity,
                position,
            } => {
                lit(&mut radiance, color, intensity, position.normalize_or_zero(), 1.0);
            }
            Light::Point {
                color,
                intensity,
                range,
                position,
            } => {
                let to_light = position - point;
                let dist = to_light.length();
                let falloff = (1.0 - dist / range).clamp(0.0, 1.0);
                lit(&mut radiance, color, intensity, to_light / dist.max(1e-6), falloff * falloff);
            }
            Light::Spot {
                color,
                intensity,
                range,
                angle,
                penumbra,
                position,
            } => {
                let to_light = position - point;
                let dist = to_light.length();
                let light_dir = to_light / dist.max(1e-6);
                let falloff = (1.0 - dist / range).clamp(0.0, 1.0);
                // Cone test against the spot axis (aimed at the origin)
                let axis = (-position).normalize_or_zero();
                let cos_outer = angle.cos();
                let cos_inner = (angle * (1.0 - penumbra)).cos();
                let cos_theta = axis.dot(-light_dir);
                let cone = ((cos_theta - cos_outer) / (cos_inner - cos_outer).max(1e-6))
                    .clamp(0.0, 1.0);
                lit(&mut radiance, color, intensity, light_dir, falloff * falloff * cone);
            }
        }
    }

    // Animated orbit light, shaded as a point light
    let orbit = scene.orbit;
    let to_light = orbit.position - point;
    let dist = to_light.length();
    let falloff = (1.0 - dist / orbit.range).clamp(0.0, 1.0);
    lit(
        &mut radiance,
        orbit.color,
        orbit.intensity,
        to_light / dist.max(1e-6),
        falloff * falloff,
    );

    if let Some(env) = &scene.environment {
        let mirror = reflect(-view_dir, normal);
        radiance += env.sample(mirror) * material.env_map_intensity * material.metalness;
    }

    radiance
}

/// Exposure tone mapping to 8-bit
#[inline]
fn tone_map(c: Vec3) -> (u8, u8, u8) {
    let mapped = Vec3::new(
        1.0 - (-c.x * EXPOSURE).exp(),
        1.0 - (-c.y * EXPOSURE).exp(),
        1.0 - (-c.z * EXPOSURE).exp(),
    );
    (
        (mapped.x * 255.0) as u8,
        (mapped.y * 255.0) as u8,
        (mapped.z * 255.0) as u8,
    )
}

/// Fill one triangle with per-pixel lighting and depth testing.
///
/// Counter-clockwise screen winding only; callers cull backfaces by area
/// sign before getting here.
#[allow(clippy::too_many_arguments)]
pub fn draw_triangle(
    v0: &RasterVertex,
    v1: &RasterVertex,
    v2: &RasterVertex,
    normal: Vec3,
    material: &Material,
    scene: &Scene,
    camera_pos: Vec3,
    pixels: &mut PixelBuffer,
    depth: &mut [f32],
) {
    let (w, h) = (pixels.width() as f32, pixels.height() as f32);
    let min_x = v0.screen.x.min(v1.screen.x).min(v2.screen.x).floor().max(0.0) as usize;
    let max_x = v0.screen.x.max(v1.screen.x).max(v2.screen.x).ceil().min(w - 1.0) as usize;
    let min_y = v0.screen.y.min(v1.screen.y).min(v2.screen.y).floor().max(0.0) as usize;
    let max_y = v0.screen.y.max(v1.screen.y).max(v2.screen.y).ceil().min(h - 1.0) as usize;

    let area = edge_function(v0.screen, v1.screen, v2.screen);
    if area <= f32::EPSILON {
        return;
    }

    let width = pixels.width() as usize;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge_function(v1.screen, v2.screen, p);
            let w1 = edge_function(v2.screen, v0.screen, p);
            let w2 = edge_function(v0.screen, v1.screen, p);
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let (w0, w1, w2) = (w0 / area, w1 / area, w2 / area);

            let z = v0.depth * w0 + v1.depth * w1 + v2.depth * w2;
            let offset = y * width + x;
            if z >= depth[offset] {
                continue;
            }
            depth[offset] = z;

            let point = v0.world * w0 + v1.world * w1 + v2.world * w2;
            let (r, g, b) = tone_map(shade(scene, camera_pos, point, normal, material));
            pixels.set_pixel(x as i32, y as i32, r, g, b);
        }
    }
}

/// Depth-tested Bresenham line between two projected vertices.
pub fn draw_line(
    v0: &RasterVertex,
    v1: &RasterVertex,
    color: (u8, u8, u8),
    pixels: &mut PixelBuffer,
    depth: &mut [f32],
) {
    let (mut x0, mut y0) = (v0.screen.x.round() as i64, v0.screen.y.round() as i64);
    let (x1, y1) = (v1.screen.x.round() as i64, v1.screen.y.round() as i64);
    let total = ((x1 - x0).abs().max((y1 - y0).abs())).max(1) as f32;

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let mut step = 0.0f32;

    let width = pixels.width() as i64;
    let height = pixels.height() as i64;
    loop {
        if x0 >= 0 && x0 < width && y0 >= 0 && y0 < height {
            let t = step / total;
            let z = v0.depth + (v1.depth - v0.depth) * t - LINE_DEPTH_BIAS;
            let offset = (y0 * width + x0) as usize;
            if z < depth[offset] {
                depth[offset] = z;
                pixels.set_pixel(x0 as i32, y0 as i32, color.0, color.1, color.2);
            }
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
        step += 1.0;
    }
}

/// Render one frame of the scene into the pixel and depth buffers.
///
/// `rotation` is the cube group's current (x tilt, y turn); the fixed z tilt
/// and the fit scale come from the scene. The ground plane is shadow-only
/// and contributes no color.
pub fn render(
    scene: &Scene,
    camera: &Camera,
    rotation: Vec2,
    pixels: &mut PixelBuffer,
    depth: &mut [f32],
) {
    pixels.clear();
    depth.fill(f32::INFINITY);
    let (w, h) = (pixels.width() as f32, pixels.height() as f32);
    if w < 1.0 || h < 1.0 {
        return;
    }

    let view_proj = camera.projection(w / h) * camera.view();
    let group = Mat3::from_rotation_z(GROUP_TILT_Z)
        * Mat3::from_rotation_y(rotation.y)
        * Mat3::from_rotation_x(rotation.x);
    let edge_color = {
        let c = rgb(0x0a0a0a);
        (
            (c.x * 255.0) as u8,
            (c.y * 255.0) as u8,
            (c.z * 255.0) as u8,
        )
    };

    for cell in &scene.cells {
        let mut verts = [RasterVertex {
            world: Vec3::ZERO,
            screen: Vec2::ZERO,
            depth: 0.0,
        }; 8];
        let mut clipped = false;
        for (vert, corner) in verts.iter_mut().zip(cell.corners()) {
            let world = group * (corner * scene.scale);
            let clip = view_proj * world.extend(1.0);
            if clip.w <= 0.0 {
                clipped = true;
                break;
            }
            let ndc = clip.truncate() / clip.w;
            *vert = RasterVertex {
                world,
                screen: Vec2::new((ndc.x + 1.0) * 0.5 * w, (1.0 - ndc.y) * 0.5 * h),
                depth: ndc.z,
            };
        }
        // Cells crossing the near plane are dropped whole; the camera never
        // gets that close in practice.
        if clipped {
            continue;
        }

        for [a, b, c, d] in FACES {
            let (va, vb, vc, vd) = (&verts[a], &verts[b], &verts[c], &verts[d]);
            // Backface cull on screen winding
            if edge_function(va.screen, vb.screen, vc.screen) <= 0.0 {
                continue;
            }
            let normal = (vb.world - va.world)
                .cross(vc.world - va.world)
                .normalize_or_zero();
            draw_triangle(
                va,
                vb,
                vc,
                normal,
                &cell.material,
                scene,
                camera.position,
                pixels,
                depth,
            );
            draw_triangle(
                va,
                vc,
                vd,
                normal,
                &cell.material,
                scene,
                camera.position,
                pixels,
                depth,
            );
        }

        for (a, b) in EDGES {
            draw_line(&verts[a], &verts[b], edge_color, pixels, depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32, y: f32, z: f32) -> RasterVertex {
        RasterVertex {
            world: Vec3::new(x, y, 2.0),
            screen: Vec2::new(x, y),
            depth: z,
        }
    }

    fn test_scene() -> Scene {
        Scene::build(500.0, 500.0)
    }

    #[test]
    fn test_set_pixel_bounds() {
        let mut buf = PixelBuffer::new(4, 4);
        buf.set_pixel(-1, 0, 255, 0, 0);
        buf.set_pixel(0, 4, 255, 0, 0);
        buf.set_pixel(4, 0, 255, 0, 0);
        assert!(buf.data.iter().all(|&b| b == 0));
        buf.set_pixel(3, 3, 255, 0, 0);
        let idx = (3 * 4 + 3) * 4;
        assert_eq!(buf.data[idx], 255);
        assert_eq!(buf.data[idx + 3], 255);
    }

    #[test]
    fn test_resize_clears_buffer() {
        let mut buf = PixelBuffer::new(2, 2);
        buf.set_pixel(0, 0, 9, 9, 9);
        buf.resize(8, 8);
        assert_eq!(buf.data.len(), 8 * 8 * 4);
        assert!(buf.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_triangle_covers_interior() {
        let scene = test_scene();
        let mut buf = PixelBuffer::new(32, 32);
        let mut depth = vec![f32::INFINITY; 32 * 32];
        // Counter-clockwise in screen space (y grows downward)
        let v0 = vertex(4.0, 4.0, 0.5);
        let v1 = vertex(4.0, 28.0, 0.5);
        let v2 = vertex(28.0, 4.0, 0.5);
        draw_triangle(
            &v0,
            &v1,
            &v2,
            Vec3::Z,
            &Material::steel(),
            &scene,
            Vec3::new(0.0, 0.0, 5.0),
            &mut buf,
            &mut depth,
        );
        // Centroid pixel is written, far corner is not
        let centroid = ((12 * 32) + 12) * 4;
        assert_eq!(buf.data[centroid + 3], 255);
        let outside = ((30 * 32) + 30) * 4;
        assert_eq!(buf.data[outside + 3], 0);
        assert!(depth[12 * 32 + 12] < f32::INFINITY);
    }

    #[test]
    fn test_triangle_backface_rejected() {
        let scene = test_scene();
        let mut buf = PixelBuffer::new(32, 32);
        let mut depth = vec![f32::INFINITY; 32 * 32];
        // Clockwise winding (negative area) must draw nothing
        let v0 = vertex(4.0, 4.0, 0.5);
        let v1 = vertex(28.0, 4.0, 0.5);
        let v2 = vertex(4.0, 28.0, 0.5);
        draw_triangle(
            &v0,
            &v1,
            &v2,
            Vec3::Z,
            &Material::steel(),
            &scene,
            Vec3::new(0.0, 0.0, 5.0),
            &mut buf,
            &mut depth,
        );
        assert!(buf.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_depth_test_keeps_nearer_fragment() {
        let scene = test_scene();
        let material = Material::steel();
        let mut buf = PixelBuffer::new(16, 16);
        let mut depth = vec![f32::INFINITY; 16 * 16];
        let near = |z| {
            (
                vertex(1.0, 1.0, z),
                vertex(1.0, 14.0, z),
                vertex(14.0, 1.0, z),
            )
        };
        let (a, b, c) = near(0.2);
        draw_triangle(
            &a,
            &b,
            &c,
            Vec3::Z,
            &material,
            &scene,
            Vec3::new(0.0, 0.0, 5.0),
            &mut buf,
            &mut depth,
        );
        let z_after_near = depth[5 * 16 + 5];
        let (a, b, c) = near(0.8);
        draw_triangle(
            &a,
            &b,
            &c,
            Vec3::Z,
            &material,
            &scene,
            Vec3::new(0.0, 0.0, 5.0),
            &mut buf,
            &mut depth,
        );
        assert_eq!(depth[5 * 16 + 5], z_after_near);
    }

    #[test]
    fn test_line_endpoints_written() {
        let mut buf = PixelBuffer::new(16, 16);
        let mut depth = vec![f32::INFINITY; 16 * 16];
        let v0 = vertex(2.0, 2.0, 0.5);
        let v1 = vertex(13.0, 9.0, 0.5);
        draw_line(&v0, &v1, (10, 10, 10), &mut buf, &mut depth);
        assert_eq!(buf.data[((2 * 16) + 2) * 4 + 3], 255);
        assert_eq!(buf.data[((9 * 16) + 13) * 4 + 3], 255);
    }

    #[test]
    fn test_line_clips_outside_buffer() {
        let mut buf = PixelBuffer::new(8, 8);
        let mut depth = vec![f32::INFINITY; 8 * 8];
        let v0 = vertex(-5.0, 3.0, 0.5);
        let v1 = vertex(12.0, 3.0, 0.5);
        draw_line(&v0, &v1, (10, 10, 10), &mut buf, &mut depth);
        // In-bounds span written, nothing panicked
        assert_eq!(buf.data[((3 * 8) + 0) * 4 + 3], 255);
        assert_eq!(buf.data[((3 * 8) + 7) * 4 + 3], 255);
    }

    #[test]
    fn test_render_produces_pixels() {
        let mut scene = test_scene();
        scene.environment = Some(super::super::envmap::EnvMapGenerator::new().bake(
            super::super::envmap::SPHERE_COLOR,
        ));
        let camera = Camera::new();
        let mut buf = PixelBuffer::new(64, 64);
        let mut depth = vec![f32::INFINITY; 64 * 64];
        render(
            &scene,
            &camera,
            Vec2::new(-1.0, 0.7),
            &mut buf,
            &mut depth,
        );
        let covered = buf.data.chunks_exact(4).filter(|p| p[3] == 255).count();
        assert!(covered > 0, "cube should cover some pixels");
        // Alpha outside the cube stays transparent
        assert!(covered < 64 * 64);
    }

    #[test]
    fn test_ambient_shading_floor() {
        let scene = test_scene();
        let material = Material::steel();
        // Normal facing away from every light still receives ambient
        let c = shade(
            &scene,
            Vec3::new(0.0, 0.0, 5.5),
            Vec3::ZERO,
            Vec3::new(0.0, -1.0, 0.0),
            &material,
        );
        assert!(c.length() > 0.0);
    }

    #[test]
    fn test_tone_map_saturates() {
        let (r, g, b) = tone_map(Vec3::splat(100.0));
        assert_eq!((r, g, b), (255, 255, 255));
        let (r, _, _) = tone_map(Vec3::ZERO);
        assert_eq!(r, 0);
    }
}
