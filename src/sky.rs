//! Sky cubemap reflected by the metaball surface.
//!
//! Faces are stored as RGBA8 in wgpu layer order: +X, −X, +Y, −Y, +Z, −Z.
//! A directory of face images can be loaded with [`Cubemap::load_dir`]:
//!
//! ```text
//! sky/
//!   px.png nx.png py.png ny.png pz.png nz.png
//! ```
//!
//! Without one, [`Cubemap::procedural`] paints a horizon gradient.

use std::path::Path;

use glam::Vec3;

use crate::error::TextureError;
use crate::grid::MAX_TEXTURE_SIDE;

/// File stems for each face, in layer order.
pub const FACE_NAMES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];

const FACE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Six square RGBA8 faces.
#[derive(Clone, Debug)]
pub struct Cubemap {
    /// Edge length of every face in pixels.
    pub size: u32,
    pub faces: [Vec<u8>; 6],
}

impl Cubemap {
    /// Generate a gradient sky with a bright horizon band.
    pub fn procedural(size: u32) -> Self {
        let size = size.clamp(1, MAX_TEXTURE_SIDE);
        let faces = std::array::from_fn(|face| {
            let mut data = Vec::with_capacity((size * size * 4) as usize);
            for y in 0..size {
                for x in 0..size {
                    let u = (x as f32 + 0.5) / size as f32;
                    let v = (y as f32 + 0.5) / size as f32;
                    let color = sky_color(face_direction(face, u, v));
                    data.extend_from_slice(&[
                        (color.x.clamp(0.0, 1.0) * 255.0) as u8,
                        (color.y.clamp(0.0, 1.0) * 255.0) as u8,
                        (color.z.clamp(0.0, 1.0) * 255.0) as u8,
                        255,
                    ]);
                }
            }
            data
        });
        Self { size, faces }
    }

    /// Load six face images from `dir`.
    ///
    /// # Errors
    ///
    /// Fails if a face is missing, cannot be decoded, exceeds
    /// [`MAX_TEXTURE_SIDE`], is not square, or differs in size from the
    /// first face.
    pub fn load_dir(dir: &Path) -> Result<Self, TextureError> {
        let mut size = None;
        let mut faces: [Vec<u8>; 6] = Default::default();

        for (slot, &face) in FACE_NAMES.iter().enumerate() {
            let path = FACE_EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!("{}.{}", face, ext)))
                .find(|p| p.is_file())
                .ok_or_else(|| TextureError::MissingFace {
                    dir: dir.to_path_buf(),
                    face,
                })?;

            // Header only, so oversized faces are never decoded
            let (width, height) = image::image_dimensions(&path)?;
            if width > MAX_TEXTURE_SIDE || height > MAX_TEXTURE_SIDE {
                return Err(TextureError::FaceTooLarge {
                    face,
                    width,
                    height,
                    max: MAX_TEXTURE_SIDE,
                });
            }

            let expected = *size.get_or_insert(width);
            if width != height || width != expected {
                return Err(TextureError::FaceSize {
                    face,
                    width,
                    height,
                    expected,
                });
            }
            faces[slot] = image::open(&path)?.to_rgba8().into_raw();
        }

        let size = size.unwrap_or(1);
        log::info!("Loaded {}x{} sky cubemap from {}", size, size, dir.display());
        Ok(Self { size, faces })
    }

    /// Bytes per face row.
    pub fn bytes_per_row(&self) -> u32 {
        self.size * 4
    }
}

/// World direction through texel `(u, v)` of `face`, both in 0..1.
///
/// Follows the cubemap convention used by wgpu/WebGPU, where `v` runs down
/// each face.
pub fn face_direction(face: usize, u: f32, v: f32) -> Vec3 {
    let s = u * 2.0 - 1.0;
    let t = v * 2.0 - 1.0;
    let dir = match face {
        0 => Vec3::new(1.0, -t, -s),
        1 => Vec3::new(-1.0, -t, s),
        2 => Vec3::new(s, 1.0, t),
        3 => Vec3::new(s, -1.0, -t),
        4 => Vec3::new(s, -t, 1.0),
        _ => Vec3::new(-s, -t, -1.0),
    };
    dir.normalize()
}

fn sky_color(dir: Vec3) -> Vec3 {
    let zenith = Vec3::new(0.10, 0.22, 0.45);
    let horizon = Vec3::new(0.85, 0.80, 0.72);
    let ground = Vec3::new(0.12, 0.10, 0.09);
    if dir.y >= 0.0 {
        horizon.lerp(zenith, dir.y.powf(0.5))
    } else {
        horizon.lerp(ground, (-dir.y).powf(0.35))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_procedural_layout() {
        let sky = Cubemap::procedural(8);
        assert_eq!(sky.size, 8);
        for face in &sky.faces {
            assert_eq!(face.len(), 8 * 8 * 4);
            assert!(face.chunks(4).all(|px| px[3] == 255));
        }
    }

    #[test]
    fn test_face_centers() {
        let centers = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for (face, expected) in centers.iter().enumerate() {
            let dir = face_direction(face, 0.5, 0.5);
            assert!((dir - *expected).length() < 1e-5, "face {}", face);
        }
    }

    #[test]
    fn test_top_row_of_side_faces_points_up() {
        for face in [0, 1, 4, 5] {
            assert!(face_direction(face, 0.5, 0.0).y > 0.0);
        }
    }

    #[test]
    fn test_sky_brighter_above_horizon_than_below() {
        let sky = Cubemap::procedural(4);
        let up = &sky.faces[2];
        let down = &sky.faces[3];
        let brightness = |face: &[u8]| face.iter().map(|&b| b as u32).sum::<u32>();
        assert!(brightness(up) > brightness(down));
    }

    #[test]
    fn test_missing_face_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = Cubemap::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, TextureError::MissingFace { face: "px", .. }));
    }

    #[test]
    fn test_load_dir_rejects_mismatched_faces() {
        let dir = tempfile::tempdir().unwrap();
        for (i, face) in FACE_NAMES.iter().enumerate() {
            let size = if i == 3 { 8 } else { 4 };
            image::RgbaImage::new(size, size)
                .save(dir.path().join(format!("{}.png", face)))
                .unwrap();
        }
        let err = Cubemap::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, TextureError::FaceSize { face: "ny", expected: 4, .. }));
    }

    #[test]
    fn test_load_dir_rejects_face_past_texture_limit() {
        let dir = tempfile::tempdir().unwrap();
        for (i, face) in FACE_NAMES.iter().enumerate() {
            let width = if i == 1 { MAX_TEXTURE_SIDE + 1 } else { 4 };
            let height = if i == 1 { 1 } else { 4 };
            image::RgbaImage::new(width, height)
                .save(dir.path().join(format!("{}.png", face)))
                .unwrap();
        }
        let err = Cubemap::load_dir(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            TextureError::FaceTooLarge { face: "nx", max: MAX_TEXTURE_SIDE, .. }
        ));
    }

    #[test]
    fn test_procedural_size_is_capped() {
        assert_eq!(Cubemap::procedural(0).size, 1);
        assert_eq!(Cubemap::procedural(8).size, 8);
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        for face in FACE_NAMES {
            image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]))
                .save(dir.path().join(format!("{}.png", face)))
                .unwrap();
        }
        let sky = Cubemap::load_dir(dir.path()).unwrap();
        assert_eq!(sky.size, 4);
        assert_eq!(&sky.faces[5][..4], &[10, 20, 30, 255]);
    }
}
