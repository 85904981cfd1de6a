//! Layout of particles on square textures.
//!
//! Particle `i` is stored at texel `(i % side, i / side)` of every particle
//! texture, and kernels run in 8×8 workgroups over the `side × side` grid.

use crate::error::ConfigError;

/// Compute workgroup edge length. Must match `@workgroup_size` in the kernels.
pub const WORKGROUP_EDGE: u32 = 8;

/// Largest 2D texture edge the device is requested with
/// (`wgpu::Limits::default().max_texture_dimension_2d`).
pub const MAX_TEXTURE_SIDE: u32 = 8192;

/// Square texture layout for a fixed particle count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParticleGrid {
    count: u32,
    side: u32,
}

impl ParticleGrid {
    /// Build the layout for `count` particles.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParticleCount`] if `count` is zero or
    /// not a perfect square, and [`ConfigError::ParticleGridTooLarge`] if the
    /// textures would exceed [`MAX_TEXTURE_SIDE`].
    pub fn new(count: u32) -> Result<Self, ConfigError> {
        let side = (count as f64).sqrt().floor() as u32;
        if count == 0 || side * side != count {
            return Err(ConfigError::InvalidParticleCount(count));
        }
        if side > MAX_TEXTURE_SIDE {
            return Err(ConfigError::ParticleGridTooLarge {
                count,
                side,
                max: MAX_TEXTURE_SIDE,
            });
        }
        Ok(Self { count, side })
    }

    /// Total number of particles.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Edge length of the particle textures in texels.
    #[inline]
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Workgroups to dispatch along each of x and y.
    #[inline]
    pub fn workgroups(&self) -> u32 {
        self.side.div_ceil(WORKGROUP_EDGE)
    }

    /// Texel holding particle `index`, or `None` past the end.
    pub fn texel_of(&self, index: u32) -> Option<(u32, u32)> {
        (index < self.count).then(|| (index % self.side, index / self.side))
    }

    /// Texture extent for wgpu.
    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.side,
            height: self.side,
            depth_or_array_layers: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_count() {
        let grid = ParticleGrid::new(64).unwrap();
        assert_eq!(grid.side(), 8);
        assert_eq!(grid.workgroups(), 1);
    }

    #[test]
    fn test_workgroups_round_up() {
        // 4x4 would dispatch zero groups with truncating division
        assert_eq!(ParticleGrid::new(16).unwrap().workgroups(), 1);
        assert_eq!(ParticleGrid::new(100).unwrap().workgroups(), 2);
        assert_eq!(ParticleGrid::new(1024).unwrap().workgroups(), 4);
    }

    #[test]
    fn test_rejects_non_square() {
        assert!(matches!(
            ParticleGrid::new(128),
            Err(ConfigError::InvalidParticleCount(128))
        ));
        assert!(ParticleGrid::new(0).is_err());
        assert!(ParticleGrid::new(1).is_ok());
    }

    #[test]
    fn test_rejects_grid_past_texture_limit() {
        assert_eq!(MAX_TEXTURE_SIDE, wgpu::Limits::default().max_texture_dimension_2d);

        let largest = ParticleGrid::new(MAX_TEXTURE_SIDE * MAX_TEXTURE_SIDE).unwrap();
        assert_eq!(largest.side(), MAX_TEXTURE_SIDE);

        let over = MAX_TEXTURE_SIDE + 1;
        assert!(matches!(
            ParticleGrid::new(over * over),
            Err(ConfigError::ParticleGridTooLarge { side, max: MAX_TEXTURE_SIDE, .. }) if side == over
        ));
        assert!(matches!(
            ParticleGrid::new(100_000_000),
            Err(ConfigError::ParticleGridTooLarge { side: 10_000, .. })
        ));
    }

    #[test]
    fn test_texel_of() {
        let grid = ParticleGrid::new(64).unwrap();
        assert_eq!(grid.texel_of(0), Some((0, 0)));
        assert_eq!(grid.texel_of(9), Some((1, 1)));
        assert_eq!(grid.texel_of(63), Some((7, 7)));
        assert_eq!(grid.texel_of(64), None);
    }
}
