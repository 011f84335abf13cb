//! Texture loading and management

use crate::backend::traits::*;
use crate::backend::types::*;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Image loading error type
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to load image {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Image {0} has zero size")]
    Empty(PathBuf),
}

/// Loaded texture data
///
/// `levels[0]` is the full-size image; further entries are successive mip
/// levels, each half the size of the previous one.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    /// Channels stored per texel in `levels`
    pub channels: u32,
    pub format: TextureFormat,
    pub levels: Vec<Vec<u8>>,
    pub name: String,
}

fn texture_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn open_image(path: &Path, flip: bool) -> Result<DynamicImage, TextureError> {
    let img = image::open(path).map_err(|source| TextureError::Load {
        path: path.to_path_buf(),
        source,
    })?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(TextureError::Empty(path.to_path_buf()));
    }

    log::info!(
        "Loaded {} ({}x{}, {} channels)",
        path.display(),
        width,
        height,
        img.color().channel_count()
    );

    Ok(if flip { img.flipv() } else { img })
}

impl TextureData {
    /// Load an RGBA8 sRGB texture from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let img = open_image(path, false)?;
        Ok(Self::from_rgba(img, &texture_name(path)))
    }

    /// Load a single-channel float height map.
    ///
    /// 8-bit sources are normalized into `0..=1`.
    pub fn load_height_field<P: AsRef<Path>>(path: P, flip: bool) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let img = open_image(path, flip)?;
        let (width, height) = img.dimensions();
        let luma = img.to_luma32f();

        Ok(Self {
            width,
            height,
            channels: 1,
            format: TextureFormat::R32Float,
            levels: vec![bytemuck::cast_slice::<f32, u8>(luma.as_raw()).to_vec()],
            name: texture_name(path),
        })
    }

    /// Load a diffuse map; RGB sources are widened to RGBA8 since GPUs have
    /// no three-channel 8-bit format.
    pub fn load_diffuse<P: AsRef<Path>>(path: P, flip: bool) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let img = open_image(path, flip)?;
        Ok(Self::from_rgba(img, &texture_name(path)))
    }

    fn from_rgba(img: DynamicImage, name: &str) -> Self {
        let (width, height) = img.dimensions();
        let rgba = img.to_rgba8();

        Self {
            width,
            height,
            channels: 4,
            format: TextureFormat::Rgba8UnormSrgb,
            levels: vec![rgba.into_raw()],
            name: name.to_string(),
        }
    }

    /// Create a solid color texture
    pub fn solid_color(color: [u8; 4], name: &str) -> Self {
        Self {
            width: 1,
            height: 1,
            channels: 4,
            format: TextureFormat::Rgba8UnormSrgb,
            levels: vec![color.to_vec()],
            name: name.to_string(),
        }
    }

    /// Create a default white texture
    pub fn white() -> Self {
        Self::solid_color([255, 255, 255, 255], "white")
    }

    /// A single zero-height texel
    pub fn flat_height() -> Self {
        Self {
            width: 1,
            height: 1,
            channels: 1,
            format: TextureFormat::R32Float,
            levels: vec![0.0f32.to_ne_bytes().to_vec()],
            name: "flat_height".to_string(),
        }
    }

    /// Create a checkerboard texture
    pub fn checkerboard(size: u32, color1: [u8; 4], color2: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let is_even = ((x / 8) + (y / 8)) % 2 == 0;
                let color = if is_even { color1 } else { color2 };
                data.extend_from_slice(&color);
            }
        }

        Self {
            width: size,
            height: size,
            channels: 4,
            format: TextureFormat::Rgba8UnormSrgb,
            levels: vec![data],
            name: "checkerboard".to_string(),
        }
    }

    /// Base level pixels
    pub fn data(&self) -> &[u8] {
        self.levels.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn mip_level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    /// Size of a mip level, never below 1x1
    pub fn level_size(&self, level: u32) -> (u32, u32) {
        ((self.width >> level).max(1), (self.height >> level).max(1))
    }

    /// Number of levels in a full chain down to 1x1
    pub fn full_mip_count(width: u32, height: u32) -> u32 {
        32 - width.max(height).max(1).leading_zeros()
    }

    /// Build a full mip chain on the CPU.
    ///
    /// Only RGBA8 payloads are filtered; float height maps are sampled with
    /// `textureLoad` and keep their single level.
    pub fn with_mipmaps(mut self) -> Self {
        if self.channels != 4 || self.format.is_depth() || !self.format.is_filterable() {
            log::debug!("Skipping mip chain for {} ({:?})", self.name, self.format);
            return self;
        }

        let Some(base) = image::RgbaImage::from_raw(self.width, self.height, self.data().to_vec())
        else {
            log::warn!("Texture {} has a malformed payload, keeping a single level", self.name);
            return self;
        };

        self.levels.truncate(1);
        for level in 1..Self::full_mip_count(self.width, self.height) {
            let (width, height) = self.level_size(level);
            let resized = image::imageops::resize(&base, width, height, FilterType::Triangle);
            self.levels.push(resized.into_raw());
        }

        self
    }
}

/// GPU texture with its view
pub struct GpuTexture {
    pub handle: TextureHandle,
    pub view: TextureViewHandle,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub name: String,
}

impl GpuTexture {
    /// Create and upload every mip level of a texture to the GPU
    pub fn create<B: GraphicsBackend>(
        backend: &mut B,
        data: &TextureData,
    ) -> BackendResult<Self> {
        let handle = backend.create_texture(&TextureDescriptor {
            label: Some(data.name.clone()),
            width: data.width,
            height: data.height,
            mip_levels: data.mip_level_count().max(1),
            format: data.format,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        })?;

        let view = match backend.create_texture_view(handle) {
            Ok(view) => view,
            Err(e) => {
                backend.destroy_texture(handle);
                return Err(e);
            }
        };

        for (level, pixels) in data.levels.iter().enumerate() {
            let (width, height) = data.level_size(level as u32);
            backend.write_texture(handle, level as u32, pixels, width, height);
        }

        Ok(Self {
            handle,
            view,
            width: data.width,
            height: data.height,
            format: data.format,
            name: data.name.clone(),
        })
    }

    /// Release the view and the texture
    pub fn destroy<B: GraphicsBackend>(self, backend: &mut B) {
        backend.destroy_texture_view(self.view);
        backend.destroy_texture(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("terrain_labs_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = TextureData::from_file(temp_path("does_not_exist.png")).unwrap_err();
        assert!(matches!(err, TextureError::Load { .. }));
        assert!(err.to_string().contains("does_not_exist.png"));
    }

    #[test]
    fn test_diffuse_widens_rgb_to_rgba() {
        let path = temp_path("diffuse.png");
        image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let data = TextureData::load_diffuse(&path, false).unwrap();
        assert_eq!((data.width, data.height), (3, 2));
        assert_eq!(data.channels, 4);
        assert_eq!(data.format, TextureFormat::Rgba8UnormSrgb);
        assert_eq!(data.data().len(), 3 * 2 * 4);
        assert_eq!(&data.data()[..4], &[10, 20, 30, 255]);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_flip_reverses_rows() {
        let path = temp_path("flip.png");
        let img = image::RgbImage::from_fn(2, 2, |_, y| {
            if y == 0 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        });
        img.save(&path).unwrap();

        let upright = TextureData::load_diffuse(&path, false).unwrap();
        let flipped = TextureData::load_diffuse(&path, true).unwrap();
        assert_eq!(&upright.data()[..4], &[255, 0, 0, 255]);
        assert_eq!(&flipped.data()[..4], &[0, 0, 255, 255]);
        assert_eq!(&flipped.data()[8..12], &[255, 0, 0, 255]);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_height_field_is_single_float_channel() {
        let path = temp_path("height.png");
        image::GrayImage::from_fn(2, 2, |x, y| image::Luma([if x + y == 0 { 255 } else { 0 }]))
            .save(&path)
            .unwrap();

        let data = TextureData::load_height_field(&path, false).unwrap();
        assert_eq!(data.channels, 1);
        assert_eq!(data.format, TextureFormat::R32Float);
        assert_eq!(data.data().len(), 2 * 2 * 4);

        let heights: Vec<f32> = data
            .data()
            .chunks_exact(4)
            .map(|texel| f32::from_ne_bytes([texel[0], texel[1], texel[2], texel[3]]))
            .collect();
        assert!((heights[0] - 1.0).abs() < 1e-6);
        assert!(heights[1].abs() < 1e-6);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_mip_chain_halves_to_one() {
        let data = TextureData::checkerboard(16, [255; 4], [0, 0, 0, 255]).with_mipmaps();
        assert_eq!(data.mip_level_count(), 5);
        for level in 0..data.mip_level_count() {
            let (width, height) = data.level_size(level);
            assert_eq!(width, 16 >> level);
            assert_eq!(data.levels[level as usize].len(), (width * height * 4) as usize);
        }
        assert_eq!(data.level_size(4), (1, 1));
    }

    #[test]
    fn test_mip_chain_for_non_square_texture() {
        assert_eq!(TextureData::full_mip_count(8, 2), 4);
        assert_eq!(TextureData::full_mip_count(1, 1), 1);

        let mut data = TextureData::white();
        data.width = 8;
        data.height = 2;
        data.levels = vec![vec![255; 8 * 2 * 4]];
        let data = data.with_mipmaps();
        assert_eq!(data.level_size(3), (1, 1));
        assert_eq!(data.levels[3].len(), 4);
    }

    #[test]
    fn test_height_field_keeps_single_level() {
        let data = TextureData::flat_height().with_mipmaps();
        assert_eq!(data.mip_level_count(), 1);
        assert_eq!(data.data(), &0.0f32.to_ne_bytes());
    }
}
