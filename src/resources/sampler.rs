//! Runtime-adjustable sampler settings for the textured quad lab.

use crate::backend::types::{FilterMode, SamplerDescriptor};

/// Highest anisotropy level the GUI offers.
pub const MAX_ANISOTROPY: f32 = 16.0;

/// Magnification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MagFilter {
    Nearest,
    #[default]
    Linear,
}

impl MagFilter {
    pub const ALL: [MagFilter; 2] = [MagFilter::Nearest, MagFilter::Linear];

    pub fn label(&self) -> &'static str {
        match self {
            MagFilter::Nearest => "Nearest",
            MagFilter::Linear => "Linear",
        }
    }

    fn filter_mode(&self) -> FilterMode {
        match self {
            MagFilter::Nearest => FilterMode::Nearest,
            MagFilter::Linear => FilterMode::Linear,
        }
    }
}

/// Minification filter, including the four mipmapped combinations.
///
/// The first word picks the texel filter within a level, the second picks
/// how neighbouring mip levels are blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapNearest,
    #[default]
    LinearMipmapLinear,
}

impl MinFilter {
    pub const ALL: [MinFilter; 6] = [
        MinFilter::Nearest,
        MinFilter::Linear,
        MinFilter::NearestMipmapNearest,
        MinFilter::NearestMipmapLinear,
        MinFilter::LinearMipmapNearest,
        MinFilter::LinearMipmapLinear,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MinFilter::Nearest => "Nearest",
            MinFilter::Linear => "Linear",
            MinFilter::NearestMipmapNearest => "Nearest, mipmap nearest",
            MinFilter::NearestMipmapLinear => "Nearest, mipmap linear",
            MinFilter::LinearMipmapNearest => "Linear, mipmap nearest",
            MinFilter::LinearMipmapLinear => "Linear, mipmap linear",
        }
    }

    /// Whether sampling reads anything other than level 0
    pub fn uses_mipmaps(&self) -> bool {
        !matches!(self, MinFilter::Nearest | MinFilter::Linear)
    }

    fn texel_filter(&self) -> FilterMode {
        match self {
            MinFilter::Nearest | MinFilter::NearestMipmapNearest | MinFilter::NearestMipmapLinear => {
                FilterMode::Nearest
            }
            MinFilter::Linear | MinFilter::LinearMipmapNearest | MinFilter::LinearMipmapLinear => {
                FilterMode::Linear
            }
        }
    }

    fn mipmap_filter(&self) -> FilterMode {
        match self {
            MinFilter::NearestMipmapLinear | MinFilter::LinearMipmapLinear => FilterMode::Linear,
            _ => FilterMode::Nearest,
        }
    }
}

/// Sampler state the quad lab exposes in its GUI.
///
/// Texture coordinates always clamp to the edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerSettings {
    pub mag_filter: MagFilter,
    pub min_filter: MinFilter,
    /// Requested anisotropy, 1..=16
    pub anisotropy: f32,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            mag_filter: MagFilter::default(),
            min_filter: MinFilter::default(),
            anisotropy: MAX_ANISOTROPY,
        }
    }
}

impl SamplerSettings {
    /// Anisotropy level actually applied to the sampler.
    ///
    /// wgpu only accepts values above 1 when every filter is linear.
    pub fn effective_anisotropy(&self) -> u16 {
        let all_linear = self.mag_filter == MagFilter::Linear
            && self.min_filter.texel_filter() == FilterMode::Linear
            && self.min_filter.mipmap_filter() == FilterMode::Linear;
        if !all_linear {
            return 1;
        }

        let level = self.anisotropy.round();
        if level.is_nan() {
            1
        } else {
            level.clamp(1.0, MAX_ANISOTROPY) as u16
        }
    }

    pub fn descriptor(&self) -> SamplerDescriptor {
        let lod_max_clamp = if self.min_filter.uses_mipmaps() { 32.0 } else { 0.0 };

        SamplerDescriptor {
            label: Some("Quad Sampler".to_string()),
            mag_filter: self.mag_filter.filter_mode(),
            min_filter: self.min_filter.texel_filter(),
            mipmap_filter: self.min_filter.mipmap_filter(),
            lod_min_clamp: 0.0,
            lod_max_clamp,
            anisotropy_clamp: self.effective_anisotropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = SamplerSettings::default();
        assert_eq!(settings.mag_filter, MagFilter::Linear);
        assert_eq!(settings.min_filter, MinFilter::LinearMipmapLinear);
        assert_eq!(settings.anisotropy, 16.0);
        assert_eq!(settings.descriptor().anisotropy_clamp, 16);
    }

    #[test]
    fn test_min_filter_mapping() {
        let expected = [
            (MinFilter::Nearest, FilterMode::Nearest, FilterMode::Nearest, 0.0),
            (MinFilter::Linear, FilterMode::Linear, FilterMode::Nearest, 0.0),
            (MinFilter::NearestMipmapNearest, FilterMode::Nearest, FilterMode::Nearest, 32.0),
            (MinFilter::NearestMipmapLinear, FilterMode::Nearest, FilterMode::Linear, 32.0),
            (MinFilter::LinearMipmapNearest, FilterMode::Linear, FilterMode::Nearest, 32.0),
            (MinFilter::LinearMipmapLinear, FilterMode::Linear, FilterMode::Linear, 32.0),
        ];

        for (min_filter, texel, mipmap, lod_max) in expected {
            let desc = SamplerSettings {
                min_filter,
                ..Default::default()
            }
            .descriptor();
            assert_eq!(desc.min_filter, texel, "{:?}", min_filter);
            assert_eq!(desc.mipmap_filter, mipmap, "{:?}", min_filter);
            assert_eq!(desc.lod_min_clamp, 0.0);
            assert_eq!(desc.lod_max_clamp, lod_max, "{:?}", min_filter);
        }
    }

    #[test]
    fn test_mag_filter_mapping() {
        let desc = SamplerSettings {
            mag_filter: MagFilter::Nearest,
            ..Default::default()
        }
        .descriptor();
        assert_eq!(desc.mag_filter, FilterMode::Nearest);
    }

    #[test]
    fn test_anisotropy_is_rounded_and_clamped() {
        let with = |anisotropy| SamplerSettings {
            anisotropy,
            ..Default::default()
        };
        assert_eq!(with(4.4).effective_anisotropy(), 4);
        assert_eq!(with(4.6).effective_anisotropy(), 5);
        assert_eq!(with(0.0).effective_anisotropy(), 1);
        assert_eq!(with(100.0).effective_anisotropy(), 16);
        assert_eq!(with(f32::NAN).effective_anisotropy(), 1);
    }

    #[test]
    fn test_anisotropy_requires_linear_filters() {
        for min_filter in MinFilter::ALL {
            let settings = SamplerSettings {
                min_filter,
                ..Default::default()
            };
            let expected = if min_filter == MinFilter::LinearMipmapLinear { 16 } else { 1 };
            assert_eq!(settings.effective_anisotropy(), expected, "{:?}", min_filter);
        }

        let nearest_mag = SamplerSettings {
            mag_filter: MagFilter::Nearest,
            ..Default::default()
        };
        assert_eq!(nearest_mag.descriptor().anisotropy_clamp, 1);
    }

    #[test]
    fn test_labels_are_unique() {
        let labels: std::collections::HashSet<_> = MinFilter::ALL.iter().map(|f| f.label()).collect();
        assert_eq!(labels.len(), MinFilter::ALL.len());
        assert_ne!(MagFilter::Nearest.label(), MagFilter::Linear.label());
    }
}
