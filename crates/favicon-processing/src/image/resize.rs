use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> FilterType {
        let width_ratio = orig_width as f32 / new_width as f32;
        let height_ratio = orig_height as f32 / new_height as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            FilterType::Triangle
        } else if max_ratio > 1.5 {
            FilterType::CatmullRom
        } else {
            FilterType::Lanczos3
        }
    }

    /// Scale to fill a `size`×`size` square, cropping the overflow around the centre.
    pub fn cover_fit(img: &DynamicImage, size: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let filter = Self::select_filter(orig_width, orig_height, size, size);
        img.resize_to_fill(size, size, filter)
    }

    /// Canonical RGBA base every target is derived from.
    pub fn normalize_base(img: &DynamicImage, base_size: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(Self::cover_fit(img, base_size).to_rgba8())
    }
}
