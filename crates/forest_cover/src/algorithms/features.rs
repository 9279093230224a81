//! Per-pixel feature channels.
//!
//! Channels use the 8-bit conventions of common vision toolkits: hue is halved into `0..180`,
//! saturation/value/lightness are scaled to `0..=255`, LAB lightness is scaled from `0..=100`
//! to `0..=255` and the opponent channels `a`/`b` are offset by 128.

use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use palette::{FromColor, Hsl, Hsv, Lab, Srgb};

/// Floating point feature channel
pub type FloatChannel = ImageBuffer<Luma<f32>, Vec<f32>>;

#[derive(Debug, Clone)]
pub struct FeatureChannels {
    pub hsv_h: GrayImage,
    pub hsv_s: GrayImage,
    pub hsv_v: GrayImage,
    pub lab_l: GrayImage,
    pub lab_a: GrayImage,
    pub lab_b: GrayImage,
    pub hls_h: GrayImage,
    pub hls_l: GrayImage,
    pub hls_s: GrayImage,
    pub red: GrayImage,
    pub green: GrayImage,
    pub blue: GrayImage,
    /// Luminance `0.299 R + 0.587 G + 0.114 B`
    pub gray: GrayImage,
    /// `(G - R) / (G + R + 1)`
    pub ndvi: FloatChannel,
    /// `G - 0.5 (R + B)`
    pub green_excess: FloatChannel,
}

impl FeatureChannels {
    pub fn extract(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let gray_channel = || GrayImage::new(width, height);

        let mut channels = Self {
            hsv_h: gray_channel(),
            hsv_s: gray_channel(),
            hsv_v: gray_channel(),
            lab_l: gray_channel(),
            lab_a: gray_channel(),
            lab_b: gray_channel(),
            hls_h: gray_channel(),
            hls_l: gray_channel(),
            hls_s: gray_channel(),
            red: gray_channel(),
            green: gray_channel(),
            blue: gray_channel(),
            gray: gray_channel(),
            ndvi: FloatChannel::new(width, height),
            green_excess: FloatChannel::new(width, height),
        };

        for (x, y, pixel) in image.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            let srgb = Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);

            let hsv: Hsv = Hsv::from_color(srgb);
            channels.hsv_h.put_pixel(x, y, Luma([hue_to_u8(hsv.hue.into_positive_degrees())]));
            channels.hsv_s.put_pixel(x, y, Luma([unit_to_u8(hsv.saturation)]));
            channels.hsv_v.put_pixel(x, y, Luma([unit_to_u8(hsv.value)]));

            let hsl: Hsl = Hsl::from_color(srgb);
            channels.hls_h.put_pixel(x, y, Luma([hue_to_u8(hsl.hue.into_positive_degrees())]));
            channels.hls_l.put_pixel(x, y, Luma([unit_to_u8(hsl.lightness)]));
            channels.hls_s.put_pixel(x, y, Luma([unit_to_u8(hsl.saturation)]));

            let lab: Lab = Lab::from_color(srgb);
            channels.lab_l.put_pixel(x, y, Luma([to_u8(lab.l * 255.0 / 100.0)]));
            channels.lab_a.put_pixel(x, y, Luma([to_u8(lab.a + 128.0)]));
            channels.lab_b.put_pixel(x, y, Luma([to_u8(lab.b + 128.0)]));

            channels.red.put_pixel(x, y, Luma([r]));
            channels.green.put_pixel(x, y, Luma([g]));
            channels.blue.put_pixel(x, y, Luma([b]));
            channels.gray.put_pixel(x, y, Luma([luminance(r, g, b)]));

            let (rf, gf, bf) = (r as f32, g as f32, b as f32);
            channels.ndvi.put_pixel(x, y, Luma([(gf - rf) / (gf + rf + 1.0)]));
            channels.green_excess.put_pixel(x, y, Luma([gf - 0.5 * (rf + bf)]));
        }

        channels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.red.dimensions()
    }
}

pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    to_u8(0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32)
}

fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn unit_to_u8(value: f32) -> u8 {
    to_u8(value * 255.0)
}

fn hue_to_u8(degrees: f32) -> u8 {
    ((degrees / 2.0).round() as u32 % 180) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn single(r: u8, g: u8, b: u8) -> FeatureChannels {
        FeatureChannels::extract(&RgbImage::from_pixel(1, 1, Rgb([r, g, b])))
    }

    fn at(channel: &GrayImage) -> u8 {
        channel.get_pixel(0, 0)[0]
    }

    #[test]
    fn test_pure_green() {
        let f = single(0, 255, 0);
        assert_eq!(at(&f.hsv_h), 60);
        assert_eq!(at(&f.hsv_s), 255);
        assert_eq!(at(&f.hsv_v), 255);
        assert_eq!(at(&f.hls_h), 60);
        assert!(at(&f.lab_a) < 100, "green has negative a: {}", at(&f.lab_a));
        assert_eq!(at(&f.gray), 150);
    }

    #[test]
    fn test_pure_red() {
        let f = single(255, 0, 0);
        assert_eq!(at(&f.hsv_h), 0);
        assert_eq!(at(&f.hsv_s), 255);
        assert!(at(&f.lab_a) > 180, "red has strongly positive a: {}", at(&f.lab_a));
        assert_eq!(at(&f.hls_l), 128);
    }

    #[test]
    fn test_neutral_gray_is_achromatic() {
        let f = single(100, 100, 100);
        assert_eq!(at(&f.hsv_s), 0);
        assert_eq!(at(&f.hls_s), 0);
        assert_eq!(at(&f.lab_a), 128);
        assert_eq!(at(&f.lab_b), 128);
        assert_eq!(at(&f.gray), 100);
        assert_eq!(f.ndvi.get_pixel(0, 0)[0], 0.0);
        assert_eq!(f.green_excess.get_pixel(0, 0)[0], 0.0);
    }

    #[test]
    fn test_vegetation_indices() {
        let f = single(10, 110, 30);
        let ndvi = f.ndvi.get_pixel(0, 0)[0];
        assert!((ndvi - 100.0 / 121.0).abs() < 1e-6);
        assert_eq!(f.green_excess.get_pixel(0, 0)[0], 90.0);
    }
}
