//! Contrast and brightness adjustment.
//!
//! Both operators blend each channel against a degenerate image:
//! `out = base + factor * (value - base)`, truncated and clamped to `0..=255`.
//! Contrast uses the mean luminance as the base, brightness uses black.

use image::{Rgb, RgbImage};

use crate::constants::{BRIGHTNESS_FACTOR, CONTRAST_FACTOR};

/// Pushes a noisy light-gray background towards flat white.
pub fn whiten(image: &mut RgbImage) {
    contrast(image, CONTRAST_FACTOR);
    brightness(image, BRIGHTNESS_FACTOR);
}

/// Scales distance from the mean luminance by `factor`.
pub fn contrast(image: &mut RgbImage, factor: f32) {
    let mean = f32::from(mean_luminance(image));
    blend(image, mean, factor);
}

/// Scales every channel by `factor`.
pub fn brightness(image: &mut RgbImage, factor: f32) {
    blend(image, 0.0, factor);
}

fn blend(image: &mut RgbImage, base: f32, factor: f32) {
    for channel in image.iter_mut() {
        let value = base + factor * (f32::from(*channel) - base);
        *channel = if value <= 0.0 {
            0
        } else if value >= 255.0 {
            255
        } else {
            value as u8
        };
    }
}

/// ITU-R 601-2 luma in 16.16 fixed point.
fn luminance(pixel: &Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    let weighted = u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000;
    (weighted >> 16) as u8
}

/// Mean luma rounded to the nearest integer, 0 for an empty image.
fn mean_luminance(image: &RgbImage) -> u8 {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return 0;
    }
    let total: u64 = image.pixels().map(|pixel| u64::from(luminance(pixel))).sum();
    ((total as f64 / count as f64) + 0.5).floor().min(255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_image_keeps_contrast() {
        let mut image = RgbImage::from_pixel(3, 3, Rgb([120, 120, 120]));
        contrast(&mut image, 2.0);
        assert!(image.pixels().all(|pixel| *pixel == Rgb([120, 120, 120])));
    }

    #[test]
    fn contrast_spreads_from_mean() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, Rgb([0, 0, 0]));
        image.put_pixel(1, 0, Rgb([200, 200, 200]));
        assert_eq!(mean_luminance(&image), 100);
        contrast(&mut image, 2.0);
        assert_eq!(*image.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(1, 0), Rgb([255, 255, 255]));
    }

    #[test]
    fn brightness_scales_and_clamps() {
        let mut image = RgbImage::new(3, 1);
        image.put_pixel(0, 0, Rgb([200, 100, 0]));
        image.put_pixel(1, 0, Rgb([250, 250, 250]));
        image.put_pixel(2, 0, Rgb([10, 11, 12]));
        brightness(&mut image, 1.1);
        assert_eq!(*image.get_pixel(0, 0), Rgb([220, 110, 0]));
        assert_eq!(*image.get_pixel(1, 0), Rgb([255, 255, 255]));
        assert_eq!(*image.get_pixel(2, 0), Rgb([11, 12, 13]));
    }

    #[test]
    fn whiten_flattens_light_gray() {
        let mut image = RgbImage::from_pixel(4, 4, Rgb([230, 230, 230]));
        image.put_pixel(0, 0, Rgb([20, 20, 20]));
        whiten(&mut image);
        assert_eq!(*image.get_pixel(3, 3), Rgb([255, 255, 255]));
        assert_eq!(*image.get_pixel(0, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn luma_of_gray_is_gray() {
        assert_eq!(luminance(&Rgb([200, 200, 200])), 200);
        assert_eq!(luminance(&Rgb([255, 255, 255])), 255);
    }
}
