//! Boundary-safe square patch extraction.

use image::{RgbImage, imageops};

use crate::models::PatchSpec;

/// Cut a `size × size` patch centered on `(x, y)`.
///
/// Parts of the region outside the image stay black; the overlap is copied
/// at the matching offset. Centers far outside the image give an all-black
/// patch.
pub fn crop(image: &RgbImage, x: i64, y: i64, size: u32) -> RgbImage {
    crop_spec(
        image,
        &PatchSpec {
            center_x: x,
            center_y: y,
            size,
        },
    )
}

pub fn crop_spec(image: &RgbImage, spec: &PatchSpec) -> RgbImage {
    let mut patch = RgbImage::new(spec.size, spec.size);
    let (left, top) = spec.origin();
    let size = i64::from(spec.size);

    // Overlap of [left, left + size) x [top, top + size) with the image.
    let x0 = left.max(0);
    let y0 = top.max(0);
    let x1 = left.saturating_add(size).min(i64::from(image.width()));
    let y1 = top.saturating_add(size).min(i64::from(image.height()));
    if x0 >= x1 || y0 >= y1 {
        return patch;
    }

    let overlap = imageops::crop_imm(
        image,
        x0 as u32,
        y0 as u32,
        (x1 - x0) as u32,
        (y1 - y0) as u32,
    )
    .to_image();
    imageops::replace(&mut patch, &overlap, x0 - left, y0 - top);
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([x as u8, y as u8, 200]))
    }

    #[test]
    fn test_interior_patch_is_verbatim() {
        let img = gradient(100, 100);
        let patch = crop(&img, 50, 40, 32);

        assert_eq!(patch.dimensions(), (32, 32));
        assert_eq!(patch.get_pixel(0, 0), img.get_pixel(34, 24));
        assert_eq!(patch.get_pixel(31, 31), img.get_pixel(65, 55));
    }

    #[test]
    fn test_corner_patch_is_padded() {
        let img = gradient(100, 100);
        let patch = crop(&img, 2, 3, 32);

        // left = -14, top = -13
        assert_eq!(*patch.get_pixel(13, 12), Rgb([0, 0, 0]));
        assert_eq!(patch.get_pixel(14, 13), img.get_pixel(0, 0));
        assert_eq!(patch.get_pixel(31, 31), img.get_pixel(17, 18));
    }

    #[test]
    fn test_far_right_edge() {
        let img = gradient(50, 50);
        let patch = crop(&img, 49, 49, 8);
        assert_eq!(patch.get_pixel(4, 4), img.get_pixel(49, 49));
        assert_eq!(*patch.get_pixel(5, 4), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_outside_centers_give_black_patch() {
        let img = gradient(20, 20);
        for (x, y) in [(-100, 5), (5, 500), (i64::MIN, i64::MAX), (i64::MAX, 0)] {
            let patch = crop(&img, x, y, 16);
            assert_eq!(patch.dimensions(), (16, 16));
            assert!(patch.pixels().all(|p| *p == Rgb([0, 0, 0])));
        }
    }

    #[test]
    fn test_odd_size_keeps_requested_dimensions() {
        let img = gradient(10, 10);
        let patch = crop(&img, 5, 5, 5);
        assert_eq!(patch.dimensions(), (5, 5));
        assert_eq!(patch.get_pixel(0, 0), img.get_pixel(3, 3));
    }
}
