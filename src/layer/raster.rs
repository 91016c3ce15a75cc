//! Pixel-level drawing helpers shared by the overlay layers.
//!
//! Filled shapes are rasterized with tiny-skia into a small scratch pixmap and
//! then composited onto the frame, so edges come out anti-aliased.

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};

// ============================================================================
// Shapes
// ============================================================================

/// Fills an axis-aligned rectangle, blending with what is already there.
///
/// Fully transparent colors are a no-op.
pub fn fill_rect(dest: &mut RgbaImage, x: i32, y: i32, width: u32, height: u32, color: Rgba<u8>) {
    if color[3] == 0 || width == 0 || height == 0 {
        return;
    }
    let Some(rect) = Rect::from_xywh(0.0, 0.0, width as f32, height as f32) else {
        return;
    };
    let Some(mut pixmap) = Pixmap::new(width, height) else {
        return;
    };

    pixmap.fill_rect(rect, &paint(color), Transform::identity(), None);
    composite_over(dest, &pixmap_to_rgba_image(&pixmap), x, y);
}

/// Fills a disc of `diameter` pixels centered on `(cx, cy)`.
pub fn fill_circle(dest: &mut RgbaImage, cx: f32, cy: f32, diameter: f32, color: Rgba<u8>) {
    if color[3] == 0 || diameter <= 0.0 {
        return;
    }
    let side = diameter.ceil() as u32 + 2;
    let Some(mut pixmap) = Pixmap::new(side, side) else {
        return;
    };
    let center = side as f32 / 2.0;
    let Some(path) = PathBuilder::from_circle(center, center, diameter / 2.0) else {
        return;
    };

    pixmap.fill_path(&path, &paint(color), FillRule::Winding, Transform::identity(), None);

    let left = (cx - center).round() as i32;
    let top = (cy - center).round() as i32;
    composite_over(dest, &pixmap_to_rgba_image(&pixmap), left, top);
}

fn paint(color: Rgba<u8>) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = true;
    paint
}

/// Copies a scratch pixmap into a straight-alpha image.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());

    for (pixel, out) in pixmap.pixels().iter().zip(img.pixels_mut()) {
        // tiny_skia stores premultiplied alpha
        let (r, g, b, a) = unpremultiply(pixel.red(), pixel.green(), pixel.blue(), pixel.alpha());
        *out = Rgba([r, g, b, a]);
    }

    img
}

/// Unpremultiplies a premultiplied alpha pixel.
fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        (0, 0, 0, 0)
    } else {
        let a_f = a as f32 / 255.0;
        (
            (r as f32 / a_f).round().min(255.0) as u8,
            (g as f32 / a_f).round().min(255.0) as u8,
            (b as f32 / a_f).round().min(255.0) as u8,
            a,
        )
    }
}

// ============================================================================
// Compositing
// ============================================================================

/// Draws `src` over `dest` with its top-left corner at `(x, y)`.
///
/// Parts of `src` that fall outside `dest` are dropped.
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i32, y: i32) {
    let dest_width = dest.width() as i32;
    let dest_height = dest.height() as i32;

    for (sx, sy, src_pixel) in src.enumerate_pixels() {
        let dx = x + sx as i32;
        let dy = y + sy as i32;

        if dx < 0 || dy < 0 || dx >= dest_width || dy >= dest_height {
            continue;
        }

        let dst_pixel = dest.get_pixel(dx as u32, dy as u32);
        let blended = alpha_blend(*src_pixel, *dst_pixel);
        dest.put_pixel(dx as u32, dy as u32, blended);
    }
}

/// Blends `color` into one pixel, scaled by a glyph coverage in `0.0..=1.0`.
///
/// Out-of-bounds coordinates are ignored.
pub fn blend_pixel(dest: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= dest.width() as i32 || y >= dest.height() as i32 {
        return;
    }
    let alpha = (color[3] as f32 * coverage.clamp(0.0, 1.0)).round() as u8;
    if alpha == 0 {
        return;
    }

    let src = Rgba([color[0], color[1], color[2], alpha]);
    let dst = *dest.get_pixel(x as u32, y as u32);
    dest.put_pixel(x as u32, y as u32, alpha_blend(src, dst));
}

/// Source-over for straight-alpha pixels.
fn alpha_blend(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let [sr, sg, sb, sa] = src.0.map(|c| c as f32 / 255.0);
    let [dr, dg, db, da] = dst.0.map(|c| c as f32 / 255.0);

    // share of the destination left showing through
    let backdrop = da * (1.0 - sa);
    let alpha = sa + backdrop;
    if alpha <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mix = |s: f32, d: f32| ((s * sa + d * backdrop) / alpha * 255.0).round() as u8;
    Rgba([
        mix(sr, dr),
        mix(sg, dg),
        mix(sb, db),
        (alpha * 255.0).round() as u8,
    ])
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    #[test]
    fn opaque_backdrop_hides_the_frame() {
        let frame = Rgba([100, 120, 140, 255]);
        let mut dest = RgbaImage::from_pixel(10, 10, frame);
        let backdrop = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));

        composite_over(&mut dest, &backdrop, 3, 3);

        assert_eq!(*dest.get_pixel(4, 4), Rgba([0, 0, 0, 255]));
        assert_eq!(*dest.get_pixel(7, 7), frame);
    }

    #[test]
    fn translucent_backdrop_darkens_the_frame() {
        let mut dest = RgbaImage::from_pixel(6, 6, Rgba([100, 100, 100, 255]));
        let backdrop = RgbaImage::from_pixel(6, 6, Rgba([0, 0, 0, 128]));

        composite_over(&mut dest, &backdrop, 0, 0);

        let pixel = dest.get_pixel(2, 2);
        assert!((49..=51).contains(&pixel[0]), "{pixel:?}");
        assert_eq!(pixel[0], pixel[2]);
        assert_eq!(pixel[3], 255);
    }

    #[test]
    fn blending_onto_transparent_keeps_source() {
        assert_eq!(alpha_blend(BLUE, Rgba([0, 0, 0, 0])), BLUE);
        assert_eq!(alpha_blend(Rgba([9, 9, 9, 0]), Rgba([0, 0, 0, 0])), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn composite_clips_negative_offsets() {
        let mut dest = RgbaImage::from_pixel(4, 4, RED);
        let src = RgbaImage::from_pixel(4, 4, BLUE);

        composite_over(&mut dest, &src, -2, -2);

        assert_eq!(*dest.get_pixel(1, 1), BLUE);
        assert_eq!(*dest.get_pixel(2, 2), RED);
    }

    #[test]
    fn rect_fill_covers_exact_area() {
        let mut dest = RgbaImage::from_pixel(20, 20, RED);
        fill_rect(&mut dest, 5, 5, 4, 3, BLUE);

        assert_eq!(*dest.get_pixel(5, 5), BLUE);
        assert_eq!(*dest.get_pixel(8, 7), BLUE);
        assert_eq!(*dest.get_pixel(9, 5), RED);
        assert_eq!(*dest.get_pixel(5, 8), RED);
    }

    #[test]
    fn transparent_fill_is_noop() {
        let mut dest = RgbaImage::from_pixel(8, 8, RED);
        fill_rect(&mut dest, 0, 0, 8, 8, Rgba([0, 0, 0, 0]));
        fill_circle(&mut dest, 4.0, 4.0, 6.0, Rgba([0, 0, 0, 0]));
        assert!(dest.pixels().all(|p| *p == RED));
    }

    #[test]
    fn circle_fills_center_not_corners() {
        let mut dest = RgbaImage::from_pixel(40, 40, RED);
        fill_circle(&mut dest, 20.0, 20.0, 20.0, BLUE);

        assert_eq!(*dest.get_pixel(20, 20), BLUE);
        assert_eq!(*dest.get_pixel(0, 0), RED);
        assert_eq!(*dest.get_pixel(11, 11), RED);
    }

    #[test]
    fn coverage_scales_alpha() {
        let mut dest = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        blend_pixel(&mut dest, 0, 0, Rgba([255, 255, 255, 255]), 1.0);
        blend_pixel(&mut dest, 1, 0, Rgba([255, 255, 255, 255]), 0.5);
        blend_pixel(&mut dest, 0, 1, Rgba([255, 255, 255, 255]), 0.0);
        blend_pixel(&mut dest, 5, 5, Rgba([255, 255, 255, 255]), 1.0);

        assert_eq!(dest.get_pixel(0, 0).0, [255, 255, 255, 255]);
        let half = dest.get_pixel(1, 0);
        assert!(half[0] > 100 && half[0] < 160);
        assert_eq!(dest.get_pixel(0, 1).0, [0, 0, 0, 255]);
    }
}
