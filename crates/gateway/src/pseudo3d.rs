//! Pseudo-3D rendering of a floor plan.
//!
//! A deterministic filter chain that gives a flat plan a raised look: the
//! image is enhanced, dropped onto a dark canvas over an offset grey
//! shadow, and framed with a bevelled border and a corner highlight. No
//! randomness is involved; identical input bytes and parameters always
//! produce identical PNG bytes.
//!
//! The enhancement steps follow the usual "blend against a degenerate
//! image" formulation:
//! - contrast blends against a flat image of the mean luminance,
//! - brightness blends against black,
//! - sharpness blends against a 3x3 smoothed copy.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

use planview_core::{Error, Result};

/// MIME type of every rendered image.
pub const PNG_MIME: &str = "image/png";

/// Tunables of the render. `Default` is the production look.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub contrast: f32,
    pub brightness: f32,
    pub sharpness: f32,
    /// Canvas margin around the plan on every side.
    pub padding: u32,
    /// Shadow displacement to the right and down.
    pub shadow_offset: u32,
    pub background: Rgb<u8>,
    /// Shadow colour for black input.
    pub shadow_dark: Rgb<u8>,
    /// Shadow colour for white input.
    pub shadow_light: Rgb<u8>,
    /// Border colours, innermost first; each is drawn one pixel further out.
    pub bevel: Vec<Rgb<u8>>,
    pub highlight: Rgb<u8>,
    pub highlight_length: u32,
    pub highlight_width: u32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            contrast: 1.3,
            brightness: 1.1,
            sharpness: 1.2,
            padding: 30,
            shadow_offset: 8,
            background: Rgb([0x1a, 0x1a, 0x1a]),
            shadow_dark: Rgb([0x40, 0x40, 0x40]),
            shadow_light: Rgb([0x80, 0x80, 0x80]),
            bevel: (0..3u8).map(|i| Rgb([100 + i * 30; 3])).collect(),
            highlight: Rgb([0xff, 0xff, 0xff]),
            highlight_length: 20,
            highlight_width: 2,
        }
    }
}

/// An encoded image ready to hand back to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Decode image bytes in any supported format.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| Error::image(format!("cannot decode image: {}", e)))
}

/// Drop alpha, expand palettes and greyscale to three 8-bit channels.
pub fn normalize(img: &DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Encode as PNG.
pub fn encode_png(img: RgbImage) -> Result<RenderedImage> {
    let (width, height) = img.dimensions();
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| Error::image(format!("cannot encode PNG: {}", e)))?;
    Ok(RenderedImage {
        bytes,
        mime_type: PNG_MIME,
        width,
        height,
    })
}

/// Re-encode arbitrary image bytes as PNG without altering colour mode.
pub fn reencode_png(bytes: &[u8]) -> Result<RenderedImage> {
    let img = decode(bytes)?;
    let (width, height) = (img.width(), img.height());
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| Error::image(format!("cannot encode PNG: {}", e)))?;
    Ok(RenderedImage {
        bytes: out,
        mime_type: PNG_MIME,
        width,
        height,
    })
}

/// The source image normalized to RGB, as PNG. Used for degraded results.
pub fn normalized_png(bytes: &[u8]) -> Result<RenderedImage> {
    encode_png(normalize(&decode(bytes)?))
}

/// Full pipeline: decode, enhance, compose, encode.
pub fn render(bytes: &[u8], params: &RenderParams) -> Result<RenderedImage> {
    let source = normalize(&decode(bytes)?);
    encode_png(compose(&source, params))
}

/// Build the pseudo-3D canvas for an RGB image.
///
/// The canvas is `(w + 2 * padding) x (h + 2 * padding)`.
pub fn compose(source: &RgbImage, params: &RenderParams) -> RgbImage {
    let enhanced = enhance(source, params);
    let shadow = shadow_layer(&enhanced, params);

    let (w, h) = enhanced.dimensions();
    let p = params.padding;
    let mut canvas = RgbImage::from_pixel(w + 2 * p, h + 2 * p, params.background);

    let depth = i64::from(p + params.shadow_offset);
    image::imageops::replace(&mut canvas, &shadow, depth, depth);
    image::imageops::replace(&mut canvas, &enhanced, i64::from(p), i64::from(p));

    let (p, w, h) = (i64::from(p), i64::from(w), i64::from(h));
    for (i, color) in params.bevel.iter().enumerate() {
        let i = i as i64;
        outline(&mut canvas, (p - i - 1, p - i - 1), (p + w + i, p + h + i), *color);
    }

    let len = i64::from(params.highlight_length);
    let width = i64::from(params.highlight_width.max(1));
    fill(&mut canvas, (p, p), (p + len, p + width - 1), params.highlight);
    fill(&mut canvas, (p, p), (p + width - 1, p + len), params.highlight);

    canvas
}

/// Contrast, then brightness, then sharpness.
pub fn enhance(source: &RgbImage, params: &RenderParams) -> RgbImage {
    let img = adjust_contrast(source, params.contrast);
    let img = adjust_brightness(&img, params.brightness);
    adjust_sharpness(&img, params.sharpness)
}

/// ITU-R 601-2 luma with 16-bit fixed-point weights.
pub fn luma(px: &Rgb<u8>) -> u8 {
    let [r, g, b] = px.0;
    ((u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000) >> 16) as u8
}

/// `degenerate + factor * (img - degenerate)`, truncated into `0..=255`.
fn blend_channel(degenerate: u8, value: u8, factor: f32) -> u8 {
    let d = f32::from(degenerate);
    let v = d + factor * (f32::from(value) - d);
    if v <= 0.0 {
        0
    } else if v >= 255.0 {
        255
    } else {
        v as u8
    }
}

fn blend(degenerate: &RgbImage, img: &RgbImage, factor: f32) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let d = degenerate.get_pixel(x, y).0;
        let v = img.get_pixel(x, y).0;
        Rgb([
            blend_channel(d[0], v[0], factor),
            blend_channel(d[1], v[1], factor),
            blend_channel(d[2], v[2], factor),
        ])
    })
}

pub fn adjust_contrast(img: &RgbImage, factor: f32) -> RgbImage {
    let count = u64::from(img.width()) * u64::from(img.height());
    let mean = if count == 0 {
        0
    } else {
        let sum: u64 = img.pixels().map(|p| u64::from(luma(p))).sum();
        (sum as f64 / count as f64 + 0.5) as u8
    };
    let degenerate = RgbImage::from_pixel(img.width(), img.height(), Rgb([mean; 3]));
    blend(&degenerate, img, factor)
}

pub fn adjust_brightness(img: &RgbImage, factor: f32) -> RgbImage {
    let degenerate = RgbImage::new(img.width(), img.height());
    blend(&degenerate, img, factor)
}

pub fn adjust_sharpness(img: &RgbImage, factor: f32) -> RgbImage {
    blend(&smooth(img), img, factor)
}

/// 3x3 smoothing kernel (centre weight 5, neighbours 1, divisor 13).
///
/// Edge pixels are copied unchanged; images narrower or shorter than the
/// kernel are returned as-is.
fn smooth(img: &RgbImage) -> RgbImage {
    const KERNEL: [[f32; 3]; 3] = [[1.0, 1.0, 1.0], [1.0, 5.0, 1.0], [1.0, 1.0, 1.0]];
    const DIVISOR: f32 = 13.0;

    let (w, h) = img.dimensions();
    let mut out = img.clone();
    if w < 3 || h < 3 {
        return out;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut acc = [0f32; 3];
            for (ky, row) in KERNEL.iter().enumerate() {
                for (kx, weight) in row.iter().enumerate() {
                    let px = img.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1).0;
                    for c in 0..3 {
                        acc[c] += weight * f32::from(px[c]);
                    }
                }
            }
            let px = acc.map(|v| {
                let v = v / DIVISOR;
                if v <= 0.0 {
                    0
                } else if v >= 255.0 {
                    255
                } else {
                    (v + 0.5) as u8
                }
            });
            out.put_pixel(x, y, Rgb(px));
        }
    }
    out
}

/// Greyscale of `img` mapped linearly from `shadow_dark` to `shadow_light`.
pub fn shadow_layer(img: &RgbImage, params: &RenderParams) -> RgbImage {
    let dark = params.shadow_dark.0;
    let light = params.shadow_light.0;
    let ramp = |level: u8, c: usize| -> u8 {
        if level == 255 {
            light[c]
        } else {
            let (lo, hi) = (i32::from(dark[c]), i32::from(light[c]));
            (lo + (i32::from(level) * (hi - lo)).div_euclid(255)) as u8
        }
    };
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let level = luma(img.get_pixel(x, y));
        Rgb([ramp(level, 0), ramp(level, 1), ramp(level, 2)])
    })
}

fn put(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(canvas.width()) && y < i64::from(canvas.height()) {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

/// One-pixel rectangle outline with inclusive corners.
fn outline(canvas: &mut RgbImage, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: Rgb<u8>) {
    for x in x0..=x1 {
        put(canvas, x, y0, color);
        put(canvas, x, y1, color);
    }
    for y in y0..=y1 {
        put(canvas, x0, y, color);
        put(canvas, x1, y, color);
    }
}

/// Filled rectangle with inclusive corners.
fn fill(canvas: &mut RgbImage, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: Rgb<u8>) {
    for y in y0..=y1 {
        for x in x0..=x1 {
            put(canvas, x, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
        out
    }

    fn white(w: u32, h: u32) -> Vec<u8> {
        png_bytes(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            w,
            h,
            Rgb([255, 255, 255]),
        )))
    }

    #[test]
    fn test_output_is_padded_by_sixty() {
        let params = RenderParams::default();
        for (w, h) in [(10, 10), (1, 1), (37, 5), (120, 80)] {
            let out = render(&white(w, h), &params).unwrap();
            assert_eq!((out.width, out.height), (w + 60, h + 60));
            let decoded = decode(&out.bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (w + 60, h + 60));
            assert_eq!(out.mime_type, "image/png");
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let src = RgbImage::from_fn(40, 30, |x, y| Rgb([(x * 6) as u8, (y * 8) as u8, 90]));
        let bytes = png_bytes(DynamicImage::ImageRgb8(src));
        let params = RenderParams::default();

        let a = render(&bytes, &params).unwrap();
        let b = render(&bytes, &params).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn test_white_plan_layout() {
        let params = RenderParams::default();
        let src = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        let canvas = compose(&src, &params);

        // background corner
        assert_eq!(*canvas.get_pixel(0, 0), Rgb([0x1a, 0x1a, 0x1a]));
        // plan interior stays white
        assert_eq!(*canvas.get_pixel(35, 35), Rgb([255, 255, 255]));
        // shadow peeks out below-right of the plan
        assert_eq!(*canvas.get_pixel(45, 45), Rgb([0x80, 0x80, 0x80]));
        // bevel rings, innermost darkest
        assert_eq!(*canvas.get_pixel(29, 35), Rgb([100, 100, 100]));
        assert_eq!(*canvas.get_pixel(28, 35), Rgb([130, 130, 130]));
        assert_eq!(*canvas.get_pixel(27, 35), Rgb([160, 160, 160]));
        assert_eq!(*canvas.get_pixel(40, 35), Rgb([100, 100, 100]));
        // highlight overruns the small plan
        assert_eq!(*canvas.get_pixel(50, 31), Rgb([255, 255, 255]));
        assert_eq!(*canvas.get_pixel(31, 50), Rgb([255, 255, 255]));
        assert_eq!(*canvas.get_pixel(50, 32), Rgb([0x1a, 0x1a, 0x1a]));
        // 2px strokes grow down and right of the anchor, never above or left
        assert_eq!(*canvas.get_pixel(50, 30), Rgb([255, 255, 255]));
        assert_eq!(*canvas.get_pixel(50, 29), Rgb([0x1a, 0x1a, 0x1a]));
        assert_eq!(*canvas.get_pixel(30, 50), Rgb([255, 255, 255]));
        assert_eq!(*canvas.get_pixel(29, 50), Rgb([0x1a, 0x1a, 0x1a]));
    }

    #[test]
    fn test_non_rgb_modes_are_normalized() {
        let params = RenderParams::default();

        let gray = png_bytes(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            8,
            6,
            Luma([128]),
        )));
        let rgba = png_bytes(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            8,
            6,
            Rgba([10, 20, 30, 0]),
        )));

        for bytes in [gray, rgba] {
            let out = render(&bytes, &params).unwrap();
            let decoded = decode(&out.bytes).unwrap();
            assert_eq!(decoded.color(), image::ColorType::Rgb8);
            assert_eq!((decoded.width(), decoded.height()), (68, 66));
        }
    }

    #[test]
    fn test_brightness_clips() {
        let img = RgbImage::from_pixel(2, 2, Rgb([250, 100, 0]));
        let out = adjust_brightness(&img, 1.1);
        assert_eq!(*out.get_pixel(0, 0), Rgb([255, 110, 0]));
    }

    #[test]
    fn test_contrast_of_flat_image_is_identity() {
        let img = RgbImage::from_pixel(4, 4, Rgb([77, 77, 77]));
        assert_eq!(adjust_contrast(&img, 1.3), img);
    }

    #[test]
    fn test_shadow_ramp_endpoints() {
        let params = RenderParams::default();
        let img = RgbImage::from_fn(2, 1, |x, _| if x == 0 { Rgb([0; 3]) } else { Rgb([255; 3]) });
        let shadow = shadow_layer(&img, &params);
        assert_eq!(*shadow.get_pixel(0, 0), Rgb([0x40; 3]));
        assert_eq!(*shadow.get_pixel(1, 0), Rgb([0x80; 3]));
    }

    #[test]
    fn test_luma_weights() {
        assert_eq!(luma(&Rgb([255, 255, 255])), 255);
        assert_eq!(luma(&Rgb([0, 0, 0])), 0);
        assert_eq!(luma(&Rgb([255, 0, 0])), 76);
    }

    #[test]
    fn test_normalized_png_keeps_size() {
        let out = normalized_png(&white(13, 7)).unwrap();
        assert_eq!((out.width, out.height), (13, 7));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode(b"not an image"), Err(Error::Image(_))));
    }
}
