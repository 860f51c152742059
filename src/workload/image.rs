//! Image pipeline on synthetic RGB buffers: centre crop, bilinear resize and
//! tiled, clip-limited histogram equalisation of luminance.

use crate::error::{Error, Result};
use rand::RngCore;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

const TARGET_SIZE: u32 = 512;
const CLIP_LIMIT: f64 = 2.0;
const TILE_GRID: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// JSON array of `"WxH"` strings.
    pub(super) fn list_from_arg(arg: &Value) -> Result<Vec<ImageSize>> {
        let items = arg
            .as_array()
            .ok_or_else(|| Error::config("task 'img' expects a list of \"WxH\" image sizes"))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| Error::config(format!("image size {item} is not a string")))?
                    .parse()
            })
            .collect()
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ImageSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::config(format!("invalid image size '{s}', expected WxH"));
        let (w, h) = s.split_once('x').ok_or_else(bad)?;
        let width: u32 = w.trim().parse().map_err(|_| bad())?;
        let height: u32 = h.trim().parse().map_err(|_| bad())?;
        if width == 0 || height == 0 {
            return Err(bad());
        }
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for ImageSize {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Interleaved 8-bit RGB.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 3],
        }
    }

    pub fn random<R: RngCore>(size: ImageSize, rng: &mut R) -> Self {
        let mut img = Self::new(size.width, size.height);
        rng.fill_bytes(&mut img.data);
        img
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let i = self.offset(x, y);
        self.data[i..i + 3].copy_from_slice(&rgb);
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 3
    }

    /// Largest centred square.
    pub fn crop_square(&self) -> RgbImage {
        let side = self.width.min(self.height);
        let x0 = (self.width - side) / 2;
        let y0 = (self.height - side) / 2;

        let mut out = RgbImage::new(side, side);
        let row_bytes = side as usize * 3;
        for y in 0..side {
            let src = self.offset(x0, y0 + y);
            let dst = out.offset(0, y);
            out.data[dst..dst + row_bytes].copy_from_slice(&self.data[src..src + row_bytes]);
        }
        out
    }

    /// Bilinear resize so the longer side equals `max_side`.
    pub fn resize_longest(&self, max_side: u32) -> RgbImage {
        let (w, h) = (self.width as u64, self.height as u64);
        let (out_w, out_h) = if h > w {
            ((w * max_side as u64 / h).max(1) as u32, max_side)
        } else {
            (max_side, (h * max_side as u64 / w).max(1) as u32)
        };
        self.resize(out_w, out_h)
    }

    pub fn resize(&self, out_w: u32, out_h: u32) -> RgbImage {
        let mut out = RgbImage::new(out_w, out_h);
        let sx = self.width as f64 / out_w as f64;
        let sy = self.height as f64 / out_h as f64;

        for oy in 0..out_h {
            let (y0, y1, fy) = sample_axis(oy, sy, self.height);
            for ox in 0..out_w {
                let (x0, x1, fx) = sample_axis(ox, sx, self.width);
                let p00 = self.pixel(x0, y0);
                let p10 = self.pixel(x1, y0);
                let p01 = self.pixel(x0, y1);
                let p11 = self.pixel(x1, y1);

                let mut rgb = [0u8; 3];
                for c in 0..3 {
                    let top = lerp(p00[c] as f64, p10[c] as f64, fx);
                    let bottom = lerp(p01[c] as f64, p11[c] as f64, fx);
                    rgb[c] = to_u8(lerp(top, bottom, fy));
                }
                out.set_pixel(ox, oy, rgb);
            }
        }
        out
    }

    /// Clip-limited adaptive histogram equalisation of luminance on an
    /// 8x8 tile grid; chroma is preserved.
    pub fn enhance_contrast(&self, clip_limit: f64) -> RgbImage {
        let (w, h) = (self.width, self.height);
        let mut luma = Vec::with_capacity(w as usize * h as usize);
        let mut chroma = Vec::with_capacity(w as usize * h as usize);
        for px in self.data.chunks_exact(3) {
            let (y, cb, cr) = rgb_to_ycbcr([px[0], px[1], px[2]]);
            luma.push(to_u8(y));
            chroma.push((cb, cr));
        }

        let tiles_x = TILE_GRID.min(w).max(1);
        let tiles_y = TILE_GRID.min(h).max(1);
        let tile_w = w.div_ceil(tiles_x);
        let tile_h = h.div_ceil(tiles_y);

        let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                let xs = (tx * tile_w).min(w)..((tx + 1) * tile_w).min(w);
                let ys = (ty * tile_h).min(h)..((ty + 1) * tile_h).min(h);
                let mut hist = [0u32; 256];
                for y in ys {
                    for x in xs.clone() {
                        hist[luma[(y * w + x) as usize] as usize] += 1;
                    }
                }
                luts.push(clipped_equalisation(&hist, clip_limit));
            }
        }

        let mut out = RgbImage::new(w, h);
        for y in 0..h {
            let (ty0, ty1, fy) = tile_axis(y, tile_h, tiles_y);
            for x in 0..w {
                let (tx0, tx1, fx) = tile_axis(x, tile_w, tiles_x);
                let i = (y * w + x) as usize;
                let v = luma[i] as usize;
                let at = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][v] as f64;

                let top = lerp(at(tx0, ty0), at(tx1, ty0), fx);
                let bottom = lerp(at(tx0, ty1), at(tx1, ty1), fx);
                let (cb, cr) = chroma[i];
                out.set_pixel(x, y, ycbcr_to_rgb(lerp(top, bottom, fy), cb, cr));
            }
        }
        out
    }
}

/// Crop to a centred square, resize to 512 and enhance contrast.
pub(super) fn transform(img: &RgbImage) -> RgbImage {
    img.crop_square()
        .resize_longest(TARGET_SIZE)
        .enhance_contrast(CLIP_LIMIT)
}

fn clipped_equalisation(hist: &[u32; 256], clip_limit: f64) -> [u8; 256] {
    let total: u32 = hist.iter().sum();
    let mut lut = [0u8; 256];
    if total == 0 {
        return lut;
    }

    let limit = ((clip_limit * total as f64 / 256.0) as u32).max(1);
    let mut clipped = [0u32; 256];
    let mut excess = 0u32;
    for (c, &count) in clipped.iter_mut().zip(hist) {
        *c = count.min(limit);
        excess += count - *c;
    }
    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, c) in clipped.iter_mut().enumerate() {
        *c += share + u32::from(i < remainder);
    }

    let mut cdf = 0u64;
    for (out, &c) in lut.iter_mut().zip(&clipped) {
        cdf += c as u64;
        *out = (cdf * 255 / total as u64).min(255) as u8;
    }
    lut
}

/// Source indices and blend weight for output coordinate `o` at scale `s`.
fn sample_axis(o: u32, scale: f64, len: u32) -> (u32, u32, f64) {
    let pos = ((o as f64 + 0.5) * scale - 0.5).clamp(0.0, (len - 1) as f64);
    let i0 = pos.floor() as u32;
    let i1 = (i0 + 1).min(len - 1);
    (i0, i1, pos - i0 as f64)
}

/// Neighbouring tile centres around pixel `p` and the blend weight.
fn tile_axis(p: u32, tile: u32, tiles: u32) -> (u32, u32, f64) {
    let pos = ((p as f64 + 0.5) / tile as f64 - 0.5).clamp(0.0, (tiles - 1) as f64);
    let t0 = pos.floor() as u32;
    let t1 = (t0 + 1).min(tiles - 1);
    (t0, t1, pos - t0 as f64)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn to_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn rgb_to_ycbcr([r, g, b]: [u8; 3]) -> (f64, f64, f64) {
    let (r, g, b) = (r as f64, g as f64, b as f64);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
    let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
    (y, cb, cr)
}

fn ycbcr_to_rgb(y: f64, cb: f64, cr: f64) -> [u8; 3] {
    let r = y + 1.402 * (cr - 128.0);
    let g = y - 0.344_136 * (cb - 128.0) - 0.714_136 * (cr - 128.0);
    let b = y + 1.772 * (cb - 128.0);
    [to_u8(r), to_u8(g), to_u8(b)]
}
