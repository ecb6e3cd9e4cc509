//! Correlation score surfaces for template matching

use super::{MatchingMethod, Template};
use crate::traits::{ScoreSurface, TemplateMatchable};
use image::{GrayImage, RgbImage};
use imageproc::template_matching::{match_template, MatchTemplateMethod};
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Per-pixel variance below which a window or template is treated as flat
/// and scores 0.
const FLAT_EPSILON: f64 = 1e-3;

/// Template matcher producing normalized correlation surfaces
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateMatcher {
    method: MatchingMethod,
}

impl TemplateMatcher {
    /// Create new template matcher
    pub fn new(method: MatchingMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> MatchingMethod {
        self.method
    }

    /// Normalized cross-correlation on luma, via imageproc
    fn ccorr_normed(&self, image: &GrayImage, template: &GrayImage) -> ScoreSurface {
        let result = match_template(image, template, MatchTemplateMethod::CrossCorrelationNormalized);
        ScoreSurface {
            width: result.width(),
            height: result.height(),
            scores: result.into_raw(),
        }
    }
}

impl TemplateMatchable for TemplateMatcher {
    fn score_surface(&self, image: &RgbImage, template: &Template, grayscale: bool) -> ScoreSurface {
        if template.width() == 0
            || template.height() == 0
            || template.width() > image.width()
            || template.height() > image.height()
        {
            return ScoreSurface::default();
        }

        match (self.method, grayscale) {
            (MatchingMethod::CCorrNormed, _) => {
                self.ccorr_normed(&automon_core::luma(image), &template.gray)
            }
            (MatchingMethod::CCoeffNormed, true) => {
                let image = automon_core::luma(image);
                ccoeff_normed(
                    &Planes::from_gray(&image),
                    &Planes::from_gray(&template.gray),
                )
            }
            (MatchingMethod::CCoeffNormed, false) => ccoeff_normed(
                &Planes::from_rgb(image),
                &Planes::from_rgb(&template.image),
            ),
        }
    }
}

/// Planar f32 copy of an image, one plane per channel
struct Planes {
    width: usize,
    height: usize,
    channels: Vec<Vec<f32>>,
}

impl Planes {
    fn from_rgb(image: &RgbImage) -> Self {
        let mut channels = vec![Vec::with_capacity(image.len() / 3); 3];
        for pixel in image.pixels() {
            for (c, plane) in channels.iter_mut().enumerate() {
                plane.push(pixel[c] as f32);
            }
        }
        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            channels,
        }
    }

    fn from_gray(image: &GrayImage) -> Self {
        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            channels: vec![image.as_raw().iter().map(|&v| v as f32).collect()],
        }
    }

    /// Summed-area table of a plane, `(width + 1) * (height + 1)` entries
    fn integral(&self, plane: &[f32], squared: bool) -> Vec<f64> {
        let stride = self.width + 1;
        let mut table = vec![0.0f64; stride * (self.height + 1)];
        for y in 0..self.height {
            let mut row_sum = 0.0f64;
            for x in 0..self.width {
                let v = plane[y * self.width + x] as f64;
                row_sum += if squared { v * v } else { v };
                table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row_sum;
            }
        }
        table
    }
}

fn window_sum(table: &[f64], stride: usize, x: usize, y: usize, w: usize, h: usize) -> f64 {
    table[(y + h) * stride + x + w] - table[y * stride + x + w] - table[(y + h) * stride + x]
        + table[y * stride + x]
}

/// Row-then-column 2D FFT over a fixed `width x height` grid.
///
/// Spectra stay transposed (column-major) between `forward` and `inverse`.
struct Fft2d {
    width: usize,
    height: usize,
    rows: Arc<dyn Fft<f64>>,
    cols: Arc<dyn Fft<f64>>,
    rows_inverse: Arc<dyn Fft<f64>>,
    cols_inverse: Arc<dyn Fft<f64>>,
}

impl Fft2d {
    fn new(width: usize, height: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            width,
            height,
            rows: planner.plan_fft_forward(width),
            cols: planner.plan_fft_forward(height),
            rows_inverse: planner.plan_fft_inverse(width),
            cols_inverse: planner.plan_fft_inverse(height),
        }
    }

    /// Spectrum of `plane - offset`, zero-padded to the grid
    fn forward(&self, plane: &[f32], plane_width: usize, offset: f64) -> Vec<Complex64> {
        let mut data = vec![Complex64::new(0.0, 0.0); self.width * self.height];
        for (y, row) in plane.chunks(plane_width).enumerate() {
            for (x, &v) in row.iter().enumerate() {
                data[y * self.width + x].re = v as f64 - offset;
            }
        }
        self.rows.process(&mut data);
        let mut data = transpose(&data, self.width, self.height);
        self.cols.process(&mut data);
        data
    }

    fn inverse(&self, mut spectrum: Vec<Complex64>) -> Vec<f64> {
        self.cols_inverse.process(&mut spectrum);
        let mut data = transpose(&spectrum, self.height, self.width);
        self.rows_inverse.process(&mut data);
        let scale = 1.0 / (self.width * self.height) as f64;
        data.into_iter().map(|c| c.re * scale).collect()
    }
}

fn transpose(data: &[Complex64], width: usize, height: usize) -> Vec<Complex64> {
    let mut out = vec![Complex64::new(0.0, 0.0); data.len()];
    for (y, row) in data.chunks(width).enumerate() {
        for (x, &v) in row.iter().enumerate() {
            out[x * height + y] = v;
        }
    }
    out
}

fn mean(plane: &[f32]) -> f64 {
    plane.iter().map(|&v| v as f64).sum::<f64>() / plane.len().max(1) as f64
}

/// `Σ_c Σ_t I_c(x + t) · T_c(t)` for every offset of the image grid, row-major.
///
/// Offsets up to `image - template` never wrap, so the circular correlation
/// needs no padding beyond the image itself. The template planes must be
/// zero-mean; the image mean is removed first to keep the sums small.
fn cross_correlation(image: &Planes, template: &[Vec<f32>], template_width: usize) -> Vec<f64> {
    let fft = Fft2d::new(image.width, image.height);
    let product = |c: usize| -> Vec<Complex64> {
        let plane = &image.channels[c];
        let frame = fft.forward(plane, image.width, mean(plane));
        let kernel = fft.forward(&template[c], template_width, 0.0);
        frame.iter().zip(&kernel).map(|(f, k)| *f * k.conj()).collect()
    };

    #[cfg(feature = "parallel")]
    let products: Vec<Vec<Complex64>> = {
        use rayon::prelude::*;
        (0..template.len()).into_par_iter().map(product).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let products: Vec<Vec<Complex64>> = (0..template.len()).map(product).collect();

    let spectrum = products
        .into_iter()
        .reduce(|mut acc, next| {
            for (a, b) in acc.iter_mut().zip(next) {
                *a += b;
            }
            acc
        })
        .unwrap_or_default();
    fft.inverse(spectrum)
}

/// Correlation coefficient surface, channels summed.
///
/// `R = Σ T'·I / sqrt(Σ T'² · Σ I'²)` where `T'` and `I'` are the template and
/// window with their per-channel means removed. The numerator comes from an
/// FFT cross-correlation, the window norms from summed-area tables.
fn ccoeff_normed(image: &Planes, template: &Planes) -> ScoreSurface {
    let (tw, th) = (template.width, template.height);
    let out_w = image.width - tw + 1;
    let out_h = image.height - th + 1;
    let n = (tw * th) as f64;

    let centered: Vec<Vec<f32>> = template
        .channels
        .iter()
        .map(|plane| {
            let mean = mean(plane);
            plane.iter().map(|&v| (v as f64 - mean) as f32).collect()
        })
        .collect();
    let template_norm: f64 = centered
        .iter()
        .flat_map(|plane| plane.iter())
        .map(|&v| (v as f64) * (v as f64))
        .sum();

    if template_norm / n <= FLAT_EPSILON {
        return ScoreSurface {
            width: out_w as u32,
            height: out_h as u32,
            scores: vec![0.0; out_w * out_h],
        };
    }

    let correlation = cross_correlation(image, &centered, tw);
    let sums: Vec<Vec<f64>> = image.channels.iter().map(|p| image.integral(p, false)).collect();
    let squares: Vec<Vec<f64>> = image.channels.iter().map(|p| image.integral(p, true)).collect();
    let stride = image.width + 1;

    let row_scores = |y: usize| -> Vec<f32> {
        let mut row = Vec::with_capacity(out_w);
        for x in 0..out_w {
            let numerator = correlation[y * image.width + x];
            let mut window_norm = 0.0f64;
            for c in 0..image.channels.len() {
                let sum = window_sum(&sums[c], stride, x, y, tw, th);
                let sq = window_sum(&squares[c], stride, x, y, tw, th);
                window_norm += sq - sum * sum / n;
            }

            let score = if window_norm / n <= FLAT_EPSILON {
                0.0
            } else {
                (numerator / (template_norm * window_norm).sqrt()).clamp(-1.0, 1.0)
            };
            row.push(score as f32);
        }
        row
    };

    #[cfg(feature = "parallel")]
    let rows: Vec<Vec<f32>> = {
        use rayon::prelude::*;
        (0..out_h).into_par_iter().map(row_scores).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let rows: Vec<Vec<f32>> = (0..out_h).map(row_scores).collect();

    ScoreSurface {
        width: out_w as u32,
        height: out_h as u32,
        scores: rows.into_iter().flatten().collect(),
    }
}
