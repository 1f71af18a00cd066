//! Whole-canvas filter kernels.
//!
//! Fixed kernels are convolutions with a divisor (`scale`) and a constant
//! `offset`, applied to the color channels only; alpha is preserved and
//! edge pixels sample their nearest in-bounds neighbor. Gaussian blur and
//! unsharp masking delegate to `image::imageops`.

use crate::types::PostFilter;
use image::{Rgba, RgbaImage, imageops};

/// A square convolution kernel.
struct Kernel {
    size: u32,
    weights: &'static [f32],
    scale: f32,
    offset: f32,
}

#[rustfmt::skip]
const BLUR: Kernel = Kernel {
    size: 5,
    weights: &[
        1.0, 1.0, 1.0, 1.0, 1.0,
        1.0, 0.0, 0.0, 0.0, 1.0,
        1.0, 0.0, 0.0, 0.0, 1.0,
        1.0, 0.0, 0.0, 0.0, 1.0,
        1.0, 1.0, 1.0, 1.0, 1.0,
    ],
    scale: 16.0,
    offset: 0.0,
};

#[rustfmt::skip]
const CONTOUR: Kernel = Kernel {
    size: 3,
    weights: &[
        -1.0, -1.0, -1.0,
        -1.0,  8.0, -1.0,
        -1.0, -1.0, -1.0,
    ],
    scale: 1.0,
    offset: 255.0,
};

#[rustfmt::skip]
const DETAIL: Kernel = Kernel {
    size: 3,
    weights: &[
         0.0, -1.0,  0.0,
        -1.0, 10.0, -1.0,
         0.0, -1.0,  0.0,
    ],
    scale: 6.0,
    offset: 0.0,
};

#[rustfmt::skip]
const EDGE_ENHANCE: Kernel = Kernel {
    size: 3,
    weights: &[
        -1.0, -1.0, -1.0,
        -1.0, 10.0, -1.0,
        -1.0, -1.0, -1.0,
    ],
    scale: 2.0,
    offset: 0.0,
};

#[rustfmt::skip]
const EDGE_ENHANCE_MORE: Kernel = Kernel {
    size: 3,
    weights: &[
        -1.0, -1.0, -1.0,
        -1.0,  9.0, -1.0,
        -1.0, -1.0, -1.0,
    ],
    scale: 1.0,
    offset: 0.0,
};

#[rustfmt::skip]
const EMBOSS: Kernel = Kernel {
    size: 3,
    weights: &[
        -1.0, 0.0, 0.0,
         0.0, 1.0, 0.0,
         0.0, 0.0, 0.0,
    ],
    scale: 1.0,
    offset: 128.0,
};

#[rustfmt::skip]
const FIND_EDGES: Kernel = Kernel {
    size: 3,
    weights: &[
        -1.0, -1.0, -1.0,
        -1.0,  8.0, -1.0,
        -1.0, -1.0, -1.0,
    ],
    scale: 1.0,
    offset: 0.0,
};

#[rustfmt::skip]
const SHARPEN: Kernel = Kernel {
    size: 3,
    weights: &[
        -2.0, -2.0, -2.0,
        -2.0, 32.0, -2.0,
        -2.0, -2.0, -2.0,
    ],
    scale: 16.0,
    offset: 0.0,
};

#[rustfmt::skip]
const SMOOTH: Kernel = Kernel {
    size: 3,
    weights: &[
        1.0, 1.0, 1.0,
        1.0, 5.0, 1.0,
        1.0, 1.0, 1.0,
    ],
    scale: 13.0,
    offset: 0.0,
};

#[rustfmt::skip]
const SMOOTH_MORE: Kernel = Kernel {
    size: 5,
    weights: &[
        1.0, 1.0,  1.0, 1.0, 1.0,
        1.0, 5.0,  5.0, 5.0, 1.0,
        1.0, 5.0, 44.0, 5.0, 1.0,
        1.0, 5.0,  5.0, 5.0, 1.0,
        1.0, 1.0,  1.0, 1.0, 1.0,
    ],
    scale: 100.0,
    offset: 0.0,
};

/// Apply one filter to the canvas, returning the filtered canvas.
pub fn apply_filter(canvas: &RgbaImage, filter: PostFilter) -> RgbaImage {
    match filter {
        PostFilter::Blur => convolve(canvas, &BLUR),
        PostFilter::Contour => convolve(canvas, &CONTOUR),
        PostFilter::Detail => convolve(canvas, &DETAIL),
        PostFilter::EdgeEnhance => convolve(canvas, &EDGE_ENHANCE),
        PostFilter::EdgeEnhanceMore => convolve(canvas, &EDGE_ENHANCE_MORE),
        PostFilter::Emboss => convolve(canvas, &EMBOSS),
        PostFilter::FindEdges => convolve(canvas, &FIND_EDGES),
        PostFilter::Sharpen => convolve(canvas, &SHARPEN),
        PostFilter::Smooth => convolve(canvas, &SMOOTH),
        PostFilter::SmoothMore => convolve(canvas, &SMOOTH_MORE),
        PostFilter::GaussianBlur { radius } => imageops::blur(canvas, radius.max(0.0)),
        PostFilter::UnsharpMask { sigma, threshold } => {
            imageops::unsharpen(canvas, sigma, threshold)
        }
    }
}

/// Apply `filters` in order.
pub fn apply_filters(canvas: RgbaImage, filters: &[PostFilter]) -> RgbaImage {
    filters.iter().fold(canvas, |acc, filter| {
        tracing::debug!(%filter, "applying post filter");
        apply_filter(&acc, *filter)
    })
}

fn convolve(src: &RgbaImage, kernel: &Kernel) -> RgbaImage {
    let (width, height) = src.dimensions();
    if width == 0 || height == 0 {
        return src.clone();
    }
    let radius = (kernel.size / 2) as i64;
    let max_x = width as i64 - 1;
    let max_y = height as i64 - 1;

    RgbaImage::from_fn(width, height, |x, y| {
        let mut acc = [0.0f32; 3];
        for ky in 0..kernel.size as i64 {
            for kx in 0..kernel.size as i64 {
                let weight = kernel.weights[(ky * kernel.size as i64 + kx) as usize];
                if weight == 0.0 {
                    continue;
                }
                let sx = (x as i64 + kx - radius).clamp(0, max_x) as u32;
                let sy = (y as i64 + ky - radius).clamp(0, max_y) as u32;
                let pixel = src.get_pixel(sx, sy);
                for (channel, value) in acc.iter_mut().enumerate() {
                    *value += weight * pixel[channel] as f32;
                }
            }
        }

        let alpha = src.get_pixel(x, y)[3];
        let channel = |v: f32| (v / kernel.scale + kernel.offset).round().clamp(0.0, 255.0) as u8;
        Rgba([channel(acc[0]), channel(acc[1]), channel(acc[2]), alpha])
    })
}
