//! Separable image filters over single-channel `f32` images stored row-major.
//!
//! Borders are extended with reflect-101 (`gfedcb|abcdefgh|gfedcba`), the
//! default border mode of common image-processing toolkits.

use rayon::prelude::*;

/// Maps a possibly out-of-range coordinate into `[0, n)` by reflect-101.
#[inline]
pub fn reflect_101(mut i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let last = n as isize - 1;
    loop {
        if i < 0 {
            i = -i;
        } else if i > last {
            i = 2 * last - i;
        } else {
            return i as usize;
        }
    }
}

/// Binomial smoothing kernel of length `len` (1, 1 2 1, 1 4 6 4 1, ...).
fn binomial(len: usize) -> Vec<f32> {
    let mut k = vec![1.0f32];
    for _ in 1..len {
        let mut next = vec![0.0f32; k.len() + 1];
        for (i, v) in k.iter().enumerate() {
            next[i] += v;
            next[i + 1] += v;
        }
        k = next;
    }
    k
}

/// One-dimensional Sobel factor of aperture `ksize` for derivative `order`
/// (0 = smoothing, 1 = first derivative).
///
/// The first-derivative factor is the binomial of length `ksize - 1`
/// differenced once, e.g. `[-1, 0, 1]` for an aperture of 3.
///
/// # Panics
///
/// Panics if `ksize` is even or smaller than 3, or if `order > 1`.
pub fn sobel_factor(ksize: usize, order: usize) -> Vec<f32> {
    assert!(ksize >= 3 && ksize % 2 == 1, "sobel aperture must be odd and >= 3");
    match order {
        0 => binomial(ksize),
        1 => {
            let b = binomial(ksize - 1);
            (0..ksize)
                .map(|j| {
                    let left = if j > 0 { b[j - 1] } else { 0.0 };
                    let right = b.get(j).copied().unwrap_or(0.0);
                    left - right
                })
                .collect()
        }
        _ => panic!("only derivative orders 0 and 1 are supported"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symmetry {
    Symmetric,
    Antisymmetric,
    General,
}

fn symmetry(k: &[f32]) -> Symmetry {
    if k.len() % 2 == 0 {
        return Symmetry::General;
    }
    let pairs = || k.iter().zip(k.iter().rev());
    if pairs().all(|(a, b)| *a == -*b) {
        Symmetry::Antisymmetric
    } else if pairs().all(|(a, b)| a == b) {
        Symmetry::Symmetric
    } else {
        Symmetry::General
    }
}

/// Correlates `k` with `tap(offset)` for offsets `-r..=r` around the center.
///
/// Mirrored taps are combined before weighting, so an antisymmetric kernel
/// over reflect-101 data gives exactly zero on the border.
#[inline]
fn correlate(k: &[f32], sym: Symmetry, tap: impl Fn(isize) -> f32) -> f32 {
    let r = k.len() / 2;
    match sym {
        Symmetry::Antisymmetric => (1..=r)
            .map(|j| k[r + j] * (tap(j as isize) - tap(-(j as isize))))
            .sum(),
        Symmetry::Symmetric => {
            let mut acc = k[r] * tap(0);
            for j in 1..=r {
                acc += k[r + j] * (tap(j as isize) + tap(-(j as isize)));
            }
            acc
        }
        Symmetry::General => k
            .iter()
            .enumerate()
            .map(|(i, w)| w * tap(i as isize - r as isize))
            .sum(),
    }
}

/// Correlates the image with `kx` along rows and then `ky` along columns.
pub fn separable_filter(
    src: &[f32],
    width: usize,
    height: usize,
    kx: &[f32],
    ky: &[f32],
) -> Vec<f32> {
    assert_eq!(src.len(), width * height, "image buffer does not match its shape");
    if src.is_empty() {
        return Vec::new();
    }

    let (sx, sy) = (symmetry(kx), symmetry(ky));

    let mut horizontal = vec![0.0f32; src.len()];
    horizontal
        .par_chunks_mut(width)
        .zip(src.par_chunks(width))
        .for_each(|(dst, row)| {
            for (col, out) in dst.iter_mut().enumerate() {
                *out = correlate(kx, sx, |off| row[reflect_101(col as isize + off, width)]);
            }
        });

    let mut out = vec![0.0f32; src.len()];
    out.par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, dst)| {
            for (col, o) in dst.iter_mut().enumerate() {
                *o = correlate(ky, sy, |off| {
                    horizontal[reflect_101(row as isize + off, height) * width + col]
                });
            }
        });
    out
}

/// Normalized `ksize x ksize` box blur.
pub fn box_blur(src: &[f32], width: usize, height: usize, ksize: usize) -> Vec<f32> {
    let k = vec![1.0 / ksize as f32; ksize];
    separable_filter(src, width, height, &k, &k)
}

/// Sobel derivative: `dx = 1` differentiates along columns, `dy = 1` along
/// rows.
pub fn sobel(
    src: &[f32],
    width: usize,
    height: usize,
    dx: usize,
    dy: usize,
    ksize: usize,
) -> Vec<f32> {
    let kx = sobel_factor(ksize, dx);
    let ky = sobel_factor(ksize, dy);
    separable_filter(src, width, height, &kx, &ky)
}
