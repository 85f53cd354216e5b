//! Network kernels: accumulator row updates, and the output layer (SCReLU
//! activation of both accumulators, dotted with the output weights).
//!
//! The backend is picked at compile time. `generic` is the reference; every
//! other backend must produce exactly the same integers. For that to hold, the
//! output weights must lie in `[-MAX_OUTPUT_WEIGHT, MAX_OUTPUT_WEIGHT]`, so that
//! `clamp(x) * w` never leaves the `i16` range.

use super::network::{Align64, L1_SIZE, QA};

#[allow(clippy::cast_possible_truncation)]
pub const MAX_OUTPUT_WEIGHT: i16 = (i16::MAX as i32 / QA) as i16;

pub mod generic {
    use super::{Align64, L1_SIZE, QA};

    /// `output = input + Σ adds - Σ subs`, lane by lane, wrapping like the vector backends.
    pub fn update(
        input: &[i16; L1_SIZE],
        output: &mut [i16; L1_SIZE],
        adds: &[&[i16; L1_SIZE]],
        subs: &[&[i16; L1_SIZE]],
    ) {
        for (i, o) in output.iter_mut().enumerate() {
            let mut v = input[i];
            for row in adds {
                v = v.wrapping_add(row[i]);
            }
            for row in subs {
                v = v.wrapping_sub(row[i]);
            }
            *o = v;
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn screlu(x: i16) -> i32 {
        let x = i32::from(x.clamp(0, QA as i16));
        x * x
    }

    /// Sum of `screlu(us) · w_us + screlu(them) · w_them`, divided by `QA`.
    pub fn flatten(
        us: &Align64<[i16; L1_SIZE]>,
        them: &Align64<[i16; L1_SIZE]>,
        weights: &Align64<[i16; L1_SIZE * 2]>,
    ) -> i32 {
        let mut sum: i32 = 0;
        for (&i, &w) in us.iter().zip(&weights[..L1_SIZE]) {
            sum += screlu(i) * i32::from(w);
        }
        for (&i, &w) in them.iter().zip(&weights[L1_SIZE..]) {
            sum += screlu(i) * i32::from(w);
        }
        sum / QA
    }
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub mod avx2 {
    use std::arch::x86_64::{
        __m256i, _mm_add_epi32, _mm_cvtsi128_si32, _mm_shuffle_epi32, _mm_unpackhi_epi64, _mm256_add_epi16,
        _mm256_add_epi32, _mm256_castsi256_si128, _mm256_extracti128_si256, _mm256_load_si256,
        _mm256_loadu_si256, _mm256_madd_epi16, _mm256_max_epi16, _mm256_min_epi16, _mm256_mullo_epi16,
        _mm256_set1_epi16, _mm256_setzero_si256, _mm256_storeu_si256, _mm256_sub_epi16,
    };

    use super::{Align64, L1_SIZE, QA};

    const CHUNK: usize = 16;

    /// SAFETY: `start + CHUNK` must not exceed `N`, and `start` must be a multiple of `CHUNK`.
    #[inline]
    unsafe fn load<const N: usize>(v: &Align64<[i16; N]>, start: usize) -> __m256i {
        // SAFETY: in bounds and 32-byte aligned, as the caller guarantees.
        unsafe { _mm256_load_si256(v.0.as_ptr().add(start).cast()) }
    }

    /// SAFETY: `start + CHUNK` must not exceed `L1_SIZE`.
    #[inline]
    unsafe fn load_row(row: &[i16; L1_SIZE], start: usize) -> __m256i {
        // SAFETY: in bounds, as the caller guarantees; the load is unaligned.
        unsafe { _mm256_loadu_si256(row.as_ptr().add(start).cast()) }
    }

    pub fn update(
        input: &[i16; L1_SIZE],
        output: &mut [i16; L1_SIZE],
        adds: &[&[i16; L1_SIZE]],
        subs: &[&[i16; L1_SIZE]],
    ) {
        // SAFETY: avx2 is enabled for the whole compilation, and every access
        // covers CHUNK lanes starting at a multiple of CHUNK below L1_SIZE.
        unsafe {
            for i in (0..L1_SIZE).step_by(CHUNK) {
                let mut v = load_row(input, i);
                for row in adds {
                    v = _mm256_add_epi16(v, load_row(row, i));
                }
                for row in subs {
                    v = _mm256_sub_epi16(v, load_row(row, i));
                }
                _mm256_storeu_si256(output.as_mut_ptr().add(i).cast(), v);
            }
        }
    }

    #[inline]
    fn horizontal_sum(sum: __m256i) -> i32 {
        // SAFETY: avx2 is enabled for the whole compilation.
        unsafe {
            let upper_128 = _mm256_extracti128_si256::<1>(sum);
            let sum_128 = _mm_add_epi32(upper_128, _mm256_castsi256_si128(sum));
            let sum_64 = _mm_add_epi32(_mm_unpackhi_epi64(sum_128, sum_128), sum_128);
            let sum_32 = _mm_add_epi32(_mm_shuffle_epi32::<0b00_00_00_01>(sum_64), sum_64);
            _mm_cvtsi128_si32(sum_32)
        }
    }

    /// Multiplies the clamped input by the weight in 16 bits, then by the clamped
    /// input again while widening to 32 bits, so `x² · w` never overflows.
    #[allow(clippy::cast_possible_truncation)]
    pub fn flatten(
        us: &Align64<[i16; L1_SIZE]>,
        them: &Align64<[i16; L1_SIZE]>,
        weights: &Align64<[i16; L1_SIZE * 2]>,
    ) -> i32 {
        // SAFETY: avx2 is enabled for the whole compilation, and every load
        // below starts at a multiple of CHUNK strictly inside its array.
        unsafe {
            let zero = _mm256_setzero_si256();
            let qa = _mm256_set1_epi16(QA as i16);
            let mut sum = _mm256_setzero_si256();
            for (acc, weight_offset) in [(us, 0), (them, L1_SIZE)] {
                for i in (0..L1_SIZE).step_by(CHUNK) {
                    let v = _mm256_min_epi16(_mm256_max_epi16(load(acc, i), zero), qa);
                    let w = load(weights, weight_offset + i);
                    let vw = _mm256_mullo_epi16(v, w);
                    sum = _mm256_add_epi32(sum, _mm256_madd_epi16(vw, v));
                }
            }
            horizontal_sum(sum) / QA
        }
    }
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub const ARCH: &str = "avx2";
#[cfg(not(all(target_arch = "x86_64", target_feature = "avx2")))]
pub const ARCH: &str = "generic";

/// Computes one accumulator row from its predecessor and the feature rows
/// switched on and off.
pub fn update(
    input: &[i16; L1_SIZE],
    output: &mut [i16; L1_SIZE],
    adds: &[&[i16; L1_SIZE]],
    subs: &[&[i16; L1_SIZE]],
) {
    #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
    {
        avx2::update(input, output, adds, subs);
    }
    #[cfg(not(all(target_arch = "x86_64", target_feature = "avx2")))]
    {
        generic::update(input, output, adds, subs);
    }
}

pub fn flatten(
    us: &Align64<[i16; L1_SIZE]>,
    them: &Align64<[i16; L1_SIZE]>,
    weights: &Align64<[i16; L1_SIZE * 2]>,
) -> i32 {
    #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
    {
        avx2::flatten(us, them, weights)
    }
    #[cfg(not(all(target_arch = "x86_64", target_feature = "avx2")))]
    {
        generic::flatten(us, them, weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::XorShiftState;

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn random_vector<const N: usize>(rng: &mut XorShiftState, lo: i16, hi: i16) -> Align64<[i16; N]> {
        let span = (i32::from(hi) - i32::from(lo) + 1) as u64;
        Align64(std::array::from_fn(|_| (i64::from(lo) + (rng.next() % span) as i64) as i16))
    }

    #[test]
    fn selected_backend_matches_reference() {
        let mut rng = XorShiftState::new();
        for _ in 0..64 {
            let us = random_vector::<L1_SIZE>(&mut rng, -400, 400);
            let them = random_vector::<L1_SIZE>(&mut rng, -400, 400);
            let weights = random_vector::<{ L1_SIZE * 2 }>(&mut rng, -MAX_OUTPUT_WEIGHT, MAX_OUTPUT_WEIGHT);
            assert_eq!(flatten(&us, &them, &weights), generic::flatten(&us, &them, &weights));
        }
    }

    #[test]
    fn selected_update_matches_reference() {
        let mut rng = XorShiftState::new();
        let rows = (0..34).map(|_| random_vector::<L1_SIZE>(&mut rng, -128, 127)).collect::<Vec<_>>();
        let rows = rows.iter().map(|r| &r.0).collect::<Vec<_>>();
        let input = random_vector::<L1_SIZE>(&mut rng, -2000, 2000);
        // the shapes used by moves, and by a full refresh.
        for (n_adds, n_subs) in [(1, 1), (1, 2), (2, 2), (32, 0)] {
            let (adds, rest) = rows.split_at(n_adds);
            let subs = &rest[..n_subs];
            let mut fast = [0; L1_SIZE];
            let mut reference = [0; L1_SIZE];
            update(&input, &mut fast, adds, subs);
            generic::update(&input, &mut reference, adds, subs);
            assert_eq!(fast, reference, "{n_adds} adds, {n_subs} subs");
        }
    }

    #[test]
    fn update_adds_and_removes_rows() {
        let input = [10i16; L1_SIZE];
        let add = [3i16; L1_SIZE];
        let sub = [4i16; L1_SIZE];
        let mut out = [0i16; L1_SIZE];
        update(&input, &mut out, &[&add], &[&sub, &sub]);
        assert!(out.iter().all(|&v| v == 5));
    }

    #[test]
    fn screlu_clamps_both_ends() {
        let mut us = Align64([0i16; L1_SIZE]);
        let them = Align64([0i16; L1_SIZE]);
        let mut weights = Align64([0i16; L1_SIZE * 2]);
        us[0] = 1000;
        us[1] = -1000;
        weights[0] = 1;
        weights[1] = 1;
        assert_eq!(generic::flatten(&us, &them, &weights), QA);
    }
}
