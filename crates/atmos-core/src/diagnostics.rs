//! Build and runtime information for hosts

use std::sync::OnceLock;

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn engine_version() -> &'static str {
    ENGINE_VERSION
}

/// Widest vector extension the CPU reports, detected once
///
/// 0 = none, 1 = SSE2, 2 = AVX2, 3 = AVX-512F. Non-x86 targets report 0.
pub fn simd_level() -> u8 {
    static LEVEL: OnceLock<u8> = OnceLock::new();
    *LEVEL.get_or_init(detect_simd_level)
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn detect_simd_level() -> u8 {
    if is_x86_feature_detected!("avx512f") {
        3
    } else if is_x86_feature_detected!("avx2") {
        2
    } else if is_x86_feature_detected!("sse2") {
        1
    } else {
        0
    }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
fn detect_simd_level() -> u8 {
    0
}
