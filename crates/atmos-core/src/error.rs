//! Error types for grid accessors

use glam::IVec2;
use thiserror::Error;

/// Errors returned by index-based grid operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AtmosError {
    #[error("tile index {index} out of range (grid has {count} tiles)")]
    TileOutOfRange { index: usize, count: usize },
    #[error("direction {0} is not one of N, S, E, W (0..=3)")]
    InvalidDirection(i32),
    #[error("position {0} lies outside the layout")]
    PositionOutOfBounds(IVec2),
}

pub type AtmosResult<T> = Result<T, AtmosError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AtmosError::TileOutOfRange { index: 9, count: 4 };
        assert_eq!(err.to_string(), "tile index 9 out of range (grid has 4 tiles)");
        assert!(AtmosError::InvalidDirection(7).to_string().contains('7'));
        let err = AtmosError::PositionOutOfBounds(IVec2::new(3, -1));
        assert_eq!(err.to_string(), "position [3, -1] lies outside the layout");
    }
}
