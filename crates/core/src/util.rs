//! Common utility functions shared across modules.

/// Squared magnitude of a position given by its components.
#[inline(always)]
pub fn squared_norm(x: f64, y: f64, z: f64) -> f64 {
    x * x + y * y + z * z
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squared_norm() {
        assert_eq!(squared_norm(1.0, -2.0, 2.0), 9.0);
        assert_eq!(squared_norm(0.0, 0.0, 0.0), 0.0);
    }
}
