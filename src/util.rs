//! Small shared helpers

/// Measure the evaluation time of an expression and log it. Evaluates to
/// the value of the expression. Logs at debug level unless a level is given.
#[macro_export]
macro_rules! timed {
    ($label:expr, $ex:expr) => {
        $crate::timed!($label, log::Level::Debug, $ex)
    };
    ($label:expr, $log_level:expr, $ex:expr) => {{
        let now = std::time::Instant::now();
        let value = $ex;
        let elapsed = now.elapsed();
        log::log!($log_level, "{} took {} ms", $label, elapsed.as_millis());
        value
    }};
}

/// Grid cell coordinate as `(x, y)`
pub type GridPos = (usize, usize);

/// Offsets of the 8 neighbours of a cell: cardinals first, then diagonals
pub const NEIGHBOURS_8: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
];

/// Offsets of the 4 cardinal neighbours of a cell
pub const NEIGHBOURS_4: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Apply an offset to a cell, returning `None` if it leaves a `size`x`size` grid
#[inline]
pub fn offset_in_grid((x, y): GridPos, (dx, dy): (isize, isize), size: usize) -> Option<GridPos> {
    let nx = x.checked_add_signed(dx)?;
    let ny = y.checked_add_signed(dy)?;
    (nx < size && ny < size).then_some((nx, ny))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_in_grid() {
        assert_eq!(offset_in_grid((0, 0), (-1, 0), 3), None);
        assert_eq!(offset_in_grid((0, 0), (1, 1), 3), Some((1, 1)));
        assert_eq!(offset_in_grid((2, 2), (1, 0), 3), None);
        assert_eq!(offset_in_grid((2, 2), (0, -1), 3), Some((2, 1)));
    }

    #[test]
    fn test_timed_returns_value() {
        let value = timed!("addition", 2 + 2);
        assert_eq!(value, 4);
    }
}
