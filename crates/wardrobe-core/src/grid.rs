//! Hourly sample grid for a worn interval

use crate::types::Timestamp;

/// One hour in seconds
pub const HOUR: Timestamp = 3600;

/// Upper bound on grid size (one leap year of hours)
pub const MAX_GRID_POINTS: usize = 24 * 366;

/// Grid generation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),
}

/// Hourly sample instants covering `[start, end)`, always including `start`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourlyGrid {
    points: Vec<Timestamp>,
    end: Timestamp,
}

impl HourlyGrid {
    pub fn points(&self) -> &[Timestamp] {
        &self.points
    }

    pub fn start(&self) -> Timestamp {
        self.points[0]
    }

    /// End of the requested interval (not necessarily a grid point)
    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; a grid holds at least its start point
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Timestamp> + '_ {
        self.points.iter().copied()
    }
}

/// Generate the hourly grid for an interval.
///
/// Yields `start, start + HOUR, ...` while the running value is below `end`.
/// `start == end` yields `[start]`.
pub fn generate_grid(start: Timestamp, end: Timestamp) -> Result<HourlyGrid, GridError> {
    if end < start {
        return Err(GridError::InvalidInterval(format!(
            "end {} precedes start {}",
            end, start
        )));
    }

    let span = (end as i128) - (start as i128);
    let count = if span == 0 {
        1
    } else {
        ((span + HOUR as i128 - 1) / HOUR as i128) as u128
    };

    if count > MAX_GRID_POINTS as u128 {
        return Err(GridError::InvalidInterval(format!(
            "interval {}..{} spans {} hours, limit is {}",
            start, end, count, MAX_GRID_POINTS
        )));
    }

    let points = (0..count as i64).map(|i| start + i * HOUR).collect();

    Ok(HourlyGrid { points, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_two_and_a_half_hours() {
        let grid = generate_grid(1_700_000_000, 1_700_009_000).unwrap();
        assert_eq!(
            grid.points(),
            &[1_700_000_000, 1_700_003_600, 1_700_007_200]
        );
        assert_eq!(grid.start(), 1_700_000_000);
        assert_eq!(grid.end(), 1_700_009_000);
    }

    #[test]
    fn test_grid_degenerate_interval() {
        let grid = generate_grid(1_700_000_000, 1_700_000_000).unwrap();
        assert_eq!(grid.points(), &[1_700_000_000]);
        assert!(!grid.is_empty());
    }

    #[test]
    fn test_grid_exact_hours() {
        // End is exclusive once the interval is non-empty
        let grid = generate_grid(0, 2 * HOUR).unwrap();
        assert_eq!(grid.points(), &[0, HOUR]);

        let grid = generate_grid(0, 1).unwrap();
        assert_eq!(grid.points(), &[0]);
    }

    #[test]
    fn test_grid_strictly_increasing() {
        let grid = generate_grid(1_699_999_999, 1_700_090_001).unwrap();
        assert_eq!(grid.start(), 1_699_999_999);
        assert!(grid.points().windows(2).all(|w| w[1] - w[0] == HOUR));
        let last = *grid.points().last().unwrap();
        assert!(last < grid.end());
        assert!(last + HOUR >= grid.end());
    }

    #[test]
    fn test_grid_reversed_interval() {
        assert!(matches!(
            generate_grid(100, 99),
            Err(GridError::InvalidInterval(_))
        ));
    }

    #[test]
    fn test_grid_too_long() {
        let limit = MAX_GRID_POINTS as i64 * HOUR;
        assert_eq!(generate_grid(0, limit).unwrap().len(), MAX_GRID_POINTS);
        assert!(matches!(
            generate_grid(0, limit + 1),
            Err(GridError::InvalidInterval(_))
        ));
        assert!(generate_grid(i64::MIN, i64::MAX).is_err());
    }

    #[test]
    fn test_grid_snapshot() {
        let grid = generate_grid(1_700_000_000, 1_700_010_800).unwrap();
        let joined = grid
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(",");
        insta::assert_snapshot!(joined, @"1700000000,1700003600,1700007200");
    }
}
