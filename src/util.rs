use std::fmt::Display;

/// Iterator over the set bit positions of a word, lowest first.
pub fn bit_iter(bits: u64) -> impl Iterator<Item = usize> {
    let mut remaining = bits;
    std::iter::from_fn(move || {
        if remaining == 0 {
            return None;
        }
        let position = remaining.trailing_zeros() as usize;
        remaining &= remaining - 1;
        Some(position)
    })
}

/// Running min/max/mean over integer samples.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    pub count: usize,
    pub min: usize,
    pub max: usize,
    pub avg: f32,
}

impl Stats {
    pub fn add_sample(&mut self, value: usize) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.avg += (value as f32 - self.avg) / (self.count as f32);
    }
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            count: 0,
            min: usize::MAX,
            max: 0,
            avg: 0.0,
        }
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "no samples");
        }
        write!(
            f,
            "{} - {}; avg {:.1}; {} samples",
            self.min, self.max, self.avg, self.count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;

    #[test]
    fn bit_iter_yields_positions_in_order() {
        let positions: Vec<usize> = bit_iter(0b1001_0100).collect();
        assert!(positions == vec![2, 4, 7]);
    }

    #[test]
    fn bit_iter_empty() {
        assert!(bit_iter(0).next().is_none());
    }

    #[test]
    fn stats_track_extremes_and_mean() {
        let mut stats = Stats::default();
        stats.add_sample(2);
        stats.add_sample(8);
        stats.add_sample(5);
        assert!(stats.count == 3);
        assert!(stats.min == 2);
        assert!(stats.max == 8);
        assert!((stats.avg - 5.0).abs() < 1e-6);
    }

    #[test]
    fn empty_stats_display() {
        assert!(format!("{}", Stats::default()) == "no samples");
    }
}
