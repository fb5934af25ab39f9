use crate::{
    error::{Error, Result},
    frame::Sample,
};
use serde::Serialize;

/// Share of the value span added above and below an auto-ranged axis
pub const AUTO_RANGE_PADDING: f64 = 0.15;

/// Inclusive pixel window used for statistics, peak search and auto-range
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize)]
pub struct InspectionRange {
    min: u32,
    max: u32,
}

impl Default for InspectionRange {
    fn default() -> Self {
        InspectionRange { min: 0, max: 1023 }
    }
}

impl InspectionRange {
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min >= max {
            return Err(Error::InvalidRange { min, max });
        }
        Ok(InspectionRange { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn contains(&self, pixel: u32) -> bool {
        (self.min..=self.max).contains(&pixel)
    }

    pub fn filter(&self, samples: &[Sample]) -> Vec<Sample> {
        samples
            .iter()
            .filter(|s| self.contains(s.pixel))
            .copied()
            .collect()
    }
}

/// Summary of a series. All fields are zero for an empty series.
#[derive(PartialEq, Debug, Clone, Copy, Default, Serialize)]
pub struct Statistics {
    pub mean: f64,
    pub median: f64,
    /// Population variance
    pub variance: f64,
    #[serde(rename = "standardDeviation")]
    pub std_dev: f64,
}

impl Statistics {
    pub fn from_samples(samples: &[Sample]) -> Self {
        if samples.is_empty() {
            return Statistics::default();
        }
        let count = samples.len() as f64;
        let mut values: Vec<f64> = samples.iter().map(|s| s.intensity).collect();

        let mean = values.iter().sum::<f64>() / count;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

        values.sort_by(f64::total_cmp);
        let mid = values.len() / 2;
        let median = if values.len() % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        };

        Statistics {
            mean,
            median,
            variance,
            std_dev: variance.sqrt(),
        }
    }

    /// Statistics of the part of `samples` within `range`
    pub fn in_range(samples: &[Sample], range: InspectionRange) -> Self {
        Statistics::from_samples(&range.filter(samples))
    }
}

#[derive(PartialEq, Debug, Clone, Copy, Serialize)]
pub struct Peak {
    pub pixel: u32,
    pub intensity: f64,
}

/// Sample with the highest intensity, the first one wins a tie
pub fn find_peak(samples: &[Sample]) -> Option<Peak> {
    let mut iter = samples.iter();
    let first = iter.next()?;
    let mut peak = Peak {
        pixel: first.pixel,
        intensity: first.intensity,
    };
    for sample in iter {
        if sample.intensity > peak.intensity {
            peak = Peak {
                pixel: sample.pixel,
                intensity: sample.intensity,
            };
        }
    }
    Some(peak)
}

fn extremes(samples: &[Sample]) -> Option<(f64, f64)> {
    samples.iter().fold(None, |acc, s| match acc {
        None => Some((s.intensity, s.intensity)),
        Some((lo, hi)) => Some((lo.min(s.intensity), hi.max(s.intensity))),
    })
}

/// Difference between the highest and the lowest intensity
pub fn peak_to_peak(samples: &[Sample]) -> Option<f64> {
    extremes(samples).map(|(lo, hi)| hi - lo)
}

#[derive(PartialEq, Debug, Clone, Copy, Serialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Self {
        AxisRange { min, max }
    }

    /// Value span of `samples` padded by [`AUTO_RANGE_PADDING`] on both sides
    pub fn auto(samples: &[Sample]) -> Option<Self> {
        let (lo, hi) = extremes(samples)?;
        let padding = (hi - lo) * AUTO_RANGE_PADDING;
        Some(AxisRange {
            min: lo - padding,
            max: hi + padding,
        })
    }
}

/// Y axis mode of the rendered view
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub enum YRange {
    #[default]
    Auto,
    Fixed(AxisRange),
}

impl YRange {
    pub fn resolve(&self, samples: &[Sample]) -> Option<AxisRange> {
        match self {
            YRange::Auto => AxisRange::auto(samples),
            YRange::Fixed(range) => Some(*range),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::*;

    fn samples(values: &[f64]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(pixel, &v)| Sample::new(pixel as u32, v))
            .collect()
    }

    #[test]
    fn statistics_of_short_series() {
        let stats = Statistics::from_samples(&samples(&[1.0, 2.0, 3.0, 4.0]));
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.variance, 1.25);
        assert!((stats.std_dev - 1.118).abs() < 1e-3);
    }

    #[test]
    fn median_of_odd_series() {
        let stats = Statistics::from_samples(&samples(&[9.0, 1.0, 5.0]));
        assert_eq!(stats.median, 5.0);
    }

    #[test]
    fn statistics_of_empty_series() {
        assert_eq!(Statistics::from_samples(&[]), Statistics::default());
        let stats = Statistics::from_samples(&[]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn statistics_honor_range() {
        let data = samples(&[100.0, 1.0, 2.0, 3.0, 4.0, 100.0]);
        let range = assert_ok!(InspectionRange::new(1, 4));
        assert_eq!(Statistics::in_range(&data, range).mean, 2.5);
    }

    #[test]
    fn range_validation() {
        assert_matches!(
            InspectionRange::new(10, 10),
            Err(Error::InvalidRange { min: 10, max: 10 })
        );
        assert_err!(InspectionRange::new(11, 10));
        let range = assert_ok!(InspectionRange::new(0, 1));
        assert!(range.contains(0));
        assert!(range.contains(1));
        assert!(!range.contains(2));
    }

    #[test]
    fn peak_prefers_first_occurrence() {
        let peak = assert_some!(find_peak(&samples(&[1.0, 7.0, 3.0, 7.0])));
        assert_eq!(peak, Peak { pixel: 1, intensity: 7.0 });
        assert_none!(find_peak(&[]));
    }

    #[test]
    fn peak_of_negative_series() {
        let peak = assert_some!(find_peak(&samples(&[-5.0, -2.0, -9.0])));
        assert_eq!(peak.pixel, 1);
    }

    #[test]
    fn auto_range_padding() {
        let data = samples(&[10.0, 30.0, 110.0]);
        assert_some_eq!(peak_to_peak(&data), 100.0);
        assert_some_eq!(AxisRange::auto(&data), AxisRange::new(-5.0, 125.0));
        assert_some_eq!(
            YRange::Fixed(AxisRange::new(0.0, 1.0)).resolve(&data),
            AxisRange::new(0.0, 1.0)
        );
        assert_none!(YRange::Auto.resolve(&[]));
    }
}
