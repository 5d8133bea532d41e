use std::collections::VecDeque;
use serde::Serialize;
use crate::drivers::AcquisitionError;
/// One reduced acquisition: seconds since session start and the block average.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub time_offset: f64,
    pub value: f64,
}
impl SeriesPoint {
    pub fn new(time_offset: f64, value: f64) -> Self {
        Self { time_offset, value }
    }
}
/// Points of the last `window_secs`, oldest first.
///
/// Callers append in non-decreasing time order; eviction only ever happens at the front.
pub struct SlidingSeriesBuffer {
    points: VecDeque<SeriesPoint>,
    window_secs: f64,
}
impl SlidingSeriesBuffer {
    pub fn new(window_secs: f64) -> Result<Self, AcquisitionError> {
        if !window_secs.is_finite() || window_secs <= 0.0 {
            return Err(AcquisitionError::InvalidWindow(window_secs));
        }
        Ok(Self {
            points: VecDeque::new(),
            window_secs,
        })
    }
    #[cfg(test)]
    pub fn window_secs(&self) -> f64 {
        self.window_secs
    }
    pub fn append(&mut self, point: SeriesPoint) {
        self.points.push_back(point);
        self.evict_older_than(point.time_offset);
    }
    pub fn snapshot(&self) -> Vec<SeriesPoint> {
        self.points.iter().copied().collect()
    }
    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.points.iter()
    }
    pub fn latest(&self) -> Option<&SeriesPoint> {
        self.points.back()
    }
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.points.len()
    }
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
    fn evict_older_than(&mut self, newest: f64) {
        while let Some(front) = self.points.front() {
            if newest - front.time_offset > self.window_secs {
                self.points.pop_front();
            } else {
                break;
            }
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn rejects_non_positive_window() {
        assert!(matches!(
            SlidingSeriesBuffer::new(0.0),
            Err(AcquisitionError::InvalidWindow(_))
        ));
        assert!(SlidingSeriesBuffer::new(-1.0).is_err());
        assert!(SlidingSeriesBuffer::new(f64::NAN).is_err());
    }
    #[test]
    fn one_second_ticks_keep_the_last_ten_seconds() {
        let mut buffer = SlidingSeriesBuffer::new(10.0).unwrap();
        for i in 0..=12 {
            buffer.append(SeriesPoint::new(i as f64, i as f64));
        }
        let times: Vec<f64> = buffer.iter().map(|p| p.time_offset).collect();
        // A point exactly one window old is still inside it.
        let expected: Vec<f64> = (2..=12).map(|i| i as f64).collect();
        assert_eq!(times, expected);
        assert_eq!(buffer.latest(), Some(&SeriesPoint::new(12.0, 12.0)));
    }
    #[test]
    fn jittered_ticks_never_span_more_than_the_window() {
        let mut buffer = SlidingSeriesBuffer::new(2.5).unwrap();
        let mut t = 0.0;
        for i in 0..200 {
            t += 0.05 + (i % 7) as f64 * 0.031;
            buffer.append(SeriesPoint::new(t, 0.0));
            let first = buffer.iter().next().unwrap().time_offset;
            let last = buffer.latest().unwrap().time_offset;
            assert!(last - first <= buffer.window_secs());
            assert!(buffer.iter().all(|p| t - p.time_offset <= 2.5));
        }
    }
    #[test]
    fn snapshot_reflects_only_retained_points() {
        let mut buffer = SlidingSeriesBuffer::new(1.0).unwrap();
        buffer.append(SeriesPoint::new(0.0, 1.0));
        buffer.append(SeriesPoint::new(0.5, 2.0));
        let before = buffer.snapshot();
        buffer.append(SeriesPoint::new(1.6, 3.0));
        assert_eq!(before.len(), 2);
        assert_eq!(
            buffer.snapshot(),
            vec![SeriesPoint::new(1.6, 3.0)]
        );
    }
    #[test]
    fn equal_timestamps_are_all_kept() {
        let mut buffer = SlidingSeriesBuffer::new(0.1).unwrap();
        for v in 0..5 {
            buffer.append(SeriesPoint::new(3.0, v as f64));
        }
        assert_eq!(buffer.len(), 5);
    }
}
