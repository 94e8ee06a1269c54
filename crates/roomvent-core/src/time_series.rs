//! Time-indexed scalar values (C1): a continuous/step series and a
//! bracketed-interval series, the two time-dependent primitives every
//! ambient input (temperature, RH, wind, emissions, ...) is expressed in.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// How a [`TimeDependentValue`] behaves between samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Continuity {
    /// Linear interpolation between the two bracketing samples.
    Linear,
    /// Left-continuous step: holds the earlier neighbour's value.
    Step,
}

/// Types that can be linearly interpolated. Discrete series (adult counts,
/// light switches) still implement this so the type checks regardless of
/// continuity, but their [`Continuity::Step`] series never calls `lerp`.
pub trait Interpolatable: Copy {
    fn lerp(a: Self, b: Self, frac: f64) -> Self;
}

impl Interpolatable for f64 {
    fn lerp(a: Self, b: Self, frac: f64) -> Self {
        a + (b - a) * frac
    }
}

impl Interpolatable for bool {
    fn lerp(a: Self, b: Self, frac: f64) -> Self {
        if frac < 0.5 {
            a
        } else {
            b
        }
    }
}

impl Interpolatable for u32 {
    fn lerp(a: Self, b: Self, frac: f64) -> Self {
        (a as f64 + (b as f64 - a as f64) * frac).round() as u32
    }
}

/// A finite sequence of `(time, value)` pairs in strictly increasing time
/// order, either continuous (linearly interpolated) or a left-continuous
/// step function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeDependentValue<T: Interpolatable> {
    times: Vec<f64>,
    values: Vec<T>,
    continuity: Continuity,
}

impl<T: Interpolatable> TimeDependentValue<T> {
    /// Build from `(time, value)` points. Fails on an empty sequence or a
    /// non-monotone time axis.
    pub fn new(points: Vec<(f64, T)>, continuity: Continuity) -> CoreResult<Self> {
        if points.is_empty() {
            return Err(CoreError::MalformedSeries);
        }
        for w in points.windows(2) {
            if w[1].0 <= w[0].0 {
                return Err(CoreError::MalformedSeries);
            }
        }
        let (times, values) = points.into_iter().unzip();
        Ok(Self {
            times,
            values,
            continuity,
        })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn first_time(&self) -> f64 {
        self.times[0]
    }

    pub fn last_time(&self) -> f64 {
        *self.times.last().unwrap()
    }

    /// The value at time `t`: exact match, interpolated, or the
    /// left-continuous step, depending on `continuity`.
    pub fn value_at(&self, t: f64) -> CoreResult<T> {
        let first = self.times[0];
        let last = *self.times.last().unwrap();
        if t < first || t > last {
            return Err(CoreError::OutOfRange { t, first, last });
        }

        match self.times.partition_point(|&x| x <= t) {
            0 => Ok(self.values[0]),
            idx if idx == self.times.len() => Ok(*self.values.last().unwrap()),
            idx => {
                if self.times[idx - 1] == t {
                    return Ok(self.values[idx - 1]);
                }
                match self.continuity {
                    Continuity::Step => Ok(self.values[idx - 1]),
                    Continuity::Linear => {
                        let t0 = self.times[idx - 1];
                        let t1 = self.times[idx];
                        let frac = (t - t0) / (t1 - t0);
                        Ok(T::lerp(self.values[idx - 1], self.values[idx], frac))
                    }
                }
            }
        }
    }
}

/// A disjoint list of `(t0, t1, value)` intervals, non-zero only while
/// `t` falls within one of them (used for emission schedules).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBracketedValue {
    intervals: Vec<(f64, f64, f64)>,
}

impl TimeBracketedValue {
    /// Build from `(t0, t1, value)` triples. Fails if any triple has
    /// `t0 >= t1`.
    pub fn new(intervals: Vec<(f64, f64, f64)>) -> CoreResult<Self> {
        for &(t0, t1, _) in &intervals {
            if t0 >= t1 {
                return Err(CoreError::MalformedSeries);
            }
        }
        Ok(Self { intervals })
    }

    /// `v` of the triple containing `t`, else zero.
    pub fn value_at(&self, t: f64) -> f64 {
        self.intervals
            .iter()
            .find(|&&(t0, t1, _)| t0 <= t && t <= t1)
            .map(|&(_, _, v)| v)
            .unwrap_or(0.0)
    }

    pub fn intervals(&self) -> &[(f64, f64, f64)] {
        &self.intervals
    }
}
