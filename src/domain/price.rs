//! Adjusted-close price history for a single instrument.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub adj_close: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub instrument: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series, sorting points chronologically.
    pub fn new(instrument: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        Self {
            instrument: instrument.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Period-over-period fractional returns, one entry per point.
    ///
    /// The first point has no return, and neither does a point whose
    /// predecessor price is not positive.
    pub fn returns(&self) -> Vec<(NaiveDate, Option<f64>)> {
        let mut out = Vec::with_capacity(self.points.len());
        if let Some(first) = self.points.first() {
            out.push((first.date, None));
        }
        for w in self.points.windows(2) {
            out.push((w[1].date, simple_return(w[0].adj_close, w[1].adj_close)));
        }
        out
    }
}

/// curr / prev - 1, undefined when prev is not a positive finite price.
pub fn simple_return(prev: f64, curr: f64) -> Option<f64> {
    if prev > 0.0 && prev.is_finite() && curr.is_finite() {
        Some(curr / prev - 1.0)
    } else {
        None
    }
}
