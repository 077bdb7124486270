//! Chart rendering seam.
//!
//! A [`ChartHandle`] owns exactly one [`ChartSink`]. Every update hands the
//! sink a full [`ChartSeries`] that replaces whatever it drew before.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::models::Sample;

/// Timestamps plus three aligned tier series, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<DateTime<Utc>>,
    pub low: Vec<f64>,
    pub average: Vec<f64>,
    pub high: Vec<f64>,
}

impl ChartSeries {
    pub fn from_samples(samples: &[Sample]) -> Self {
        let mut ordered: Vec<&Sample> = samples.iter().collect();
        ordered.sort_by_key(|s| s.timestamp);

        let mut series = Self::default();
        for sample in ordered {
            series.labels.push(sample.timestamp);
            series.low.push(sample.low);
            series.average.push(sample.average);
            series.high.push(sample.high);
        }
        series
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

pub trait ChartSink {
    /// Replaces the sink's dataset with `series`.
    fn draw(&mut self, series: &ChartSeries) -> Result<()>;

    /// Releases the sink. Called once when its handle is dropped or replaced.
    fn dispose(&mut self) {}
}

pub struct ChartHandle<S: ChartSink> {
    sink: S,
}

impl<S: ChartSink> ChartHandle<S> {
    /// Binds `sink` as the active chart, disposing `previous` first.
    pub fn initialize(previous: Option<ChartHandle<S>>, sink: S) -> Self {
        drop(previous);
        Self { sink }
    }

    pub fn update(&mut self, samples: &[Sample]) -> Result<()> {
        self.sink.draw(&ChartSeries::from_samples(samples))
    }
}

impl<S: ChartSink> Drop for ChartHandle<S> {
    fn drop(&mut self) {
        self.sink.dispose();
    }
}

/// Terminal chart: latest tier values followed by the series as a table.
pub struct TextChart<W: Write> {
    out: W,
}

impl<W: Write> TextChart<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ChartSink for TextChart<W> {
    fn draw(&mut self, series: &ChartSeries) -> Result<()> {
        let last = series.len().checked_sub(1);
        match last {
            Some(i) => {
                writeln!(self.out, "Low: {} GWEI", series.low[i])?;
                writeln!(self.out, "Average: {} GWEI", series.average[i])?;
                writeln!(self.out, "High: {} GWEI", series.high[i])?;
            }
            None => writeln!(self.out, "no gas data in the last 3 hours")?,
        }

        if !series.is_empty() {
            writeln!(
                self.out,
                "{:<20} {:>10} {:>10} {:>10}",
                "time (UTC)", "low", "average", "high"
            )?;
            for i in 0..series.len() {
                writeln!(
                    self.out,
                    "{:<20} {:>10.2} {:>10.2} {:>10.2}",
                    series.labels[i].format("%Y-%m-%d %H:%M:%S"),
                    series.low[i],
                    series.average[i],
                    series.high[i]
                )?;
            }
        }
        self.out.flush()?;
        Ok(())
    }
}
