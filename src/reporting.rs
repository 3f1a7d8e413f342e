//! reporting — per-run results log.
//!
//! A [`Reporter`] receives [`Event`]s from the analysis pipeline and turns
//! each into one line of text. It is passed explicitly to every run; there
//! is no global results log.
//!
//! - [`TextReporter`] writes lines to any `Write` (a results file, stdout)
//!   and mirrors them to `log::info!`.
//! - [`MemoryReporter`] keeps the lines in memory for tests and callers that
//!   post-process them.
use std::{
    fmt,
    io::{self, Write},
};

use log::info;
use ndarray::Array1;

use crate::{
    household::DatasetSummary, inference::Estimate, optimization::multistart::BoundedFit,
};

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ReportError {
    Io { text: String },
}

impl std::error::Error for ReportError {}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Io { text } => write!(f, "Cannot write results log: {text}"),
        }
    }
}

impl From<io::Error> for ReportError {
    fn from(err: io::Error) -> Self {
        ReportError::Io { text: err.to_string() }
    }
}

/// Something worth one line in the results log.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Dataset(&'a DatasetSummary),
    Start { x: &'a Array1<f64>, objective: f64 },
    Run { index: usize, fit: &'a BoundedFit },
    Selected { index: usize, fit: &'a BoundedFit },
    NoSuccessfulRun { runs: usize },
    StandardErrors { names: &'a [String], values: &'a [Option<f64>] },
    CovarianceFailed { reason: &'a str },
    Estimate(&'a Estimate),
}

fn fmt_vec(f: &mut fmt::Formatter<'_>, v: &Array1<f64>) -> fmt::Result {
    write!(f, "[")?;
    for (i, x) in v.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{x:.6}")?;
    }
    write!(f, "]")
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Event::Dataset(s) => write!(
                f,
                "Dataset: {} households, {} people, {} cases, largest household {}, most cases {}, {} missing ages",
                s.households, s.people, s.cases, s.largest_household, s.most_cases, s.missing_ages
            ),
            Event::Start { x, objective } => {
                write!(f, "Start ")?;
                fmt_vec(f, x)?;
                write!(f, " objective {objective:.6}")
            }
            Event::Run { index, fit } => {
                write!(f, "Run {index}: start ")?;
                fmt_vec(f, &fit.start)?;
                write!(f, " -> ")?;
                fmt_vec(f, &fit.x_hat)?;
                write!(
                    f,
                    " objective {:.6} success {} status {} iterations {}",
                    fit.objective, fit.success, fit.status, fit.iterations
                )
            }
            Event::Selected { index, fit } => {
                write!(f, "Selected run {index} with objective {:.6}: ", fit.objective)?;
                fmt_vec(f, &fit.x_hat)
            }
            Event::NoSuccessfulRun { runs } => {
                write!(f, "No successful run out of {runs}; no estimate")
            }
            Event::StandardErrors { names, values } => {
                write!(f, "Standard errors:")?;
                for (name, se) in names.iter().zip(values) {
                    match se {
                        Some(se) => write!(f, " {name}={se:.6}")?,
                        None => write!(f, " {name}=n/a")?,
                    }
                }
                Ok(())
            }
            Event::CovarianceFailed { reason } => {
                write!(f, "Covariance unavailable, intervals withheld: {reason}")
            }
            Event::Estimate(e) => {
                write!(f, "{} {:.1}", e.name, e.value)?;
                match e.interval {
                    Some((lo, hi)) => write!(f, " ({lo:.1},{hi:.1}) %")?,
                    None => write!(f, " (interval unavailable) %")?,
                }
                if e.discarded > 0 {
                    write!(f, "; {} Monte Carlo draws discarded", e.discarded)?;
                }
                Ok(())
            }
        }
    }
}

/// Sink for results-log events.
pub trait Reporter {
    fn report(&mut self, event: &Event<'_>) -> ReportResult<()>;
}

/// Writes one line per event and mirrors it to the `log` facade.
#[derive(Debug)]
pub struct TextReporter<W: Write> {
    writer: W,
}

impl<W: Write> TextReporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn report(&mut self, event: &Event<'_>) -> ReportResult<()> {
        let line = event.to_string();
        info!("{line}");
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryReporter {
    pub lines: Vec<String>,
}

impl Reporter for MemoryReporter {
    fn report(&mut self, event: &Event<'_>) -> ReportResult<()> {
        self.lines.push(event.to_string());
        Ok(())
    }
}
