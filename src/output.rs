//! This module is in charge of outputting the selected candidates and the fit
//! summary to the standard output and to disk

use crate::{
    config::Configuration,
    numeric::{floats, Float},
    pipeline::HistogramFit,
    record::EventRecord,
    resfin::FinalResults,
};

use eyre::WrapErr;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use std::{
    fs::File,
    io::{BufWriter, Result, Write},
    time::Duration,
};

/// Number of significant digits in file output
const SIG_DIGITS: usize = (floats::DIGITS - 1) as usize;

/// Write the output table and the fit summary to the configured files
pub fn dump_results(
    cfg: &Configuration,
    res_fin: &FinalResults,
    fit: Option<&HistogramFit>,
    elapsed_time: Duration,
) -> eyre::Result<()> {
    // Print out a short summary on stdout
    res_fin.print_summary();
    if let Some(fit) = fit {
        print!("{}", fit.result);
    }

    // Compute a timestamp of when the run ended
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .wrap_err("Could not format the current time")?;

    // Write the candidate table
    {
        let file = File::create(&cfg.output_table)
            .wrap_err_with(|| format!("Could not create {}", cfg.output_table))?;
        let mut writer = BufWriter::new(file);
        write_table(&mut writer, &res_fin.records, cfg.is_mc)?;
        writer.flush()?;
    }

    // Write the fit summary
    {
        let file = File::create(&cfg.fit_summary)
            .wrap_err_with(|| format!("Could not create {}", cfg.fit_summary))?;
        let mut writer = BufWriter::new(file);
        write_fit_summary(&mut writer, &timestamp, cfg, res_fin, fit, elapsed_time)?;
        writer.flush()?;
    }
    Ok(())
}

/// Write output rows as a whitespace-separated table with a header line
pub fn write_table(writer: &mut impl Write, records: &[EventRecord], with_truth: bool) -> Result<()> {
    writeln!(writer, "{}", EventRecord::header(with_truth).join(" "))?;
    for record in records {
        write!(writer, "{} {}", record.id.run, record.id.event)?;
        for value in record.values(with_truth) {
            write!(writer, " ")?;
            write_engineering(writer, value, SIG_DIGITS)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Write a human-readable account of the run and of the histogram fit
pub fn write_fit_summary(
    writer: &mut impl Write,
    timestamp: &str,
    cfg: &Configuration,
    res_fin: &FinalResults,
    fit: Option<&HistogramFit>,
    elapsed_time: Duration,
) -> Result<()> {
    let writer: &mut dyn Write = writer;
    let stats = &res_fin.stats;
    writeln_summary(writer, timestamp)?;
    writeln_summary(writer, "---------------------------------------------")?;
    writeln_summary(writer, ("Input file", cfg.input_file.as_str()))?;
    writeln_summary(writer, ("Selection profile", cfg.profile.as_str()))?;
    writeln_summary(writer, ("q2 bin", cfg.q2_bin.key))?;
    writeln_summary(writer, ("q2 min (GeV2)", cfg.q2_bin.q2_min))?;
    writeln_summary(writer, ("q2 max (GeV2)", cfg.q2_bin.q2_max))?;
    writeln_summary(writer, ("Processed events", stats.events))?;
    writeln_summary(writer, ("Selected events", stats.selected))?;
    if cfg.is_mc {
        writeln_summary(writer, ("Truth-only events", stats.truth_only))?;
        writeln_summary(writer, ("Truth-matched candidates", stats.truth_matched))?;
    }
    writeln_summary(writer, ("Undefined angles", stats.undefined_angles))?;
    writeln_summary(writer, ("Histogram entries", stats.in_q2_bin))?;
    writeln_summary(writer, ("Out of histogram range", res_fin.histogram.out_of_range()))?;
    let elapsed_secs = elapsed_time.as_secs_f64();
    writeln_summary(writer, ("Elapsed time (s)", elapsed_secs))?;
    writeln_summary(writer, "---------------------------------------------")?;

    let Some(fit) = fit else {
        writeln_summary(writer, "No fit was performed")?;
        return Ok(());
    };
    let result = &fit.result;
    let status = if result.is_converged() {
        "converged"
    } else {
        "NOT converged"
    };
    writeln_summary(writer, ("Fit status", status))?;
    writeln_summary(writer, ("Migrad attempts", result.migrad_attempts))?;
    writeln_summary(writer, ("Function calls", result.calls))?;
    writeln_summary(writer, ("Minimum", result.min_value))?;
    writeln_summary(writer, ("Estimated distance to minimum", result.edm))?;
    writeln_summary(writer, ("Chi-square", fit.diagnostics.chi2))?;
    writeln_summary(writer, ("Degrees of freedom", fit.diagnostics.dof))?;
    if let Some(reduced) = fit.diagnostics.chi2_per_dof() {
        writeln_summary(writer, ("Chi-square / DoF", reduced))?;
    }
    writeln_summary(writer, "---------------------------------------------")?;
    for param in &result.params {
        write!(writer, " {:<8}", param.name)?;
        write_engineering(writer, param.value, SIG_DIGITS)?;
        if param.fixed {
            write!(writer, " fixed")?;
        } else {
            write!(writer, " +/- ")?;
            write_engineering(writer, param.error, SIG_DIGITS)?;
        }
        if let Some(minos) = &param.minos {
            write!(writer, " minos {minos}")?;
        }
        writeln!(writer)?;
    }
    writeln_summary(writer, "---------------------------------------------")?;
    writeln_summary(writer, "   i   j       pull      ratio")?;
    for bin in &fit.diagnostics.bins {
        write!(writer, " {:>3} {:>3} {:>10.4}", bin.i, bin.j, bin.pull)?;
        match bin.ratio {
            Some(ratio) => writeln!(writer, " {ratio:>10.4}")?,
            None => writeln!(writer, " {:>10}", "-")?,
        }
    }
    Ok(())
}

/// Text output facility with a one-space margin
fn writeln_summary(writer: &mut dyn Write, data: impl SummaryItem) -> Result<()> {
    write!(writer, " ")?;
    data.write(writer)?;
    writeln!(writer)
}

/// Trait implemented by things which can be printed in the fit summary
trait SummaryItem: Sized {
    /// Write down `self` to the output
    fn write(self, writer: &mut dyn Write) -> Result<()>;
}

impl SummaryItem for &str {
    // Strings work in the usual way
    fn write(self, writer: &mut dyn Write) -> Result<()> {
        write!(writer, "{self}")
    }
}

impl SummaryItem for usize {
    fn write(self, writer: &mut dyn Write) -> Result<()> {
        write!(writer, "{self}")
    }
}

impl SummaryItem for i64 {
    fn write(self, writer: &mut dyn Write) -> Result<()> {
        write!(writer, "{self}")
    }
}

impl SummaryItem for Float {
    // Close approximation of printf's %g
    fn write(self, writer: &mut dyn Write) -> Result<()> {
        write_engineering(writer, self, SIG_DIGITS)
    }
}

impl<T: SummaryItem> SummaryItem for (&str, T) {
    // Key-value output that uses fixed-size columns for better readability
    fn write(self, writer: &mut dyn Write) -> Result<()> {
        write!(writer, "{:<31}: ", self.0)?;
        self.1.write(writer)
    }
}

/// Write a floating-point number using "engineering" notation
///
/// Analogous to the %g format of the C printf function, this method switches
/// between naive and scientific notation for floating-point numbers when the
/// number being printed becomes so small that printing leading zeroes could end
/// up larger than the scientific notation, or so large that we would be forced
/// to print more significant digits than requested.
///
fn write_engineering(writer: &mut (impl Write + ?Sized), x: Float, sig_digits: usize) -> Result<()> {
    let mut precision = sig_digits - 1;
    if x == 0. {
        // Zero is special because you can't take its log
        write!(writer, "0")
    } else {
        // Otherwise, use log to evaluate order of magnitude
        let log_x = x.abs().log10();
        if log_x >= -3. && log_x < precision as Float {
            // Print using naive notation
            //
            // Since Rust's precision controls number of digits after the
            // decimal point, we must adjust it depending on magnitude in order
            // to operate at a constant number of significant digits.
            precision = (precision as isize - log_x.trunc() as isize) as usize;

            // Numbers smaller than 1 must get one extra digit since the leading
            // zero does not count as a significant digit.
            if log_x < 0. {
                precision += 1
            }

            // People don't normally expect trailing zeros or decimal point in
            // naive notation, but be careful with integer numbers...
            let str_with_zeros = format!("{x:.precision$}");
            if str_with_zeros.contains('.') {
                write!(
                    writer,
                    "{}",
                    str_with_zeros.trim_end_matches('0').trim_end_matches('.')
                )
            } else {
                write!(writer, "{str_with_zeros}")
            }
        } else {
            // Print using scientific notation
            write!(writer, "{x:.precision$e}")
        }
    }
}
