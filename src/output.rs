//! This module is in charge of writing selection results to plain-text
//! reports on disk

use crate::{
    config::Configuration,
    numeric::{reals, Float},
    scan::{ScanParameter, ScanPoint},
    summary::Summary,
    Result,
};

use eyre::WrapErr;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    time::Duration,
};

// Number of significant digits in report output
const SIG_DIGITS: usize = (reals::DIGITS - 1) as usize;

/// Write the summary of a selection run to a report file
pub fn dump_summary(
    path: impl AsRef<Path>,
    cfg: &Configuration,
    summary: &Summary,
    elapsed_time: Duration,
) -> Result<()> {
    let path = path.as_ref();
    let mut report = create(path)?;
    let out = &mut report;

    // Timestamp of when the run ended
    writeln_report(out, timestamp()?.as_str())?;
    writeln_report(out, "---------------------------------------------")?;

    // Selection settings
    let t = &cfg.thresholds;
    writeln_report(out, ("Module limit", t.module_limit))?;
    writeln_report(out, ("Foil buffer                (mm)", t.x_foil_buffer))?;
    writeln_report(out, ("Calorimeter buffer         (mm)", t.x_calo_buffer))?;
    writeln_report(out, ("Y buffer                   (mm)", t.y_buffer))?;
    writeln_report(out, ("X max                      (mm)", t.x_max))?;
    writeln_report(out, ("Y max                      (mm)", t.y_max))?;
    writeln_report(out, ("Timing threshold", t.t_threshold))?;
    writeln_report(out, ("Timing mode", t.timing_mode.to_string().as_str()))?;
    writeln_report(out, ("Minimum energy            (MeV)", t.min_e))?;
    writeln_report(out, ("Maximum total energy      (MeV)", t.max_e_tot))?;
    writeln_report(out, "---------------------------------------------")?;

    // Per-stage survival
    writeln_report(out, ("Events read", summary.events_read))?;
    writeln_report(out, ("Unreadable records", summary.unreadable_records))?;
    for (idx, stage) in summary.stages.iter().enumerate() {
        let key = format!("Passed cut {} ({})", idx + 1, stage.label);
        writeln_report(out, (key.as_str(), stage.tally.passed))?;
        writeln_report(out, ("... domain rejections", stage.tally.rejected_domain))?;
        writeln_report(out, ("... malformed records", stage.tally.rejected_malformed))?;
        writeln_report(out, ("... invalid kinematics", stage.tally.rejected_kinematics))?;
    }
    writeln_report(out, "---------------------------------------------")?;

    // Final results
    writeln_report(out, ("Final surviving events", summary.survivors))?;
    writeln_report(out, ("Total surviving electrons", summary.surviving_electrons))?;
    writeln_report(out, ("Total surviving gammas", summary.surviving_gammas))?;
    writeln_report(out, ("Selection efficiency", summary.efficiency))?;
    let unc = summary.efficiency_uncertainty;
    writeln_report(out, ("Efficiency uncertainty", unc))?;
    let elapsed_secs = elapsed_time.as_secs_f64() as Float;
    writeln_report(out, ("Elapsed time                (s)", elapsed_secs))?;

    report
        .flush()
        .wrap_err_with(|| format!("Failed to write {}", path.display()))
}

/// Write the results of a threshold scan as a comma-separated table
pub fn dump_scan(path: impl AsRef<Path>, parameter: ScanParameter, points: &[ScanPoint]) -> Result<()> {
    let path = path.as_ref();
    let mut table = create(path)?;
    let write_table = |table: &mut BufWriter<File>| -> io::Result<()> {
        writeln!(table, "{},selected_events,efficiency,eff_uncertainty", parameter)?;
        for point in points {
            write_engineering(table, point.value, SIG_DIGITS)?;
            write!(table, ",{},", point.selected)?;
            write_engineering(table, point.efficiency, SIG_DIGITS)?;
            write!(table, ",")?;
            write_engineering(table, point.efficiency_uncertainty, SIG_DIGITS)?;
            writeln!(table)?;
        }
        table.flush()
    };
    write_table(&mut table).wrap_err_with(|| format!("Failed to write {}", path.display()))
}

/// Create a buffered report file
fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .wrap_err_with(|| format!("Failed to create {}", path.display()))
}

/// Current UTC time, as an RFC 3339 string
fn timestamp() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .wrap_err("Failed to format the current time")
}

/// Text output facility that lays reports out in columns
fn writeln_report(file: &mut impl Write, data: impl WriteReport) -> Result<()> {
    let write_line = || -> io::Result<()> {
        write!(file, " ")?;
        data.write(file)?;
        writeln!(file)
    };
    write_line().wrap_err("Failed to write the report")
}

/// Trait implemented by things which can be printed in a report
trait WriteReport: Sized {
    /// Write down `self` to the report
    fn write(self, file: &mut impl Write) -> io::Result<()>;
}

impl WriteReport for &str {
    // Strings work in the usual way
    fn write(self, file: &mut impl Write) -> io::Result<()> {
        write!(file, "{}", self)
    }
}

impl WriteReport for usize {
    // Integers work in the usual way too
    fn write(self, file: &mut impl Write) -> io::Result<()> {
        write!(file, "{}", self)
    }
}

impl WriteReport for u64 {
    fn write(self, file: &mut impl Write) -> io::Result<()> {
        write!(file, "{}", self)
    }
}

impl WriteReport for i32 {
    fn write(self, file: &mut impl Write) -> io::Result<()> {
        write!(file, "{}", self)
    }
}

impl WriteReport for Float {
    // Reports use %g-like formatting for floats
    fn write(self, file: &mut impl Write) -> io::Result<()> {
        write_engineering(file, self, SIG_DIGITS)
    }
}

impl<T: WriteReport> WriteReport for (&str, T) {
    // Key-value output that uses fixed-size columns for better readability
    fn write(self, file: &mut impl Write) -> io::Result<()> {
        write!(file, "{:<31}: ", self.0)?;
        self.1.write(file)
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
fn write_engineering(writer: &mut impl Write, x: Float, sig_digits: usize) -> io::Result<()> {
    let mut precision = sig_digits - 1;
    if x == 0. {
        // Zero is special because you can't take its log
        write!(writer, "0")
    } else {
        // Otherwise, use log to evaluate order of magnitude
        let log_x = x.abs().log10();
        if log_x >= -3. && log_x <= (sig_digits as Float) {
            // Print using naive notation
            //
            // Since Rust's precision controls number of digits after the
            // decimal point, we must adjust it depending on magnitude in order
            // to operate at a constant number of significant digits.
            precision = (precision as isize - log_x.trunc() as isize).max(0) as usize;

            // Numbers smaller than 1 must get one extra digit since the leading
            // zero does not count as a significant digit.
            if log_x < 0. {
                precision += 1
            }

            // People don't normally expect trailing zeros or decimal point in
            // naive notation, but be careful with integer numbers...
            let str_with_zeros = format!("{:.1$}", x, precision);
            if str_with_zeros.contains('.') {
                write!(
                    writer,
                    "{}",
                    str_with_zeros.trim_end_matches('0').trim_end_matches('.')
                )
            } else {
                write!(writer, "{}", str_with_zeros)
            }
        } else {
            // Print using scientific notation
            write!(writer, "{:.1$e}", x, precision)
        }
    }
}
