use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;

use crate::analysis::{CalibratedSeries, TestSummary};
use crate::error::RigError;

/// Write the summary block and the full time-aligned table to a new CSV file
/// in `dir`. The filename carries a millisecond timestamp and the file is
/// created with `create_new`, so an export can never clobber a prior one.
pub fn export_csv(
    dir: impl AsRef<Path>,
    summary: &TestSummary,
    series: &CalibratedSeries,
) -> Result<PathBuf, RigError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S_%3f").to_string();
    let (path, file) = create_fresh(dir, &stamp)?;
    let mut w = BufWriter::new(file);

    writeln!(w, "max_force_n,{:.6}", summary.max_force_n)?;
    writeln!(
        w,
        "displacement_at_break_m,{:.6}",
        summary.displacement_at_break_m
    )?;
    writeln!(
        w,
        "displacement_uncertainty_m,{:.6}",
        summary.displacement_uncertainty_m
    )?;
    writeln!(
        w,
        "velocity_at_break_m_s,{:.6}",
        summary.velocity_at_break_m_s
    )?;
    writeln!(
        w,
        "average_velocity_m_s,{:.6}",
        summary.average_velocity_m_s
    )?;
    writeln!(w, "sampling_rate_hz,{}", summary.sampling_rate_hz)?;
    writeln!(w, "test_duration_s,{:.6}", summary.test_duration_s)?;
    for warning in &summary.warnings {
        writeln!(w, "low_variation_warning,{}", warning.sensor)?;
    }
    writeln!(w)?;
    writeln!(w, "Time (s),Force (N),Displacement (m),Velocity (m/s)")?;
    for i in 0..series.len() {
        writeln!(
            w,
            "{:.6},{:.6},{:.6},{:.6}",
            series.time[i], series.force[i], series.displacement[i], series.velocity[i]
        )?;
    }
    w.flush()?;
    info!("exported test results to {}", path.display());
    Ok(path)
}

/// Open a brand-new file, suffixing the name if two exports land on the same
/// millisecond.
fn create_fresh(dir: &Path, stamp: &str) -> Result<(PathBuf, File), RigError> {
    for attempt in 0..100u32 {
        let name = if attempt == 0 {
            format!("tensile_test_{stamp}.csv")
        } else {
            format!("tensile_test_{stamp}_{attempt}.csv")
        };
        let path = dir.join(name);
        match File::options().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(RigError::Io(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "could not find a fresh export filename",
    )))
}
