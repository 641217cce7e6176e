//! IP3 uncaging stimuli
//!
//! An uncaging event releases `amount` of IP3 over `duration` seconds, i.e.
//! at rate `amount / duration`. One call applies one timestep's worth of
//! that rate; the injector keeps no timing state. [`UncagingPulse`] does the
//! bookkeeping for callers that want a pulse applied over its full duration.

use super::fields::ConcentrationField;
use std::fmt;
use tracing::warn;

/// Errors from rejected uncaging requests
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StimulusError {
    /// Duration is zero, negative or not finite
    InvalidDuration(f64),
    /// Amount is not finite
    InvalidAmount(f64),
    /// Radius is negative or not finite
    InvalidRadius(f64),
    /// Centre coordinate is not finite
    InvalidCentre,
}

impl fmt::Display for StimulusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StimulusError::InvalidDuration(d) => {
                write!(f, "Uncaging duration must be positive and finite, got {d}")
            }
            StimulusError::InvalidAmount(a) => write!(f, "Uncaging amount must be finite, got {a}"),
            StimulusError::InvalidRadius(r) => {
                write!(f, "Uncaging radius must be non-negative and finite, got {r}")
            }
            StimulusError::InvalidCentre => write!(f, "Uncaging centre must be finite"),
        }
    }
}

impl std::error::Error for StimulusError {}

/// Where an uncaging event releases IP3
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UncagingRegion {
    /// Every site
    Global,
    /// Sites with `(col − x)² + (row − y)² ≤ radius²`
    Disk {
        /// Centre column
        x: f64,
        /// Centre row
        y: f64,
        /// Radius in cells
        radius: f64,
    },
}

impl UncagingRegion {
    fn validate(&self) -> Result<(), StimulusError> {
        match *self {
            UncagingRegion::Global => Ok(()),
            UncagingRegion::Disk { x, y, radius } => {
                if !x.is_finite() || !y.is_finite() {
                    return Err(StimulusError::InvalidCentre);
                }
                if !radius.is_finite() || radius < 0.0 {
                    return Err(StimulusError::InvalidRadius(radius));
                }
                Ok(())
            }
        }
    }
}

/// IP3 added per site during one step
///
/// # Errors
/// Rejects non-positive or non-finite durations and non-finite amounts
pub fn uncaging_increment(amount: f64, duration: f64, dt: f64) -> Result<f64, StimulusError> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(StimulusError::InvalidDuration(duration));
    }
    if !amount.is_finite() {
        return Err(StimulusError::InvalidAmount(amount));
    }
    Ok(amount / duration * dt)
}

/// Add one step of uncaging to every site, then clamp to `[0, ip3_max]`
///
/// # Errors
/// See [`uncaging_increment`]; the field is untouched on error
pub fn apply_global_uncaging(
    ip3: &mut ConcentrationField,
    amount: f64,
    duration: f64,
    dt: f64,
    ip3_max: f64,
) -> Result<(), StimulusError> {
    let increment = uncaging_increment(amount, duration, dt)?;
    for v in &mut ip3.data {
        *v = (*v + increment).clamp(0.0, ip3_max);
    }
    Ok(())
}

/// Add one step of uncaging inside a disk centred on column `x`, row `y`
///
/// Sites outside the disk are not touched.
///
/// # Errors
/// Invalid geometry or timing; the field is untouched on error
#[allow(clippy::too_many_arguments)]
pub fn apply_local_uncaging(
    ip3: &mut ConcentrationField,
    x: f64,
    y: f64,
    radius: f64,
    amount: f64,
    duration: f64,
    dt: f64,
    ip3_max: f64,
) -> Result<(), StimulusError> {
    UncagingRegion::Disk { x, y, radius }.validate()?;
    let increment = uncaging_increment(amount, duration, dt)?;

    let size = ip3.size;
    if size == 0 {
        return Ok(());
    }
    let last = (size - 1) as f64;
    let row_lo = (y - radius).ceil().clamp(0.0, last) as usize;
    let row_hi = (y + radius).floor().clamp(0.0, last) as usize;
    let col_lo = (x - radius).ceil().clamp(0.0, last) as usize;
    let col_hi = (x + radius).floor().clamp(0.0, last) as usize;
    let radius_sq = radius * radius;

    for row in row_lo..=row_hi {
        let dy = row as f64 - y;
        for col in col_lo..=col_hi {
            let dx = col as f64 - x;
            if dx * dx + dy * dy <= radius_sq {
                let idx = ip3.index(row, col);
                ip3.data[idx] = (ip3.data[idx] + increment).clamp(0.0, ip3_max);
            }
        }
    }
    Ok(())
}

/// An uncaging event spread over several steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UncagingPulse {
    /// Release region
    pub region: UncagingRegion,
    /// Total IP3 released over the pulse
    pub amount: f64,
    /// Pulse length (s)
    pub duration: f64,
    /// Simulated time still to run (s)
    pub remaining: f64,
}

impl UncagingPulse {
    /// New pulse with its full duration remaining
    ///
    /// # Errors
    /// Same validation as the immediate uncaging calls
    pub fn new(region: UncagingRegion, amount: f64, duration: f64) -> Result<Self, StimulusError> {
        region.validate()?;
        uncaging_increment(amount, duration, 1.0)?;
        Ok(Self {
            region,
            amount,
            duration,
            remaining: duration,
        })
    }

    /// True while the pulse still has time left
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    /// Apply one step of the pulse and advance its clock
    ///
    /// The final step is shortened so the pulse never releases more than
    /// `amount` in total.
    pub fn apply(&mut self, ip3: &mut ConcentrationField, dt: f64, ip3_max: f64) {
        if !self.is_active() {
            return;
        }
        let step = dt.min(self.remaining);
        let applied = match self.region {
            UncagingRegion::Global => {
                apply_global_uncaging(ip3, self.amount, self.duration, step, ip3_max)
            }
            UncagingRegion::Disk { x, y, radius } => apply_local_uncaging(
                ip3,
                x,
                y,
                radius,
                self.amount,
                self.duration,
                step,
                ip3_max,
            ),
        };
        // Only fails if the public fields were edited after `new`
        if let Err(e) = applied {
            warn!("Uncaging pulse skipped a step: {}", e);
        }
        self.remaining -= step;
        // Float residue from repeated subtraction must not cost an extra step
        if self.remaining <= dt * 1e-9 {
            self.remaining = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_uncaging_adds_rate_times_dt() {
        let mut ip3 = ConcentrationField::new(4);
        apply_global_uncaging(&mut ip3, 2.0, 0.5, 0.001, 10.0).unwrap();
        assert!(ip3.data.iter().all(|&v| (v - 0.004).abs() < 1e-15));
    }

    #[test]
    fn test_global_uncaging_clamps() {
        let mut ip3 = ConcentrationField::with_value(4, 9.999);
        apply_global_uncaging(&mut ip3, 100.0, 1.0, 1.0, 10.0).unwrap();
        assert!(ip3.data.iter().all(|&v| v == 10.0));
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut ip3 = ConcentrationField::with_value(4, 1.0);
        let err = apply_global_uncaging(&mut ip3, 1.0, 0.0, 0.001, 10.0).unwrap_err();
        assert_eq!(err, StimulusError::InvalidDuration(0.0));
        assert!(ip3.data.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_local_uncaging_disk() {
        let mut ip3 = ConcentrationField::new(21);
        apply_local_uncaging(&mut ip3, 10.0, 10.0, 3.0, 1.0, 1.0, 1.0, 10.0).unwrap();

        for row in 0..21 {
            for col in 0..21 {
                let d_sq = (col as f64 - 10.0).powi(2) + (row as f64 - 10.0).powi(2);
                let v = ip3.get(row, col);
                if d_sq <= 9.0 {
                    assert_eq!(v, 1.0, "inside at ({row}, {col})");
                } else {
                    assert_eq!(v, 0.0, "outside at ({row}, {col})");
                }
            }
        }
        // Edge of the disk is included
        assert_eq!(ip3.get(10, 13), 1.0);
        assert_eq!(ip3.get(13, 10), 1.0);
    }

    #[test]
    fn test_local_uncaging_x_is_column() {
        let mut ip3 = ConcentrationField::new(10);
        apply_local_uncaging(&mut ip3, 8.0, 1.0, 0.0, 1.0, 1.0, 1.0, 10.0).unwrap();
        assert_eq!(ip3.get(1, 8), 1.0);
        assert_eq!(ip3.get(8, 1), 0.0);
        assert_eq!(ip3.data.iter().filter(|&&v| v > 0.0).count(), 1);
    }

    #[test]
    fn test_local_uncaging_partly_off_grid() {
        let mut ip3 = ConcentrationField::new(10);
        apply_local_uncaging(&mut ip3, 0.0, 0.0, 2.0, 1.0, 1.0, 1.0, 10.0).unwrap();
        // Quarter disk of radius 2 on the grid: (0,0),(0,1),(0,2),(1,0),(1,1),(2,0)
        assert_eq!(ip3.data.iter().filter(|&&v| v > 0.0).count(), 6);

        // Entirely off grid touches nothing
        let mut ip3 = ConcentrationField::new(10);
        apply_local_uncaging(&mut ip3, 50.0, 50.0, 3.0, 1.0, 1.0, 1.0, 10.0).unwrap();
        assert!(ip3.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_pulse_releases_amount_over_duration() {
        let mut ip3 = ConcentrationField::new(3);
        let mut pulse = UncagingPulse::new(UncagingRegion::Global, 1.0, 0.0105).unwrap();
        let mut steps = 0;
        while pulse.is_active() {
            pulse.apply(&mut ip3, 0.001, 10.0);
            steps += 1;
        }
        assert_eq!(steps, 11);
        assert!((ip3.get(1, 1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pulse_validation() {
        assert!(UncagingPulse::new(UncagingRegion::Global, 1.0, -1.0).is_err());
        let disk = UncagingRegion::Disk {
            x: 1.0,
            y: 1.0,
            radius: -2.0,
        };
        assert_eq!(
            UncagingPulse::new(disk, 1.0, 1.0),
            Err(StimulusError::InvalidRadius(-2.0))
        );
    }

    #[test]
    fn test_pulse_edited_after_creation_leaves_field_alone() {
        let mut ip3 = ConcentrationField::with_value(3, 1.0);
        let mut pulse = UncagingPulse::new(UncagingRegion::Global, 1.0, 0.002).unwrap();
        pulse.amount = f64::NAN;

        pulse.apply(&mut ip3, 0.001, 10.0);
        assert!(ip3.data.iter().all(|&v| v == 1.0));
        // The clock still runs so the pulse cannot stall
        assert!((pulse.remaining - 0.001).abs() < 1e-12);
    }
}
