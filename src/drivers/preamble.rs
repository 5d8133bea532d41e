use std::str::FromStr;
use crate::drivers::AcquisitionError;
const FIELD_POINTS: usize = 2;
const FIELD_X_INCREMENT: usize = 4;
const FIELD_Y_MULTIPLIER: usize = 7;
const FIELD_Y_ORIGIN: usize = 8;
const FIELD_Y_REFERENCE: usize = 9;
const MIN_FIELDS: usize = FIELD_Y_REFERENCE + 1;
/// Calibration read once from `:WAVeform:PREamble?`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleParameters {
    pub total_points: usize,
    /// Seconds per sample.
    pub x_increment: f64,
    /// Volts per count.
    pub y_multiplier: f64,
    /// Count offset of the 0 V position.
    pub y_origin: f64,
    /// Count at the vertical centre of the screen.
    pub y_reference: f64,
}
impl ScaleParameters {
    /// Parses the comma-delimited preamble. Either all five fields parse or nothing does.
    pub fn from_preamble(response: &str) -> Result<Self, AcquisitionError> {
        let fields: Vec<&str> = response.trim().split(',').map(str::trim).collect();
        if fields.len() < MIN_FIELDS {
            return Err(AcquisitionError::MalformedPreamble(format!(
                "expected at least {MIN_FIELDS} fields, got {}",
                fields.len()
            )));
        }
        Ok(Self {
            total_points: parse_field(&fields, FIELD_POINTS, "points")?,
            x_increment: parse_field(&fields, FIELD_X_INCREMENT, "x increment")?,
            y_multiplier: parse_field(&fields, FIELD_Y_MULTIPLIER, "y increment")?,
            y_origin: parse_field(&fields, FIELD_Y_ORIGIN, "y origin")?,
            y_reference: parse_field(&fields, FIELD_Y_REFERENCE, "y reference")?,
        })
    }
    /// Physical value of a single raw count.
    pub fn volts(&self, count: u8) -> f64 {
        ((f64::from(count) - self.y_reference) - self.y_origin) * self.y_multiplier
    }
}
impl FromStr for ScaleParameters {
    type Err = AcquisitionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_preamble(s)
    }
}
fn parse_field<T: FromStr>(
    fields: &[&str],
    index: usize,
    name: &str,
) -> Result<T, AcquisitionError> {
    fields[index].parse().map_err(|_| {
        AcquisitionError::MalformedPreamble(format!(
            "field {index} ({name}) is not a number: `{}`",
            fields[index]
        ))
    })
}
