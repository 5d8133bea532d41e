use crate::drivers::{AcquisitionError, ScaleParameters};
/// Converts a raw block of 1-byte counts into volts.
///
/// The block length is not checked against `params.total_points`; the instrument may return a
/// different number of points depending on its acquisition mode.
pub fn decode(raw: &[u8], params: &ScaleParameters) -> Result<Vec<f64>, AcquisitionError> {
    if raw.is_empty() {
        return Err(AcquisitionError::EmptyAcquisition);
    }
    Ok(raw.iter().map(|&count| params.volts(count)).collect())
}
