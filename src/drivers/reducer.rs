use crate::drivers::AcquisitionError;
/// Arithmetic mean of one decoded block.
pub fn reduce(samples: &[f64]) -> Result<f64, AcquisitionError> {
    if samples.is_empty() {
        return Err(AcquisitionError::EmptyAcquisition);
    }
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}
