// src/simulator.rs
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::drivers::{InstrumentTransport, TransportError, DATA_QUERY, PREAMBLE_QUERY};
pub const SIM_POINTS: usize = 1200;
const SIM_PREAMBLE: &str = "0,0,1200,1,1.000000e-06,-6.000000e-04,0,4.000000e-02,0,128";
/// Stand-in oscilloscope: a slow sine around mid-scale with a little noise.
pub struct SimulatedScope {
    rng: StdRng,
    phase: f64,
    closed: bool,
}
impl SimulatedScope {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }
    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }
    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            phase: 0.0,
            closed: false,
        }
    }
    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
    fn next_block(&mut self) -> Vec<u8> {
        self.phase += 0.05;
        let centre = 128.0 + 40.0 * self.phase.sin();
        (0..SIM_POINTS)
            .map(|_| {
                let noise: f64 = self.rng.gen_range(-3.0..=3.0);
                (centre + noise).round().clamp(0.0, 255.0) as u8
            })
            .collect()
    }
}
impl Default for SimulatedScope {
    fn default() -> Self {
        Self::new()
    }
}
impl InstrumentTransport for SimulatedScope {
    fn configure(&mut self, commands: &[String]) -> Result<(), TransportError> {
        self.ensure_open()?;
        match commands.iter().find(|c| !c.starts_with(":WAVeform:")) {
            Some(unknown) => Err(TransportError::UnknownCommand(unknown.clone())),
            None => Ok(()),
        }
    }
    fn query_text(&mut self, command: &str) -> Result<String, TransportError> {
        self.ensure_open()?;
        match command {
            PREAMBLE_QUERY => Ok(SIM_PREAMBLE.to_owned()),
            "*IDN?" => Ok("SIMULATED,SCOPE-AVG,0,0.1".to_owned()),
            _ => Err(TransportError::UnknownCommand(command.to_owned())),
        }
    }
    fn query_binary_block(&mut self, command: &str) -> Result<Vec<u8>, TransportError> {
        self.ensure_open()?;
        if command == DATA_QUERY {
            Ok(self.next_block())
        } else {
            Err(TransportError::UnknownCommand(command.to_owned()))
        }
    }
    fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        Ok(())
    }
}
