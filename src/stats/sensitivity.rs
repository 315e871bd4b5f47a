use super::{DesignInputs, SampleSizeCalculator, SampleSizeResult};
use crate::error::PlanResult;

/// Row-major walk over an effect-size x dropout-rate grid. Each step
/// recomputes one result; nothing is materialised up front. Cloning or
/// calling `restart` replays the same sequence.
#[derive(Debug, Clone)]
pub struct SensitivitySweep<'a> {
    calculator: &'a SampleSizeCalculator,
    base: DesignInputs,
    effect_sizes: &'a [f64],
    dropout_rates: &'a [f64],
    position: usize,
}

impl<'a> SensitivitySweep<'a> {
    pub(crate) fn new(
        calculator: &'a SampleSizeCalculator,
        base: DesignInputs,
        effect_sizes: &'a [f64],
        dropout_rates: &'a [f64],
    ) -> Self {
        Self {
            calculator,
            base,
            effect_sizes,
            dropout_rates,
            position: 0,
        }
    }
    
    pub fn restart(&mut self) {
        self.position = 0;
    }
    
    fn grid_len(&self) -> usize {
        self.effect_sizes.len() * self.dropout_rates.len()
    }
}

impl<'a> Iterator for SensitivitySweep<'a> {
    type Item = PlanResult<SampleSizeResult>;
    
    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.grid_len() {
            return None;
        }
        
        let columns = self.dropout_rates.len();
        let effect = self.effect_sizes[self.position / columns];
        let dropout = self.dropout_rates[self.position % columns];
        self.position += 1;
        
        let inputs = self.base.with_effect(effect).with_dropout(dropout);
        Some(self.calculator.calculate(&inputs))
    }
    
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.grid_len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for SensitivitySweep<'a> {}
