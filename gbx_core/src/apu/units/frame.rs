/// frame sequencer ticks between envelope clocks
const ENVELOPE_RATE: u8 = 8;
/// frame sequencer ticks between length clocks
const LENGTH_RATE: u8 = 2;
/// frame sequencer ticks between sweep clocks
const SWEEP_RATE: u8 = 4;

bitflags::bitflags! {
    pub struct Step: u8 {
        const LENGTH   = 0b001;
        const ENVELOPE = 0b010;
        const SWEEP    = 0b100;
    }
}

/// Splits the 512 Hz divider clock into the sub-machine clocks.
#[derive(Debug, Default)]
pub struct FrameSequencer {
    envelope: u8,
    length: u8,
    sweep: u8,
}

impl FrameSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) -> Step {
        let mut step = Step::empty();

        step.set(Step::ENVELOPE, Self::count(&mut self.envelope, ENVELOPE_RATE));
        step.set(Step::LENGTH, Self::count(&mut self.length, LENGTH_RATE));
        step.set(Step::SWEEP, Self::count(&mut self.sweep, SWEEP_RATE));

        step
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn count(counter: &mut u8, rate: u8) -> bool {
        *counter += 1;
        if *counter >= rate {
            *counter = 0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let mut sequencer = FrameSequencer::new();
        let mut counts = [0; 3];

        for _ in 0..512 {
            let step = sequencer.tick();
            counts[0] += step.contains(Step::LENGTH) as u32;
            counts[1] += step.contains(Step::ENVELOPE) as u32;
            counts[2] += step.contains(Step::SWEEP) as u32;
        }

        assert_eq!(counts, [256, 64, 128]);
    }
}
