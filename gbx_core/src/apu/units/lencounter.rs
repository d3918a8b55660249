/// Length timer counting up from the written value to `threshold`.
#[derive(Debug)]
pub struct LengthTimer {
    threshold: u16,
    initial: u16,
    counter: u16,
    altered: bool,
    enabled: bool,
}

impl LengthTimer {
    pub fn new(threshold: u16) -> Self {
        Self {
            threshold,
            initial: 0,
            counter: 0,
            altered: false,
            enabled: false,
        }
    }

    pub fn load(&mut self, value: u8) {
        self.initial = value as u16;
        self.altered = true;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// A trigger on an expired timer restarts it at full length.
    pub fn trigger(&mut self) {
        if !self.altered && self.counter >= self.threshold {
            self.counter = 0;
        }
    }

    /// Returns true when the channel has to be disabled.
    pub fn tick(&mut self) -> bool {
        if !self.enabled {
            return false;
        }

        if self.altered {
            self.altered = false;
            self.counter = self.initial;
        }

        self.counter = self.counter.saturating_add(1);
        self.counter >= self.threshold
    }

    pub fn reset(&mut self) {
        self.initial = 0;
        self.counter = 0;
        self.altered = false;
        self.enabled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expire() {
        let mut timer = LengthTimer::new(64);
        timer.load(61);
        assert!(!timer.tick());

        timer.set_enabled(true);
        assert!(!timer.tick());
        assert!(!timer.tick());
        assert!(timer.tick());
    }

    #[test]
    fn test_reload_on_alter() {
        let mut timer = LengthTimer::new(128);
        timer.set_enabled(true);
        timer.load(126);
        assert!(!timer.tick());

        timer.load(100);
        for _ in 0..27 {
            assert!(!timer.tick());
        }
        assert!(timer.tick());
    }
}
