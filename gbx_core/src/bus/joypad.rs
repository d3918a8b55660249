use bit_field::BitField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl Button {
    /// P1 bit selecting this button's line
    fn line(self) -> usize {
        match self {
            Button::Right | Button::Left | Button::Up | Button::Down => 4,
            Button::A | Button::B | Button::Select | Button::Start => 5,
        }
    }
}

#[derive(Debug, Default)]
pub struct InputStates {
    pub a: bool,
    pub b: bool,
    pub select: bool,
    pub start: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl InputStates {
    fn get_mut(&mut self, button: Button) -> &mut bool {
        match button {
            Button::Right => &mut self.right,
            Button::Left => &mut self.left,
            Button::Up => &mut self.up,
            Button::Down => &mut self.down,
            Button::A => &mut self.a,
            Button::B => &mut self.b,
            Button::Select => &mut self.select,
            Button::Start => &mut self.start,
        }
    }

    fn directions(&self) -> u8 {
        ((!self.right as u8) << 0)
            | ((!self.left as u8) << 1)
            | ((!self.up as u8) << 2)
            | ((!self.down as u8) << 3)
    }

    fn actions(&self) -> u8 {
        ((!self.a as u8) << 0)
            | ((!self.b as u8) << 1)
            | ((!self.select as u8) << 2)
            | ((!self.start as u8) << 3)
    }
}

/// P1 register.
#[derive(Debug)]
pub struct Joypad {
    select: u8,
    states: InputStates,
}

impl Default for Joypad {
    fn default() -> Self {
        Self {
            select: 0x30,
            states: InputStates::default(),
        }
    }
}

impl Joypad {
    pub fn read(&self) -> u8 {
        let mut lines = 0x0F;
        if !self.select.get_bit(4) {
            lines &= self.states.directions();
        }
        if !self.select.get_bit(5) {
            lines &= self.states.actions();
        }
        0xC0 | self.select | lines
    }

    pub fn write(&mut self, data: u8) {
        self.select = data & 0x30;
    }

    /// Returns true when the change pulls a selected line low.
    pub fn set_button(&mut self, button: Button, pressed: bool) -> bool {
        let state = self.states.get_mut(button);
        let newly = pressed && !*state;
        *state = pressed;

        newly && !self.select.get_bit(button.line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_lines() {
        let mut joypad = Joypad::default();
        assert_eq!(joypad.read(), 0xFF);

        joypad.set_button(Button::Start, true);
        joypad.set_button(Button::Left, true);

        joypad.write(0x10);
        assert_eq!(joypad.read(), 0xD7);

        joypad.write(0x20);
        assert_eq!(joypad.read(), 0xED);
    }

    #[test]
    fn test_press_interrupt() {
        let mut joypad = Joypad::default();
        assert!(!joypad.set_button(Button::A, true));

        joypad.write(0x10);
        assert!(joypad.set_button(Button::B, true));
        assert!(!joypad.set_button(Button::B, true));
        assert!(!joypad.set_button(Button::Up, true));
    }
}
