use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const JUMP = 1 << 2;
    }
}

/// Control intent of one player, stamped with a per-sender sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Input {
    pub buttons: Buttons,
    pub seq: u32,
}

impl Input {
    pub const NEUTRAL: Input = Input {
        buttons: Buttons::empty(),
        seq: 0,
    };

    pub fn new(buttons: Buttons, seq: u32) -> Self {
        Self { buttons, seq }
    }

    pub fn from_flags(left: bool, right: bool, jump: bool) -> Self {
        let mut buttons = Buttons::empty();
        buttons.set(Buttons::LEFT, left);
        buttons.set(Buttons::RIGHT, right);
        buttons.set(Buttons::JUMP, jump);
        Self { buttons, seq: 0 }
    }

    #[inline]
    pub fn left(&self) -> bool {
        self.buttons.contains(Buttons::LEFT)
    }

    #[inline]
    pub fn right(&self) -> bool {
        self.buttons.contains(Buttons::RIGHT)
    }

    #[inline]
    pub fn jump(&self) -> bool {
        self.buttons.contains(Buttons::JUMP)
    }

    pub fn is_neutral(&self) -> bool {
        self.buttons.is_empty()
    }
}

/// Turns a held jump button into a single-step jump request. The integrator
/// applies the impulse whenever jump is asserted on the ground, so callers
/// run their inputs through this first.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputEdge {
    jump_was_held: bool,
}

impl InputEdge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, input: Input) -> Input {
        let held = input.jump();
        let pressed = held && !self.jump_was_held;
        self.jump_was_held = held;

        let mut edged = input;
        edged.buttons.set(Buttons::JUMP, pressed);
        edged
    }

    pub fn reset(&mut self) {
        self.jump_was_held = false;
    }
}
