use bitflags::bitflags;
use rfb_common::Point;
use tracing::trace;

bitflags! {
    /// RFB pointer button mask (bits).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ButtonMask: u8 {
        const LEFT  = 1 << 0; // Button 1
        const MIDDLE= 1 << 1; // Button 2
        const RIGHT = 1 << 2; // Button 3
        const WHEEL_UP   = 1 << 3; // Button 4 (scroll up)
        const WHEEL_DOWN = 1 << 4; // Button 5 (scroll down)
        const WHEEL_LEFT = 1 << 5; // Button 6 (horizontal scroll left)
        const WHEEL_RIGHT = 1 << 6; // Button 7 (horizontal scroll right)
    }
}

/// A physical pointer button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Middle,
    Right,
}

impl PointerButton {
    pub fn mask(self) -> ButtonMask {
        match self {
            PointerButton::Left => ButtonMask::LEFT,
            PointerButton::Middle => ButtonMask::MIDDLE,
            PointerButton::Right => ButtonMask::RIGHT,
        }
    }
}

/// One wheel notch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelDirection {
    Up,
    Down,
    Left,
    Right,
}

impl WheelDirection {
    pub fn mask(self) -> ButtonMask {
        match self {
            WheelDirection::Up => ButtonMask::WHEEL_UP,
            WheelDirection::Down => ButtonMask::WHEEL_DOWN,
            WheelDirection::Left => ButtonMask::WHEEL_LEFT,
            WheelDirection::Right => ButtonMask::WHEEL_RIGHT,
        }
    }
}

/// Tracks the remote pointer position and held buttons.
#[derive(Debug, Clone, Default)]
pub struct MouseState {
    position: Point,
    buttons: ButtonMask,
}

impl MouseState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last position, in remote coordinates.
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn buttons(&self) -> ButtonMask {
        self.buttons
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub fn press(&mut self, button: PointerButton) -> ButtonMask {
        self.buttons.insert(button.mask());
        trace!("Buttons now {:?}", self.buttons);
        self.buttons
    }

    pub fn release(&mut self, button: PointerButton) -> ButtonMask {
        self.buttons.remove(button.mask());
        trace!("Buttons now {:?}", self.buttons);
        self.buttons
    }

    /// Masks for a wheel notch: press with the wheel bit, then release it.
    pub fn wheel_masks(&self, direction: WheelDirection) -> [ButtonMask; 2] {
        [self.buttons | direction.mask(), self.buttons]
    }

    /// Forget held buttons, e.g. after focus loss or disconnect.
    pub fn reset_buttons(&mut self) {
        self.buttons = ButtonMask::empty();
    }
}
