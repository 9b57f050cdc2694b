use std::f64::consts::PI;

use crate::drivers::dualshock4::hid_report::{Color, OutputState, Rumble};

/// An [Animation] decides what a controller should look and feel like at a
/// given point in time. Sessions ask their animation for a fresh
/// [OutputState] on every update.
pub trait Animation: Send {
    /// Returns the output state for the given time in seconds since the
    /// Unix epoch.
    fn output_state(&self, time: f64) -> OutputState;
}

/// Rotates the lightbar hue by driving each color channel with a sine wave,
/// the channels a third of a cycle apart. Rumble stays off.
#[derive(Debug, Clone, Copy)]
pub struct ColorCycle {
    /// Angular rate in radians per second
    pub rate: f64,
}

impl ColorCycle {
    pub const DEFAULT_RATE: f64 = 5.0;

    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    fn channel(&self, time: f64, phase: f64) -> u8 {
        let value = 128.0 + 127.0 * (self.rate * time + phase).sin();
        value.clamp(0.0, u8::MAX as f64) as u8
    }
}

impl Default for ColorCycle {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RATE)
    }
}

impl Animation for ColorCycle {
    fn output_state(&self, time: f64) -> OutputState {
        OutputState {
            rumble: Rumble { left: 0, right: 0 },
            color: Color {
                r: self.channel(time, 0.0),
                g: self.channel(time, 2.0 * PI / 3.0),
                b: self.channel(time, 4.0 * PI / 3.0),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Animation, ColorCycle};

    #[test]
    fn test_color_cycle_values() {
        let animation = ColorCycle::default();
        let state = animation.output_state(0.0);
        assert_eq!(state.rumble.left, 0);
        assert_eq!(state.rumble.right, 0);
        // sin(0) = 0, sin(2π/3) ≈ 0.866, sin(4π/3) ≈ -0.866
        assert_eq!(state.color.r, 128);
        assert_eq!(state.color.g, 237);
        assert_eq!(state.color.b, 18);
    }

    #[test]
    fn test_color_cycle_moves_between_ticks() {
        let animation = ColorCycle::default();
        let a = animation.output_state(0.0);
        let b = animation.output_state(0.05);
        let c = animation.output_state(0.1);
        assert_ne!(a.color, b.color);
        assert_ne!(b.color, c.color);
        assert_ne!(a.color, c.color);
    }

    #[test]
    fn test_color_cycle_stays_in_range() {
        let animation = ColorCycle::new(123.456);
        for i in 0..1000 {
            let state = animation.output_state(i as f64 * 0.013);
            assert!(state.color.r >= 1);
            assert!(state.color.g >= 1);
            assert!(state.color.b >= 1);
        }
    }
}
