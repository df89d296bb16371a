use serde::{Deserialize, Serialize};

/// Red pockets on a European wheel.
pub const RED_NUMBERS: [u8; 18] = [1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Green,
    Red,
    Black,
}

/// Pocket color, or `None` for a number that is not on the wheel.
pub fn color_of(number: u8) -> Option<Color> {
    match number {
        0 => Some(Color::Green),
        n if RED_NUMBERS.contains(&n) => Some(Color::Red),
        1..=36 => Some(Color::Black),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colors() {
        assert_eq!(color_of(0), Some(Color::Green));
        assert_eq!(color_of(21), Some(Color::Red));
        assert_eq!(color_of(2), Some(Color::Black));
        assert_eq!(color_of(37), None);
        let reds = (0..=36).filter(|n| color_of(*n) == Some(Color::Red)).count();
        let blacks = (0..=36).filter(|n| color_of(*n) == Some(Color::Black)).count();
        assert_eq!((reds, blacks), (18, 18));
    }
}
