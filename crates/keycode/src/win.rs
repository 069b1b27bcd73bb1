//! Windows virtual key codes (`VK_*` values as reported by the low-level
//! keyboard hook, which distinguishes left/right modifiers).

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Code/name pairs for the standard US layout plus modifiers, function,
/// navigation and numpad keys.
pub(crate) static TABLE: &[(u32, &str)] = &[
    (0x08, "BACKSPACE"),
    (0x09, "TAB"),
    (0x0D, "RETURN"),
    (0x13, "PAUSE"),
    (0x14, "CAPS LOCK"),
    (0x1B, "ESCAPE"),
    (0x20, "SPACE"),
    (0x21, "PAGE UP"),
    (0x22, "PAGE DOWN"),
    (0x23, "END"),
    (0x24, "HOME"),
    (0x25, "LEFT ARROW"),
    (0x26, "UP ARROW"),
    (0x27, "RIGHT ARROW"),
    (0x28, "DOWN ARROW"),
    (0x2C, "PRINT SCREEN"),
    (0x2D, "INS"),
    (0x2E, "DELETE"),
    (0x30, "0"),
    (0x31, "1"),
    (0x32, "2"),
    (0x33, "3"),
    (0x34, "4"),
    (0x35, "5"),
    (0x36, "6"),
    (0x37, "7"),
    (0x38, "8"),
    (0x39, "9"),
    (0x41, "A"),
    (0x42, "B"),
    (0x43, "C"),
    (0x44, "D"),
    (0x45, "E"),
    (0x46, "F"),
    (0x47, "G"),
    (0x48, "H"),
    (0x49, "I"),
    (0x4A, "J"),
    (0x4B, "K"),
    (0x4C, "L"),
    (0x4D, "M"),
    (0x4E, "N"),
    (0x4F, "O"),
    (0x50, "P"),
    (0x51, "Q"),
    (0x52, "R"),
    (0x53, "S"),
    (0x54, "T"),
    (0x55, "U"),
    (0x56, "V"),
    (0x57, "W"),
    (0x58, "X"),
    (0x59, "Y"),
    (0x5A, "Z"),
    (0x5B, "LEFT META"),
    (0x5C, "RIGHT META"),
    (0x60, "NUMPAD 0"),
    (0x61, "NUMPAD 1"),
    (0x62, "NUMPAD 2"),
    (0x63, "NUMPAD 3"),
    (0x64, "NUMPAD 4"),
    (0x65, "NUMPAD 5"),
    (0x66, "NUMPAD 6"),
    (0x67, "NUMPAD 7"),
    (0x68, "NUMPAD 8"),
    (0x69, "NUMPAD 9"),
    (0x6A, "NUMPAD MULTIPLY"),
    (0x6B, "NUMPAD PLUS"),
    (0x6D, "NUMPAD MINUS"),
    (0x6E, "NUMPAD DOT"),
    (0x6F, "NUMPAD DIVIDE"),
    (0x70, "F1"),
    (0x71, "F2"),
    (0x72, "F3"),
    (0x73, "F4"),
    (0x74, "F5"),
    (0x75, "F6"),
    (0x76, "F7"),
    (0x77, "F8"),
    (0x78, "F9"),
    (0x79, "F10"),
    (0x7A, "F11"),
    (0x7B, "F12"),
    (0x7C, "F13"),
    (0x7D, "F14"),
    (0x7E, "F15"),
    (0x7F, "F16"),
    (0x80, "F17"),
    (0x81, "F18"),
    (0x82, "F19"),
    (0x83, "F20"),
    (0x84, "F21"),
    (0x85, "F22"),
    (0x86, "F23"),
    (0x87, "F24"),
    (0x90, "NUM LOCK"),
    (0x91, "SCROLL LOCK"),
    (0xA0, "LEFT SHIFT"),
    (0xA1, "RIGHT SHIFT"),
    (0xA2, "LEFT CTRL"),
    (0xA3, "RIGHT CTRL"),
    (0xA4, "LEFT ALT"),
    (0xA5, "RIGHT ALT"),
    (0xBA, "SEMICOLON"),
    (0xBB, "EQUALS"),
    (0xBC, "COMMA"),
    (0xBD, "MINUS"),
    (0xBE, "DOT"),
    (0xBF, "FORWARD SLASH"),
    (0xC0, "BACKTICK"),
    (0xDB, "SQUARE BRACKET OPEN"),
    (0xDC, "BACKSLASH"),
    (0xDD, "SQUARE BRACKET CLOSE"),
    (0xDE, "QUOTE"),
];

/// Code → name index, built on first lookup.
static INDEX: Lazy<HashMap<u32, &'static str>> = Lazy::new(|| TABLE.iter().copied().collect());

/// Look up a Windows virtual key code.
pub fn key_name(code: u32) -> Option<&'static str> {
    INDEX.get(&code).copied()
}
