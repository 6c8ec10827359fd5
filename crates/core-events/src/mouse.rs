//! Mouse report decoding (X10, SGR and urxvt encodings).

use crate::ModMask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    /// Zero-based column.
    pub column: u16,
    /// Zero-based row, relative to the terminal's top-left.
    pub row: u16,
    pub mods: ModMask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Down(MouseButton),
    Up(MouseButton),
    Drag(MouseButton),
    ScrollUp,
    ScrollDown,
    Moved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Unknown,
}

fn decode_button_code(code: u32, release: bool) -> (MouseEventKind, ModMask) {
    let mut mods = ModMask::empty();
    if code & 4 != 0 {
        mods |= ModMask::SHIFT;
    }
    if code & 8 != 0 {
        mods |= ModMask::ALT;
    }
    if code & 16 != 0 {
        mods |= ModMask::CTRL;
    }
    let button = match code & 3 {
        0 => MouseButton::Left,
        1 => MouseButton::Middle,
        2 => MouseButton::Right,
        _ => MouseButton::Unknown,
    };
    let kind = if code & 64 != 0 {
        if code & 1 == 0 {
            MouseEventKind::ScrollUp
        } else {
            MouseEventKind::ScrollDown
        }
    } else if code & 32 != 0 {
        if button == MouseButton::Unknown {
            MouseEventKind::Moved
        } else {
            MouseEventKind::Drag(button)
        }
    } else if release || button == MouseButton::Unknown {
        MouseEventKind::Up(button)
    } else {
        MouseEventKind::Down(button)
    };
    (kind, mods)
}

impl MouseEvent {
    /// Decode the raw data of a `Key::Mouse` press. Returns `None` for malformed reports.
    pub fn parse(data: &str) -> Option<MouseEvent> {
        let body = data.strip_prefix("\x1b[")?;
        if let Some(sgr) = body.strip_prefix('<') {
            // SGR: ESC [ < code ; x ; y (M|m)
            let release = sgr.ends_with('m');
            let fields = sgr.strip_suffix(['M', 'm'])?;
            let mut parts = fields.split(';').map(str::parse::<u32>);
            let code = parts.next()?.ok()?;
            let x = parts.next()?.ok()?;
            let y = parts.next()?.ok()?;
            let (kind, mods) = decode_button_code(code, release);
            return Some(MouseEvent {
                kind,
                column: x.saturating_sub(1) as u16,
                row: y.saturating_sub(1) as u16,
                mods,
            });
        }
        if let Some(x10) = body.strip_prefix('M') {
            // X10: ESC [ M Cb Cx Cy, each offset by 32.
            let mut chars = x10.chars().map(|c| (c as u32).saturating_sub(32));
            let code = chars.next()?;
            let x = chars.next()?;
            let y = chars.next()?;
            let (kind, mods) = decode_button_code(code, false);
            return Some(MouseEvent {
                kind,
                column: x.saturating_sub(1) as u16,
                row: y.saturating_sub(1) as u16,
                mods,
            });
        }
        // urxvt: ESC [ code ; x ; y M, code offset by 32.
        let fields = body.strip_suffix('M')?;
        let mut parts = fields.split(';').map(str::parse::<u32>);
        let code = parts.next()?.ok()?.saturating_sub(32);
        let x = parts.next()?.ok()?;
        let y = parts.next()?.ok()?;
        let (kind, mods) = decode_button_code(code, false);
        Some(MouseEvent {
            kind,
            column: x.saturating_sub(1) as u16,
            row: y.saturating_sub(1) as u16,
            mods,
        })
    }
}
