use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

/// Single line editor used for filter and search input.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    curser_pos: usize, // Position in chars, not bytes
    finished: bool,
    canceled: bool,
    changed: bool,
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    /// The text changed with the last key.
    pub changed: bool,
    pub curser_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        self.changed = false;
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.enter(),
            (KeyCode::Esc, _) => self.escape(),
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.left(),
            (KeyCode::Right, _) => self.right(),
            (KeyCode::Home, _) => self.home(),
            (KeyCode::End, _) => self.end(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => self.kill_line(),
            (kc, km) => self.key(kc, km),
        }
    }

    /// Replace the content and put the curser at the end.
    pub fn set(&mut self, s: &str) {
        self.current_input = s.to_string();
        self.curser_pos = self.current_input.chars().count();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            canceled: self.canceled,
            finished: self.finished,
            changed: self.changed,
            input: self.current_input.clone(),
            curser_pos: self.curser_pos,
        }
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.changed = false;
        self.current_input.clear();
        self.curser_pos = 0;
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        self.get()
    }

    fn escape(&mut self) -> InputResult {
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.curser_pos > 0 {
            self.curser_pos -= 1;
            self.current_input.remove(self.byte_pos());
            self.changed = true;
        }
        self.get()
    }

    fn delete(&mut self) -> InputResult {
        if self.curser_pos < self.current_input.chars().count() {
            self.current_input.remove(self.byte_pos());
            self.changed = true;
        }
        self.get()
    }

    fn kill_line(&mut self) -> InputResult {
        self.changed = !self.current_input.is_empty();
        self.current_input.clear();
        self.curser_pos = 0;
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.curser_pos = self.curser_pos.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.curser_pos < self.current_input.chars().count() {
            self.curser_pos += 1;
        }
        self.get()
    }

    fn home(&mut self) -> InputResult {
        self.curser_pos = 0;
        self.get()
    }

    fn end(&mut self) -> InputResult {
        self.curser_pos = self.current_input.chars().count();
        self.get()
    }

    fn key(&mut self, code: KeyCode, modifier: KeyModifiers) -> InputResult {
        if modifier.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            trace!("Ignoring {code:?} with {modifier:?}");
            return self.get();
        }
        if let Some(chr) = code.as_char() {
            self.current_input.insert(self.byte_pos(), chr);
            self.curser_pos += 1;
            self.changed = true;
        }
        self.get()
    }

    fn byte_pos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.curser_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn press(input: &mut Inputter, code: KeyCode) -> InputResult {
        input.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(input: &mut Inputter, s: &str) {
        for c in s.chars() {
            press(input, KeyCode::Char(c));
        }
    }

    #[test]
    fn typing_and_editing_in_the_middle() {
        let mut input = Inputter::default();
        type_str(&mut input, "sle");
        press(&mut input, KeyCode::Left);
        press(&mut input, KeyCode::Left);
        let r = press(&mut input, KeyCode::Char('a'));
        assert_eq!(r.input, "sale");
        assert!(r.changed);
        assert_eq!(r.curser_pos, 2);

        let r = press(&mut input, KeyCode::Backspace);
        assert_eq!(r.input, "sle");
        let r = press(&mut input, KeyCode::Delete);
        assert_eq!(r.input, "se");
    }

    #[test]
    fn multibyte_characters() {
        let mut input = Inputter::default();
        input.set("äöü");
        assert_eq!(input.get().curser_pos, 3);
        let r = press(&mut input, KeyCode::Backspace);
        assert_eq!(r.input, "äö");
        press(&mut input, KeyCode::Home);
        let r = press(&mut input, KeyCode::Char('x'));
        assert_eq!(r.input, "xäö");
    }

    #[test]
    fn cursor_movement_does_not_change_input() {
        let mut input = Inputter::default();
        type_str(&mut input, "ab");
        let r = press(&mut input, KeyCode::Left);
        assert!(!r.changed);
        let r = press(&mut input, KeyCode::End);
        assert_eq!(r.curser_pos, 2);
        let r = press(&mut input, KeyCode::Right);
        assert_eq!(r.curser_pos, 2);
    }

    #[test]
    fn enter_and_escape_finish_input() {
        let mut input = Inputter::default();
        type_str(&mut input, "x");
        let r = press(&mut input, KeyCode::Enter);
        assert!(r.finished && !r.canceled);
        input.clear();
        let r = press(&mut input, KeyCode::Esc);
        assert!(r.finished && r.canceled);
    }

    #[test]
    fn ctrl_u_clears_line() {
        let mut input = Inputter::default();
        type_str(&mut input, "abc");
        let r = input.read(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert_eq!(r.input, "");
        assert!(r.changed);
    }
}
