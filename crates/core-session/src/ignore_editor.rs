//! Ignore-list editing surface: the state machine behind the dialog that
//! lists every durable suppressed word as a removable chip.
//!
//! Input semantics: typing accumulates into a free-text field; comma or
//! return commits the trimmed word as a chip; backspace deletes within the
//! field, or removes the most recent chip when the field is empty. The
//! dialog chrome itself is host territory; this module owns only the state
//! transitions against the suppression store.

use core_suppress::SuppressionStore;

#[derive(Debug, Default)]
pub struct IgnoreListEditor {
    input: String,
}

impl IgnoreListEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Chips in insertion order.
    pub fn chips<'s>(&self, store: &'s SuppressionStore) -> Vec<&'s str> {
        store.durable_words()
    }

    /// Feed one typed character. Comma and return commit; everything else
    /// accumulates. Returns true when a chip was committed.
    pub fn handle_char(&mut self, c: char, store: &mut SuppressionStore) -> bool {
        if c == ',' || c == '\n' || c == '\r' {
            return self.commit(store);
        }
        self.input.push(c);
        false
    }

    fn commit(&mut self, store: &mut SuppressionStore) -> bool {
        let word = self.input.trim().to_string();
        self.input.clear();
        if word.is_empty() {
            return false;
        }
        store.add_durable(&word)
    }

    /// Backspace: edit the field, or pop the newest chip when it is empty.
    pub fn handle_backspace(&mut self, store: &mut SuppressionStore) {
        if self.input.pop().is_some() {
            return;
        }
        if let Some(last) = store.durable_words().last().map(|w| w.to_string()) {
            store.remove_durable(&last);
        }
    }

    /// All chips joined for the clipboard.
    pub fn copy_all(&self, store: &SuppressionStore) -> String {
        store.durable_words().join(", ")
    }

    pub fn clear_all(&self, store: &mut SuppressionStore) {
        store.clear_durable();
    }

    /// Commit any pending field content (dialog close).
    pub fn flush(&mut self, store: &mut SuppressionStore) {
        self.commit(store);
    }
}
