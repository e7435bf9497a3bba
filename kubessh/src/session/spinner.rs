//! On-the-wire progress feedback for `PodReconciler` state transitions.

use crate::{consts::SPINNER_GLYPHS, pod::PodState};

/// Tracks spinner position across a sequence of [`PodState::Starting`]
/// updates and renders the bytes to write to the SSH channel for each
/// emitted state.
#[derive(Default)]
pub struct Spinner {
    position: usize,
}

impl Spinner {
    pub fn new() -> Self { Self::default() }

    /// Returns the bytes to write to the channel for `state`.
    ///
    /// `Starting` backs up over the previous glyph and writes the next one;
    /// `Running` clears the line so the shell prompt starts clean.
    pub fn render(&mut self, state: PodState) -> Vec<u8> {
        match state {
            PodState::Starting => {
                let glyph = SPINNER_GLYPHS[self.position % SPINNER_GLYPHS.len()];
                self.position = self.position.wrapping_add(1);
                format!("\u{8}{glyph}").into_bytes()
            }
            PodState::Running => b"\r\x1b[K".to_vec(),
            PodState::Unknown => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_cycles_through_all_glyphs() {
        let mut spinner = Spinner::new();
        let rendered: Vec<Vec<u8>> =
            (0..SPINNER_GLYPHS.len() * 2).map(|_| spinner.render(PodState::Starting)).collect();

        for (i, glyph) in SPINNER_GLYPHS.iter().cycle().take(rendered.len()).enumerate() {
            assert_eq!(rendered[i], format!("\u{8}{glyph}").into_bytes());
        }
    }

    #[test]
    fn running_clears_the_line() {
        let mut spinner = Spinner::new();
        assert_eq!(spinner.render(PodState::Running), b"\r\x1b[K".to_vec());
    }
}
