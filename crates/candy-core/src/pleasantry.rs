//! # Pleasantry Producers
//!
//! Every accepted purchase carries a friendly message. Producing it is a
//! pluggable capability: the processor only needs something that turns
//! `"Thank you!"` into a string.
//!
//! ```text
//!  ____________
//! < Thank you! >
//!  ------------
//!         \   ^__^
//!          \  (oo)\_______
//!             (__)\       )\/\
//!                 ||----w |
//!                 ||     ||
//! ```

/// Turns a short phrase into the message shown to a buyer.
///
/// Implementations must be synchronous and must not fail. Whatever work they
/// do is invisible to the processor; a producer may return the text
/// unchanged, decorate it, or look it up somewhere.
pub trait Pleasantry: Send + Sync {
    fn produce(&self, text: &str) -> String;
}

impl<F> Pleasantry for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn produce(&self, text: &str) -> String {
        self(text)
    }
}

// =============================================================================
// Plain
// =============================================================================

/// Returns the phrase untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plain;

impl Pleasantry for Plain {
    fn produce(&self, text: &str) -> String {
        text.to_string()
    }
}

// =============================================================================
// CowSay
// =============================================================================

const COW: &str = r"        \   ^__^
         \  (oo)\_______
            (__)\       )\/\
                ||----w |
                ||     ||";

/// Has an ASCII cow say the phrase. Default producer for the server.
#[derive(Debug, Clone, Copy, Default)]
pub struct CowSay;

impl Pleasantry for CowSay {
    fn produce(&self, text: &str) -> String {
        let lines: Vec<&str> = if text.is_empty() {
            vec![""]
        } else {
            text.lines().collect()
        };
        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);

        let mut out = String::new();
        out.push(' ');
        out.push_str(&"_".repeat(width + 2));
        out.push('\n');

        let last = lines.len() - 1;
        for (i, line) in lines.iter().enumerate() {
            let (open, close) = match (i, lines.len()) {
                (_, 1) => ('<', '>'),
                (0, _) => ('/', '\\'),
                (i, _) if i == last => ('\\', '/'),
                _ => ('|', '|'),
            };
            let pad = width - line.chars().count();
            out.push_str(&format!("{} {}{} {}\n", open, line, " ".repeat(pad), close));
        }

        out.push(' ');
        out.push_str(&"-".repeat(width + 2));
        out.push('\n');
        out.push_str(COW);
        out
    }
}
