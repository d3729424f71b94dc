//! The no-ui stdout formatter: `<service padded to max-seen-width> | <message>`,
//! with a per-service color when stdout is a TTY.

use std::collections::HashMap;

use crate::color::colorize;

/// Tracks the widest service name seen so far, so earlier lines get
/// reflowed-looking alignment without needing to know every service name
/// up front.
#[derive(Default)]
pub struct Formatter {
    width: usize,
    seen: HashMap<String, ()>,
}

impl Formatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formats one line, updating the tracked column width if `service` is
    /// wider than anything seen before.
    pub fn format(&mut self, service: &str, message: &str) -> String {
        self.seen.entry(service.to_string()).or_insert(());
        self.width = self.width.max(service.len());
        let padded = format!("{service:<width$}", width = self.width);
        format!("{} | {}", colorize(service, &padded), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_short_name_is_padded_to_the_widest_seen_so_far() {
        std::env::set_var("NO_COLOR", "1");
        let mut fmt = Formatter::new();
        assert_eq!(fmt.format("web", "starting"), "web | starting");
        assert_eq!(fmt.format("database", "ready"), "database | ready");
        // The short name is now padded to match the widest seen.
        assert_eq!(fmt.format("web", "listening"), "web      | listening");
        std::env::remove_var("NO_COLOR");
    }
}
