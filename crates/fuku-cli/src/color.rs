//! Per-service color assignment for the no-ui log formatter: a hash of the
//! service name modulo a fixed palette, so the same name always gets the
//! same color within (and across) runs.

use std::io::IsTerminal;

/// ANSI 256-color codes, chosen for readability on both light and dark
/// terminal backgrounds.
const PALETTE: [u8; 8] = [33, 39, 214, 170, 77, 208, 141, 45];

/// Whether escape codes should be emitted at all. `NO_COLOR` always wins;
/// otherwise this follows whether stdout is a TTY.
pub fn should_colorize() -> bool {
    if std::env::var("NO_COLOR").is_ok_and(|v| !v.is_empty()) {
        return false;
    }
    std::io::stdout().is_terminal()
}

fn color_code_for(service: &str) -> u8 {
    let hash = service.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    PALETTE[(hash as usize) % PALETTE.len()]
}

/// Wraps `text` in the color assigned to `service`, or returns it
/// unchanged when color output is disabled.
pub fn colorize(service: &str, text: &str) -> String {
    if should_colorize() {
        format!("\x1b[38;5;{}m{text}\x1b[0m", color_code_for(service))
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_same_service_name_always_gets_the_same_color() {
        assert_eq!(color_code_for("web"), color_code_for("web"));
    }

    #[test]
    fn different_names_can_get_different_colors() {
        let colors: std::collections::HashSet<u8> =
            ["web", "db", "worker", "cache", "queue"].iter().map(|s| color_code_for(s)).collect();
        assert!(colors.len() > 1);
    }

    #[test]
    fn color_code_is_always_within_the_palette() {
        for name in ["a", "bb", "ccc", "", "service-with-a-long-name"] {
            assert!(PALETTE.contains(&color_code_for(name)));
        }
    }
}
