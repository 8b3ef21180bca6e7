//! View count display settings.

use serde::{Deserialize, Serialize};

use crate::utils::format::{format_count, CountFormat};

/// Display rules for a stored view count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewDisplay {
    /// Counts below this are not shown at all.
    pub min: u64,
    pub format: CountFormat,
}

impl Default for ViewDisplay {
    fn default() -> Self {
        Self {
            min: 20,
            format: CountFormat::Short,
        }
    }
}

impl ViewDisplay {
    /// Formatted count, or `None` when it should not be displayed.
    /// A zero count is never displayed, whatever `min` says.
    pub fn render(&self, views: u64) -> Option<String> {
        if views == 0 || views < self.min {
            return None;
        }
        Some(format_count(views, self.format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_respects_min() {
        let display = ViewDisplay::default();
        assert_eq!(display.render(19), None);
        assert_eq!(display.render(20), Some("20".to_string()));
        assert_eq!(display.render(2500), Some("2K+".to_string()));
    }

    #[test]
    fn test_render_never_shows_zero() {
        let display = ViewDisplay {
            min: 0,
            format: CountFormat::Full,
        };
        assert_eq!(display.render(0), None);
        assert_eq!(display.render(2143), Some("2,143".to_string()));
    }
}
