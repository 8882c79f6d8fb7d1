use crate::device_display::interface::DeviceDisplay;
use crate::presentation::{DetectionStatus, DisplayView};
use std::error::Error;

const BAR_WIDTH: usize = 20;

pub struct DeviceDisplayConsole {}

impl DeviceDisplayConsole {
    pub fn new() -> Self {
        Self {}
    }
}

fn bar(percent: f64) -> String {
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("{}{}", "#".repeat(filled), " ".repeat(BAR_WIDTH - filled))
}

pub fn format_view(view: &DisplayView) -> Vec<String> {
    let mut lines = vec![format!("[ {} ]", view.toggle_label())];

    let name_width = view
        .rows
        .iter()
        .map(|row| row.class_name.chars().count())
        .max()
        .unwrap_or(0);

    for row in &view.rows {
        let marker = match (&view.top_class, row.status) {
            (Some(top), _) if *top == row.class_name => "*",
            (_, DetectionStatus::Detected) => "+",
            _ => " ",
        };
        lines.push(format!(
            "{} {:<width$} {:>6.2}% [{}] {}",
            marker,
            row.class_name,
            row.percent,
            bar(row.percent),
            row.status,
            width = name_width
        ));
    }

    lines
}

impl DeviceDisplay for DeviceDisplayConsole {
    fn render(&self, view: &DisplayView) -> Result<(), Box<dyn Error + Send + Sync>> {
        let lines = format_view(view);
        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);

        println!("┌{}┐", "─".repeat(width));
        for line in &lines {
            println!("│{:<width$}│", line, width = width);
        }
        println!("└{}┘", "─".repeat(width));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_classifier::snapshot::Snapshot;
    use crate::live_loop::core::LoopState;

    #[test]
    fn test_format_view() {
        let labels = vec!["cat".to_string(), "dog".to_string(), "none".to_string()];
        let snapshot = Snapshot::from_probabilities(&labels, &[0.10, 0.85, 0.05]).unwrap();
        let view = DisplayView::new(LoopState::Running, Some(&snapshot), 0.80);

        let lines = format_view(&view);

        assert_eq!(lines[0], "[ Stop ]");
        assert_eq!(lines[1], "  cat   10.00% [##                  ] not detected");
        assert_eq!(lines[2], "* dog   85.00% [#################   ] detected");
        assert_eq!(lines[3], "  none   5.00% [#                   ] not detected");
    }

    #[test]
    fn test_idle_view_has_only_toggle() {
        let view = DisplayView::new(LoopState::Idle, None, 0.80);
        assert_eq!(format_view(&view), vec!["[ Start ]".to_string()]);
    }
}
