//! UI/Progress presentation layer
//!
//! This module handles:
//! - Progress reporting while components run
//! - The end-of-run summary ([`display`])
//!
//! All progress reporting goes through the ProgressReporter trait, so
//! dry runs and non-terminal output get the silent implementation.

pub mod display;

use indicatif::{ProgressBar, ProgressStyle};

/// Progress reporter trait for orchestration runs
pub trait ProgressReporter {
    /// Show which component is being worked on
    fn update_component(&mut self, action: &str, name: &str);

    /// Increment component progress
    fn inc_component(&mut self);

    /// Clear progress once every component is done
    fn finish(&mut self);

    /// Abandon on error
    fn abandon(&mut self);
}

/// Interactive progress reporter with a spinner and a component bar
pub struct InteractiveProgressReporter {
    component_pb: ProgressBar,
}

impl InteractiveProgressReporter {
    /// Create a new interactive progress reporter with total component count
    pub fn new(total_components: u64) -> Self {
        let style = ProgressStyle::default_bar()
            .template("{spinner} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "])
            .progress_chars("#>-");

        let component_pb = ProgressBar::new(total_components);
        component_pb.set_style(style);
        component_pb.enable_steady_tick(std::time::Duration::from_millis(80));

        Self { component_pb }
    }
}

impl ProgressReporter for InteractiveProgressReporter {
    fn update_component(&mut self, action: &str, name: &str) {
        self.component_pb.set_message(format!("{action} {name}"));
    }

    fn inc_component(&mut self) {
        self.component_pb.inc(1);
    }

    fn finish(&mut self) {
        self.component_pb.finish_and_clear();
    }

    fn abandon(&mut self) {
        self.component_pb.abandon();
    }
}

/// Silent progress reporter for dry-run mode and non-terminal output
#[derive(Default)]
pub struct SilentProgressReporter;

impl ProgressReporter for SilentProgressReporter {
    fn update_component(&mut self, _action: &str, _name: &str) {}

    fn inc_component(&mut self) {}

    fn finish(&mut self) {}

    fn abandon(&mut self) {}
}
