use indicatif::{ProgressBar, ProgressStyle};

use crate::fixers::Stage;

pub struct CatalogProgress {
    bar: ProgressBar,
}

impl CatalogProgress {
    pub fn new(visible: bool) -> Self {
        if !visible {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }

    pub fn set_stage(&self, stage: Stage) {
        self.bar.set_message(format!("Inspecting... [{}]", stage));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
