//! Shared resources for the viewer systems

use bevy::prelude::*;

use crate::picking::DoubleClickDetector;

/// Code of the bin under the cursor, for the hover readout
#[derive(Debug, Clone, Default, Resource)]
pub struct HoveredBin(pub Option<String>);

/// Double-click gesture state for mouse and touch presses
#[derive(Debug, Clone, Default, Resource)]
pub struct DoubleClickState(pub DoubleClickDetector);

/// UI layout detection and responsive settings
#[derive(Debug, Clone, Resource)]
pub struct UiLayout {
    pub is_mobile: bool,
    pub screen_width: f32,
    pub show_legend: bool,
}

impl Default for UiLayout {
    fn default() -> Self {
        Self {
            is_mobile: false,
            screen_width: 1280.0,
            show_legend: true,
        }
    }
}

impl UiLayout {
    pub fn update_from_window(&mut self, width: f32, height: f32) {
        self.screen_width = width;
        // Consider mobile if width < 800 or in portrait orientation
        self.is_mobile = width < 800.0 || (height > width * 1.2);
    }

    pub fn dialog_width(&self) -> f32 {
        if self.is_mobile {
            self.screen_width * 0.85
        } else {
            360.0
        }
    }

    pub fn ui_scale(&self) -> f32 {
        if self.is_mobile { 1.2 } else { 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mobile_detection() {
        let mut layout = UiLayout::default();
        layout.update_from_window(1920.0, 1080.0);
        assert!(!layout.is_mobile);
        assert_eq!(layout.dialog_width(), 360.0);

        layout.update_from_window(400.0, 800.0);
        assert!(layout.is_mobile);
        assert_eq!(layout.dialog_width(), 340.0);
        assert_eq!(layout.ui_scale(), 1.2);
    }
}
