//! One-tap auto-enhance variants layered on the analyzed base correction.
//!
//! ```rust
//! use retouch_ops::AutoParams;
//! use retouch_render::{Adjustments, AutoVariant};
//!
//! let base = AutoParams { exposure: 0.2, contrast: 1.1 };
//! let adj = AutoVariant::Warm.apply(&Adjustments::default(), &base);
//! assert_eq!(adj.temperature, 0.2);
//! assert_eq!(adj.exposure, 0.2);
//! ```

use retouch_ops::AutoParams;
use serde::{Deserialize, Serialize};

use crate::adjustments::Adjustments;
use crate::history::History;

/// Auto-enhance flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AutoVariant {
    /// Reset the auto-controlled fields to neutral.
    None,
    /// Analyzed exposure and contrast only.
    #[default]
    Balanced,
    /// Balanced plus a warm shift.
    Warm,
    /// Balanced plus a cool shift.
    Cool,
    /// Balanced plus stronger color and contrast.
    Vivid,
}

impl AutoVariant {
    /// All variants in display order.
    pub const ALL: [AutoVariant; 5] = [
        AutoVariant::None,
        AutoVariant::Balanced,
        AutoVariant::Warm,
        AutoVariant::Cool,
        AutoVariant::Vivid,
    ];

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            AutoVariant::None => "None",
            AutoVariant::Balanced => "Balanced",
            AutoVariant::Warm => "Warm",
            AutoVariant::Cool => "Cool",
            AutoVariant::Vivid => "Vivid",
        }
    }

    /// Returns `current` with this variant's fields set from `base`.
    ///
    /// Fields the variant does not control are kept.
    pub fn apply(self, current: &Adjustments, base: &AutoParams) -> Adjustments {
        let analyzed = Adjustments {
            exposure: base.exposure,
            contrast: base.contrast,
            ..current.clone()
        };
        match self {
            AutoVariant::None => Adjustments {
                exposure: 0.0,
                contrast: 1.0,
                temperature: 0.0,
                tint: 0.0,
                saturation: 1.0,
                vibrance: 0.0,
                ..analyzed
            },
            AutoVariant::Balanced => analyzed,
            AutoVariant::Warm => Adjustments { temperature: 0.2, tint: 0.05, ..analyzed },
            AutoVariant::Cool => Adjustments { temperature: -0.2, tint: -0.05, ..analyzed },
            AutoVariant::Vivid => Adjustments {
                saturation: 1.2,
                vibrance: 0.3,
                contrast: (base.contrast * 1.1).clamp(0.5, 1.5),
                ..analyzed
            },
        }
    }

    /// Applies this variant to the history's current state and commits it.
    ///
    /// Returns `true` if the history changed.
    pub fn commit(self, history: &mut History, base: &AutoParams) -> bool {
        let next = self.apply(history.current(), base);
        history.commit(next)
    }
}
