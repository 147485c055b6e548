//! Base-layer selection policy.
//!
//! A pure decision function mapping connectivity, the selected pack and
//! the viewport coverage ratio to the layer the renderer should draw.
//! It holds no state and must be re-evaluated whenever connectivity, the
//! selected pack or the viewport changes.

/// Minimum fraction of the viewport a pack must cover before offline
/// rendering is preferred over live tiles while connected.
///
/// Below this, a thin sliver of offline coverage is not worth forcing
/// offline rendering while online tiles are available.
pub const OFFLINE_COVERAGE_THRESHOLD: f64 = 0.70;

/// The base layer the renderer should draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseLayerMode {
    /// Live online tiles.
    Online,
    /// The selected offline pack.
    Offline,
    /// Nothing to draw (offline with no usable pack).
    None,
}

/// Choose the base layer for the current viewport.
///
/// Rules, evaluated in order:
///
/// 1. The bundled starter pack is a fallback of last resort: when it is
///    selected, online wins whenever connected, otherwise nothing.
/// 2. No coverage ratio means no usable pack for this viewport: online
///    when connected, otherwise nothing.
/// 3. While connected, coverage below [`OFFLINE_COVERAGE_THRESHOLD`]
///    still prefers online tiles.
/// 4. Otherwise the offline pack is drawn.
///
/// # Example
///
/// ```
/// use tilevault::policy::{base_layer_mode, BaseLayerMode};
///
/// let mode = base_layer_mode(true, false, Some(0.9));
/// assert_eq!(mode, BaseLayerMode::Offline);
/// ```
pub fn base_layer_mode(
    is_online: bool,
    is_bundled_starter_selected: bool,
    best_pack_coverage_ratio: Option<f64>,
) -> BaseLayerMode {
    if is_bundled_starter_selected {
        return if is_online {
            BaseLayerMode::Online
        } else {
            BaseLayerMode::None
        };
    }

    let Some(coverage) = best_pack_coverage_ratio else {
        return if is_online {
            BaseLayerMode::Online
        } else {
            BaseLayerMode::None
        };
    };

    if is_online && coverage < OFFLINE_COVERAGE_THRESHOLD {
        return BaseLayerMode::Online;
    }

    BaseLayerMode::Offline
}
