//! vision_core: VOC class table, palette rendering and overlay/figure helpers.

pub mod overlay;
pub mod palette;

pub mod prelude {
    pub use crate::overlay::*;
    pub use crate::palette::*;
}
