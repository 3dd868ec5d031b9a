//! Convenient re-exports for common types and traits

pub use crate::HitboxOrbitPlugin;
pub use crate::components::CameraRig;
pub use crate::components::ClipInfo;
pub use crate::components::ClipLibrary;
pub use crate::components::InteractiveCamera;
pub use crate::components::Proxy;
pub use crate::events::CameraTransitionEnd;
pub use crate::events::ExternalNavigation;
pub use crate::events::FocusReached;
pub use crate::events::PointerClicked;
pub use crate::events::PointerMoved;
pub use crate::events::ResetRequested;
pub use crate::extension::PanOrbitCameraExt;
pub use crate::sequencer::LoopMode;
pub use crate::state::Caption;
pub use crate::state::CursorAffordance;
pub use crate::state::InteractionMode;
pub use crate::state::InteractionState;
pub use crate::table::ClipBinding;
pub use crate::table::HoverBinding;
pub use crate::table::InteractionConfig;
pub use crate::table::InteractionTable;
pub use crate::table::ProxyBinding;
pub use crate::table::RevealSpec;
