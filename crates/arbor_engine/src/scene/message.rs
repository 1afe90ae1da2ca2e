//! Lifecycle message kinds

/// Messages fanned out over the hierarchy by the scene graph
///
/// Delivery order follows the active-object cache (depth-first order from
/// the last rebuild), then each entity's component-attachment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Message {
    /// A subtree just joined a live hierarchy; re-links component owners and
    /// recurses into [`Message::Awake`]
    Activate,
    /// Explicit start-of-life notification; never fired automatically
    Start,
    /// First wake-up delivered on activation
    Awake,
    /// Once per frame
    Update,
    /// After the frame's update pass
    LateUpdate,
    /// Once per due fixed time step
    FixedUpdate,
    /// Immediate-mode UI pass at the end of the frame
    GuiRender,
    /// The scene graph finished rebuilding its caches
    SceneGraphUpdate,
}
