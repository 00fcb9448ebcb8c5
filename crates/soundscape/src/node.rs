//! Active node handles and deferred release
//!
//! Every sound living in the render graph is paired with a [`NodeControl`]
//! shared between the control thread and the mixer. The control thread holds
//! an [`ActiveNode`] and can only ask for two things: "fade out now" and
//! "release now". Release is always deferred until the fade has had time to
//! finish, which is what [`FadeArena`] tracks.

use slotmap::{new_key_type, SlotMap};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Unique id of a node, stable for its whole life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Raw id value
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Id allocator shared by everything that creates nodes
#[derive(Debug, Default)]
pub(crate) struct NodeIds {
    next: AtomicU64,
}

impl NodeIds {
    /// Generate a new unique id
    pub(crate) fn next(&self) -> NodeId {
        NodeId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Flags shared between a node's owner and the mixer
#[derive(Debug, Default)]
pub struct NodeControl {
    stop_requested: AtomicBool,
    fade_millis: AtomicU32,
    released: AtomicBool,
    finished: AtomicBool,
}

impl NodeControl {
    /// Ask the mixer to ramp the node to silence over `fade_seconds`
    pub fn request_stop(&self, fade_seconds: f32) {
        let millis = (fade_seconds.max(0.0) * 1000.0) as u32;
        self.fade_millis.store(millis, Ordering::Relaxed);
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested, with its fade length in seconds
    pub fn stop_request(&self) -> Option<f32> {
        if self.stop_requested.load(Ordering::Acquire) {
            Some(self.fade_millis.load(Ordering::Relaxed) as f32 / 1000.0)
        } else {
            None
        }
    }

    /// Tell the mixer to drop the node at its next block
    pub fn release(&self) {
        self.released.store(true, Ordering::Release);
    }

    /// Whether the owner has released the node
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Set by the mixer once the node has produced its last sample
    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    /// Whether the mixer has dropped the node
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// Control-thread handle to a live sound in the render graph
///
/// Dropping the handle does not silence the node: long-lived layers must be
/// stopped explicitly, one-shots are simply never tracked.
#[derive(Debug, Clone)]
pub struct ActiveNode {
    id: NodeId,
    label: &'static str,
    control: Arc<NodeControl>,
}

impl ActiveNode {
    pub(crate) fn new(id: NodeId, label: &'static str, control: Arc<NodeControl>) -> Self {
        Self { id, label, control }
    }

    /// Node id
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Human-readable name of the layer
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Ramp the node to silence over `fade_seconds`
    ///
    /// Returns immediately; the node keeps sounding while the fade plays out.
    pub fn stop(&self, fade_seconds: f32) {
        self.control.request_stop(fade_seconds);
    }

    /// Whether `stop()` has been called
    pub fn is_stopping(&self) -> bool {
        self.control.stop_request().is_some()
    }

    /// Drop the node's oscillators and buffers
    pub fn release(&self) {
        self.control.release();
    }

    /// Whether the render thread is done with this node
    pub fn is_finished(&self) -> bool {
        self.control.is_finished() || self.control.is_released()
    }
}

new_key_type! {
    /// Slot of a fading node
    pub struct FadeKey;
}

/// A stopped node waiting for its fade to complete
#[derive(Debug)]
struct FadingSlot {
    node: ActiveNode,
    remaining: f32,
}

/// Stopped-but-fading nodes with a release countdown
#[derive(Debug, Default)]
pub struct FadeArena {
    slots: SlotMap<FadeKey, FadingSlot>,
}

impl FadeArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop `node` and schedule its release once `fade_seconds` have passed
    pub fn retire(&mut self, node: ActiveNode, fade_seconds: f32) -> FadeKey {
        node.stop(fade_seconds);
        self.slots.insert(FadingSlot { node, remaining: fade_seconds.max(0.0) })
    }

    /// Stop and retire every node in `nodes`
    pub fn retire_all(&mut self, nodes: impl IntoIterator<Item = ActiveNode>, fade_seconds: f32) {
        for node in nodes {
            self.retire(node, fade_seconds);
        }
    }

    /// Advance countdowns and release every node whose fade is over
    ///
    /// Returns how many nodes were released.
    pub fn tick(&mut self, delta_time: f32) -> usize {
        let mut released = 0;
        self.slots.retain(|_, slot| {
            slot.remaining -= delta_time;
            if slot.remaining <= 0.0 || slot.node.is_finished() {
                slot.node.release();
                log::trace!("Released node {:?} ({})", slot.node.id(), slot.node.label());
                released += 1;
                false
            } else {
                true
            }
        });
        released
    }

    /// Release everything immediately
    pub fn release_all(&mut self) {
        for (_, slot) in self.slots.drain() {
            slot.node.release();
        }
    }

    /// Number of nodes still fading
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no node is fading
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether the node with `id` is still fading
    pub fn contains(&self, id: NodeId) -> bool {
        self.slots.values().any(|slot| slot.node.id() == id)
    }
}

impl Drop for FadeArena {
    fn drop(&mut self) {
        self.release_all();
    }
}
