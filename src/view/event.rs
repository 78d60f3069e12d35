//! Click events and dispatch results.

use std::sync::Arc;

use super::NodeId;

/// Handler invoked for a click event.
pub type ClickHandler = Arc<dyn Fn(&mut ClickEvent) + Send + Sync>;

/// Dispatch phase a listener is invoked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    Capturing,
    AtTarget,
    Bubbling,
}

/// A click travelling through the tree.
#[derive(Debug)]
pub struct ClickEvent {
    target: NodeId,
    current_target: NodeId,
    phase: EventPhase,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl ClickEvent {
    pub(crate) fn new(target: NodeId) -> Self {
        Self {
            target,
            current_target: target,
            phase: EventPhase::Capturing,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    pub(crate) fn enter(&mut self, node: NodeId, phase: EventPhase) {
        self.current_target = node;
        self.phase = phase;
    }

    /// The element that was clicked.
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// The element whose listener is currently running.
    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    /// Cancel the default action (link navigation).
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Stop the event after the listeners of the current element.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop the event immediately, including later listeners on the current element.
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub(crate) fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }
}

/// Result of [`Document::click`](super::Document::click).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickOutcome {
    pub target: NodeId,
    pub default_prevented: bool,
    pub propagation_stopped: bool,
    /// Number of listeners that ran.
    pub handlers_invoked: usize,
    /// `href` followed by the default action, if it ran.
    pub navigated_to: Option<String>,
}
