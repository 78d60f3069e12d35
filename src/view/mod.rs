//! In-memory view tree.
//!
//! A small element tree with attributes, class lists and click dispatch.
//! It stands in for the browser DOM so that the feature locker and the
//! upgrade prompt can be driven and inspected without a browser.
//!
//! # Example
//!
//! ```rust
//! use vitrine::view::Document;
//!
//! let doc = Document::new();
//! let link = doc.create_element("a");
//! doc.set_attribute(link, "href", "/orders/tracking").unwrap();
//! doc.append_child(doc.root(), link).unwrap();
//!
//! let outcome = doc.click(link).unwrap();
//! assert_eq!(outcome.navigated_to.as_deref(), Some("/orders/tracking"));
//! ```

mod event;
mod tree;

pub use event::{ClickEvent, ClickHandler, ClickOutcome, EventPhase};
pub use tree::Document;

use std::fmt;

/// Identifier of an element inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a registered click listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Errors raised by view tree operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("cannot append {child} under {parent}: it would create a cycle")]
    InvalidHierarchy { parent: NodeId, child: NodeId },
}
