//! Arena-backed element tree behind a shareable handle.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::event::{ClickEvent, ClickHandler, ClickOutcome, EventPhase};
use super::{ListenerId, NodeId, ViewError};

type ViewResult<T> = std::result::Result<T, ViewError>;

struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            classes: Vec::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

struct Listener {
    node: NodeId,
    capture: bool,
    handler: ClickHandler,
}

struct ViewTree {
    nodes: Vec<Option<Element>>,
    // Keyed by registration order.
    listeners: BTreeMap<u64, Listener>,
    next_listener: u64,
    root: NodeId,
}

impl ViewTree {
    fn new() -> Self {
        Self {
            nodes: vec![Some(Element::new("body"))],
            listeners: BTreeMap::new(),
            next_listener: 0,
            root: NodeId(0),
        }
    }

    fn get(&self, node: NodeId) -> ViewResult<&Element> {
        self.nodes
            .get(node.0)
            .and_then(Option::as_ref)
            .ok_or(ViewError::NodeNotFound(node))
    }

    fn get_mut(&mut self, node: NodeId) -> ViewResult<&mut Element> {
        self.nodes
            .get_mut(node.0)
            .and_then(Option::as_mut)
            .ok_or(ViewError::NodeNotFound(node))
    }

    fn ancestors_inclusive(&self, node: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            match self.get(id) {
                Ok(element) => {
                    chain.push(id);
                    current = element.parent;
                }
                Err(_) => break,
            }
        }
        chain
    }

    fn descendants_inclusive(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Ok(element) = self.get(id) {
                out.push(id);
                stack.extend(element.children.iter().rev().copied());
            }
        }
        out
    }

    fn detach(&mut self, node: NodeId) -> ViewResult<()> {
        let parent = self.get_mut(node)?.parent.take();
        if let Some(parent) = parent {
            if let Ok(parent) = self.get_mut(parent) {
                parent.children.retain(|child| *child != node);
            }
        }
        Ok(())
    }
}

/// Shareable handle to a view tree.
///
/// Cloning the handle shares the same tree. The internal lock is never held
/// while click listeners run, so listeners may freely mutate the document.
#[derive(Clone)]
pub struct Document {
    inner: Arc<Mutex<ViewTree>>,
}

impl Document {
    /// Create a document holding a single `body` root element.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ViewTree::new())),
        }
    }

    fn tree(&self) -> MutexGuard<'_, ViewTree> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!(target: "vitrine::view", "view tree lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// The root element.
    pub fn root(&self) -> NodeId {
        self.tree().root
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        let mut tree = self.tree();
        tree.nodes.push(Some(Element::new(tag)));
        NodeId(tree.nodes.len() - 1)
    }

    /// Append `child` as the last child of `parent`, moving it if already attached.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> ViewResult<()> {
        let mut tree = self.tree();
        tree.get(parent)?;
        tree.get(child)?;
        if tree.ancestors_inclusive(parent).contains(&child) {
            return Err(ViewError::InvalidHierarchy { parent, child });
        }
        tree.detach(child)?;
        tree.get_mut(child)?.parent = Some(parent);
        tree.get_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Remove a node and its subtree, dropping their listeners.
    pub fn remove(&self, node: NodeId) -> ViewResult<()> {
        let mut tree = self.tree();
        tree.get(node)?;
        tree.detach(node)?;
        let doomed = tree.descendants_inclusive(node);
        for id in &doomed {
            tree.nodes[id.0] = None;
        }
        tree.listeners.retain(|_, listener| !doomed.contains(&listener.node));
        Ok(())
    }

    pub fn exists(&self, node: NodeId) -> bool {
        self.tree().get(node).is_ok()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree().get(node).ok().and_then(|element| element.parent)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree()
            .get(node)
            .map(|element| element.children.clone())
            .unwrap_or_default()
    }

    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.tree().get(node).ok().map(|element| element.tag.clone())
    }

    /// `node` followed by all of its descendants in document order.
    pub fn descendants_inclusive(&self, node: NodeId) -> Vec<NodeId> {
        self.tree().descendants_inclusive(node)
    }

    /// Whether `node` is `ancestor` or lives below it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.tree().ancestors_inclusive(node).contains(&ancestor)
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.tree()
            .get(node)
            .ok()
            .and_then(|element| element.attributes.get(name).cloned())
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.tree()
            .get(node)
            .map(|element| element.attributes.contains_key(name))
            .unwrap_or(false)
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> ViewResult<()> {
        self.tree()
            .get_mut(node)?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Returns whether the attribute was present.
    pub fn remove_attribute(&self, node: NodeId, name: &str) -> ViewResult<bool> {
        Ok(self.tree().get_mut(node)?.attributes.remove(name).is_some())
    }

    pub fn classes(&self, node: NodeId) -> Vec<String> {
        self.tree()
            .get(node)
            .map(|element| element.classes.clone())
            .unwrap_or_default()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.tree()
            .get(node)
            .map(|element| element.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Returns whether the class was added (false if already present).
    pub fn add_class(&self, node: NodeId, class: &str) -> ViewResult<bool> {
        let mut tree = self.tree();
        let element = tree.get_mut(node)?;
        if element.classes.iter().any(|c| c == class) {
            return Ok(false);
        }
        element.classes.push(class.to_string());
        Ok(true)
    }

    /// Returns whether the class was present.
    pub fn remove_class(&self, node: NodeId, class: &str) -> ViewResult<bool> {
        let mut tree = self.tree();
        let element = tree.get_mut(node)?;
        let before = element.classes.len();
        element.classes.retain(|c| c != class);
        Ok(element.classes.len() != before)
    }

    pub fn text(&self, node: NodeId) -> Option<String> {
        self.tree().get(node).ok().map(|element| element.text.clone())
    }

    pub fn set_text(&self, node: NodeId, text: &str) -> ViewResult<()> {
        self.tree().get_mut(node)?.text = text.to_string();
        Ok(())
    }

    /// Elements under `root` (inclusive) carrying `class`.
    pub fn query_by_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        let tree = self.tree();
        tree.descendants_inclusive(root)
            .into_iter()
            .filter(|id| {
                tree.get(*id)
                    .map(|element| element.classes.iter().any(|c| c == class))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Register a click listener. `capture` listeners run on the way down.
    pub fn add_click_listener<F>(&self, node: NodeId, capture: bool, handler: F) -> ViewResult<ListenerId>
    where
        F: Fn(&mut ClickEvent) + Send + Sync + 'static,
    {
        let mut tree = self.tree();
        tree.get(node)?;
        let id = tree.next_listener;
        tree.next_listener += 1;
        tree.listeners.insert(
            id,
            Listener {
                node,
                capture,
                handler: Arc::new(handler),
            },
        );
        Ok(ListenerId(id))
    }

    /// Returns whether the listener was registered.
    pub fn remove_click_listener(&self, id: ListenerId) -> bool {
        self.tree().listeners.remove(&id.0).is_some()
    }

    /// Number of listeners attached to `node`.
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.tree()
            .listeners
            .values()
            .filter(|listener| listener.node == node)
            .count()
    }

    /// Dispatch a click on `target` and run the default action unless prevented.
    ///
    /// Capturing listeners run from the root down to the target's parent,
    /// then every listener on the target (capturing first), then bubbling
    /// listeners from the parent back up to the root.
    pub fn click(&self, target: NodeId) -> ViewResult<ClickOutcome> {
        let plan = {
            let tree = self.tree();
            tree.get(target)?;
            let path = tree.ancestors_inclusive(target);
            let mut plan: Vec<(NodeId, EventPhase, Vec<u64>)> = Vec::new();

            let listeners_on = |node: NodeId, capture: Option<bool>| -> Vec<u64> {
                tree.listeners
                    .iter()
                    .filter(|(_, l)| l.node == node && capture.is_none_or(|c| l.capture == c))
                    .map(|(id, _)| *id)
                    .collect()
            };

            for node in path.iter().skip(1).rev() {
                plan.push((*node, EventPhase::Capturing, listeners_on(*node, Some(true))));
            }
            let mut at_target = listeners_on(target, Some(true));
            at_target.extend(listeners_on(target, Some(false)));
            plan.push((target, EventPhase::AtTarget, at_target));
            for node in path.iter().skip(1) {
                plan.push((*node, EventPhase::Bubbling, listeners_on(*node, Some(false))));
            }
            plan
        };

        let mut event = ClickEvent::new(target);
        let mut handlers_invoked = 0;

        'dispatch: for (node, phase, ids) in plan {
            event.enter(node, phase);
            for id in ids {
                // Listeners removed by an earlier handler do not run.
                let handler = self.tree().listeners.get(&id).map(|l| Arc::clone(&l.handler));
                if let Some(handler) = handler {
                    handler(&mut event);
                    handlers_invoked += 1;
                }
                if event.immediate_propagation_stopped() {
                    break 'dispatch;
                }
            }
            if event.propagation_stopped() {
                break;
            }
        }

        let navigated_to = if event.default_prevented() {
            None
        } else {
            let tree = self.tree();
            tree.ancestors_inclusive(target).into_iter().find_map(|id| {
                tree.get(id)
                    .ok()
                    .filter(|element| element.tag == "a")
                    .and_then(|element| element.attributes.get("href").cloned())
            })
        };

        Ok(ClickOutcome {
            target,
            default_prevented: event.default_prevented(),
            propagation_stopped: event.propagation_stopped(),
            handlers_invoked,
            navigated_to,
        })
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tree = self.tree();
        f.debug_struct("Document")
            .field("nodes", &tree.nodes.iter().filter(|n| n.is_some()).count())
            .field("listeners", &tree.listeners.len())
            .finish()
    }
}
