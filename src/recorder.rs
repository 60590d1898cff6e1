use std::cell::RefCell;
use std::rc::Rc;

use crate::document::Document;
use crate::dom::NodeId;
use crate::listeners::ListenerId;
use crate::notification::{AttrChange, MutationKind, MutationNotification};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct NotificationLog {
    container: NodeId,
    entries: Rc<RefCell<Vec<MutationNotification>>>,
    handles: Vec<(MutationKind, ListenerId)>,
}

impl NotificationLog {
    pub fn attach(document: &mut Document, container: NodeId) -> Self {
        let entries = Rc::new(RefCell::new(Vec::new()));
        let mut handles = Vec::new();
        for kind in MutationKind::ALL {
            let sink = Rc::clone(&entries);
            let id = document.add_listener(container, kind, move |_, notification| {
                sink.borrow_mut().push(notification.clone());
            });
            handles.push((kind, id));
        }
        Self {
            container,
            entries,
            handles,
        }
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn detach(&mut self, document: &mut Document) {
        for (kind, id) in self.handles.drain(..) {
            document.remove_listener(self.container, kind, id);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn snapshot(&self) -> Vec<MutationNotification> {
        self.entries.borrow().clone()
    }

    pub fn take(&self) -> Vec<MutationNotification> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }

    pub fn assert_sequence(&self, document: &Document, expected: &[ExpectedNotification]) -> Result<()> {
        let actual = self.snapshot();
        let log_snippet = render_log(document, &actual);
        for (index, descriptor) in expected.iter().enumerate() {
            match actual.get(index) {
                Some(notification) if descriptor.matches(notification) => {}
                Some(notification) => {
                    return Err(Error::AssertionFailed {
                        index,
                        expected: descriptor.describe(document),
                        actual: document.describe_notification(notification),
                        log_snippet,
                    });
                }
                None => {
                    return Err(Error::AssertionFailed {
                        index,
                        expected: descriptor.describe(document),
                        actual: "missing".into(),
                        log_snippet,
                    });
                }
            }
        }
        if actual.len() > expected.len() {
            let extra = &actual[expected.len()];
            return Err(Error::AssertionFailed {
                index: expected.len(),
                expected: "end of sequence".into(),
                actual: document.describe_notification(extra),
                log_snippet,
            });
        }
        Ok(())
    }
}

fn render_log(document: &Document, entries: &[MutationNotification]) -> String {
    if entries.is_empty() {
        return "<empty>".into();
    }
    entries
        .iter()
        .map(|notification| document.describe_notification(notification))
        .collect::<Vec<_>>()
        .join("; ")
}

// A partial matcher: only the fields set on it are compared.
#[derive(Debug, Clone)]
pub struct ExpectedNotification {
    kind: MutationKind,
    target: Option<NodeId>,
    related_node: Option<Option<NodeId>>,
    attr_name: Option<String>,
    attr_change: Option<AttrChange>,
    prev_value: Option<String>,
    new_value: Option<String>,
}

impl ExpectedNotification {
    pub fn new(kind: MutationKind) -> Self {
        Self {
            kind,
            target: None,
            related_node: None,
            attr_name: None,
            attr_change: None,
            prev_value: None,
            new_value: None,
        }
    }

    pub fn target(mut self, node: NodeId) -> Self {
        self.target = Some(node);
        self
    }

    pub fn related(mut self, related: Option<NodeId>) -> Self {
        self.related_node = Some(related);
        self
    }

    pub fn attr(mut self, name: &str) -> Self {
        self.attr_name = Some(name.to_string());
        self
    }

    pub fn change(mut self, change: AttrChange) -> Self {
        self.attr_change = Some(change);
        self
    }

    pub fn values(mut self, prev: &str, new: &str) -> Self {
        self.prev_value = Some(prev.to_string());
        self.new_value = Some(new.to_string());
        self
    }

    pub fn matches(&self, notification: &MutationNotification) -> bool {
        if notification.kind != self.kind {
            return false;
        }
        if let Some(target) = self.target {
            if notification.target != target {
                return false;
            }
        }
        if let Some(related) = self.related_node {
            if notification.related_node != related {
                return false;
            }
        }
        if let Some(attr_name) = &self.attr_name {
            if notification.attr_name != *attr_name {
                return false;
            }
        }
        if let Some(change) = self.attr_change {
            if notification.attr_change != change {
                return false;
            }
        }
        if let Some(prev) = &self.prev_value {
            if notification.prev_value != *prev {
                return false;
            }
        }
        if let Some(new) = &self.new_value {
            if notification.new_value != *new {
                return false;
            }
        }
        true
    }

    fn describe(&self, document: &Document) -> String {
        let mut out = self.kind.event_name().to_string();
        if let Some(target) = self.target {
            out.push_str(&format!(" target={}", document.node_label(target)));
        }
        if let Some(related) = self.related_node {
            match related {
                Some(node) => out.push_str(&format!(" related={}", document.node_label(node))),
                None => out.push_str(" related=null"),
            }
        }
        if let Some(name) = &self.attr_name {
            out.push_str(&format!(" attr={name}"));
        }
        if let Some(change) = self.attr_change {
            out.push_str(&format!(" change={}", change.label()));
        }
        if let Some(prev) = &self.prev_value {
            out.push_str(&format!(" prev={prev:?}"));
        }
        if let Some(new) = &self.new_value {
            out.push_str(&format!(" new={new:?}"));
        }
        out
    }
}
