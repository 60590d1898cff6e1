use std::rc::Rc;

use crate::dom::{Dom, Element, NodeId, NodeKind};
use crate::listeners::{ListenerId, ListenerStore};
use crate::markup;
use crate::notification::{MutationKind, MutationNotification};
use crate::probe::HostMode;
use crate::{Error, Result};

#[derive(Debug)]
pub struct Document {
    pub(crate) dom: Dom,
    pub(crate) listeners: ListenerStore,
    pub(crate) host_mode: HostMode,
    pub(crate) installed: bool,
    pub(crate) trace: bool,
    pub(crate) trace_logs: Vec<String>,
    pub(crate) trace_log_limit: usize,
    pub(crate) trace_to_stderr: bool,
}

impl Document {
    pub fn new() -> Self {
        Self::with_host_mode(HostMode::Silent)
    }

    pub fn with_host_mode(host_mode: HostMode) -> Self {
        Self {
            dom: Dom::new(),
            listeners: ListenerStore::default(),
            host_mode,
            installed: false,
            trace: false,
            trace_logs: Vec::new(),
            trace_log_limit: 10_000,
            trace_to_stderr: true,
        }
    }

    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_host(HostMode::Silent, html)
    }

    pub fn from_html_with_host(host_mode: HostMode, html: &str) -> Result<Self> {
        let mut document = Self::with_host_mode(host_mode);
        document.dom = markup::parse_fragment(html)?;
        Ok(document)
    }

    pub fn root(&self) -> NodeId {
        self.dom.root
    }

    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.dom
            .create_node(None, NodeKind::Element(Element::new(tag_name.to_ascii_lowercase())))
    }

    pub fn create_text_node(&mut self, data: &str) -> NodeId {
        self.dom.create_node(None, NodeKind::Text(data.to_string()))
    }

    pub fn create_comment(&mut self, data: &str) -> NodeId {
        self.dom.create_node(None, NodeKind::Comment(data.to_string()))
    }

    pub fn create_processing_instruction(&mut self, target: &str, data: &str) -> NodeId {
        self.dom.create_node(
            None,
            NodeKind::ProcessingInstruction {
                target: target.to_string(),
                data: data.to_string(),
            },
        )
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        if !self.dom.is_valid_node(node) {
            return None;
        }
        self.dom.parent(node)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        if !self.dom.is_valid_node(node) {
            return &[];
        }
        self.dom.children(node)
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        if !self.dom.is_valid_node(node) {
            return None;
        }
        self.dom.tag_name(node)
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.dom.is_valid_node(node) && self.dom.element(node).is_some()
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        self.dom.is_valid_node(node) && self.dom.is_text(node)
    }

    pub fn is_comment(&self, node: NodeId) -> bool {
        self.dom.is_valid_node(node) && self.dom.is_comment(node)
    }

    pub fn is_processing_instruction(&self, node: NodeId) -> bool {
        self.dom.is_valid_node(node) && self.dom.is_processing_instruction(node)
    }

    pub fn is_character_data(&self, node: NodeId) -> bool {
        self.dom.is_valid_node(node) && self.dom.is_character_data(node)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.dom.is_valid_node(node) && self.dom.is_connected(node)
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.dom.by_id(id)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        if !self.dom.is_valid_node(node) {
            return None;
        }
        self.dom
            .element(node)?
            .attr(&name.to_ascii_lowercase())
            .map(|attr| attr.value.clone())
    }

    pub fn attr_ns(&self, node: NodeId, namespace: &str, local_name: &str) -> Option<String> {
        if !self.dom.is_valid_node(node) {
            return None;
        }
        self.dom
            .element(node)?
            .attr_ns(namespace, local_name)
            .map(|attr| attr.value.clone())
    }

    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.attr(node, name).is_some()
    }

    pub fn id(&self, node: NodeId) -> Option<String> {
        self.attr(node, "id")
    }

    pub fn class_name(&self, node: NodeId) -> Option<String> {
        self.attr(node, "class")
    }

    pub fn value(&self, node: NodeId) -> Option<String> {
        if !self.dom.is_valid_node(node) {
            return None;
        }
        self.dom.element(node).map(|element| element.value.clone())
    }

    pub fn checked(&self, node: NodeId) -> bool {
        self.dom.is_valid_node(node)
            && self.dom.element(node).map(|element| element.checked).unwrap_or(false)
    }

    pub fn disabled(&self, node: NodeId) -> bool {
        self.dom.is_valid_node(node)
            && self.dom.element(node).map(|element| element.disabled).unwrap_or(false)
    }

    pub fn text_content(&self, node: NodeId) -> String {
        if !self.dom.is_valid_node(node) {
            return String::new();
        }
        self.dom.text_content(node)
    }

    pub fn character_data(&self, node: NodeId) -> Option<String> {
        if !self.dom.is_valid_node(node) {
            return None;
        }
        self.dom.character_data(node).map(str::to_string)
    }

    pub fn inner_html(&self, node: NodeId) -> Result<String> {
        if !self.dom.is_valid_node(node) {
            return Err(Error::NotFound("inner_html target is unknown".into()));
        }
        if self.dom.element(node).is_none() {
            return Err(Error::InvalidOperation("inner_html target is not an element".into()));
        }
        Ok(markup::serialize_children(&self.dom, node))
    }

    pub fn html(&self) -> String {
        markup::serialize_children(&self.dom, self.dom.root)
    }

    pub fn node_label(&self, node: NodeId) -> String {
        if !self.dom.is_valid_node(node) {
            return format!("node-{}", node.0);
        }
        if let Some(id) = self.attr(node, "id") {
            if !id.is_empty() {
                return format!("#{id}");
            }
        }
        match &self.dom.nodes[node.0].kind {
            NodeKind::Document => "#document".into(),
            NodeKind::Element(element) => element.tag_name.clone(),
            NodeKind::Text(_) => "#text".into(),
            NodeKind::Comment(_) => "#comment".into(),
            NodeKind::ProcessingInstruction { target, .. } => format!("?{target}"),
        }
    }

    pub fn add_listener(
        &mut self,
        node: NodeId,
        kind: MutationKind,
        callback: impl Fn(&mut Document, &MutationNotification) + 'static,
    ) -> ListenerId {
        self.listeners.add(node, kind, false, Rc::new(callback))
    }

    pub fn add_capture_listener(
        &mut self,
        node: NodeId,
        kind: MutationKind,
        callback: impl Fn(&mut Document, &MutationNotification) + 'static,
    ) -> ListenerId {
        self.listeners.add(node, kind, true, Rc::new(callback))
    }

    pub fn remove_listener(&mut self, node: NodeId, kind: MutationKind, id: ListenerId) -> bool {
        self.listeners.remove(node, kind, id)
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace_to_stderr = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidOperation(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_log_limit = max_entries;
        while self.trace_logs.len() > self.trace_log_limit {
            self.trace_logs.remove(0);
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.trace_logs)
    }

    fn trace_line(&mut self, line: String) {
        if self.trace_to_stderr {
            eprintln!("{line}");
        }
        if self.trace_logs.len() >= self.trace_log_limit {
            self.trace_logs.remove(0);
        }
        self.trace_logs.push(line);
    }

    pub(crate) fn events_active(&self) -> bool {
        self.host_mode == HostMode::Native || self.installed
    }

    pub(crate) fn emit(&mut self, notification: MutationNotification) {
        if self.events_active() {
            self.dispatch_notification(&notification);
        }
    }

    pub(crate) fn dispatch_notification(&mut self, notification: &MutationNotification) {
        // Listeners may mutate the tree and nest dispatch arbitrarily deep.
        stacker::maybe_grow(64 * 1024, 4 * 1024 * 1024, || {
            self.dispatch_notification_inner(notification);
        });
    }

    fn dispatch_notification_inner(&mut self, notification: &MutationNotification) {
        if self.trace {
            let line = format!("[mutation] {}", self.describe_notification(notification));
            self.trace_line(line);
        }

        if !self.dom.is_valid_node(notification.target) {
            return;
        }
        let mut path = Vec::new();
        let mut cursor = Some(notification.target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }
        path.reverse();

        if path.len() >= 2 {
            for node in &path[..path.len() - 1] {
                self.invoke_listeners(*node, notification, true);
            }
        }
        // At the target, capture registrations run before bubble registrations.
        self.invoke_listeners(notification.target, notification, true);
        self.invoke_listeners(notification.target, notification, false);
        if path.len() >= 2 {
            for node in path[..path.len() - 1].iter().rev() {
                self.invoke_listeners(*node, notification, false);
            }
        }
    }

    fn invoke_listeners(&mut self, node: NodeId, notification: &MutationNotification, capture: bool) {
        let listeners = self.listeners.get(node, notification.kind, capture);
        for listener in listeners {
            (*listener.callback)(self, notification);
        }
    }

    pub(crate) fn describe_notification(&self, notification: &MutationNotification) -> String {
        let mut line = format!(
            "{} target={}",
            notification.kind.event_name(),
            self.node_label(notification.target)
        );
        match notification.related_node {
            Some(related) => {
                line.push_str(&format!(" related={}", self.node_label(related)));
            }
            None => line.push_str(" related=null"),
        }
        match notification.kind {
            MutationKind::AttrModified => {
                line.push_str(&format!(
                    " attr={} change={} prev={:?} new={:?}",
                    notification.attr_name,
                    notification.attr_change.label(),
                    notification.prev_value,
                    notification.new_value
                ));
            }
            MutationKind::CharacterDataModified => {
                line.push_str(&format!(
                    " prev={:?} new={:?}",
                    notification.prev_value, notification.new_value
                ));
            }
            _ => {}
        }
        line
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::InstallOutcome;

    fn installed_document() -> crate::Result<Document> {
        let mut document = Document::new();
        assert_eq!(document.install_mutation_events(), InstallOutcome::Installed);
        Ok(document)
    }

    #[test]
    fn capture_listeners_run_before_bubble_listeners() -> crate::Result<()> {
        let mut document = installed_document()?;
        let container = document.create_element("div");
        let leaf = document.create_element("span");
        document.append_child(document.root(), container)?;
        document.append_child(container, leaf)?;

        let order = Rc::new(RefCell::new(Vec::new()));
        let for_root_capture = Rc::clone(&order);
        let for_container_capture = Rc::clone(&order);
        let for_container_bubble = Rc::clone(&order);
        let for_target = Rc::clone(&order);

        let root = document.root();
        document.add_capture_listener(root, MutationKind::NodeInserted, move |_, _| {
            for_root_capture.borrow_mut().push("root-capture");
        });
        document.add_capture_listener(container, MutationKind::NodeInserted, move |_, _| {
            for_container_capture.borrow_mut().push("container-capture");
        });
        document.add_listener(container, MutationKind::NodeInserted, move |_, _| {
            for_container_bubble.borrow_mut().push("container-bubble");
        });
        document.add_listener(leaf, MutationKind::NodeInserted, move |_, _| {
            for_target.borrow_mut().push("leaf-bubble");
        });

        let child = document.create_element("em");
        document.append_child(leaf, child)?;

        assert_eq!(
            order.borrow().as_slice(),
            &["root-capture", "container-capture", "leaf-bubble", "container-bubble"],
        );

        order.borrow_mut().clear();
        let grandchild = document.create_text_node("x");
        document.append_child(child, grandchild)?;
        assert_eq!(
            order.borrow().as_slice(),
            &["root-capture", "container-capture", "leaf-bubble", "container-bubble"],
        );
        Ok(())
    }

    #[test]
    fn removal_listener_observes_the_node_still_attached() -> crate::Result<()> {
        let mut document = installed_document()?;
        let container = document.create_element("div");
        let child = document.create_element("p");
        document.append_child(document.root(), container)?;
        document.append_child(container, child)?;

        let seen_parent = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen_parent);
        document.add_listener(container, MutationKind::NodeRemoved, move |doc, n| {
            *sink.borrow_mut() = doc.parent(n.target);
        });

        document.remove(child)?;
        assert_eq!(*seen_parent.borrow(), Some(container));
        assert_eq!(document.parent(child), None);
        Ok(())
    }

    #[test]
    fn removed_listener_no_longer_fires() -> crate::Result<()> {
        let mut document = installed_document()?;
        let container = document.create_element("div");
        document.append_child(document.root(), container)?;

        let hits = Rc::new(RefCell::new(0usize));
        let sink = Rc::clone(&hits);
        let id = document.add_listener(container, MutationKind::SubtreeModified, move |_, _| {
            *sink.borrow_mut() += 1;
        });

        let first = document.create_element("a");
        document.append_child(container, first)?;
        assert_eq!(*hits.borrow(), 1);

        assert!(document.remove_listener(container, MutationKind::SubtreeModified, id));
        let second = document.create_element("b");
        document.append_child(container, second)?;
        assert_eq!(*hits.borrow(), 1);
        Ok(())
    }

    #[test]
    fn trace_logs_record_dispatched_notifications() -> crate::Result<()> {
        let mut document = installed_document()?;
        document.enable_trace(true);
        document.set_trace_stderr(false);

        let container = document.create_element("div");
        document.append_child(document.root(), container)?;
        document.set_attribute(container, "id", "stage")?;

        let logs = document.take_trace_logs();
        assert!(logs.iter().any(|line| line.starts_with("[mutation] DOMNodeInserted target=div")));
        assert!(logs.iter().any(|line| {
            line.contains("DOMAttrModified target=#stage")
                && line.contains("change=addition")
                && line.contains("new=\"stage\"")
        }));
        assert!(document.take_trace_logs().is_empty());
        Ok(())
    }

    #[test]
    fn trace_log_overflow_evicts_the_oldest_lines() -> crate::Result<()> {
        let mut document = installed_document()?;
        let mut nodes = Vec::new();
        for index in 0..8 {
            let node = document.create_element("p");
            document.set_attribute(node, "id", &format!("t{index}"))?;
            nodes.push(node);
        }
        document.enable_trace(true);
        document.set_trace_stderr(false);
        document.set_trace_log_limit(4)?;

        let root = document.root();
        for node in nodes {
            document.append_child(root, node)?;
        }

        // Eight appends write sixteen lines; the ring keeps the last four.
        let logs = document.take_trace_logs();
        assert_eq!(logs.len(), 4);
        assert!(logs[0].contains("DOMNodeInserted target=#t6"));
        assert!(logs[2].contains("DOMNodeInserted target=#t7"));
        assert!(logs[3].contains("DOMSubtreeModified"));
        assert!(logs.iter().all(|line| !line.contains("#t0")));
        Ok(())
    }

    #[test]
    fn trace_log_limit_rejects_zero_and_trims_to_the_newest() -> crate::Result<()> {
        let mut document = installed_document()?;
        document.enable_trace(true);
        document.set_trace_stderr(false);
        assert!(matches!(
            document.set_trace_log_limit(0),
            Err(Error::InvalidOperation(_))
        ));

        let root = document.root();
        for tag in ["em", "strong", "aside"] {
            let node = document.create_element(tag);
            document.append_child(root, node)?;
        }
        document.set_trace_log_limit(2)?;

        let logs = document.take_trace_logs();
        assert_eq!(logs.len(), 2);
        assert!(logs[0].contains("DOMNodeInserted target=aside"));
        assert!(logs[1].contains("DOMSubtreeModified"));
        Ok(())
    }

    #[test]
    fn node_labels_prefer_ids() -> crate::Result<()> {
        let mut document = Document::new();
        let div = document.create_element("div");
        let text = document.create_text_node("x");
        let comment = document.create_comment("c");
        let pi = document.create_processing_instruction("probe", "");

        assert_eq!(document.node_label(document.root()), "#document");
        assert_eq!(document.node_label(div), "div");
        document.set_attribute(div, "id", "stage")?;
        assert_eq!(document.node_label(div), "#stage");
        assert_eq!(document.node_label(text), "#text");
        assert_eq!(document.node_label(comment), "#comment");
        assert_eq!(document.node_label(pi), "?probe");
        assert_eq!(document.node_label(NodeId(999)), "node-999");
        Ok(())
    }

    #[test]
    fn accessors_reflect_parsed_markup() -> crate::Result<()> {
        let document = Document::from_html(
            "<div id=\"stage\" class=\"wide\"><input value=\"go\" checked disabled>text</div>",
        )?;
        let stage = document.element_by_id("stage").ok_or(Error::NotFound("stage".into()))?;
        assert_eq!(document.tag_name(stage), Some("div"));
        assert_eq!(document.class_name(stage).as_deref(), Some("wide"));
        assert_eq!(document.text_content(stage), "text");

        let input = document.children(stage)[0];
        assert_eq!(document.value(input).as_deref(), Some("go"));
        assert!(document.checked(input));
        assert!(document.disabled(input));
        assert!(document.has_attr(input, "checked"));

        assert_eq!(
            document.inner_html(stage)?,
            "<input value=\"go\" checked=\"\" disabled=\"\">text"
        );
        assert!(document.html().starts_with("<div id=\"stage\""));
        Ok(())
    }

    #[test]
    fn nothing_is_emitted_while_events_are_inactive() -> crate::Result<()> {
        let mut document = Document::new();
        let container = document.create_element("div");
        document.append_child(document.root(), container)?;

        let hits = Rc::new(RefCell::new(0usize));
        let sink = Rc::clone(&hits);
        document.add_listener(container, MutationKind::NodeInserted, move |_, _| {
            *sink.borrow_mut() += 1;
        });

        let child = document.create_element("p");
        document.append_child(container, child)?;
        assert_eq!(*hits.borrow(), 0);
        assert_eq!(document.children(container).len(), 1);
        Ok(())
    }
}
