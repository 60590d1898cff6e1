use std::collections::HashMap;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Attr {
    pub(crate) name: String,
    pub(crate) namespace: Option<String>,
    pub(crate) value: String,
}

pub(crate) fn local_name_of(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

impl Attr {
    pub(crate) fn local_name(&self) -> &str {
        local_name_of(&self.name)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: Vec<Attr>,
    pub(crate) value: String,
    pub(crate) checked: bool,
    pub(crate) disabled: bool,
}

impl Element {
    pub(crate) fn new(tag_name: String) -> Self {
        Self {
            tag_name,
            attrs: Vec::new(),
            value: String::new(),
            checked: false,
            disabled: false,
        }
    }

    pub(crate) fn with_attrs(tag_name: String, attrs: Vec<Attr>) -> Self {
        let mut element = Self::new(tag_name);
        for attr in &attrs {
            match attr.name.as_str() {
                "value" => element.value = attr.value.clone(),
                "checked" => element.checked = true,
                "disabled" => element.disabled = true,
                _ => {}
            }
        }
        element.attrs = attrs;
        element
    }

    pub(crate) fn attr(&self, name: &str) -> Option<&Attr> {
        self.attrs.iter().find(|attr| attr.name == name)
    }

    pub(crate) fn attr_ns(&self, namespace: &str, local_name: &str) -> Option<&Attr> {
        self.attrs
            .iter()
            .find(|attr| attr.namespace.as_deref() == Some(namespace) && attr.local_name() == local_name)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Document,
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) id_index: HashMap<String, NodeId>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    pub(crate) fn create_node(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            kind,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn is_valid_node(&self, node_id: NodeId) -> bool {
        node_id.0 < self.nodes.len()
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes[node_id.0].parent
    }

    pub(crate) fn children(&self, node_id: NodeId) -> &[NodeId] {
        &self.nodes[node_id.0].children
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes[node_id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[node_id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|element| element.tag_name.as_str())
    }

    pub(crate) fn is_document(&self, node_id: NodeId) -> bool {
        matches!(self.nodes[node_id.0].kind, NodeKind::Document)
    }

    pub(crate) fn is_text(&self, node_id: NodeId) -> bool {
        matches!(self.nodes[node_id.0].kind, NodeKind::Text(_))
    }

    pub(crate) fn is_comment(&self, node_id: NodeId) -> bool {
        matches!(self.nodes[node_id.0].kind, NodeKind::Comment(_))
    }

    pub(crate) fn is_processing_instruction(&self, node_id: NodeId) -> bool {
        matches!(self.nodes[node_id.0].kind, NodeKind::ProcessingInstruction { .. })
    }

    pub(crate) fn is_character_data(&self, node_id: NodeId) -> bool {
        matches!(
            self.nodes[node_id.0].kind,
            NodeKind::Text(_) | NodeKind::Comment(_) | NodeKind::ProcessingInstruction { .. }
        )
    }

    pub(crate) fn can_have_children(&self, node_id: NodeId) -> bool {
        matches!(self.nodes[node_id.0].kind, NodeKind::Document | NodeKind::Element(_))
    }

    pub(crate) fn is_descendant_of(&self, node_id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.parent(node_id);
        while let Some(node) = cursor {
            if node == ancestor {
                return true;
            }
            cursor = self.parent(node);
        }
        false
    }

    pub(crate) fn is_connected(&self, node_id: NodeId) -> bool {
        node_id == self.root || self.is_descendant_of(node_id, self.root)
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub(crate) fn character_data(&self, node_id: NodeId) -> Option<&str> {
        match &self.nodes[node_id.0].kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => Some(data),
            NodeKind::ProcessingInstruction { data, .. } => Some(data),
            _ => None,
        }
    }

    pub(crate) fn set_character_data(&mut self, node_id: NodeId, value: &str) {
        match &mut self.nodes[node_id.0].kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => *data = value.to_string(),
            NodeKind::ProcessingInstruction { data, .. } => *data = value.to_string(),
            _ => {}
        }
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        match &self.nodes[node_id.0].kind {
            NodeKind::Document | NodeKind::Element(_) => self.descendant_text(node_id),
            NodeKind::Text(data) | NodeKind::Comment(data) => data.clone(),
            NodeKind::ProcessingInstruction { data, .. } => data.clone(),
        }
    }

    fn descendant_text(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        for child in &self.nodes[node_id.0].children {
            match &self.nodes[child.0].kind {
                NodeKind::Text(data) => out.push_str(data),
                NodeKind::Element(_) => out.push_str(&self.descendant_text(*child)),
                _ => {}
            }
        }
        out
    }

    pub(crate) fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.nodes[child.0].parent {
            self.nodes[parent.0].children.retain(|id| *id != child);
            self.nodes[child.0].parent = None;
        }
    }

    fn attach_at(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        self.nodes[child.0].parent = Some(parent);
        match index {
            Some(index) if index <= self.nodes[parent.0].children.len() => {
                self.nodes[parent.0].children.insert(index, child);
            }
            _ => self.nodes[parent.0].children.push(child),
        }
    }

    pub(crate) fn ensure_can_insert(&self, parent: NodeId, child: NodeId, label: &str) -> Result<()> {
        if !self.is_valid_node(parent) || !self.is_valid_node(child) {
            return Err(Error::NotFound(format!("{label} node is unknown")));
        }
        if !self.can_have_children(parent) {
            return Err(Error::InvalidOperation(format!(
                "{label} target cannot have children"
            )));
        }
        if child == self.root {
            return Err(Error::InvalidOperation(format!(
                "{label} cannot move the document root"
            )));
        }
        // Walk up from the parent: inserting an ancestor of it would create a cycle.
        let mut cursor = Some(parent);
        while let Some(node) = cursor {
            if node == child {
                return Err(Error::InvalidOperation(format!("{label} would create a cycle")));
            }
            cursor = self.parent(node);
        }
        Ok(())
    }

    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.attach_at(parent, child, None);
        self.rebuild_id_index();
    }

    pub(crate) fn insert_child_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<()> {
        if !self.is_valid_node(reference) || self.parent(reference) != Some(parent) {
            return Err(Error::NotFound(
                "insert_before reference is not a direct child".into(),
            ));
        }
        if child == reference {
            return Ok(());
        }
        self.detach(child);
        let Some(index) = self.nodes[parent.0].children.iter().position(|id| *id == reference)
        else {
            return Err(Error::NotFound("insert_before reference is missing".into()));
        };
        self.attach_at(parent, child, Some(index));
        self.rebuild_id_index();
        Ok(())
    }

    pub(crate) fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.parent(child) != Some(parent) {
            return Err(Error::NotFound(
                "remove_child target is not a direct child".into(),
            ));
        }
        self.nodes[parent.0].children.retain(|id| *id != child);
        self.nodes[child.0].parent = None;
        self.rebuild_id_index();
        Ok(())
    }

    pub(crate) fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> Result<()> {
        if self.parent(old_child) != Some(parent) {
            return Err(Error::NotFound(
                "replace_child old child is not a direct child".into(),
            ));
        }
        if new_child == old_child {
            return Ok(());
        }
        self.detach(new_child);
        // The old child's slot may have shifted if the new child was an earlier sibling.
        let Some(index) = self.nodes[parent.0].children.iter().position(|id| *id == old_child)
        else {
            return Err(Error::NotFound("replace_child old child is missing".into()));
        };
        self.nodes[old_child.0].parent = None;
        self.nodes[parent.0].children[index] = new_child;
        self.nodes[new_child.0].parent = Some(parent);
        self.rebuild_id_index();
        Ok(())
    }

    pub(crate) fn set_attr_raw(
        &mut self,
        node_id: NodeId,
        namespace: Option<&str>,
        name: &str,
        value: &str,
    ) -> Result<(Option<String>, String)> {
        let Some(element) = self.element_mut(node_id) else {
            return Err(Error::InvalidOperation(
                "attribute target is not an element".into(),
            ));
        };
        let (previous, qualified) = if let Some(ns) = namespace {
            let local = local_name_of(name).to_string();
            if let Some(attr) = element
                .attrs
                .iter_mut()
                .find(|attr| attr.namespace.as_deref() == Some(ns) && attr.local_name() == local)
            {
                let previous = std::mem::replace(&mut attr.value, value.to_string());
                (Some(previous), attr.name.clone())
            } else {
                element.attrs.push(Attr {
                    name: name.to_string(),
                    namespace: Some(ns.to_string()),
                    value: value.to_string(),
                });
                (None, name.to_string())
            }
        } else if let Some(attr) = element.attrs.iter_mut().find(|attr| attr.name == name) {
            let previous = std::mem::replace(&mut attr.value, value.to_string());
            (Some(previous), attr.name.clone())
        } else {
            element.attrs.push(Attr {
                name: name.to_string(),
                namespace: None,
                value: value.to_string(),
            });
            (None, name.to_string())
        };
        if namespace.is_none() {
            match name {
                "value" => element.value = value.to_string(),
                "checked" => element.checked = true,
                "disabled" => element.disabled = true,
                _ => {}
            }
            if name == "id" {
                self.rebuild_id_index();
            }
        }
        Ok((previous, qualified))
    }

    pub(crate) fn remove_attr_raw(
        &mut self,
        node_id: NodeId,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(Option<String>, String)> {
        let Some(element) = self.element_mut(node_id) else {
            return Err(Error::InvalidOperation(
                "attribute target is not an element".into(),
            ));
        };
        let position = match namespace {
            Some(ns) => element
                .attrs
                .iter()
                .position(|attr| attr.namespace.as_deref() == Some(ns) && attr.local_name() == name),
            None => element.attrs.iter().position(|attr| attr.name == name),
        };
        let (previous, qualified) = match position {
            Some(index) => {
                let attr = element.attrs.remove(index);
                (Some(attr.value), attr.name)
            }
            None => (None, name.to_string()),
        };
        if namespace.is_none() {
            match name {
                "value" => element.value.clear(),
                "checked" => element.checked = false,
                "disabled" => element.disabled = false,
                _ => {}
            }
            if name == "id" {
                self.rebuild_id_index();
            }
        }
        Ok((previous, qualified))
    }

    pub(crate) fn rebuild_id_index(&mut self) {
        self.id_index.clear();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if let NodeKind::Element(element) = &self.nodes[node.0].kind {
                if let Some(attr) = element.attr("id") {
                    if !attr.value.is_empty() && !self.id_index.contains_key(&attr.value) {
                        self.id_index.insert(attr.value.clone(), node);
                    }
                }
            }
            // Preorder: push children reversed so the first child pops first.
            for child in self.nodes[node.0].children.iter().rev() {
                stack.push(*child);
            }
        }
    }

    pub(crate) fn adopt_subtree(
        &mut self,
        source: &Dom,
        source_node: NodeId,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        let kind = match &source.nodes[source_node.0].kind {
            NodeKind::Document => {
                return Err(Error::InvalidOperation("cannot adopt a document node".into()));
            }
            other => other.clone(),
        };
        let node = self.create_node(parent, kind);
        for child in source.children(source_node) {
            self.adopt_subtree(source, *child, Some(node))?;
        }
        Ok(node)
    }
}
