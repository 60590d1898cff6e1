use crate::document::Document;
use crate::dom::NodeId;
use crate::markup;
use crate::notification::{AttrChange, MutationKind, MutationNotification};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub enum NodeOrText<'a> {
    Node(NodeId),
    Text(&'a str),
}

impl From<NodeId> for NodeOrText<'_> {
    fn from(node: NodeId) -> Self {
        NodeOrText::Node(node)
    }
}

impl<'a> From<&'a str> for NodeOrText<'a> {
    fn from(text: &'a str) -> Self {
        NodeOrText::Text(text)
    }
}

impl Document {
    fn emit_node_notification(&mut self, kind: MutationKind, target: NodeId, parent: NodeId) {
        self.emit(MutationNotification::new(kind, target).with_related(parent));
    }

    fn emit_subtree_modified(&mut self, target: NodeId) {
        self.emit(MutationNotification::new(MutationKind::SubtreeModified, target));
    }

    fn emit_attr_notification(
        &mut self,
        target: NodeId,
        name: &str,
        change: AttrChange,
        prev: &str,
        new: &str,
    ) {
        self.emit(
            MutationNotification::new(MutationKind::AttrModified, target)
                .with_attr(name, change)
                .with_values(prev, new),
        );
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.dom.ensure_can_insert(parent, child, "append_child")?;
        self.dom.append_child(parent, child);
        self.emit_node_notification(MutationKind::NodeInserted, child, parent);
        self.emit_subtree_modified(parent);
        Ok(())
    }

    pub fn append(&mut self, parent: NodeId, entries: &[NodeOrText<'_>]) -> Result<()> {
        for entry in entries {
            let child = match entry {
                NodeOrText::Node(node) => *node,
                NodeOrText::Text(text) => self.create_text_node(text),
            };
            self.append_child(parent, child)?;
        }
        Ok(())
    }

    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        self.dom.ensure_can_insert(parent, child, "insert_before")?;
        match reference {
            Some(reference) => self.dom.insert_child_before(parent, child, reference)?,
            None => self.dom.append_child(parent, child),
        }
        self.emit_node_notification(MutationKind::NodeInserted, child, parent);
        self.emit_subtree_modified(parent);
        Ok(())
    }

    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        if !self.dom.is_valid_node(node) {
            return Err(Error::NotFound("remove node is unknown".into()));
        }
        if node == self.dom.root {
            return Err(Error::InvalidOperation("cannot remove the document root".into()));
        }
        // Removing an already detached node is a quiet no-op.
        let Some(parent) = self.dom.parent(node) else {
            return Ok(());
        };
        self.emit_node_notification(MutationKind::NodeRemoved, node, parent);
        self.dom.remove_child(parent, node)?;
        self.emit_subtree_modified(parent);
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.dom.is_valid_node(parent) || !self.dom.is_valid_node(child) {
            return Err(Error::NotFound("remove_child node is unknown".into()));
        }
        if self.dom.parent(child) != Some(parent) {
            return Err(Error::NotFound("remove_child target is not a direct child".into()));
        }
        self.emit_node_notification(MutationKind::NodeRemoved, child, parent);
        self.dom.remove_child(parent, child)?;
        self.emit_subtree_modified(parent);
        Ok(())
    }

    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> Result<()> {
        if !self.dom.is_valid_node(old_child) {
            return Err(Error::NotFound("replace_child node is unknown".into()));
        }
        self.dom.ensure_can_insert(parent, new_child, "replace_child")?;
        if self.dom.parent(old_child) != Some(parent) {
            return Err(Error::NotFound("replace_child old child is not a direct child".into()));
        }
        if new_child == old_child {
            return Ok(());
        }
        self.emit_node_notification(MutationKind::NodeRemoved, old_child, parent);
        self.dom.replace_child(parent, new_child, old_child)?;
        self.emit_node_notification(MutationKind::NodeInserted, new_child, parent);
        self.emit_subtree_modified(parent);
        Ok(())
    }

    pub fn set_inner_html(&mut self, node: NodeId, markup_text: &str) -> Result<()> {
        if !self.dom.is_valid_node(node) {
            return Err(Error::NotFound("inner_html target is unknown".into()));
        }
        if self.dom.element(node).is_none() {
            return Err(Error::InvalidOperation("inner_html target is not an element".into()));
        }
        // Parse before touching the tree so malformed markup changes nothing.
        let fragment = markup::parse_fragment(markup_text)?;

        let old_children = self.dom.children(node).to_vec();
        for child in &old_children {
            self.emit_node_notification(MutationKind::NodeRemoved, *child, node);
        }
        // Detach whatever is present now; listeners may have edited the child list.
        for child in self.dom.children(node).to_vec() {
            self.dom.detach(child);
        }
        let mut new_children = Vec::new();
        for &fragment_child in fragment.children(fragment.root) {
            new_children.push(self.dom.adopt_subtree(&fragment, fragment_child, Some(node))?);
        }
        self.dom.rebuild_id_index();
        for child in &new_children {
            self.emit_node_notification(MutationKind::NodeInserted, *child, node);
        }
        self.emit_subtree_modified(node);
        Ok(())
    }

    pub fn set_text_content(&mut self, node: NodeId, text: &str) -> Result<()> {
        if !self.dom.is_valid_node(node) {
            return Err(Error::NotFound("text_content target is unknown".into()));
        }
        if self.dom.is_document(node) {
            return Err(Error::InvalidOperation("text_content target is the document".into()));
        }

        let old_children = self.dom.children(node).to_vec();
        for child in &old_children {
            self.emit_node_notification(MutationKind::NodeRemoved, *child, node);
        }

        if self.dom.is_character_data(node) {
            let previous = self.dom.character_data(node).map(str::to_string).unwrap_or_default();
            self.dom.set_character_data(node, text);
            self.emit(
                MutationNotification::new(MutationKind::CharacterDataModified, node)
                    .with_values(&previous, text),
            );
            self.emit_subtree_modified(node);
            return Ok(());
        }

        for child in self.dom.children(node).to_vec() {
            self.dom.detach(child);
        }
        self.dom.rebuild_id_index();
        if !text.is_empty() {
            let child = self.create_text_node(text);
            self.dom.append_child(node, child);
            self.emit_node_notification(MutationKind::NodeInserted, child, node);
        }
        self.emit_subtree_modified(node);
        Ok(())
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        if !self.dom.is_valid_node(node) {
            return Err(Error::NotFound("set_attribute target is unknown".into()));
        }
        let name = name.to_ascii_lowercase();
        let (previous, qualified) = self.dom.set_attr_raw(node, None, &name, value)?;
        let change = if previous.is_none() {
            AttrChange::Addition
        } else {
            AttrChange::Modification
        };
        let prev = previous.unwrap_or_default();
        self.emit_attr_notification(node, &qualified, change, &prev, value);
        self.emit_subtree_modified(node);
        Ok(())
    }

    pub fn set_attribute_ns(
        &mut self,
        node: NodeId,
        namespace: &str,
        qualified_name: &str,
        value: &str,
    ) -> Result<()> {
        if !self.dom.is_valid_node(node) {
            return Err(Error::NotFound("set_attribute target is unknown".into()));
        }
        let (previous, qualified) = self.dom.set_attr_raw(node, Some(namespace), qualified_name, value)?;
        let change = if previous.is_none() {
            AttrChange::Addition
        } else {
            AttrChange::Modification
        };
        let prev = previous.unwrap_or_default();
        self.emit_attr_notification(node, &qualified, change, &prev, value);
        self.emit_subtree_modified(node);
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<()> {
        if !self.dom.is_valid_node(node) {
            return Err(Error::NotFound("remove_attribute target is unknown".into()));
        }
        let name = name.to_ascii_lowercase();
        let (previous, qualified) = self.dom.remove_attr_raw(node, None, &name)?;
        let prev = previous.unwrap_or_default();
        // Removal of an absent attribute still reports, with an empty previous value.
        self.emit_attr_notification(node, &qualified, AttrChange::Removal, &prev, "");
        self.emit_subtree_modified(node);
        Ok(())
    }

    pub fn remove_attribute_ns(&mut self, node: NodeId, namespace: &str, local_name: &str) -> Result<()> {
        if !self.dom.is_valid_node(node) {
            return Err(Error::NotFound("remove_attribute target is unknown".into()));
        }
        let (previous, qualified) = self.dom.remove_attr_raw(node, Some(namespace), local_name)?;
        let prev = previous.unwrap_or_default();
        self.emit_attr_notification(node, &qualified, AttrChange::Removal, &prev, "");
        self.emit_subtree_modified(node);
        Ok(())
    }

    pub fn set_id(&mut self, node: NodeId, value: &str) -> Result<()> {
        self.set_attribute(node, "id", value)
    }

    pub fn set_class_name(&mut self, node: NodeId, value: &str) -> Result<()> {
        self.set_attribute(node, "class", value)
    }

    pub fn set_value(&mut self, node: NodeId, value: &str) -> Result<()> {
        self.set_attribute(node, "value", value)
    }

    pub fn set_checked(&mut self, node: NodeId, checked: bool) -> Result<()> {
        if checked {
            self.set_attribute(node, "checked", "")
        } else {
            self.remove_attribute(node, "checked")
        }
    }

    pub fn set_disabled(&mut self, node: NodeId, disabled: bool) -> Result<()> {
        if disabled {
            self.set_attribute(node, "disabled", "")
        } else {
            self.remove_attribute(node, "disabled")
        }
    }
}
