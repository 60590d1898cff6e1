use std::fmt;

use crate::dom::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    NodeInserted,
    NodeRemoved,
    SubtreeModified,
    AttrModified,
    CharacterDataModified,
}

impl MutationKind {
    pub const ALL: [MutationKind; 5] = [
        MutationKind::NodeInserted,
        MutationKind::NodeRemoved,
        MutationKind::SubtreeModified,
        MutationKind::AttrModified,
        MutationKind::CharacterDataModified,
    ];

    pub fn event_name(self) -> &'static str {
        match self {
            MutationKind::NodeInserted => "DOMNodeInserted",
            MutationKind::NodeRemoved => "DOMNodeRemoved",
            MutationKind::SubtreeModified => "DOMSubtreeModified",
            MutationKind::AttrModified => "DOMAttrModified",
            MutationKind::CharacterDataModified => "DOMCharacterDataModified",
        }
    }

    pub fn from_event_name(name: &str) -> Option<MutationKind> {
        match name {
            "DOMNodeInserted" => Some(MutationKind::NodeInserted),
            "DOMNodeRemoved" => Some(MutationKind::NodeRemoved),
            "DOMSubtreeModified" => Some(MutationKind::SubtreeModified),
            "DOMAttrModified" => Some(MutationKind::AttrModified),
            "DOMCharacterDataModified" => Some(MutationKind::CharacterDataModified),
            _ => None,
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttrChange {
    #[default]
    None = 0,
    Modification = 1,
    Addition = 2,
    Removal = 3,
}

impl AttrChange {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            AttrChange::None => "none",
            AttrChange::Modification => "modification",
            AttrChange::Addition => "addition",
            AttrChange::Removal => "removal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationNotification {
    pub kind: MutationKind,
    pub target: NodeId,
    pub related_node: Option<NodeId>,
    pub attr_name: String,
    pub attr_change: AttrChange,
    pub prev_value: String,
    pub new_value: String,
}

impl MutationNotification {
    pub fn new(kind: MutationKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            related_node: None,
            attr_name: String::new(),
            attr_change: AttrChange::None,
            prev_value: String::new(),
            new_value: String::new(),
        }
    }

    pub(crate) fn with_related(mut self, related: NodeId) -> Self {
        self.related_node = Some(related);
        self
    }

    pub(crate) fn with_attr(mut self, name: &str, change: AttrChange) -> Self {
        self.attr_name = name.to_string();
        self.attr_change = change;
        self
    }

    pub(crate) fn with_values(mut self, prev: &str, new: &str) -> Self {
        self.prev_value = prev.to_string();
        self.new_value = new.to_string();
        self
    }

    pub fn bubbles(&self) -> bool {
        true
    }

    pub fn cancelable(&self) -> bool {
        false
    }
}
