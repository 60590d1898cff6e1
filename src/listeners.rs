use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::document::Document;
use crate::dom::NodeId;
use crate::notification::{MutationKind, MutationNotification};

pub(crate) type ListenerFn = dyn Fn(&mut Document, &MutationNotification);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Clone)]
pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) capture: bool,
    pub(crate) callback: Rc<ListenerFn>,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("capture", &self.capture)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ListenerStore {
    buckets: HashMap<NodeId, HashMap<MutationKind, Vec<Listener>>>,
    next_id: u64,
}

impl ListenerStore {
    pub(crate) fn add(
        &mut self,
        node_id: NodeId,
        kind: MutationKind,
        capture: bool,
        callback: Rc<ListenerFn>,
    ) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.buckets
            .entry(node_id)
            .or_default()
            .entry(kind)
            .or_default()
            .push(Listener { id, capture, callback });
        id
    }

    pub(crate) fn remove(&mut self, node_id: NodeId, kind: MutationKind, id: ListenerId) -> bool {
        let Some(kinds) = self.buckets.get_mut(&node_id) else {
            return false;
        };
        let Some(listeners) = kinds.get_mut(&kind) else {
            return false;
        };
        let Some(position) = listeners.iter().position(|listener| listener.id == id) else {
            return false;
        };
        listeners.remove(position);
        if listeners.is_empty() {
            kinds.remove(&kind);
        }
        if kinds.is_empty() {
            self.buckets.remove(&node_id);
        }
        true
    }

    // Clones the matching listeners out so dispatch stays stable while callbacks
    // add or remove registrations.
    pub(crate) fn get(&self, node_id: NodeId, kind: MutationKind, capture: bool) -> Vec<Listener> {
        self.buckets
            .get(&node_id)
            .and_then(|kinds| kinds.get(&kind))
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|listener| listener.capture == capture)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
