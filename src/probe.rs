use std::cell::Cell;
use std::rc::Rc;

use crate::document::Document;
use crate::notification::MutationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HostMode {
    Native,
    #[default]
    Silent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    NativeSupport,
    AlreadyInstalled,
}

impl Document {
    // Appends a text node to a scratch element and reports whether the host
    // delivered DOMNodeInserted for it. The scratch nodes stay detached from
    // the document tree.
    pub fn probe_native_insert_support(&mut self) -> bool {
        let scratch = self.create_element("div");
        let fired = Rc::new(Cell::new(false));
        let seen = Rc::clone(&fired);
        let listener = self.add_listener(scratch, MutationKind::NodeInserted, move |_, _| {
            seen.set(true);
        });
        let text = self.create_text_node("probe");
        let appended = self.append_child(scratch, text).is_ok();
        self.remove_listener(scratch, MutationKind::NodeInserted, listener);
        appended && fired.get()
    }

    pub fn install_mutation_events(&mut self) -> InstallOutcome {
        if self.installed {
            return InstallOutcome::AlreadyInstalled;
        }
        if self.probe_native_insert_support() {
            return InstallOutcome::NativeSupport;
        }
        self.installed = true;
        InstallOutcome::Installed
    }

    pub fn uninstall_mutation_events(&mut self) {
        self.installed = false;
    }

    pub fn mutation_events_installed(&self) -> bool {
        self.installed
    }

    pub fn host_mode(&self) -> HostMode {
        self.host_mode
    }
}
