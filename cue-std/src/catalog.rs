//! Link-time catalog of trigger types.
//!
//! `#[derive(Trigger)]` submits a [`TriggerDescriptor`] for every trigger it
//! generates; [`catalog`] lists them without any runtime registration.

/// Static description of one trigger type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerDescriptor {
    /// Event name, e.g. `"start"`.
    pub event: &'static str,
    /// Trigger type name.
    pub type_name: &'static str,
    /// Module the trigger is defined in.
    pub module: &'static str,
    /// Value type delivered to awaiters.
    pub value_type: &'static str,
}

impl TriggerDescriptor {
    /// Describe a trigger.
    pub const fn new(
        event: &'static str,
        type_name: &'static str,
        module: &'static str,
        value_type: &'static str,
    ) -> Self {
        Self {
            event,
            type_name,
            module,
            value_type,
        }
    }

    /// `module::TypeName`.
    pub fn path(&self) -> String {
        format!("{}::{}", self.module, self.type_name)
    }
}

inventory::collect!(TriggerDescriptor);

/// Every trigger type linked into the binary.
pub fn catalog() -> impl Iterator<Item = &'static TriggerDescriptor> {
    inventory::iter::<TriggerDescriptor>.into_iter()
}

/// The first trigger registered for `event`.
pub fn find_trigger(event: &str) -> Option<&'static TriggerDescriptor> {
    catalog().find(|descriptor| descriptor.event == event)
}
