use crate::delivery::{Delivery, PacketSink};
use crate::registry::ClientId;
use shared::{Packet, StaffModule};

pub fn set_staff_module_state<S: PacketSink + ?Sized>(
    sink: &S,
    client: ClientId,
    module: StaffModule,
    enabled: bool,
) -> Delivery {
    sink.attempt_deliver(client, Packet::StaffModState { module, enabled })
}

/// Prefer enabling modules one by one; this hands out every tool.
pub fn give_all_staff_modules<S: PacketSink + ?Sized>(sink: &S, client: ClientId) -> Vec<Delivery> {
    StaffModule::ALL
        .iter()
        .map(|module| set_staff_module_state(sink, client, *module, true))
        .collect()
}

pub fn disable_all_staff_modules<S: PacketSink + ?Sized>(
    sink: &S,
    client: ClientId,
) -> Vec<Delivery> {
    StaffModule::ALL
        .iter()
        .map(|module| set_staff_module_state(sink, client, *module, false))
        .collect()
}
