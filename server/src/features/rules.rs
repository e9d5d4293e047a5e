//! Server rules advertised to enhanced clients.

use crate::delivery::{Delivery, PacketSink};
use crate::registry::ClientId;
use shared::{Packet, ServerRule};
use std::collections::BTreeMap;

/// One value per rule; setting a rule again replaces its value. Changes are
/// not pushed automatically, send the table to clients when they join or
/// after editing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerRules {
    rules: BTreeMap<ServerRule, bool>,
}

impl ServerRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rule(&mut self, rule: ServerRule, value: bool) -> &mut Self {
        self.rules.insert(rule, value);
        self
    }

    pub fn get(&self, rule: ServerRule) -> Option<bool> {
        self.rules.get(&rule).copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn packets(&self) -> impl Iterator<Item = Packet> + '_ {
        self.rules
            .iter()
            .map(|(rule, value)| Packet::ServerRule {
                rule: *rule,
                value: *value,
            })
    }

    /// Sends every rule to every client given.
    pub fn send_to<S, I>(&self, sink: &S, clients: I) -> Vec<Delivery>
    where
        S: PacketSink + ?Sized,
        I: IntoIterator<Item = ClientId>,
    {
        if self.rules.is_empty() {
            return Vec::new();
        }
        clients
            .into_iter()
            .flat_map(|client| {
                self.packets()
                    .map(move |packet| sink.attempt_deliver(client, packet))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl FromIterator<ServerRule> for ServerRules {
    /// Enables each listed rule.
    fn from_iter<T: IntoIterator<Item = ServerRule>>(iter: T) -> Self {
        let mut rules = ServerRules::new();
        for rule in iter {
            rules.set_rule(rule, true);
        }
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSink;
    use uuid::Uuid;

    #[test]
    fn test_last_write_wins() {
        let mut rules = ServerRules::new();
        rules
            .set_rule(ServerRule::CompetitiveGame, true)
            .set_rule(ServerRule::CompetitiveGame, false);

        assert_eq!(rules.len(), 1);
        assert_eq!(rules.get(ServerRule::CompetitiveGame), Some(false));
        assert_eq!(rules.get(ServerRule::LegacyCombat), None);
    }

    #[test]
    fn test_send_to_every_client() {
        let sink = RecordingSink::default();
        let rules: ServerRules = [ServerRule::VoiceEnabled, ServerRule::ShadersDisabled]
            .into_iter()
            .collect();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let results = rules.send_to(&sink, [a, b]);
        assert_eq!(results.len(), 4);

        let sent = sink.packets();
        assert_eq!(sent.iter().filter(|(id, _)| *id == a).count(), 2);
        assert_eq!(sent.iter().filter(|(id, _)| *id == b).count(), 2);
        assert_eq!(
            sent[0].1,
            Packet::ServerRule {
                rule: ServerRule::VoiceEnabled,
                value: true
            }
        );
    }

    #[test]
    fn test_empty_table_sends_nothing() {
        let sink = RecordingSink::default();
        assert!(ServerRules::new().send_to(&sink, [Uuid::new_v4()]).is_empty());
        assert!(sink.packets().is_empty());
    }
}
