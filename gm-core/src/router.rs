//! Agent routing: intent category to the agents dispatched for it.

use crate::intent::{Intent, IntentCategory};
use std::collections::HashMap;

pub use crate::agents::AgentKind;

/// Static category → agents table. Order is dispatch order.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    routes: HashMap<IntentCategory, Vec<AgentKind>>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        use AgentKind::*;
        use IntentCategory as C;

        let routes = HashMap::from([
            (C::Combat, vec![Narrator, Arbiter, Archivist]),
            (C::Exploration, vec![Narrator, ContentKeeper]),
            (C::Question, vec![Narrator, ContentKeeper]),
            (C::Social, vec![Narrator, Archivist]),
            (C::Roleplay, vec![Narrator, Archivist]),
            // Out-of-character rules lookups need no fiction.
            (C::Rules, vec![Archivist]),
            (C::Ambiguous, vec![Narrator]),
        ]);
        Self { routes }
    }
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the route for one category. Duplicate kinds are dropped,
    /// keeping the first occurrence.
    pub fn with_route(mut self, category: IntentCategory, agents: impl IntoIterator<Item = AgentKind>) -> Self {
        let mut route = Vec::new();
        for kind in agents {
            if !route.contains(&kind) {
                route.push(kind);
            }
        }
        self.routes.insert(category, route);
        self
    }

    /// Agents to dispatch for `intent`. Unrouted categories get the Narrator.
    pub fn route(&self, intent: &Intent) -> Vec<AgentKind> {
        self.routes
            .get(&intent.category)
            .cloned()
            .unwrap_or_else(|| vec![AgentKind::Narrator])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::IntentClassifier;

    fn intent(category: IntentCategory) -> Intent {
        Intent {
            category,
            confidence: 1.0,
            matched_signals: Vec::new(),
            alternative: None,
            ranked: Vec::new(),
        }
    }

    #[test]
    fn test_combat_routes_to_three_agents() {
        let intent = IntentClassifier::default().classify("I attack the goblin with my sword");
        assert_eq!(
            RoutingTable::default().route(&intent),
            vec![AgentKind::Narrator, AgentKind::Arbiter, AgentKind::Archivist]
        );
    }

    #[test]
    fn test_narrator_everywhere_but_rules() {
        let table = RoutingTable::default();
        for category in IntentCategory::SCORED {
            let route = table.route(&intent(category));
            assert_eq!(route.contains(&AgentKind::Narrator), category != IntentCategory::Rules);
        }
        assert_eq!(
            table.route(&intent(IntentCategory::Ambiguous)),
            vec![AgentKind::Narrator]
        );
        assert_eq!(
            table.route(&intent(IntentCategory::Rules)),
            vec![AgentKind::Archivist]
        );
    }

    #[test]
    fn test_with_route_dedupes() {
        let table = RoutingTable::new().with_route(
            IntentCategory::Social,
            [AgentKind::Narrator, AgentKind::ContentKeeper, AgentKind::Narrator],
        );
        assert_eq!(
            table.route(&intent(IntentCategory::Social)),
            vec![AgentKind::Narrator, AgentKind::ContentKeeper]
        );
    }
}
