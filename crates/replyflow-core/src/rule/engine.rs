use super::delay::DelayCalculator;
use super::matcher::normalize;
use super::model::Rule;
use std::sync::{Arc, RwLock};

/// The immutable outcome of matching one inbound message.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub matched: bool,
    /// The winning rule, present only if matched.
    pub rule: Option<Arc<Rule>>,
    /// Position of the winning rule in the rule set.
    pub rule_index: Option<usize>,
    /// Delay to wait before replying, in seconds.
    pub rendered_delay: f64,
    pub matched_pattern: Option<String>,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self {
            matched: false,
            rule: None,
            rule_index: None,
            rendered_delay: 0.0,
            matched_pattern: None,
        }
    }

    /// Reply template of the winning rule.
    pub fn reply_template(&self) -> Option<&str> {
        self.rule.as_deref().map(Rule::reply_template)
    }
}

/// An ordered set of rules plus its precomputed evaluation order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Arc<Rule>>,
    order: Vec<usize>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        let rules: Vec<Arc<Rule>> = rules.into_iter().map(Arc::new).collect();
        let mut order: Vec<usize> = (0..rules.len()).filter(|&i| rules[i].is_enabled()).collect();
        // sort_by_key is stable: equal priorities keep insertion order
        order.sort_by_key(|&i| std::cmp::Reverse(rules[i].priority()));
        Self { rules, order }
    }

    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Indices of enabled rules, highest priority first.
    pub fn evaluation_order(&self) -> &[usize] {
        &self.order
    }

    pub fn active_count(&self) -> usize {
        self.order.len()
    }

    /// First `(rule index, pattern)` matching `text`.
    fn find(&self, text: &str) -> Option<(usize, &str)> {
        let normalized = normalize(text);
        self.order.iter().find_map(|&index| {
            self.rules[index]
                .patterns()
                .iter()
                .find(|pattern| pattern.matches_normalized(&normalized))
                .map(|pattern| (index, pattern.as_str()))
        })
    }
}

/// Resolves inbound messages against one account's rules.
///
/// The rule set can be replaced at any time; calls already running keep
/// the snapshot they started with.
#[derive(Debug)]
pub struct RuleEngine {
    rule_set: RwLock<Arc<RuleSet>>,
    delays: DelayCalculator,
}

impl RuleEngine {
    pub fn new(rules: Vec<Rule>, delays: DelayCalculator) -> Self {
        Self {
            rule_set: RwLock::new(Arc::new(RuleSet::new(rules))),
            delays,
        }
    }

    pub fn with_seed(rules: Vec<Rule>, seed: Option<u64>) -> Self {
        Self::new(rules, DelayCalculator::new(seed))
    }

    /// Current rule set snapshot.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        let guard = self.rule_set.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn process_message(&self, text: &str) -> MatchResult {
        if text.trim().is_empty() {
            return MatchResult::no_match();
        }

        let rule_set = self.snapshot();
        match rule_set.find(text) {
            Some((index, pattern)) => {
                let rule = Arc::clone(&rule_set.rules[index]);
                MatchResult {
                    matched: true,
                    rendered_delay: self.delays.calculate_delay(&rule),
                    matched_pattern: Some(pattern.to_string()),
                    rule: Some(rule),
                    rule_index: Some(index),
                }
            }
            None => MatchResult::no_match(),
        }
    }

    /// Atomically replaces the whole rule set.
    pub fn update_rules(&self, rules: Vec<Rule>) {
        let next = Arc::new(RuleSet::new(rules));
        let mut guard = self.rule_set.write().unwrap_or_else(|e| e.into_inner());
        *guard = next;
    }

    /// Replaces the rule at `index` with a copy whose `enabled` flag is set.
    ///
    /// Returns false if `index` is out of range.
    pub fn set_rule_enabled(&self, index: usize, enabled: bool) -> bool {
        let mut guard = self.rule_set.write().unwrap_or_else(|e| e.into_inner());
        if index >= guard.rules.len() {
            return false;
        }
        let rules = guard
            .rules
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                if i == index {
                    rule.with_enabled(enabled)
                } else {
                    Rule::clone(rule)
                }
            })
            .collect();
        *guard = Arc::new(RuleSet::new(rules));
        true
    }

    pub fn active_rule_count(&self) -> usize {
        self.snapshot().active_count()
    }

    /// All rules, enabled or not, in configured order.
    pub fn rules(&self) -> Vec<Arc<Rule>> {
        self.snapshot().rules().to_vec()
    }

    pub fn evaluation_order(&self) -> Vec<usize> {
        self.snapshot().evaluation_order().to_vec()
    }

    pub fn delay_calculator(&self) -> &DelayCalculator {
        &self.delays
    }
}
