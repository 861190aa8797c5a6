//! Business pattern rules.
//!
//! Each rule ANDs one or more required term groups (whole-word, case-insensitive)
//! and is vetoed by any of its exclusion patterns. Rules are evaluated in
//! ascending `priority`; only the first rule that fires is reported.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::error::AppError;
use crate::models::{BusinessCategory, Energy, MoodPolarity};

/// A hand-authored, high-precision business pattern.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    /// Lower runs first. Ties keep declaration order.
    pub priority: u32,
    pub category: BusinessCategory,
    /// Energy the rule pins, if any
    pub energy: Option<Energy>,
    pub mood_polarity: Option<MoodPolarity>,
    pub confidence_boost: i32,
    required: Vec<Regex>,
    excluded: Vec<Regex>,
}

impl Rule {
    pub fn builder(id: &str, priority: u32, category: BusinessCategory) -> RuleBuilder {
        RuleBuilder {
            id: id.to_string(),
            priority,
            category,
            energy: None,
            mood_polarity: None,
            confidence_boost: 0,
            required: Vec::new(),
            excluded: Vec::new(),
        }
    }

    /// Whether the rule fires on already-normalized text
    pub fn matches(&self, normalized: &str) -> bool {
        !self.required.is_empty()
            && self.required.iter().all(|group| group.is_match(normalized))
            && !self.excluded.iter().any(|veto| veto.is_match(normalized))
    }
}

/// Incremental constructor for [`Rule`].
pub struct RuleBuilder {
    id: String,
    priority: u32,
    category: BusinessCategory,
    energy: Option<Energy>,
    mood_polarity: Option<MoodPolarity>,
    confidence_boost: i32,
    required: Vec<String>,
    excluded: Vec<String>,
}

impl RuleBuilder {
    pub fn energy(mut self, energy: Energy) -> Self {
        self.energy = Some(energy);
        self
    }

    pub fn polarity(mut self, polarity: MoodPolarity) -> Self {
        self.mood_polarity = Some(polarity);
        self
    }

    pub fn boost(mut self, boost: i32) -> Self {
        self.confidence_boost = boost;
        self
    }

    /// Adds a term group: at least one of `terms` must appear as whole words.
    pub fn require(mut self, terms: &[&str]) -> Self {
        let alternatives: Vec<String> = terms.iter().map(|t| regex::escape(t)).collect();
        self.required
            .push(format!(r"(?i)\b(?:{})\b", alternatives.join("|")));
        self
    }

    /// Adds a raw regex that vetoes the rule when it matches.
    pub fn exclude(mut self, pattern: &str) -> Self {
        self.excluded.push(format!("(?i){}", pattern));
        self
    }

    pub fn build(self) -> Result<Rule, AppError> {
        if self.required.is_empty() {
            return Err(AppError::Validation(format!(
                "Rule {} has no required term group",
                self.id
            )));
        }
        let compile = |pattern: &String| {
            Regex::new(pattern).map_err(|e| {
                AppError::Validation(format!("Rule {} has an invalid pattern: {}", self.id, e))
            })
        };
        let required = self.required.iter().map(compile).collect::<Result<Vec<_>, _>>()?;
        let excluded = self.excluded.iter().map(compile).collect::<Result<Vec<_>, _>>()?;

        Ok(Rule {
            id: self.id,
            priority: self.priority,
            category: self.category,
            energy: self.energy,
            mood_polarity: self.mood_polarity,
            confidence_boost: self.confidence_boost,
            required,
            excluded,
        })
    }
}

fn default_rule_set() -> Result<Vec<Rule>, AppError> {
    use BusinessCategory::*;

    Ok(vec![
        Rule::builder("supply_disruption", 10, Challenge)
            .polarity(MoodPolarity::Negative)
            .boost(6)
            .require(&[
                "supplier", "suppliers", "vendor", "vendors", "shipment", "shipments",
                "raw material", "raw materials", "inventory", "logistics", "freight",
                "manufacturer", "factory",
            ])
            .require(&[
                "delayed", "delay", "delays", "late", "shortage", "shortages", "backorder",
                "backordered", "stuck", "held up", "disrupted", "disruption", "at risk",
            ])
            .exclude(r"\b(?:ahead of schedule|arrived early|on time|no longer delayed)\b")
            .build()?,
        Rule::builder("cash_flow_pressure", 20, Challenge)
            .energy(Energy::Low)
            .polarity(MoodPolarity::Negative)
            .boost(6)
            .require(&[
                "cash flow", "cashflow", "runway", "payroll", "burn rate", "cash crunch",
                "overdue invoices", "unpaid invoices", "late payments", "bank balance",
            ])
            .require(&[
                "tight", "short", "shortfall", "running low", "running out", "months left",
                "weeks left", "struggling", "behind", "negative", "cover", "crunch", "worried",
                "scared", "can't make", "cannot make",
            ])
            .exclude(r"\b(?:improved|improving|healthy|extended)\b")
            .exclude(r"\bpositive cash ?flow\b")
            .build()?,
        Rule::builder("technical_outage", 30, Challenge)
            .energy(Energy::High)
            .polarity(MoodPolarity::Negative)
            .boost(5)
            .require(&[
                "outage", "downtime", "server", "servers", "website", "site", "app", "platform",
                "checkout", "database", "api", "payment system",
            ])
            .require(&[
                "down", "crashed", "crash", "crashing", "offline", "outage", "broke", "broken",
                "failing", "failed", "unreachable",
            ])
            // "costs are down" is good news, not an incident
            .exclude(r"\b(?:costs?|prices?|expenses|spend|spending|churn|downtime|complaints|returns)\s+(?:are\s+|is\s+|were\s+|was\s+|went\s+|have\s+gone\s+)?down\b")
            .exclude(r"\b(?:turned (?:us )?down|down payment)\b")
            .build()?,
        Rule::builder("customer_churn", 40, Challenge)
            .energy(Energy::Medium)
            .polarity(MoodPolarity::Negative)
            .boost(5)
            .require(&[
                "churn", "churned", "churning", "cancelled", "canceled", "cancellation",
                "cancellations", "unsubscribed",
            ])
            .require(&[
                "customer", "customers", "client", "clients", "subscriber", "subscribers",
                "account", "accounts", "users", "rate", "contract", "subscription",
                "subscriptions",
            ])
            .exclude(r"\bchurn (?:is |was |went |has )?(?:down|dropped|fell|decreased)\b")
            .exclude(r"\b(?:reduced|lower|lowest|record[- ]low) churn\b")
            .exclude(r"\bzero (?:churn|cancellations)\b")
            .build()?,
        Rule::builder("revenue_growth", 50, Growth)
            .energy(Energy::High)
            .polarity(MoodPolarity::Positive)
            .boost(8)
            .require(&[
                "revenue", "mrr", "arr", "monthly recurring revenue", "annual recurring revenue",
                "sales", "bookings", "gmv", "profit", "profits",
            ])
            .require(&[
                "all-time high", "record", "record high", "new high", "grew", "growth",
                "increased", "doubled", "tripled", "up", "jumped", "surged", "climbed",
                "growing", "beat",
            ])
            .exclude(r"\b(?:down|dropped|declined|fell|decreased|missed|flat|shrank|slipped)\b")
            .build()?,
        Rule::builder("customer_acquisition", 60, Growth)
            .energy(Energy::High)
            .polarity(MoodPolarity::Positive)
            .boost(5)
            .require(&[
                "signed", "onboarded", "closed", "landed", "won", "acquired", "added",
            ])
            .require(&[
                "new accounts", "new customers", "new clients", "accounts", "customers",
                "clients", "deals", "contracts", "subscribers", "signups",
            ])
            .exclude(r"\b(?:lost|churn|churned|cancelled|canceled|cancellations?)\b")
            .build()?,
        Rule::builder("milestone_achieved", 70, Achievement)
            .energy(Energy::High)
            .polarity(MoodPolarity::Positive)
            .boost(5)
            .require(&[
                "launched", "shipped", "hit", "reached", "achieved", "completed", "won",
                "secured", "landed", "closed", "finished", "released", "passed",
            ])
            .require(&[
                "milestone", "funding", "round", "seed", "series a", "award", "launch", "goal",
                "target", "partnership", "investment", "certification", "beta", "version",
                "mvp", "grant",
            ])
            .exclude(r"\b(?:missed|failed|delayed|postponed|fell short|not yet|didn't|did not|almost)\b")
            .build()?,
        Rule::builder("strategic_planning", 80, Planning)
            .energy(Energy::Medium)
            .polarity(MoodPolarity::Neutral)
            .boost(3)
            .require(&[
                "plan", "plans", "planning", "roadmap", "strategy", "strategic", "budget",
                "priorities", "okrs", "okr", "forecast", "timeline",
            ])
            .require(&[
                "next quarter", "next month", "next year", "next week", "upcoming", "outline",
                "outlined", "map out", "mapped out", "draft", "drafted", "drafting",
                "prioritize", "prioritized", "goals", "milestones", "q1", "q2", "q3", "q4",
            ])
            .exclude(r"\b(?:scrapped|abandoned|cancelled|canceled)\b")
            .build()?,
        Rule::builder("customer_research", 90, Research)
            .energy(Energy::Medium)
            .polarity(MoodPolarity::Neutral)
            .boost(4)
            .require(&[
                "interviewed", "interviews", "interviewing", "survey", "surveyed", "surveys",
                "user research", "market research", "competitor analysis",
                "competitive analysis", "focus group", "benchmarked", "researched",
                "researching", "analyzed", "analyzing", "analysing", "studied",
            ])
            .require(&[
                "customers", "users", "market", "competitors", "competitor", "segment",
                "segments", "pricing", "prospects", "respondents", "data", "buyers",
                "personas", "industry",
            ])
            .build()?,
        Rule::builder("lesson_learned", 100, Learning)
            .energy(Energy::Medium)
            .polarity(MoodPolarity::Neutral)
            .boost(3)
            .require(&[
                "learned", "learning", "lesson", "lessons", "realized", "realised", "takeaway",
                "takeaways", "insight", "insights",
            ])
            .require(&[
                "mistake", "mistakes", "the hard way", "mentor", "course", "book", "workshop",
                "feedback", "failure", "experience", "podcast", "advisor", "from",
            ])
            .build()?,
    ])
}

// Compile the default rule set once
// NOTE: the patterns are static, a failure here is a programming error
static DEFAULT_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    default_rule_set().expect("Invalid regex: default business rule set")
});

/// Lowercase and collapse whitespace
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ordered first-match rule evaluator
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    /// Create an engine with the built-in business rules
    pub fn new() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
        }
    }

    /// Create an engine over a custom rule set, sorted by priority
    pub fn with_rules(mut rules: Vec<Rule>) -> Result<Self, AppError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.clone()) {
                return Err(AppError::Validation(format!("Duplicate rule id: {}", rule.id)));
            }
        }
        // stable: equal priorities keep declaration order
        rules.sort_by_key(|r| r.priority);
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The first rule, by priority, whose predicate holds
    pub fn first_match(&self, text: &str) -> Option<&Rule> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return None;
        }
        self.rules.iter().find(|rule| rule.matches(&normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fired(text: &str) -> Option<String> {
        RuleEngine::new().first_match(text).map(|r| r.id.clone())
    }

    #[test]
    fn test_default_rules_are_sorted_and_unique() {
        let engine = RuleEngine::new();
        let priorities: Vec<u32> = engine.rules().iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
        assert!(RuleEngine::with_rules(engine.rules().to_vec()).is_ok());
    }

    #[test]
    fn test_supply_disruption() {
        assert_eq!(
            fired("Supplier delayed the raw material shipment by two weeks").as_deref(),
            Some("supply_disruption")
        );
        assert_eq!(fired("The supplier shipment arrived early, great news"), None);
    }

    #[test]
    fn test_outage_excludes_costs_down() {
        assert_eq!(
            fired("The website went down for three hours during the launch").as_deref(),
            Some("technical_outage")
        );
        assert_ne!(
            fired("Moved the site to a cheaper host and costs are down 30%").as_deref(),
            Some("technical_outage")
        );
    }

    #[test]
    fn test_churn_exclusion() {
        assert_eq!(
            fired("Two customers cancelled their subscription this week").as_deref(),
            Some("customer_churn")
        );
        assert_eq!(fired("Churn dropped after onboarding changes for customers"), None);
    }

    #[test]
    fn test_revenue_growth() {
        assert_eq!(
            fired("Our monthly recurring revenue is now at an all-time high").as_deref(),
            Some("revenue_growth")
        );
        assert_ne!(
            fired("Revenue dropped and sales are down this month").as_deref(),
            Some("revenue_growth")
        );
    }

    #[test]
    fn test_word_boundaries() {
        // "uptime" must not satisfy "up", "sales" alone is not enough
        assert_eq!(fired("Sales uptime dashboards refreshed"), None);
    }

    #[test]
    fn test_priority_decides_conflicts() {
        // Both churn (40) and revenue growth (50) groups are present
        let text = "Revenue grew but three customers cancelled their contracts";
        assert_eq!(fired(text).as_deref(), Some("customer_churn"));
    }

    #[test]
    fn test_custom_rules_sorted_by_priority() {
        let late = Rule::builder("late", 50, BusinessCategory::Research)
            .require(&["coffee"])
            .build()
            .unwrap();
        let early = Rule::builder("early", 5, BusinessCategory::Planning)
            .require(&["coffee"])
            .build()
            .unwrap();
        let engine = RuleEngine::with_rules(vec![late, early]).unwrap();
        assert_eq!(engine.first_match("More coffee").unwrap().id, "early");
    }

    #[test]
    fn test_duplicate_rule_ids_rejected() {
        let a = Rule::builder("dup", 1, BusinessCategory::Growth)
            .require(&["x1"])
            .build()
            .unwrap();
        let b = a.clone();
        assert!(RuleEngine::with_rules(vec![a, b]).is_err());
    }

    #[test]
    fn test_rule_without_groups_rejected() {
        assert!(Rule::builder("empty", 1, BusinessCategory::Growth).build().is_err());
    }

    #[test]
    fn test_empty_text_matches_nothing() {
        assert_eq!(fired(""), None);
        assert_eq!(fired("   \n\t "), None);
    }
}
