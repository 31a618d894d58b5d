//! # Compliance Evaluators
//!
//! Table-driven rule sets that inspect a finished calculation against an
//! external standard and return a [`ComplianceVerdict`].
//!
//! - [`national_code`] - Saudi Building Code (SBC 201-801)
//! - [`international`] - ACI 318, IEC 60364, ASHRAE, EN 752, NFPA 72, ISO/IEC 11801, ISO 9001
//! - [`safety_regulation`] - OSHA 29 CFR 1926 construction safety
//!
//! A rule is a row keyed by `(discipline, calculation_type)`. A key with no
//! rules is a pass with no notes: "nothing applies" is a valid outcome. A
//! failing rule is never an error; only a discipline or calculation type the
//! evaluator cannot even attempt is ([`EngineError::Evaluation`]).
//!
//! ## Scoring
//!
//! ```text
//! score = 100
//!       - ratio_weight         × clamp((worst − floor) / (ceiling − floor), 0, 1)
//!       - documentation_weight × missing / required
//!       - blocking_penalty     × #blocking
//!       - advisory_penalty     × #advisory
//! ```
//!
//! clamped to `[0, 100]`, one decimal. Every term only subtracts, so a worse
//! ratio or a missing document can never raise the score.

pub mod international;
pub mod national_code;
pub mod safety_regulation;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::calculations::{menu, CalculationResult, Discipline};
use crate::config::{ComplianceThresholds, EngineConfig, ScoringWeights};
use crate::errors::{EngineError, EngineResult};

pub use international::InternationalStandard;
pub use national_code::NationalCode;
pub use safety_regulation::SafetyRegulation;

// ============================================================================
// Verdicts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Advisory,
    Blocking,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Advisory => "advisory",
            Severity::Blocking => "blocking",
        })
    }
}

/// Structured origin of one note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub rule: String,
    pub message: String,
    pub reference: String,
}

impl Finding {
    pub fn note(&self) -> String {
        format!("[{}] {}: {}", self.severity, self.reference, self.message)
    }
}

/// One evaluator's judgement of one calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceVerdict {
    pub evaluator: String,
    pub passed: bool,
    pub notes: Vec<String>,
    pub applicable_references: Vec<String>,
    pub score: f64,
    pub findings: Vec<Finding>,
    pub missing_documentation: Vec<String>,
}

impl ComplianceVerdict {
    pub fn blocking_count(&self) -> usize {
        self.findings.iter().filter(|f| f.severity == Severity::Blocking).count()
    }

    pub fn advisory_count(&self) -> usize {
        self.findings.iter().filter(|f| f.severity == Severity::Advisory).count()
    }
}

/// All evaluators' verdicts merged into one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub passed: bool,
    pub notes: Vec<String>,
    pub references: Vec<String>,
    /// Lowest evaluator score
    pub score: f64,
    pub verdicts: Vec<ComplianceVerdict>,
}

impl ComplianceReport {
    /// AND over `passed`, notes concatenated in evaluator order, references
    /// unioned in first-seen order.
    pub fn merge(verdicts: Vec<ComplianceVerdict>) -> Self {
        let mut references: Vec<String> = Vec::new();
        for r in verdicts.iter().flat_map(|v| &v.applicable_references) {
            if !references.contains(r) {
                references.push(r.clone());
            }
        }
        ComplianceReport {
            passed: verdicts.iter().all(|v| v.passed),
            notes: verdicts.iter().flat_map(|v| v.notes.iter().cloned()).collect(),
            references,
            score: verdicts.iter().map(|v| v.score).fold(None, |acc: Option<f64>, s| {
                Some(acc.map_or(s, |a| a.min(s)))
            })
            .unwrap_or(100.0),
            verdicts,
        }
    }
}

// ============================================================================
// Actor context
// ============================================================================

/// Caller's role, used only to tailor advisory text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    SiteEngineer,
    ProjectManager,
    SafetyOfficer,
    Consultant,
    Contractor,
}

impl ActorRole {
    /// Unrecognised roles yield `None`; they are not an error.
    pub fn parse(role: &str) -> Option<Self> {
        match role.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "site_engineer" => Some(ActorRole::SiteEngineer),
            "project_manager" => Some(ActorRole::ProjectManager),
            "safety_officer" => Some(ActorRole::SafetyOfficer),
            "consultant" => Some(ActorRole::Consultant),
            "contractor" => Some(ActorRole::Contractor),
            _ => None,
        }
    }

    fn blocking_advice(&self) -> &'static str {
        match self {
            ActorRole::SiteEngineer => "hold the affected work until a revised design is issued",
            ActorRole::ProjectManager => "schedule a design review before procurement or programme commitments",
            ActorRole::SafetyOfficer => "confirm controls are in place before issuing a permit to work",
            ActorRole::Consultant => "revise the design and resubmit the calculation for approval",
            ActorRole::Contractor => "do not build this element until a revised design is approved",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActorRole::SiteEngineer => "site_engineer",
            ActorRole::ProjectManager => "project_manager",
            ActorRole::SafetyOfficer => "safety_officer",
            ActorRole::Consultant => "consultant",
            ActorRole::Contractor => "contractor",
        }
    }
}

// ============================================================================
// Rules
// ============================================================================

/// What a rule sees
pub struct EvaluationContext<'a> {
    pub discipline: Discipline,
    pub calculation_type: &'a str,
    pub inputs: &'a Value,
    pub result: &'a CalculationResult,
    pub thresholds: &'a ComplianceThresholds,
    pub actor: Option<ActorRole>,
}

impl EvaluationContext<'_> {
    pub fn input(&self, key: &str) -> Option<f64> {
        self.inputs.get(key).and_then(Value::as_f64)
    }

    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.inputs.get(key).and_then(Value::as_str)
    }

    pub fn input_flag(&self, key: &str) -> bool {
        self.inputs.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn result(&self, path: &str) -> Option<f64> {
        self.result.number(path)
    }

    pub fn ratio(&self, check: &str) -> Option<f64> {
        self.result.ratio(check)
    }
}

pub type CustomCheck = fn(&EvaluationContext<'_>) -> Option<(Severity, String)>;

#[derive(Clone, Copy)]
pub enum RuleKind {
    /// Inline compliance ratio: blocking above `blocking_ratio`, advisory
    /// above `advisory_ratio`. Entries without a ratio block when failed.
    Ratio(&'static str),
    /// Inline pass/fail entry with a fixed severity
    Flag(&'static str, Severity),
    /// Reads raw inputs or results
    Custom(CustomCheck),
}

#[derive(Clone, Copy)]
pub struct Rule {
    /// `None` applies to every discipline
    pub discipline: Option<Discipline>,
    /// `"*"` applies to every calculation type
    pub calculation_type: &'static str,
    pub id: &'static str,
    pub reference: &'static str,
    pub kind: RuleKind,
}

impl Rule {
    pub const fn ratio(
        discipline: Discipline,
        calculation_type: &'static str,
        check: &'static str,
        reference: &'static str,
    ) -> Self {
        Rule {
            discipline: Some(discipline),
            calculation_type,
            id: check,
            reference,
            kind: RuleKind::Ratio(check),
        }
    }

    pub const fn flag(
        discipline: Discipline,
        calculation_type: &'static str,
        check: &'static str,
        severity: Severity,
        reference: &'static str,
    ) -> Self {
        Rule {
            discipline: Some(discipline),
            calculation_type,
            id: check,
            reference,
            kind: RuleKind::Flag(check, severity),
        }
    }

    pub const fn custom(
        discipline: Option<Discipline>,
        calculation_type: &'static str,
        id: &'static str,
        reference: &'static str,
        check: CustomCheck,
    ) -> Self {
        Rule {
            discipline,
            calculation_type,
            id,
            reference,
            kind: RuleKind::Custom(check),
        }
    }

    pub fn applies_to(&self, discipline: Discipline, calculation_type: &str) -> bool {
        self.discipline.map_or(true, |d| d == discipline)
            && (self.calculation_type == "*" || self.calculation_type == calculation_type)
    }

    /// Returns the finding (if any) and the ratio read, for scoring
    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> (Option<Finding>, Option<f64>) {
        let found = |severity: Severity, message: String| Finding {
            severity,
            rule: self.id.to_string(),
            message,
            reference: self.reference.to_string(),
        };
        match self.kind {
            RuleKind::Ratio(name) => {
                let Some(entry) = ctx.result.compliance.get(name) else {
                    return (None, None);
                };
                match entry.ratio {
                    Some(ratio) => {
                        let t = ctx.thresholds;
                        let finding = if ratio > t.blocking_ratio {
                            Some(found(
                                Severity::Blocking,
                                format!("{} ratio {:.2} exceeds {:.2}", name, ratio, t.blocking_ratio),
                            ))
                        } else if ratio > t.advisory_ratio {
                            Some(found(
                                Severity::Advisory,
                                format!("{} ratio {:.2} is above {:.2}", name, ratio, t.advisory_ratio),
                            ))
                        } else {
                            None
                        };
                        (finding, Some(ratio))
                    }
                    None if !entry.passed => (
                        Some(found(Severity::Blocking, format!("{} check failed: {}", name, entry.notes.join("; ")))),
                        None,
                    ),
                    None => (None, None),
                }
            }
            RuleKind::Flag(name, severity) => {
                let finding = ctx
                    .result
                    .compliance
                    .get(name)
                    .filter(|c| !c.passed)
                    .map(|c| found(severity, format!("{} check failed: {}", name, c.notes.join("; "))));
                (finding, None)
            }
            RuleKind::Custom(check) => (check(ctx).map(|(severity, message)| found(severity, message)), None),
        }
    }
}

/// The calculation an evaluator is asked to judge
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub discipline: &'a str,
    pub calculation_type: &'a str,
    pub inputs: &'a Value,
    pub result: &'a CalculationResult,
}

impl<'a> Subject<'a> {
    pub fn of(result: &'a CalculationResult) -> Self {
        Subject {
            discipline: result.discipline.name(),
            calculation_type: &result.calculation_type,
            inputs: &result.inputs,
            result,
        }
    }
}

/// A standard's rule set.
pub trait ComplianceEvaluator: Send + Sync {
    fn name(&self) -> &'static str;

    fn rules(&self) -> &'static [Rule];

    /// Input keys whose presence counts toward the documentation score
    fn documentation_fields(&self) -> &'static [&'static str];

    fn check(
        &self,
        subject: &Subject<'_>,
        config: &EngineConfig,
        actor: Option<ActorRole>,
    ) -> EngineResult<ComplianceVerdict> {
        evaluate(self.name(), self.rules(), self.documentation_fields(), subject, config, actor)
    }
}

fn evaluate(
    evaluator: &str,
    rules: &[Rule],
    documentation: &[&str],
    subject: &Subject<'_>,
    config: &EngineConfig,
    actor: Option<ActorRole>,
) -> EngineResult<ComplianceVerdict> {
    let cannot = |reason: String| {
        EngineError::evaluation(evaluator, subject.discipline, subject.calculation_type, reason)
    };
    let discipline: Discipline = subject
        .discipline
        .parse()
        .map_err(|_| cannot("unrecognised discipline".to_string()))?;
    if !menu(discipline).contains(&subject.calculation_type) {
        return Err(cannot(format!("'{}' is not a {} calculation", subject.calculation_type, discipline)));
    }

    let ctx = EvaluationContext {
        discipline,
        calculation_type: subject.calculation_type,
        inputs: subject.inputs,
        result: subject.result,
        thresholds: &config.compliance,
        actor,
    };

    let mut findings = Vec::new();
    let mut references: Vec<String> = Vec::new();
    let mut worst: Option<f64> = None;
    for rule in rules.iter().filter(|r| r.applies_to(discipline, subject.calculation_type)) {
        if !references.iter().any(|r| r == rule.reference) {
            references.push(rule.reference.to_string());
        }
        let (finding, ratio) = rule.evaluate(&ctx);
        if let Some(r) = ratio {
            worst = Some(worst.map_or(r, |w| w.max(r)));
        }
        findings.extend(finding);
    }

    let missing: Vec<String> = documentation
        .iter()
        .filter(|field| !is_documented(subject.inputs.get(**field)))
        .map(|field| field.to_string())
        .collect();

    let blocking = findings.iter().filter(|f| f.severity == Severity::Blocking).count();
    let advisory = findings.len() - blocking;
    let score = score(&config.scoring, worst, missing.len(), documentation.len(), blocking, advisory);

    let mut notes: Vec<String> = findings.iter().map(Finding::note).collect();
    if blocking > 0 {
        if let Some(role) = actor {
            notes.push(format!("{}: {}", role.name(), role.blocking_advice()));
        }
        warn!(evaluator, %discipline, calculation_type = subject.calculation_type, blocking, "blocking compliance findings");
    } else {
        debug!(evaluator, %discipline, calculation_type = subject.calculation_type, advisory, score, "compliance evaluated");
    }

    Ok(ComplianceVerdict {
        evaluator: evaluator.to_string(),
        passed: blocking == 0,
        notes,
        applicable_references: references,
        score,
        findings,
        missing_documentation: missing,
    })
}

fn is_documented(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

/// Weighted 0-100 score; see the module docs for the formula.
pub fn score(
    weights: &ScoringWeights,
    worst_ratio: Option<f64>,
    missing_documents: usize,
    required_documents: usize,
    blocking: usize,
    advisory: usize,
) -> f64 {
    let ratio_penalty = worst_ratio.map_or(0.0, |r| {
        let span = weights.ratio_ceiling - weights.ratio_floor;
        weights.ratio_weight * ((r - weights.ratio_floor) / span).clamp(0.0, 1.0)
    });
    let documentation_penalty = if required_documents == 0 {
        0.0
    } else {
        weights.documentation_weight * missing_documents as f64 / required_documents as f64
    };
    let raw = 100.0
        - ratio_penalty
        - documentation_penalty
        - weights.blocking_penalty * blocking as f64
        - weights.advisory_penalty * advisory as f64;
    (raw.clamp(0.0, 100.0) * 10.0).round() / 10.0
}

/// The three evaluators in call order
pub fn standard_evaluators() -> Vec<Box<dyn ComplianceEvaluator>> {
    vec![
        Box::new(NationalCode),
        Box::new(InternationalStandard),
        Box::new(SafetyRegulation),
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;

    use serde_json::{Map, Value};

    use crate::calculations::{CalculationResult, ComplianceCheck, Discipline};

    pub fn result_with(
        discipline: Discipline,
        calculation_type: &str,
        inputs: Value,
        checks: &[(&str, ComplianceCheck)],
    ) -> CalculationResult {
        CalculationResult {
            discipline,
            calculation_type: calculation_type.to_string(),
            inputs,
            results: Map::new(),
            compliance: checks
                .iter()
                .map(|(name, c)| (name.to_string(), c.clone()))
                .collect::<BTreeMap<_, _>>(),
            recommendations: vec![],
            standards: vec![],
            compliance_report: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::result_with;
    use super::*;
    use crate::calculations::ComplianceCheck;
    use serde_json::json;

    fn verdict(evaluator: &str, passed: bool, notes: &[&str], refs: &[&str], score: f64) -> ComplianceVerdict {
        ComplianceVerdict {
            evaluator: evaluator.to_string(),
            passed,
            notes: notes.iter().map(|s| s.to_string()).collect(),
            applicable_references: refs.iter().map(|s| s.to_string()).collect(),
            score,
            findings: vec![],
            missing_documentation: vec![],
        }
    }

    #[test]
    fn test_merge_ands_and_keeps_order() {
        let a = verdict("a", false, &["a1", "a2"], &["X", "Y"], 60.0);
        let b = verdict("b", true, &["b1"], &["Y", "Z"], 90.0);
        let report = ComplianceReport::merge(vec![a, b]);
        assert!(!report.passed);
        assert_eq!(report.notes, vec!["a1", "a2", "b1"]);
        assert_eq!(report.references, vec!["X", "Y", "Z"]);
        assert_eq!(report.score, 60.0);
    }

    #[test]
    fn test_merge_of_nothing_passes() {
        let report = ComplianceReport::merge(vec![]);
        assert!(report.passed);
        assert_eq!(report.score, 100.0);
        assert!(report.notes.is_empty());
    }

    #[test]
    fn test_score_terms() {
        let w = ScoringWeights::default();
        assert_eq!(score(&w, None, 0, 2, 0, 0), 100.0);
        assert_eq!(score(&w, Some(0.4), 0, 2, 0, 0), 100.0);
        // halfway between floor and ceiling
        assert_eq!(score(&w, Some(1.0), 0, 2, 0, 0), 80.0);
        assert_eq!(score(&w, Some(1.0), 1, 2, 1, 0), 45.0);
        assert_eq!(score(&w, Some(3.0), 2, 2, 3, 2), 0.0);
    }

    #[test]
    fn test_score_never_rises_with_worse_inputs() {
        let w = ScoringWeights::default();
        let mut last = f64::INFINITY;
        for step in 0..30 {
            let s = score(&w, Some(step as f64 * 0.1), 1, 2, 0, 1);
            assert!(s <= last);
            last = s;
        }
        assert!(score(&w, Some(0.8), 2, 2, 0, 0) <= score(&w, Some(0.8), 1, 2, 0, 0));
    }

    #[test]
    fn test_actor_roles() {
        assert_eq!(ActorRole::parse("Site Engineer"), Some(ActorRole::SiteEngineer));
        assert_eq!(ActorRole::parse("safety-officer"), Some(ActorRole::SafetyOfficer));
        assert_eq!(ActorRole::parse("auditor"), None);
    }

    #[test]
    fn test_unknown_pair_is_evaluation_error() {
        let config = EngineConfig::default();
        let result = result_with(Discipline::Civil, "beam-analysis", json!({}), &[]);
        let mut subject = Subject::of(&result);
        subject.calculation_type = "nonexistent-calc";
        let err = NationalCode.check(&subject, &config, None).unwrap_err();
        assert_eq!(err.error_code(), "EVALUATION_ERROR");

        subject.discipline = "geotechnical";
        subject.calculation_type = "beam-analysis";
        let err = SafetyRegulation.check(&subject, &config, None).unwrap_err();
        assert_eq!(err.error_code(), "EVALUATION_ERROR");
    }

    #[test]
    fn test_role_text_only_with_blocking() {
        let config = EngineConfig::default();
        let failing = result_with(
            Discipline::Civil,
            "beam-analysis",
            json!({}),
            &[("deflection", ComplianceCheck::ratio(1.3, "over"))],
        );
        let v = NationalCode
            .check(&Subject::of(&failing), &config, Some(ActorRole::Contractor))
            .unwrap();
        assert!(!v.passed);
        assert!(v.notes.iter().any(|n| n.starts_with("contractor:")));

        let passing = result_with(
            Discipline::Civil,
            "beam-analysis",
            json!({}),
            &[("deflection", ComplianceCheck::ratio(0.95, "close"))],
        );
        let v = NationalCode
            .check(&Subject::of(&passing), &config, Some(ActorRole::Contractor))
            .unwrap();
        assert!(v.passed);
        assert_eq!(v.advisory_count(), 1);
        assert!(!v.notes.iter().any(|n| n.starts_with("contractor:")));
    }

    #[test]
    fn test_documentation_counts() {
        assert!(!is_documented(None));
        assert!(!is_documented(Some(&json!(""))));
        assert!(!is_documented(Some(&json!(false))));
        assert!(is_documented(Some(&json!("DB-001 rev B"))));
        assert!(is_documented(Some(&json!(true))));
    }

    #[test]
    fn test_verdict_wire_names() {
        let v = verdict("national-code", true, &[], &["SBC 304"], 100.0);
        let json = serde_json::to_value(&v).unwrap();
        assert!(json.get("applicableReferences").is_some());
        assert!(json.get("missingDocumentation").is_some());
    }
}
