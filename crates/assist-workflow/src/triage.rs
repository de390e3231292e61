//! 症状分诊规则
//!
//! 按固定顺序匹配关键词规则，将症状描述归类为危重或中等

use assist_core::{Severity, TriageResult};

/// 规则条件
#[derive(Debug, Clone)]
enum SymptomCondition {
    Contains(&'static str),             // 描述包含
    AnyOf(Vec<SymptomCondition>),       // 任一条件满足
    AllOf(Vec<SymptomCondition>),       // 全部条件满足
}

impl SymptomCondition {
    fn matches(&self, description: &str) -> bool {
        match self {
            Self::Contains(keyword) => description.contains(keyword),
            Self::AnyOf(conditions) => conditions.iter().any(|c| c.matches(description)),
            Self::AllOf(conditions) => conditions.iter().all(|c| c.matches(description)),
        }
    }
}

/// 分诊规则
#[derive(Debug, Clone)]
struct TriageRule {
    name: &'static str,
    condition: SymptomCondition,
    summary: &'static str,
    severity: Severity,
}

/// 症状分诊器
///
/// 规则列表是封闭且有序的，第一条匹配的规则生效；
/// 都不匹配时返回小写化的原始描述和中等严重程度
#[derive(Debug, Clone)]
pub struct SymptomTriage {
    rules: Vec<TriageRule>,
}

impl SymptomTriage {
    /// 创建带有默认规则的分诊器
    pub fn new() -> Self {
        use SymptomCondition::*;

        let rules = vec![
            TriageRule {
                name: "chest_pain_radiating",
                // "chest pain" 与 "pain in my chest" 都算胸痛
                condition: AllOf(vec![
                    AnyOf(vec![
                        Contains("chest pain"),
                        Contains("pain in my chest"),
                        Contains("pain in the chest"),
                    ]),
                    AnyOf(vec![Contains("arm"), Contains("left")]),
                ]),
                summary: "Severe chest pain, arm numbness",
                severity: Severity::Critical,
            },
            TriageRule {
                name: "difficulty_breathing",
                condition: Contains("difficulty breathing"),
                summary: "Difficulty breathing",
                severity: Severity::Critical,
            },
        ];

        Self { rules }
    }

    /// 对症状描述进行分诊
    pub fn classify(&self, description: &str) -> TriageResult {
        tracing::info!("Analyzing symptoms: {}", description);
        let description = description.to_lowercase();

        for rule in &self.rules {
            if rule.condition.matches(&description) {
                tracing::debug!("Triage rule {} matched", rule.name);
                return TriageResult {
                    summary: rule.summary.to_string(),
                    severity: rule.severity,
                };
            }
        }

        TriageResult {
            summary: description,
            severity: Severity::Moderate,
        }
    }
}

impl Default for SymptomTriage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chest_pain_with_arm_is_critical() {
        let triage = SymptomTriage::new();

        let result = triage.classify("Sudden CHEST PAIN spreading to my ARM");
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.summary, "Severe chest pain, arm numbness");

        let result = triage.classify("chest pain on the left side");
        assert_eq!(result.severity, Severity::Critical);
    }

    #[test]
    fn test_chest_pain_without_arm_or_left_falls_through() {
        let triage = SymptomTriage::new();

        let result = triage.classify("Mild chest pain after running");
        assert_eq!(result.severity, Severity::Moderate);
        assert_eq!(result.summary, "mild chest pain after running");
    }

    #[test]
    fn test_difficulty_breathing_is_critical() {
        let triage = SymptomTriage::new();

        let result = triage.classify("I have Difficulty Breathing");
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.summary, "Difficulty breathing");
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let triage = SymptomTriage::new();

        let result = triage.classify("chest pain in my left arm and difficulty breathing");
        assert_eq!(result.summary, "Severe chest pain, arm numbness");
    }

    #[test]
    fn test_default_rule_returns_lowercased_input() {
        let triage = SymptomTriage::new();

        let result = triage.classify("Twisted My Ankle");
        assert_eq!(result.severity, Severity::Moderate);
        assert_eq!(result.summary, "twisted my ankle");

        let result = triage.classify("");
        assert_eq!(result.severity, Severity::Moderate);
        assert_eq!(result.summary, "");
    }

    #[test]
    fn test_reordered_chest_pain_phrase_is_critical() {
        let triage = SymptomTriage::new();

        let result = triage.classify("I feel a sharp pain in my chest and my arm is numb.");
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.summary, "Severe chest pain, arm numbness");
    }

    #[test]
    fn test_unrelated_chest_and_pain_mentions_are_moderate() {
        let triage = SymptomTriage::new();

        let description = "Pain in my left knee; chest x-ray last week was normal";
        let result = triage.classify(description);
        assert_eq!(result.severity, Severity::Moderate);
        assert_eq!(result.summary, description.to_lowercase());
    }

    #[test]
    fn test_chest_without_pain_is_not_critical() {
        let triage = SymptomTriage::new();

        let result = triage.classify("tightness in my chest and left shoulder");
        assert_eq!(result.severity, Severity::Moderate);
    }
}
