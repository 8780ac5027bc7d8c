use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{PaysheetError, Result};
use crate::models::FlowType;
use crate::normalizer::normalize_text;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    Contains,
    StartsWith,
    Exact,
    Regex,
}

/// A reference label an event description is tested against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRule {
    pub pattern: String,
    #[serde(default)]
    pub match_type: MatchType,
}

impl LabelRule {
    pub fn contains(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            match_type: MatchType::Contains,
        }
    }
}

/// Recognized label sets, one per classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub meal_allowance: Vec<LabelRule>,
    pub tax: Vec<LabelRule>,
    pub pension: Vec<LabelRule>,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            meal_allowance: vec![LabelRule::contains("AUXILIO ALIMENTACAO")],
            tax: vec![
                LabelRule::contains("I.R.R.F."),
                LabelRule::contains("I.R.R.F. 13º SALÁRIO"),
                LabelRule::contains("IRRF"),
            ],
            pension: vec![
                LabelRule::contains("CONTRIBUICAO SIMPAS"),
                LabelRule::contains("CONTRIBUICAO SIMPAS 13º SALARIO"),
                LabelRule::contains("PREVIDENCIA MUNICIPAL - PATRONAL FUNDO"),
            ],
        }
    }
}

enum Matcher {
    Contains(String),
    StartsWith(String),
    Exact(String),
    Regex(Regex),
}

impl Matcher {
    fn compile(rule: &LabelRule) -> Result<Self> {
        Ok(match rule.match_type {
            MatchType::Contains => Self::Contains(normalize_text(&rule.pattern)),
            MatchType::StartsWith => Self::StartsWith(normalize_text(&rule.pattern)),
            MatchType::Exact => Self::Exact(normalize_text(&rule.pattern)),
            // Regexes run against the normalized description, so they are
            // compiled case-insensitive but otherwise left as written.
            MatchType::Regex => {
                let re = RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        PaysheetError::Settings(format!("Invalid label regex {:?}: {e}", rule.pattern))
                    })?;
                Self::Regex(re)
            }
        })
    }

    fn is_match(&self, desc: &str) -> bool {
        match self {
            Self::Contains(p) => !p.is_empty() && desc.contains(p.as_str()),
            Self::StartsWith(p) => !p.is_empty() && desc.starts_with(p.as_str()),
            Self::Exact(p) => desc == p,
            Self::Regex(re) => re.is_match(desc),
        }
    }
}

fn compile_all(rules: &[LabelRule]) -> Result<Vec<Matcher>> {
    rules.iter().map(Matcher::compile).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub is_meal_allowance: bool,
    pub is_tax: bool,
    pub is_pension: bool,
}

/// Compiled label sets. Every predicate normalizes its input first, so raw
/// and already-normalized descriptions classify the same way.
pub struct Classifier {
    meal_allowance: Vec<Matcher>,
    tax: Vec<Matcher>,
    pension: Vec<Matcher>,
}

impl Classifier {
    pub fn new(labels: &Labels) -> Result<Self> {
        Ok(Self {
            meal_allowance: compile_all(&labels.meal_allowance)?,
            tax: compile_all(&labels.tax)?,
            pension: compile_all(&labels.pension)?,
        })
    }

    pub fn classify(&self, desc: &str) -> Classification {
        let desc = normalize_text(desc);
        Classification {
            is_meal_allowance: any_match(&self.meal_allowance, &desc),
            is_tax: any_match(&self.tax, &desc),
            is_pension: any_match(&self.pension, &desc),
        }
    }

    pub fn is_meal_allowance(&self, desc: &str) -> bool {
        self.classify(desc).is_meal_allowance
    }

    pub fn is_tax(&self, desc: &str) -> bool {
        self.classify(desc).is_tax
    }

    pub fn is_pension(&self, desc: &str) -> bool {
        self.classify(desc).is_pension
    }
}

fn any_match(matchers: &[Matcher], desc: &str) -> bool {
    matchers.iter().any(|m| m.is_match(desc))
}

pub fn flow_type(raw_flag: &str) -> FlowType {
    match raw_flag.trim().to_uppercase().as_str() {
        "P" => FlowType::Earning,
        "D" => FlowType::Deduction,
        _ => FlowType::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_classifier() -> Classifier {
        Classifier::new(&Labels::default()).unwrap()
    }

    #[test]
    fn test_meal_allowance_substring() {
        let c = default_classifier();
        assert!(c.is_meal_allowance("AUXILIO ALIMENTACAO"));
        assert!(c.is_meal_allowance("auxílio alimentação - diferença"));
        assert!(!c.is_meal_allowance("AUXILIO TRANSPORTE"));
    }

    #[test]
    fn test_tax_matches_every_variant() {
        let c = default_classifier();
        assert!(c.is_tax("I.R.R.F."));
        assert!(c.is_tax("I.R.R.F. 13º SALÁRIO"));
        assert!(c.is_tax("IRRF FERIAS"));
        assert!(c.is_tax("desconto irrf"));
        assert!(!c.is_tax("I.N.S.S."));
    }

    #[test]
    fn test_pension_accented_mixed_case() {
        let c = default_classifier();
        assert!(c.is_pension("Contribuição Simpas 13º Salário"));
        assert!(c.is_pension("CONTRIBUICAO SIMPAS"));
        assert!(c.is_pension("Previdência Municipal - Patronal Fundo Financeiro"));
        assert!(!c.is_pension("CONTRIBUICAO SINDICAL"));
    }

    #[test]
    fn test_flow_type_mapping() {
        assert_eq!(flow_type("P"), FlowType::Earning);
        assert_eq!(flow_type("D"), FlowType::Deduction);
        assert_eq!(flow_type(" d "), FlowType::Deduction);
        assert_eq!(flow_type("PATRONAL"), FlowType::None);
        assert_eq!(flow_type(""), FlowType::None);
    }

    #[test]
    fn test_starts_with_and_exact_rules() {
        let labels = Labels {
            meal_allowance: vec![LabelRule {
                pattern: "vale".into(),
                match_type: MatchType::StartsWith,
            }],
            tax: vec![LabelRule {
                pattern: "I.R.R.F.".into(),
                match_type: MatchType::Exact,
            }],
            pension: vec![],
        };
        let c = Classifier::new(&labels).unwrap();
        assert!(c.is_meal_allowance("VALE REFEICAO"));
        assert!(!c.is_meal_allowance("DESCONTO VALE"));
        assert!(c.is_tax("i.r.r.f."));
        assert!(!c.is_tax("I.R.R.F. 13 SALARIO"));
        assert!(!c.is_pension("CONTRIBUICAO SIMPAS"));
    }

    #[test]
    fn test_regex_rule() {
        let labels = Labels {
            tax: vec![LabelRule {
                pattern: r"^IMPOSTO\s+DE\s+RENDA".into(),
                match_type: MatchType::Regex,
            }],
            ..Labels::default()
        };
        let c = Classifier::new(&labels).unwrap();
        assert!(c.is_tax("Imposto de Renda Retido"));
        assert!(!c.is_tax("I.R.R.F."));
    }

    #[test]
    fn test_invalid_regex_is_settings_error() {
        let labels = Labels {
            pension: vec![LabelRule {
                pattern: "(unclosed".into(),
                match_type: MatchType::Regex,
            }],
            ..Labels::default()
        };
        let err = Classifier::new(&labels).err().unwrap();
        assert!(matches!(err, PaysheetError::Settings(_)));
    }

    #[test]
    fn test_labels_deserialize_with_defaults() {
        let json = r#"{"tax": [{"pattern": "IMPOSTO"}]}"#;
        let labels: Labels = serde_json::from_str(json).unwrap();
        assert_eq!(labels.tax, vec![LabelRule::contains("IMPOSTO")]);
        assert_eq!(labels.pension, Labels::default().pension);
    }
}
