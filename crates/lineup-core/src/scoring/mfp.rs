/// Uniform Mandatory/Forbidden/Preferred rule evaluation.
///
/// Two variants share the same priority order (forbidden > mandatory >
/// preferred, first match wins):
/// - `check_rules` for content with a *list* of tokens (genres, keywords):
///   mandatory means "every listed value must be present".
/// - `check_single_token` for content with exactly *one* token (type, rating
///   category, duration category): mandatory means "the token must be one of
///   the listed values".
use crate::domain::{CriterionRules, MfpPolicy};
use crate::scoring::{RuleKind, RuleOutcome};

/// Evaluate list-semantics rules against lowercased content tokens.
/// Returns the score adjustment plus the typed outcome, if any rule fired.
pub fn check_rules(
    content_values: &[String],
    rules: Option<&CriterionRules>,
    policy: &MfpPolicy,
) -> (f64, Option<RuleOutcome>) {
    let Some(rules) = rules else {
        return (0.0, None);
    };

    let content_lower: Vec<String> = content_values
        .iter()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_lowercase())
        .collect();

    // Forbidden check (highest priority)
    for forbidden in &rules.forbidden_values {
        if content_lower.contains(&forbidden.to_lowercase()) {
            let penalty = rules
                .forbidden_penalty
                .unwrap_or(policy.forbidden_detected_penalty);
            return (
                penalty,
                Some(RuleOutcome::new(
                    RuleKind::Forbidden,
                    vec![forbidden.clone()],
                    penalty,
                )),
            );
        }
    }

    // Mandatory check: every listed value must be present
    if !rules.mandatory_values.is_empty() {
        let missing: Vec<String> = rules
            .mandatory_values
            .iter()
            .filter(|m| !content_lower.contains(&m.to_lowercase()))
            .cloned()
            .collect();

        return if missing.is_empty() {
            let bonus = policy.mandatory_matched_bonus;
            (
                bonus,
                Some(RuleOutcome::new(
                    RuleKind::Mandatory,
                    rules.mandatory_values.clone(),
                    bonus,
                )),
            )
        } else {
            let penalty = rules
                .mandatory_penalty
                .unwrap_or(policy.mandatory_missed_penalty);
            (
                penalty,
                Some(RuleOutcome::new(RuleKind::Mandatory, missing, penalty)),
            )
        };
    }

    // Preferred check (bonus)
    for preferred in &rules.preferred_values {
        if content_lower.contains(&preferred.to_lowercase()) {
            let bonus = rules
                .preferred_bonus
                .unwrap_or(policy.preferred_matched_bonus);
            return (
                bonus,
                Some(RuleOutcome::new(
                    RuleKind::Preferred,
                    vec![preferred.clone()],
                    bonus,
                )),
            );
        }
    }

    (0.0, None)
}

/// Evaluate membership-semantics rules for content that carries exactly one
/// token: the token must be *in* the mandatory list, not contain it.
pub fn check_single_token(
    token: &str,
    rules: Option<&CriterionRules>,
    policy: &MfpPolicy,
) -> (f64, Option<RuleOutcome>) {
    let Some(rules) = rules else {
        return (0.0, None);
    };
    if token.is_empty() {
        return (0.0, None);
    }
    let token_lower = token.to_lowercase();

    let in_list = |values: &[String]| values.iter().any(|v| v.to_lowercase() == token_lower);

    if in_list(&rules.forbidden_values) {
        let penalty = rules
            .forbidden_penalty
            .unwrap_or(policy.forbidden_detected_penalty);
        return (
            penalty,
            Some(RuleOutcome::new(
                RuleKind::Forbidden,
                vec![token.to_string()],
                penalty,
            )),
        );
    }

    if !rules.mandatory_values.is_empty() {
        return if in_list(&rules.mandatory_values) {
            let bonus = policy.mandatory_matched_bonus;
            (
                bonus,
                Some(RuleOutcome::new(
                    RuleKind::Mandatory,
                    vec![token.to_string()],
                    bonus,
                )),
            )
        } else {
            let penalty = rules
                .mandatory_penalty
                .unwrap_or(policy.mandatory_missed_penalty);
            (
                penalty,
                Some(RuleOutcome::new(
                    RuleKind::Mandatory,
                    rules.mandatory_values.clone(),
                    penalty,
                )),
            )
        };
    }

    if in_list(&rules.preferred_values) {
        let bonus = rules
            .preferred_bonus
            .unwrap_or(policy.preferred_matched_bonus);
        return (
            bonus,
            Some(RuleOutcome::new(
                RuleKind::Preferred,
                vec![token.to_string()],
                bonus,
            )),
        );
    }

    (0.0, None)
}

/// Membership semantics over a small set of alias tokens for the same fact
/// (e.g. a duration's category plus its exact-minute token). Mandatory is
/// satisfied when *any* alias appears in the mandatory list.
pub fn check_alias_tokens(
    tokens: &[String],
    rules: Option<&CriterionRules>,
    policy: &MfpPolicy,
) -> (f64, Option<RuleOutcome>) {
    let Some(rules) = rules else {
        return (0.0, None);
    };
    let tokens_lower: Vec<String> = tokens
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect();
    if tokens_lower.is_empty() {
        return (0.0, None);
    }

    let hit = |values: &[String]| -> Option<String> {
        values
            .iter()
            .find(|v| tokens_lower.contains(&v.to_lowercase()))
            .cloned()
    };

    if let Some(value) = hit(&rules.forbidden_values) {
        let penalty = rules
            .forbidden_penalty
            .unwrap_or(policy.forbidden_detected_penalty);
        return (
            penalty,
            Some(RuleOutcome::new(RuleKind::Forbidden, vec![value], penalty)),
        );
    }

    if !rules.mandatory_values.is_empty() {
        return if let Some(value) = hit(&rules.mandatory_values) {
            let bonus = policy.mandatory_matched_bonus;
            (
                bonus,
                Some(RuleOutcome::new(RuleKind::Mandatory, vec![value], bonus)),
            )
        } else {
            let penalty = rules
                .mandatory_penalty
                .unwrap_or(policy.mandatory_missed_penalty);
            (
                penalty,
                Some(RuleOutcome::new(
                    RuleKind::Mandatory,
                    rules.mandatory_values.clone(),
                    penalty,
                )),
            )
        };
    }

    if let Some(value) = hit(&rules.preferred_values) {
        let bonus = rules
            .preferred_bonus
            .unwrap_or(policy.preferred_matched_bonus);
        return (
            bonus,
            Some(RuleOutcome::new(RuleKind::Preferred, vec![value], bonus)),
        );
    }

    (0.0, None)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn rules(mandatory: &[&str], forbidden: &[&str], preferred: &[&str]) -> CriterionRules {
        CriterionRules {
            mandatory_values: tokens(mandatory),
            forbidden_values: tokens(forbidden),
            preferred_values: tokens(preferred),
            ..CriterionRules::default()
        }
    }

    #[test]
    fn test_forbidden_beats_preferred() {
        // A token in both lists yields the forbidden outcome only
        let policy = MfpPolicy::default();
        let r = rules(&[], &["action"], &["action"]);
        let (delta, outcome) = check_rules(&tokens(&["Action", "drama"]), Some(&r), &policy);

        assert_eq!(delta, -400.0);
        let outcome = outcome.unwrap();
        assert_eq!(outcome.rule_type, RuleKind::Forbidden);
        assert_eq!(outcome.values, vec!["action".to_string()]);
    }

    #[test]
    fn test_forbidden_beats_mandatory() {
        let policy = MfpPolicy::default();
        let r = rules(&["drama"], &["horror"], &[]);
        let (delta, outcome) =
            check_rules(&tokens(&["drama", "horror"]), Some(&r), &policy);

        assert_eq!(delta, -400.0);
        assert_eq!(outcome.unwrap().rule_type, RuleKind::Forbidden);
    }

    #[test]
    fn test_mandatory_all_present_grants_bonus() {
        let policy = MfpPolicy::default();
        let r = rules(&["drama", "crime"], &[], &[]);
        let (delta, outcome) =
            check_rules(&tokens(&["crime", "drama", "thriller"]), Some(&r), &policy);

        assert_eq!(delta, 10.0);
        let outcome = outcome.unwrap();
        assert_eq!(outcome.rule_type, RuleKind::Mandatory);
        assert_eq!(outcome.values.len(), 2);
    }

    #[test]
    fn test_mandatory_missing_reports_only_missing_values() {
        let policy = MfpPolicy::default();
        let r = rules(&["drama", "crime"], &[], &[]);
        let (delta, outcome) = check_rules(&tokens(&["drama"]), Some(&r), &policy);

        assert_eq!(delta, -40.0);
        assert_eq!(outcome.unwrap().values, vec!["crime".to_string()]);
    }

    #[test]
    fn test_preferred_match_and_rule_level_override() {
        let policy = MfpPolicy::default();
        let mut r = rules(&[], &[], &["comedy"]);
        let (delta, _) = check_rules(&tokens(&["comedy"]), Some(&r), &policy);
        assert_eq!(delta, 20.0);

        r.preferred_bonus = Some(35.0);
        let (delta, _) = check_rules(&tokens(&["comedy"]), Some(&r), &policy);
        assert_eq!(delta, 35.0);
    }

    #[test]
    fn test_no_rules_is_neutral() {
        let policy = MfpPolicy::default();
        assert_eq!(check_rules(&tokens(&["a"]), None, &policy), (0.0, None));

        let empty = CriterionRules::default();
        let (delta, outcome) = check_rules(&tokens(&["a"]), Some(&empty), &policy);
        assert_eq!(delta, 0.0);
        assert!(outcome.is_none());
    }

    #[test]
    fn test_single_token_mandatory_is_membership() {
        // "movie" must be IN the mandatory list, not the other way around
        let policy = MfpPolicy::default();
        let r = rules(&["movie", "episode"], &[], &[]);

        let (delta, outcome) = check_single_token("movie", Some(&r), &policy);
        assert_eq!(delta, 10.0);
        assert_eq!(outcome.unwrap().rule_type, RuleKind::Mandatory);

        let (delta, outcome) = check_single_token("trailer", Some(&r), &policy);
        assert_eq!(delta, -40.0);
        assert_eq!(
            outcome.unwrap().values,
            vec!["movie".to_string(), "episode".to_string()]
        );
    }

    #[test]
    fn test_alias_tokens_any_match_satisfies_mandatory() {
        let policy = MfpPolicy::default();
        let r = rules(&["short", "90min"], &[], &[]);

        // Either alias satisfies the mandatory set
        let (delta, _) = check_alias_tokens(
            &tokens(&["standard", "90min"]),
            Some(&r),
            &policy,
        );
        assert_eq!(delta, 10.0);

        let (delta, outcome) =
            check_alias_tokens(&tokens(&["epic", "250min"]), Some(&r), &policy);
        assert_eq!(delta, -40.0);
        assert_eq!(outcome.unwrap().rule_type, RuleKind::Mandatory);
    }

    #[test]
    fn test_single_token_forbidden_priority() {
        let policy = MfpPolicy::default();
        let r = rules(&["trailer"], &["trailer"], &["trailer"]);
        let (delta, outcome) = check_single_token("trailer", Some(&r), &policy);
        assert_eq!(delta, -400.0);
        assert_eq!(outcome.unwrap().rule_type, RuleKind::Forbidden);
    }
}
