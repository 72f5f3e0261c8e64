//! Property tests for permission matching and condition evaluation

use group_auth::condition::ConditionEngine;
use group_auth::{
    decide, AuthConfig, Authorizer, Group, InMemoryRuleStore, MatchMode, PermissionRequest,
    PermissionSet, RequestParams, RequestScope, Relation, Rule, StaticIdentity, User,
};
use proptest::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9]{0,6}_[a-zA-Z]{1,6}"
}

proptest! {
    #[test]
    fn prop_case_does_not_change_decisions(
        granted in prop::collection::vec(name_strategy(), 0..6),
        requested in prop::collection::vec(name_strategy(), 0..4),
        all in any::<bool>(),
    ) {
        let relation = if all { Relation::All } else { Relation::Any };
        let params = RequestParams::new();

        let lower = PermissionSet::new(granted.iter().map(|n| n.to_lowercase()));
        let upper = PermissionSet::new(granted.iter().map(|n| n.to_uppercase()));
        let request = PermissionRequest::from_names(&requested).with_relation(relation);
        let shouted = PermissionRequest::from_names(requested.iter().map(|n| n.to_uppercase()))
            .with_relation(relation);

        prop_assert_eq!(decide(&lower, &request, &params), decide(&upper, &shouted, &params));
    }

    #[test]
    fn prop_all_implies_any(
        granted in prop::collection::vec(name_strategy(), 0..6),
        requested in prop::collection::vec(name_strategy(), 0..4),
    ) {
        let params = RequestParams::new();
        let set = PermissionSet::new(&granted);
        let any = PermissionRequest::from_names(&requested);
        let all = any.clone().with_relation(Relation::All);

        if decide(&set, &all, &params) {
            prop_assert!(decide(&set, &any, &params));
        }
    }

    #[test]
    fn prop_granted_names_always_match(
        granted in prop::collection::vec(name_strategy(), 1..6),
    ) {
        let params = RequestParams::new();
        let set = PermissionSet::new(&granted);

        let request = PermissionRequest::from_names(&granted)
            .with_mode(MatchMode::Plain)
            .with_relation(Relation::All);
        prop_assert!(decide(&set, &request, &params));
    }

    #[test]
    fn prop_empty_set_never_grants(
        requested in prop::collection::vec(name_strategy(), 0..4),
        all in any::<bool>(),
    ) {
        let relation = if all { Relation::All } else { Relation::Any };
        let request = PermissionRequest::from_names(&requested).with_relation(relation);
        prop_assert!(!decide(&PermissionSet::empty(), &request, &RequestParams::new()));
    }

    #[test]
    fn prop_url_constraint_requires_exact_value(
        name in name_strategy(),
        expected in 0u32..1000,
        actual in 0u32..1000,
    ) {
        let set = PermissionSet::new([format!("{}?status={}", name, expected)]);
        let request = PermissionRequest::parse(&name);
        let params = RequestParams::from_json(json!({ "status": actual.to_string() }));

        prop_assert_eq!(decide(&set, &request, &params), expected == actual);
    }

    #[test]
    fn prop_numeric_comparison_matches_rust(score in -1000i64..1000, threshold in -1000i64..1000) {
        let engine = ConditionEngine::new();
        let mut attributes = HashMap::new();
        attributes.insert("score".to_string(), json!(score));

        let expr = format!("{{score}} >= {}", threshold);
        prop_assert_eq!(engine.evaluate_expression(&expr, &attributes).unwrap(), score >= threshold);
    }

    #[test]
    fn prop_condition_never_panics(input in ".{0,40}") {
        let engine = ConditionEngine::new();
        let _ = engine.evaluate_expression(&input, &HashMap::new());
    }

    #[test]
    fn prop_cached_check_is_stable(
        granted in prop::collection::vec(name_strategy(), 1..5),
        requested in name_strategy(),
    ) {
        tokio_test::block_on(async {
            let store = Arc::new(InMemoryRuleStore::new());
            let mut ids = Vec::new();
            for (i, name) in granted.iter().enumerate() {
                store.put_rule(Rule::new(i.to_string(), name.clone())).await;
                ids.push(i.to_string());
            }
            store.put_group(Group::new("staff", ids)).await;
            store.add_member("alice", "staff").await;

            let authorizer = Authorizer::new(AuthConfig::default(), store);
            let identity = StaticIdentity::new(User::new("alice"));
            let scope = RequestScope::new(&identity);

            let first = authorizer
                .check_string(&scope, &requested, MatchMode::Url, Relation::Any)
                .await
                .unwrap();
            let second = authorizer
                .check_string(&scope, &requested, MatchMode::Url, Relation::Any)
                .await
                .unwrap();

            let expected = granted.iter().any(|n| n.eq_ignore_ascii_case(&requested));
            assert_eq!(first, expected);
            assert_eq!(first, second);
        });
    }
}
