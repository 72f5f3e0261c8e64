/// Benchmarks for permission matching and condition evaluation
///
/// Measures:
/// - Plain and url-constrained matching over growing permission sets
/// - Condition compile vs cached evaluation
/// - A full cached check through the authorizer

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use group_auth::condition::ConditionEngine;
use group_auth::{
    decide, AuthConfig, Authorizer, Group, InMemoryRuleStore, MatchMode, PermissionRequest,
    PermissionSet, Relation, RequestParams, RequestScope, Rule, StaticIdentity, User,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

fn permission_set(size: usize) -> PermissionSet {
    PermissionSet::new((0..size).map(|i| {
        if i % 2 == 0 {
            format!("module{}_view", i)
        } else {
            format!("module{}_edit?status={}", i, i % 5)
        }
    }))
}

fn bench_decide(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide");
    let params = RequestParams::from_json(json!({"status": "3", "id": "42"}));

    for size in [10usize, 100, 1000] {
        let set = permission_set(size);
        let last = size - 1;

        let plain = PermissionRequest::parse(&format!("module{}_view,module0_view", last - 1))
            .with_mode(MatchMode::Plain)
            .with_relation(Relation::All);
        group.bench_with_input(BenchmarkId::new("plain_all", size), &set, |b, set| {
            b.iter(|| decide(black_box(set), black_box(&plain), &params))
        });

        let url = PermissionRequest::parse(&format!("module{}_edit", last));
        group.bench_with_input(BenchmarkId::new("url_any", size), &set, |b, set| {
            b.iter(|| decide(black_box(set), black_box(&url), &params))
        });
    }

    group.finish();
}

fn bench_conditions(c: &mut Criterion) {
    let mut group = c.benchmark_group("conditions");
    let mut attributes = HashMap::new();
    attributes.insert("score".to_string(), json!(150));
    attributes.insert("dept".to_string(), json!("finance"));
    let expr = "{score} > 100 and {dept} in ['finance', 'audit']";

    group.bench_function("cold_compile", |b| {
        b.iter(|| {
            let engine = ConditionEngine::new();
            engine.evaluate_expression(black_box(expr), &attributes).unwrap()
        })
    });

    let engine = ConditionEngine::new();
    group.bench_function("cached", |b| {
        b.iter(|| engine.evaluate_expression(black_box(expr), &attributes).unwrap())
    });

    group.finish();
}

fn bench_cached_check(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let authorizer = runtime.block_on(async {
        let store = Arc::new(InMemoryRuleStore::new());
        let mut ids = Vec::new();
        for i in 0..200 {
            store.put_rule(Rule::new(i.to_string(), format!("module{}_view", i))).await;
            ids.push(i.to_string());
        }
        store.put_group(Group::new("staff", ids)).await;
        store.add_member("alice", "staff").await;
        Authorizer::new(AuthConfig::default(), store)
    });
    let identity = StaticIdentity::new(User::new("alice"));

    c.bench_function("authorizer_cached_check", |b| {
        b.to_async(&runtime).iter(|| async {
            let scope = RequestScope::new(&identity);
            authorizer
                .check_string(&scope, black_box("module199_view"), MatchMode::Url, Relation::Any)
                .await
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_decide, bench_conditions, bench_cached_check);
criterion_main!(benches);
