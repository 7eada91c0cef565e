//! Integration tests for ferry-links

use chrono::{Duration, Utc};
use ferry_links::*;
use std::collections::HashSet;
use std::sync::Arc;

#[test]
fn test_half_hour_then_ninety_minutes() {
    let registry = LinkRegistry::new();
    let now = Utc::now();
    let link = registry
        .create_link_at("https://x/y?sig=1", "report.pdf", now + Duration::hours(1), now)
        .unwrap();

    let resolved = registry
        .resolve_at(&link.token, now + Duration::minutes(30))
        .unwrap();
    assert_eq!(
        resolved,
        ResolvedLink {
            long_url: "https://x/y?sig=1".into(),
            file_name: "report.pdf".into(),
        }
    );

    assert!(registry.resolve_at(&link.token, now + Duration::minutes(90)).is_none());
    assert!(registry.resolve_at(&link.token, now + Duration::minutes(90)).is_none());
    assert!(registry.is_empty());
}

#[test]
fn test_concurrent_creation_has_no_collisions() {
    let registry = Arc::new(LinkRegistry::new());
    let expiration = Utc::now() + Duration::hours(1);

    let handles: Vec<_> = (0..16)
        .map(|worker| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                (0..625)
                    .map(|i| {
                        registry
                            .create_link("https://x/y", format!("{worker}-{i}.bin"), expiration)
                            .unwrap()
                            .token
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut tokens = HashSet::new();
    for handle in handles {
        for token in handle.join().unwrap() {
            assert!(tokens.insert(token));
        }
    }
    assert_eq!(tokens.len(), 10_000);
    assert_eq!(registry.len(), 10_000);
}

#[tokio::test]
async fn test_concurrent_creation_across_tasks() {
    let registry = Arc::new(LinkRegistry::new());
    let expiration = Utc::now() + Duration::hours(1);

    let mut tasks = Vec::new();
    for i in 0..10_000 {
        let registry = Arc::clone(&registry);
        tasks.push(tokio::spawn(async move {
            registry
                .create_link("https://x/y", format!("{i}.txt"), expiration)
                .unwrap()
                .token
        }));
    }

    let mut tokens = HashSet::new();
    for task in tasks {
        tokens.insert(task.await.unwrap());
    }
    assert_eq!(tokens.len(), 10_000);
}

#[test]
fn test_sweep_all_expired_and_noop() {
    let registry = LinkRegistry::new();
    let now = Utc::now();
    for i in 0..50 {
        registry
            .create_link_at("https://x", format!("{i}"), now + Duration::minutes(i + 1), now)
            .unwrap();
    }

    assert_eq!(registry.sweep_at(now), 0);
    assert_eq!(registry.len(), 50);

    assert_eq!(registry.sweep_at(now + Duration::hours(2)), 50);
    assert!(registry.is_empty());
    assert_eq!(registry.sweep_at(now + Duration::hours(2)), 0);
}

#[test]
fn test_short_link_serializes() {
    let registry = LinkRegistry::new();
    let link = registry
        .create_link("https://x", "a b.txt", Utc::now() + Duration::minutes(5))
        .unwrap();
    let value = serde_json::to_value(&link).unwrap();
    assert_eq!(value["compositeId"], format!("{}/a%20b.txt", link.token));
    assert_eq!(value["fileName"], "a b.txt");
}
