//! Deferred finalisation: whole-tree retries and batched assertions.
#![allow(
    unfulfilled_lint_expectations,
    reason = "clippy::expect_used is denied globally; tests may not hit those branches"
)]
#![expect(
    clippy::expect_used,
    reason = "tests panic to surface composition mistakes"
)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use docweave::{
    Composer, Deferred, Element, Node, RelationEntry, RelationTable, Scheduler, Scope, Suspended,
    WeaveError, deferred,
};
use docweave::path::DotPath;
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn table() -> RelationTable {
    RelationTable::builder()
        .relation(RelationEntry::new("Container", "Pod", DotPath::keys(["containers"])).array())
        .build()
        .expect("table builds")
}

/// Pod whose container image is only known once `image` resolves.
fn pod_awaiting(image: Deferred<String>, renders: Arc<AtomicUsize>) -> Node {
    Element::new("Pod")
        .prop("name", "web")
        .child(Node::from_fn("image", move |scope: &mut Scope<'_>| {
            renders.fetch_add(1, Ordering::SeqCst);
            let tag = scope.read(&image)?;
            Ok(Element::new("Container").prop("image", tag).into())
        }))
        .into()
}

#[rstest]
#[tokio::test]
async fn settles_after_deferred_value_resolves(table: RelationTable) -> Result<()> {
    let (resolver, image) = deferred::<String>("image");
    let renders = Arc::new(AtomicUsize::new(0));
    let tree = Node::root([pod_awaiting(image, Arc::clone(&renders))]);

    let pass = Composer::new(&table).pass(&tree)?;
    assert!(!pass.is_settled());
    assert_eq!(pass.pending_labels(), vec!["image"]);

    let resolve = async move {
        tokio::task::yield_now().await;
        resolver.resolve(String::from("nginx:1.14"));
    };
    let scheduler = Scheduler::new(&table);
    let (documents, ()) = tokio::join!(scheduler.settle(&tree), resolve);
    assert_eq!(
        documents?,
        vec![json!({"name": "web", "containers": [{"image": "nginx:1.14"}]})]
    );
    // One probing pass above, a suspended pass and the settled rerun.
    assert_eq!(renders.load(Ordering::SeqCst), 3);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn already_resolved_values_settle_in_one_pass(table: RelationTable) -> Result<()> {
    let (resolver, image) = deferred::<String>("image");
    resolver.resolve(String::from("redis"));
    let renders = Arc::new(AtomicUsize::new(0));
    let tree = Node::root([pod_awaiting(image, Arc::clone(&renders))]);
    let documents = Scheduler::new(&table).settle(&tree).await?;
    assert_eq!(documents[0]["containers"][0]["image"], json!("redis"));
    assert_eq!(renders.load(Ordering::SeqCst), 1);
    Ok(())
}

#[rstest]
fn single_pass_composition_rejects_pending_nodes(table: RelationTable) {
    let (_resolver, image) = deferred::<String>("image");
    let tree = Node::root([pod_awaiting(image, Arc::new(AtomicUsize::new(0)))]);
    let err = Composer::new(&table).compose(&tree).expect_err("unsettled");
    assert!(matches!(*err, WeaveError::Unsettled { pending: 1 }), "{err}");
}

#[rstest]
#[tokio::test]
async fn dropped_resolver_fails_the_composition(table: RelationTable) {
    let (resolver, image) = deferred::<String>("image");
    drop(resolver);
    let tree = Node::root([pod_awaiting(image, Arc::new(AtomicUsize::new(0)))]);
    let err = Scheduler::new(&table).settle(&tree).await.expect_err("abandoned");
    assert!(
        matches!(&*err, WeaveError::ResolverDropped { label } if label == "image"),
        "{err}"
    );
}

#[rstest]
#[tokio::test]
async fn suspension_without_a_handle_is_unsettled(table: RelationTable) {
    let tree = Node::root([Node::from_fn("stuck", |_scope: &mut Scope<'_>| Err(Suspended))]);
    let err = Scheduler::new(&table).settle(&tree).await.expect_err("unsettled");
    assert!(matches!(*err, WeaveError::Unsettled { pending: 1 }), "{err}");
}

fn asserting(name: &'static str, holds: bool) -> Node {
    Node::from_fn(name, move |scope: &mut Scope<'_>| {
        scope.defer_assert(format!("{name} must hold"), move || holds);
        Ok(Element::new("Pod").prop("name", name).into())
    })
}

#[rstest]
#[tokio::test]
async fn every_failing_assertion_is_reported_together(table: RelationTable) {
    let tree = Node::root([
        asserting("first", false),
        asserting("second", true),
        asserting("third", false),
    ]);
    let err = Scheduler::new(&table).settle(&tree).await.expect_err("assertions fail");
    let WeaveError::Assertions(failures) = &*err else {
        panic!("expected assertions, got {err}");
    };
    assert_eq!(failures.len(), 2);
    let messages: Vec<String> = failures.iter().map(ToString::to_string).collect();
    assert_eq!(messages, vec!["first: first must hold", "third: third must hold"]);
}

#[rstest]
#[tokio::test]
async fn assertions_are_checked_only_on_the_settled_pass(table: RelationTable) -> Result<()> {
    let (resolver, ready) = deferred::<bool>("ready");
    let checks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&checks);
    let tree = Node::root([Node::from_fn("gate", move |scope: &mut Scope<'_>| {
        let counted = Arc::clone(&counter);
        scope.defer_assert("gate checked", move || {
            counted.fetch_add(1, Ordering::SeqCst);
            true
        });
        let open = scope.read(&ready)?;
        Ok(Element::new("Pod").prop("open", open).into())
    })]);

    let resolve = async move {
        tokio::task::yield_now().await;
        resolver.resolve(true);
    };
    let scheduler = Scheduler::new(&table);
    let (documents, ()) = tokio::join!(scheduler.settle(&tree), resolve);
    assert_eq!(documents?, vec![json!({"open": true})]);
    assert_eq!(checks.load(Ordering::SeqCst), 1);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn fatal_errors_win_over_assertions(table: RelationTable) {
    let tree = Node::root([
        asserting("first", false),
        Element::new("Pod").child(Element::new("Pod")).into(),
    ]);
    let err = Scheduler::new(&table).settle(&tree).await.expect_err("fails");
    assert!(matches!(*err, WeaveError::NotFound { .. }), "{err}");
}
