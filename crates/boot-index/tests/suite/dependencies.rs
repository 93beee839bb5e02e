use crate::suite::{component, touch, uri, write_at, Fixture, T0};

#[tokio::test]
async fn dependents_are_rescanned_transitively() {
    let fx = Fixture::new();
    let base = write_at(&fx.main_file("com/example/Base.java"), &component("Base", None), T0);
    let middle = write_at(
        &fx.main_file("com/example/Middle.java"),
        &component("Middle", Some("Base")),
        T0,
    );
    let leaf = write_at(
        &fx.main_file("com/example/Leaf.java"),
        &component("Leaf", Some("Middle")),
        T0,
    );
    let other = write_at(&fx.main_file("com/example/Other.java"), &component("Other", None), T0);
    let indexer = fx.indexer(fx.disk_store());
    indexer.add_project(fx.project()).join().await.unwrap();
    fx.counter.reset();

    touch(&base, T0 + 1_000);
    let report = indexer.update_document(base.clone()).join().await.unwrap();

    assert_eq!(report.scanned, vec![base.clone()]);
    assert_eq!(report.affected, vec![middle.clone(), leaf.clone()]);
    for file in [&base, &middle, &leaf] {
        assert_eq!(fx.counter.count(&uri(file)), 1, "{}", file.display());
    }
    assert_eq!(fx.counter.count(&uri(&other)), 0);
}

#[tokio::test]
async fn files_in_the_batch_are_scanned_once() {
    let fx = Fixture::new();
    let base = write_at(&fx.main_file("com/example/Base.java"), &component("Base", None), T0);
    let derived = write_at(
        &fx.main_file("com/example/Derived.java"),
        &component("Derived", Some("Base")),
        T0,
    );
    let indexer = fx.indexer(fx.disk_store());
    indexer.add_project(fx.project()).join().await.unwrap();
    fx.counter.reset();

    touch(&base, T0 + 1_000);
    touch(&derived, T0 + 1_000);
    let report = indexer
        .update_documents(vec![base.clone(), derived.clone()])
        .join()
        .await
        .unwrap();

    assert_eq!(report.scanned, vec![base, derived]);
    assert!(report.affected.is_empty());
    assert_eq!(fx.counter.total(), 2);
}

#[tokio::test]
async fn dropped_supertype_is_no_longer_a_dependency() {
    let fx = Fixture::new();
    let base = write_at(&fx.main_file("com/example/Base.java"), &component("Base", None), T0);
    let derived = write_at(
        &fx.main_file("com/example/Derived.java"),
        &component("Derived", Some("Base")),
        T0,
    );
    let indexer = fx.indexer(fx.disk_store());
    indexer.add_project(fx.project()).join().await.unwrap();

    write_at(&derived, &component("Derived", None), T0 + 1_000);
    indexer.update_document(derived.clone()).join().await.unwrap();
    fx.counter.reset();

    touch(&base, T0 + 2_000);
    let report = indexer.update_document(base.clone()).join().await.unwrap();
    assert!(report.affected.is_empty());
    assert_eq!(fx.counter.count(&uri(&derived)), 0);
}
