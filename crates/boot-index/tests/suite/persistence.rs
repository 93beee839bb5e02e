use crate::suite::{component, labels, touch, uri, write_at, Fixture, HELLO_CONTROLLER, MAIN_CLASS, T0};
use boot_cache::{BeanInfo, LocalFs, OnDiskStore, SymbolStore, TimestampStore};
use std::sync::Arc;

#[tokio::test]
async fn restart_reuses_the_cache_without_scanning() {
    let fx = Fixture::new();
    let main = write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    let hello = write_at(
        &fx.main_file("com/example/web/HelloController.java"),
        HELLO_CONTROLLER,
        T0,
    );
    let before = {
        let indexer = fx.indexer(fx.disk_store());
        indexer.add_project(fx.project()).join().await.unwrap();
        labels(&indexer.all_symbols(""))
    };
    fx.counter.reset();

    let indexer = fx.indexer(fx.disk_store());
    let report = indexer.add_project(fx.project()).join().await.unwrap();
    assert!(report.from_cache);
    assert_eq!(report.symbols, 3);
    assert_eq!(fx.counter.total(), 0);
    assert_eq!(labels(&indexer.all_symbols("")), before);
    assert_eq!(
        indexer.beans_of_document(&uri(&hello)),
        vec![BeanInfo {
            name: "helloController".to_string(),
            bean_type: "com.example.web.HelloController".to_string(),
        }]
    );

    // The restored view carries the stored timestamps, so nothing looks stale.
    let report = indexer.update_document(main).join().await.unwrap();
    assert_eq!(report.scan_count(), 0);
}

#[tokio::test]
async fn change_while_stopped_forces_a_full_scan() {
    let fx = Fixture::new();
    let main = write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    write_at(
        &fx.main_file("com/example/web/HelloController.java"),
        HELLO_CONTROLLER,
        T0,
    );
    fx.indexer(fx.disk_store())
        .add_project(fx.project())
        .join()
        .await
        .unwrap();
    fx.counter.reset();

    touch(&main, T0 + 5_000);
    let indexer = fx.indexer(fx.disk_store());
    let report = indexer.add_project(fx.project()).join().await.unwrap();
    assert!(!report.from_cache);
    assert_eq!(fx.counter.total(), 2);
}

#[tokio::test]
async fn incremental_updates_are_durable() {
    let fx = Fixture::new();
    let main = write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    {
        let indexer = fx.indexer(fx.disk_store());
        indexer.add_project(fx.project()).join().await.unwrap();
        let hello = write_at(
            &fx.main_file("com/example/web/HelloController.java"),
            HELLO_CONTROLLER,
            T0 + 1_000,
        );
        write_at(&main, &component("MainClass", None), T0 + 1_000);
        indexer
            .update_documents(vec![main.clone(), hello])
            .join()
            .await
            .unwrap();
    }
    fx.counter.reset();

    let indexer = fx.indexer(fx.disk_store());
    let report = indexer.add_project(fx.project()).join().await.unwrap();
    assert!(report.from_cache);
    assert_eq!(fx.counter.total(), 0);
    assert_eq!(
        indexer
            .symbols(&uri(&main))
            .into_iter()
            .map(|symbol| symbol.name)
            .collect::<Vec<_>>(),
        vec!["@+ 'mainClass' (@Component) MainClass"]
    );
    assert_eq!(report.symbols, 3);
}

#[tokio::test]
async fn dependencies_survive_a_restart() {
    let fx = Fixture::new();
    let base = write_at(&fx.main_file("com/example/Base.java"), &component("Base", None), T0);
    let derived = write_at(
        &fx.main_file("com/example/Derived.java"),
        &component("Derived", Some("Base")),
        T0,
    );
    fx.indexer(fx.disk_store())
        .add_project(fx.project())
        .join()
        .await
        .unwrap();

    let indexer = fx.indexer(fx.disk_store());
    assert!(indexer.add_project(fx.project()).join().await.unwrap().from_cache);
    touch(&base, T0 + 1_000);
    let report = indexer.update_document(base).join().await.unwrap();
    assert_eq!(report.affected, vec![derived]);
}

#[tokio::test]
async fn classpath_change_starts_a_fresh_index() {
    let fx = Fixture::new();
    write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    let jar = write_at(&fx.root.join("lib/spring-core.jar"), "jar", T0);
    let project = fx.project().with_classpath_entry(&jar);
    let store = Arc::new(OnDiskStore::new(fx.cache_dir(), Arc::new(LocalFs)).unwrap());

    fx.indexer(store.clone())
        .add_project(project.clone())
        .join()
        .await
        .unwrap();
    let first = project.cache_key(&LocalFs).unwrap();

    touch(&jar, T0 + 60_000);
    let second = project.cache_key(&LocalFs).unwrap();
    assert_ne!(first, second);
    assert_eq!(first.primary_identifier(), "demo-java");

    let report = fx
        .indexer(store.clone())
        .add_project(project)
        .join()
        .await
        .unwrap();
    assert!(!report.from_cache);
    let artifacts = store.artifacts().unwrap();
    assert_eq!(artifacts.len(), 1);
    assert!(store.artifact_path(&second).exists());
}

#[tokio::test]
async fn timestamp_store_never_serves_symbols() {
    let fx = Fixture::new();
    write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    let store: Arc<dyn SymbolStore> = Arc::new(TimestampStore::new(Arc::new(LocalFs)));

    fx.indexer(store.clone())
        .add_project(fx.project())
        .join()
        .await
        .unwrap();
    fx.counter.reset();

    let report = fx
        .indexer(store)
        .add_project(fx.project())
        .join()
        .await
        .unwrap();
    assert!(!report.from_cache);
    assert_eq!(fx.counter.total(), 1);
}
