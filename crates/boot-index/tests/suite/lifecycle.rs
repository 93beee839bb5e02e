use crate::suite::{labels, uri, write_at, Fixture, HELLO_CONTROLLER, MAIN_CLASS, T0};
use boot_cache::{Position, Range, VoidStore};
use boot_index::{IndexError, ProgressEvent, ScanListener};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn initial_scan_indexes_every_main_source() {
    let fx = Fixture::new();
    let main = write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    let hello = write_at(
        &fx.main_file("com/example/web/HelloController.java"),
        HELLO_CONTROLLER,
        T0,
    );
    let indexer = fx.indexer(fx.disk_store());

    let report = indexer.add_project(fx.project()).join().await.unwrap();
    assert!(!report.from_cache);
    assert_eq!(report.files, 2);
    assert_eq!(report.symbols, 3);
    assert_eq!(fx.counter.count(&uri(&main)), 1);
    assert_eq!(fx.counter.count(&uri(&hello)), 1);

    let symbols = indexer.symbols(&uri(&main));
    assert_eq!(
        labels(&symbols),
        vec!["@+ 'mainClass' (@SpringBootApplication <: @SpringBootConfiguration, @Configuration, @Component) MainClass"]
    );
    assert_eq!(
        symbols[0].location.range,
        Range::new(Position::new(4, 0), Position::new(4, 22))
    );
    assert_eq!(
        labels(&indexer.symbols(&uri(&hello))),
        vec![
            "@+ 'helloController' (@RestController <: @Controller, @Component) HelloController",
            "@/hello -- GET",
        ]
    );

    let stats = indexer.project_stats("demo").unwrap();
    assert!(stats.warm);
    assert_eq!((stats.files, stats.symbols), (2, 3));
}

#[tokio::test]
async fn unchanged_documents_are_not_rescanned() {
    let fx = Fixture::new();
    let main = write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    let indexer = fx.indexer(fx.disk_store());
    indexer.add_project(fx.project()).join().await.unwrap();
    fx.counter.reset();

    let report = indexer.update_document(main.clone()).join().await.unwrap();
    assert_eq!(report.unchanged, vec![main.clone()]);
    assert_eq!(report.scan_count(), 0);
    assert_eq!(fx.counter.total(), 0);
    assert_eq!(indexer.symbols(&uri(&main)).len(), 1);
}

#[tokio::test]
async fn changed_document_is_rescanned_once() {
    let fx = Fixture::new();
    let main = write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    let indexer = fx.indexer(fx.disk_store());
    indexer.add_project(fx.project()).join().await.unwrap();
    fx.counter.reset();

    write_at(
        &main,
        &MAIN_CLASS.replace("@SpringBootApplication", "@SpringBootApplication\n@Profile(\"dev\")"),
        T0 + 1_000,
    );
    let report = indexer.update_document(main.clone()).join().await.unwrap();
    assert_eq!(report.scanned, vec![main.clone()]);
    assert_eq!(fx.counter.count(&uri(&main)), 1);
    assert_eq!(indexer.symbols(&uri(&main)).len(), 2);
}

#[tokio::test]
async fn created_document_joins_the_index() {
    let fx = Fixture::new();
    write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    let indexer = fx.indexer(fx.disk_store());
    indexer.add_project(fx.project()).join().await.unwrap();

    let hello = write_at(
        &fx.main_file("com/example/web/HelloController.java"),
        HELLO_CONTROLLER,
        T0,
    );
    let report = indexer.create_document(hello.clone()).join().await.unwrap();
    assert_eq!(report.scanned, vec![hello.clone()]);
    assert_eq!(indexer.symbols(&uri(&hello)).len(), 2);
    assert_eq!(indexer.project_stats("demo").unwrap().files, 2);
}

#[tokio::test]
async fn deleted_documents_and_folders_drop_their_symbols() {
    let fx = Fixture::new();
    let main = write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    let hello = write_at(
        &fx.main_file("com/example/web/HelloController.java"),
        HELLO_CONTROLLER,
        T0,
    );
    let indexer = fx.indexer(fx.disk_store());
    indexer.add_project(fx.project()).join().await.unwrap();

    std::fs::remove_file(&main).unwrap();
    let report = indexer.delete_document(main.clone()).join().await.unwrap();
    assert_eq!(report.removed, vec![main.clone()]);
    assert!(indexer.symbols(&uri(&main)).is_empty());

    let folder = fx.main_file("com/example/web");
    std::fs::remove_dir_all(&folder).unwrap();
    let report = indexer.delete_document(folder).join().await.unwrap();
    assert_eq!(report.removed, vec![hello.clone()]);
    assert!(indexer.all_symbols("").is_empty());
}

#[tokio::test]
async fn update_of_a_vanished_document_removes_it() {
    let fx = Fixture::new();
    let main = write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    let indexer = fx.indexer(fx.disk_store());
    indexer.add_project(fx.project()).join().await.unwrap();

    std::fs::remove_file(&main).unwrap();
    let report = indexer.update_document(main.clone()).join().await.unwrap();
    assert_eq!(report.removed, vec![main]);
    assert_eq!(indexer.project_stats("demo").unwrap().files, 0);
}

#[tokio::test]
async fn files_outside_projects_are_ignored() {
    let fx = Fixture::new();
    write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    let stray = write_at(&fx.tmp.path().join("elsewhere/Stray.java"), MAIN_CLASS, T0);
    let resource = write_at(&fx.root.join("src/main/resources/App.java"), MAIN_CLASS, T0);
    let indexer = fx.indexer(Arc::new(VoidStore));
    indexer.add_project(fx.project()).join().await.unwrap();
    fx.counter.reset();

    let report = indexer
        .update_documents(vec![stray.clone(), resource.clone()])
        .join()
        .await
        .unwrap();
    assert_eq!(report.ignored, vec![stray, resource]);
    assert_eq!(fx.counter.total(), 0);
}

struct CancelOnFirstScan(CancellationToken);

impl ScanListener for CancelOnFirstScan {
    fn file_scanned(&self, _uri: &str) {
        self.0.cancel();
    }
}

#[tokio::test]
async fn cancelled_full_scan_leaves_the_project_cold() {
    let fx = Fixture::new();
    let main = write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    write_at(
        &fx.main_file("com/example/web/HelloController.java"),
        HELLO_CONTROLLER,
        T0,
    );
    let store = fx.disk_store();
    let indexer = fx.indexer(store.clone());

    let token = CancellationToken::new();
    indexer.set_scan_listener(Some(Arc::new(CancelOnFirstScan(token.clone()))));
    let err = indexer
        .add_project_with_token(fx.project(), token)
        .join()
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::Cancelled));
    assert!(!indexer.project_stats("demo").unwrap().warm);
    assert!(indexer.all_symbols("").is_empty());

    // The next update loads the project from scratch: nothing was committed.
    indexer.set_scan_listener(Some(fx.counter.clone()));
    let report = indexer.update_document(main.clone()).join().await.unwrap();
    assert_eq!(report.loaded.len(), 1);
    assert!(!report.loaded[0].from_cache);
    assert_eq!(report.unchanged, vec![main]);
    assert_eq!(fx.counter.total(), 2);
    assert_eq!(report.scan_count(), 2);
}

#[tokio::test]
async fn removing_a_project_forgets_it() {
    let fx = Fixture::new();
    let main = write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    let store = fx.disk_store();
    let indexer = fx.indexer(store.clone());
    indexer.add_project(fx.project()).join().await.unwrap();

    assert!(indexer.remove_project("demo").join().await.unwrap());
    assert!(!indexer.remove_project("demo").join().await.unwrap());
    assert!(indexer.symbols(&uri(&main)).is_empty());
    assert!(indexer.projects().is_empty());

    let key = fx.project().cache_key(&boot_cache::LocalFs).unwrap();
    assert!(store.retrieve(&key, &[main]).is_none());
}

#[tokio::test]
async fn full_scans_report_progress() {
    let fx = Fixture::new();
    write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    write_at(
        &fx.main_file("com/example/web/HelloController.java"),
        HELLO_CONTROLLER,
        T0,
    );
    let indexer = fx.indexer(Arc::new(VoidStore));
    let mut progress = indexer.subscribe_progress();

    indexer.add_project(fx.project()).join().await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = progress.try_recv() {
        events.push(event);
    }
    assert!(matches!(
        events.first(),
        Some(ProgressEvent::Begin { project, total_files: 2, .. }) if project == "demo"
    ));
    assert!(events.iter().any(|event| matches!(
        event,
        ProgressEvent::Report { percentage: 100, .. }
    )));
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::End { message: Some(message), .. }) if message == "3 symbols in 2 files"
    ));
}

#[tokio::test]
async fn wait_operation_observes_earlier_updates() {
    let fx = Fixture::new();
    let main = write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    let indexer = fx.indexer(Arc::new(VoidStore));

    let add = indexer.add_project(fx.project());
    indexer.wait_operation().join().await.unwrap();
    assert_eq!(indexer.symbols(&uri(&main)).len(), 1);
    add.join().await.unwrap();
}
