use crate::suite::{labels, uri, write_at, Fixture, HELLO_CONTROLLER, MAIN_CLASS, T0};
use boot_cache::{AddOn, LocalFs, RequestMappingInfo, VoidStore};
use boot_index::{Indexer, IndexerOptions, JavaAnnotationScanner};
use std::sync::Arc;

const GREETING_CONTROLLER: &str = "package com.example.web;

import org.springframework.web.bind.annotation.*;

@RestController
@RequestMapping(\"/greeting\")
public class GreetingController {

\t@GetMapping
\tpublic String greet() { return \"hi\"; }

\t@PostMapping(\"/{id}\")
\tpublic void update(@PathVariable String id) {}
}
";

async fn indexed(fx: &Fixture, max_query_results: Option<usize>) -> Indexer {
    write_at(&fx.main_file("com/example/MainClass.java"), MAIN_CLASS, T0);
    write_at(
        &fx.main_file("com/example/web/HelloController.java"),
        HELLO_CONTROLLER,
        T0,
    );
    write_at(
        &fx.main_file("com/example/web/GreetingController.java"),
        GREETING_CONTROLLER,
        T0,
    );
    let indexer = Indexer::new(
        Arc::new(VoidStore),
        Arc::new(LocalFs),
        Arc::new(JavaAnnotationScanner::new()),
        IndexerOptions {
            max_query_results,
            ..IndexerOptions::default()
        },
    )
    .unwrap();
    indexer.add_project(fx.project()).join().await.unwrap();
    indexer
}

#[tokio::test]
async fn text_queries_match_case_insensitively() {
    let fx = Fixture::new();
    let indexer = indexed(&fx, None).await;

    assert_eq!(
        labels(&indexer.all_symbols("HELLO")),
        vec![
            "@+ 'helloController' (@RestController <: @Controller, @Component) HelloController",
            "@/hello -- GET",
        ]
    );
    assert_eq!(
        labels(&indexer.all_symbols("@/greeting")),
        vec!["@/greeting -- GET", "@/greeting/{id} -- POST"]
    );
    assert!(indexer.all_symbols("no such symbol").is_empty());
}

#[tokio::test]
async fn location_prefix_restricts_by_uri() {
    let fx = Fixture::new();
    let indexer = indexed(&fx, None).await;
    let web = uri(&fx.main_file("com/example/web"));

    let in_web = indexer.all_symbols(&format!("locationPrefix:{web}/?"));
    assert_eq!(in_web.len(), 5);
    assert!(in_web.iter().all(|symbol| symbol.location.uri.starts_with(&web)));

    let beans_in_web = indexer.all_symbols(&format!("locationPrefix:{web}/?@+"));
    assert_eq!(beans_in_web.len(), 2);
}

#[tokio::test]
async fn configured_limit_applies_unless_lifted() {
    let fx = Fixture::new();
    let indexer = indexed(&fx, Some(2)).await;

    assert_eq!(indexer.all_symbols("@").len(), 2);
    assert_eq!(indexer.all_symbols("*@").len(), 6);
    assert_eq!(indexer.all_symbols("").len(), 6);
}

#[tokio::test]
async fn add_ons_are_served_per_document_and_globally() {
    let fx = Fixture::new();
    let indexer = indexed(&fx, None).await;
    let greeting = uri(&fx.main_file("com/example/web/GreetingController.java"));

    let beans = indexer.beans_of_document(&greeting);
    assert_eq!(beans.len(), 1);
    assert_eq!(beans[0].name, "greetingController");
    assert_eq!(beans[0].bean_type, "com.example.web.GreetingController");

    let mappings = indexer.all_add_ons(|add_on| matches!(add_on, AddOn::RequestMapping(_)));
    assert_eq!(mappings.len(), 3);
    assert!(mappings.contains(&AddOn::RequestMapping(RequestMappingInfo {
        path: "/greeting/{id}".to_string(),
        methods: vec!["POST".to_string()],
    })));

    assert_eq!(indexer.all_add_ons(|add_on| add_on.as_bean().is_some()).len(), 3);
    assert_eq!(indexer.add_ons(&greeting).len(), 3);
}

#[tokio::test]
async fn unknown_documents_have_no_symbols() {
    let fx = Fixture::new();
    let indexer = indexed(&fx, None).await;

    assert!(indexer.symbols("untitled:Scratch.java").is_empty());
    assert!(indexer
        .symbols(&uri(&fx.tmp.path().join("Nowhere.java")))
        .is_empty());
    assert!(indexer.add_ons("not a uri").is_empty());
}
