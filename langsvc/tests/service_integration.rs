//! Integration tests for the language service boundary.
//!
//! These tests drive the daemon end-to-end through the client, the way a
//! host process would:
//! - Module load/unload lifecycle and reference-counted sharing
//! - Parse → run → describe, with exactly-one-of value/error replies
//! - Diagnostics, range projections, and ranked source fixes
//! - Handle release semantics, staleness, and teardown cleanup
//!
//! Run with: `cargo test --test service_integration`

use std::time::Duration;

use langsvc::config::ServiceConfig;
use langsvc::language::RunContext;
use langsvc::registry::ErrorHandle;
use langsvc::service::{Service, ServiceClient};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const CALC: &str = "lang.calc";
const CALC_WORDS: &str = "lang.calc.words";

// ============================================================================
// Test Helpers
// ============================================================================

/// Spawn a service with default config.
fn spawn_service() -> (ServiceClient, CancellationToken, tokio::task::JoinHandle<()>) {
    Service::spawn(&ServiceConfig::default())
}

/// Parse source that is expected to fail, returning the error handle.
async fn parse_failure(client: &ServiceClient, source: &str) -> ErrorHandle {
    let module = client.load_module(CALC).await.unwrap().unwrap();
    client
        .parse(source, None, module)
        .await
        .unwrap()
        .expect_err("source should fail to parse")
}

// ============================================================================
// Module lifecycle
// ============================================================================

#[tokio::test]
async fn test_load_and_unload_module() {
    let (client, shutdown, _daemon) = spawn_service();

    let module = client.load_module(CALC).await.unwrap();
    let module = module.expect("built-in module should load");
    assert!(client.unload_module(module).await.unwrap());

    shutdown.cancel();
}

#[tokio::test]
async fn test_unknown_identifier_loads_nothing() {
    let (client, shutdown, _daemon) = spawn_service();

    assert!(client.load_module("unknown.lang").await.unwrap().is_none());

    shutdown.cancel();
}

#[tokio::test]
async fn test_shared_loading_is_reference_counted() {
    let (client, shutdown, _daemon) = spawn_service();

    let first = client.load_module(CALC).await.unwrap().unwrap();
    let second = client.load_module(CALC).await.unwrap().unwrap();
    assert_eq!(first, second);

    // One unload releases one reference; the other sharer keeps a live
    // module until its own unload.
    assert!(client.unload_module(first).await.unwrap());
    let program = client.parse("1 + 2", None, second).await.unwrap();
    assert!(program.is_ok());

    assert!(client.unload_module(second).await.unwrap());
    // Module gone now; a second unload reports failure.
    assert!(!client.unload_module(second).await.unwrap());

    shutdown.cancel();
}

#[tokio::test]
async fn test_list_modules_includes_builtins() {
    let (client, shutdown, _daemon) = spawn_service();

    let modules = client.list_modules().await.unwrap();
    let identifiers: Vec<&str> = modules.iter().map(|m| m.identifier.as_str()).collect();
    assert_eq!(identifiers, vec![CALC, CALC_WORDS]);

    shutdown.cancel();
}

// ============================================================================
// Parse, run, describe (Scenario A)
// ============================================================================

#[tokio::test]
async fn test_parse_run_describe_round_trip() {
    let (client, shutdown, _daemon) = spawn_service();

    let module = client.load_module(CALC).await.unwrap().unwrap();
    let program = client.parse("1 + 2", None, module).await.unwrap().unwrap();
    let object = client
        .run(program, RunContext::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        client.describe_object(object).await.unwrap().as_deref(),
        Some("3")
    );

    shutdown.cancel();
}

#[tokio::test]
async fn test_programs_are_rerunnable() {
    let (client, shutdown, _daemon) = spawn_service();

    let module = client.load_module(CALC).await.unwrap().unwrap();
    let program = client.parse("2 * 3", None, module).await.unwrap().unwrap();

    for _ in 0..3 {
        let object = client
            .run(program, RunContext::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            client.describe_object(object).await.unwrap().as_deref(),
            Some("6")
        );
    }

    shutdown.cancel();
}

#[tokio::test]
async fn test_run_context_is_optional() {
    let (client, shutdown, _daemon) = spawn_service();

    let module = client.load_module(CALC).await.unwrap().unwrap();
    let program = client.parse("1 + 2", None, module).await.unwrap().unwrap();

    let context = RunContext {
        script_name: Some("demo".to_string()),
        current_application: None,
    };
    assert!(client.run(program, context).await.unwrap().is_ok());

    shutdown.cancel();
}

#[tokio::test]
async fn test_pretty_print_highlight_and_reformat() {
    let (client, shutdown, _daemon) = spawn_service();

    let calc = client.load_module(CALC).await.unwrap().unwrap();
    let words = client.load_module(CALC_WORDS).await.unwrap().unwrap();
    let program = client
        .parse("1 plus 2", None, calc)
        .await
        .unwrap()
        .unwrap();

    // Pretty print renders the owning module's dialect; reformat renders
    // another module's.
    assert_eq!(
        client.pretty_print(program).await.unwrap().as_deref(),
        Some("1 + 2")
    );
    assert_eq!(
        client.reformat(program, words).await.unwrap().as_deref(),
        Some("1 plus 2")
    );

    let blob = client.highlight(program).await.unwrap().unwrap();
    let spans = langsvc::styled::decode_blob(&blob).unwrap();
    assert_eq!(spans.len(), 3);

    shutdown.cancel();
}

// ============================================================================
// Expressions
// ============================================================================

#[tokio::test]
async fn test_locate_and_describe_expression() {
    let (client, shutdown, _daemon) = spawn_service();

    let module = client.load_module(CALC).await.unwrap().unwrap();
    let program = client.parse("1 + 2", None, module).await.unwrap().unwrap();

    let expression = client
        .locate_expression(4, program)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        client
            .describe_expression_kind(expression)
            .await
            .unwrap()
            .as_deref(),
        Some("number literal")
    );
    assert_eq!(
        client
            .describe_expression_kind_detail(expression)
            .await
            .unwrap()
            .as_deref(),
        Some("the integer literal 2")
    );

    shutdown.cancel();
}

#[tokio::test]
async fn test_locate_expression_out_of_range() {
    let (client, shutdown, _daemon) = spawn_service();

    let module = client.load_module(CALC).await.unwrap().unwrap();
    let program = client.parse("1 + 2", None, module).await.unwrap().unwrap();

    assert!(client
        .locate_expression(99, program)
        .await
        .unwrap()
        .is_none());

    shutdown.cancel();
}

#[tokio::test]
async fn test_expression_survives_program_release() {
    let (client, shutdown, _daemon) = spawn_service();

    let module = client.load_module(CALC).await.unwrap().unwrap();
    let program = client.parse("1 + 2", None, module).await.unwrap().unwrap();
    let expression = client
        .locate_expression(0, program)
        .await
        .unwrap()
        .unwrap();

    // Lazy invalidation: releasing the program leaves the expression handle
    // individually usable and releasable.
    assert!(client.release_program(program).await.unwrap());
    assert_eq!(
        client
            .describe_expression_kind(expression)
            .await
            .unwrap()
            .as_deref(),
        Some("number literal")
    );
    assert!(client.release_expression(expression).await.unwrap());
    assert!(!client.release_expression(expression).await.unwrap());

    shutdown.cancel();
}

// ============================================================================
// Release semantics (Scenario D)
// ============================================================================

#[tokio::test]
async fn test_release_then_use_reports_not_found() {
    let (client, shutdown, _daemon) = spawn_service();

    let module = client.load_module(CALC).await.unwrap().unwrap();
    let program = client.parse("1 + 2", None, module).await.unwrap().unwrap();

    assert!(client.release_program(program).await.unwrap());
    assert!(!client.release_program(program).await.unwrap());

    // Running a released program answers with an error handle, not a fault.
    let error = client
        .run(program, RunContext::default())
        .await
        .unwrap()
        .expect_err("released program must not run");
    let canonical = client.materialize_error(error).await.unwrap().unwrap();
    assert_eq!(canonical.domain, "langsvc.service");
    assert!(!canonical.message.is_empty());

    shutdown.cancel();
}

#[tokio::test]
async fn test_module_unload_with_live_program() {
    let (client, shutdown, _daemon) = spawn_service();

    let module = client.load_module(CALC).await.unwrap().unwrap();
    let program = client.parse("1 + 2", None, module).await.unwrap().unwrap();
    assert!(client.unload_module(module).await.unwrap());

    // Module-dependent operations fail cleanly with absent values...
    assert!(client.pretty_print(program).await.unwrap().is_none());
    assert!(client.highlight(program).await.unwrap().is_none());
    let error = client
        .run(program, RunContext::default())
        .await
        .unwrap()
        .expect_err("run against a dead module must fail");
    let canonical = client.materialize_error(error).await.unwrap().unwrap();
    assert!(canonical.message.contains("unloaded"));

    // ...while parse-tree queries keep working.
    assert!(client
        .locate_expression(0, program)
        .await
        .unwrap()
        .is_some());

    shutdown.cancel();
}

// ============================================================================
// Diagnostics and fixes (Scenarios B and E)
// ============================================================================

#[tokio::test]
async fn test_parse_failure_ranges() {
    let (client, shutdown, _daemon) = spawn_service();
    let source = "1 + ";

    let error = parse_failure(&client, source).await;
    let canonical = client.materialize_error(error).await.unwrap().unwrap();
    assert_eq!(canonical.domain, "langsvc.parse");
    assert!(!canonical.message.is_empty());

    assert_eq!(
        client.character_range(error, source).await.unwrap(),
        Some(4..4)
    );
    assert_eq!(client.line_range(error, source).await.unwrap(), Some(0..1));
    assert_eq!(
        client.column_range(error, source).await.unwrap(),
        Some(4..4)
    );

    shutdown.cancel();
}

#[tokio::test]
async fn test_range_queries_refuse_mismatched_source() {
    let (client, shutdown, _daemon) = spawn_service();

    let error = parse_failure(&client, "1 + ").await;

    // Resupplying different text yields no range, never a fabricated one.
    assert_eq!(client.character_range(error, "2 + ").await.unwrap(), None);
    assert_eq!(client.line_range(error, "2 + ").await.unwrap(), None);
    assert_eq!(client.column_range(error, "2 + ").await.unwrap(), None);

    shutdown.cancel();
}

#[tokio::test]
async fn test_fix_application_and_staleness() {
    let (client, shutdown, _daemon) = spawn_service();
    let source = "1 + ";

    let error = parse_failure(&client, source).await;
    let fixes = client.fixes_for_error(error).await.unwrap();
    assert!(!fixes.is_empty());

    // Best fix first: completing the expression.
    let corrected = client.apply_fix(fixes[0], source).await.unwrap().unwrap();
    assert_eq!(corrected, "1 + 1");

    // Applying is pure...
    assert_eq!(
        client.apply_fix(fixes[0], source).await.unwrap().as_deref(),
        Some("1 + 1")
    );
    // ...and stale against the corrected text.
    assert_eq!(client.apply_fix(fixes[0], &corrected).await.unwrap(), None);

    shutdown.cancel();
}

#[tokio::test]
async fn test_fix_descriptions_align_positionally() {
    let (client, shutdown, _daemon) = spawn_service();
    let source = "1 + ";

    let error = parse_failure(&client, source).await;
    let fixes = client.fixes_for_error(error).await.unwrap();
    let count = fixes.len();

    let contextual = client
        .contextual_fix_descriptions(source, fixes.clone())
        .await
        .unwrap();
    let simple = client
        .simple_fix_descriptions(source, fixes.clone())
        .await
        .unwrap();
    assert_eq!(contextual.len(), count);
    assert_eq!(simple.len(), count);
    assert_eq!(contextual[0], "add '1' after '+'");
    assert_eq!(simple[0], "add '1'");

    // Stale source: descriptions still align 1:1, as empty strings.
    let stale = client
        .simple_fix_descriptions("changed", fixes)
        .await
        .unwrap();
    assert_eq!(stale.len(), count);
    assert!(stale.iter().all(String::is_empty));

    shutdown.cancel();
}

#[tokio::test]
async fn test_error_outlives_program_and_module() {
    let (client, shutdown, _daemon) = spawn_service();
    let source = "1 / 0";

    let module = client.load_module(CALC).await.unwrap().unwrap();
    let program = client.parse(source, None, module).await.unwrap().unwrap();
    let error = client
        .run(program, RunContext::default())
        .await
        .unwrap()
        .unwrap_err();

    assert!(client.release_program(program).await.unwrap());
    assert!(client.unload_module(module).await.unwrap());

    // The diagnostic owns everything it needs.
    let canonical = client.materialize_error(error).await.unwrap().unwrap();
    assert_eq!(canonical.domain, "langsvc.runtime");
    assert!(canonical.message.contains("division by zero"));
    assert_eq!(
        client.character_range(error, source).await.unwrap(),
        Some(4..5)
    );

    assert!(client.release_error(error).await.unwrap());
    assert!(!client.release_error(error).await.unwrap());

    shutdown.cancel();
}

// ============================================================================
// Concurrency and teardown
// ============================================================================

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let (client, shutdown, _daemon) = spawn_service();

    let module = client.load_module(CALC).await.unwrap().unwrap();
    let mut tasks = Vec::new();
    for n in 0..16 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let source = format!("{} + {}", n, n);
            let program = client
                .parse(&source, None, module)
                .await
                .unwrap()
                .unwrap();
            let object = client
                .run(program, RunContext::default())
                .await
                .unwrap()
                .unwrap();
            client.describe_object(object).await.unwrap().unwrap()
        }));
    }

    for (n, task) in tasks.into_iter().enumerate() {
        let description = timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
        assert_eq!(description, (n * 2).to_string());
    }

    shutdown.cancel();
}

#[tokio::test]
async fn test_shutdown_disconnects_clients() {
    let (client, shutdown, daemon) = spawn_service();

    assert!(client.is_connected());
    shutdown.cancel();
    timeout(Duration::from_secs(5), daemon)
        .await
        .expect("daemon should stop promptly")
        .unwrap();

    assert!(!client.is_connected());
    assert!(client.load_module(CALC).await.is_err());
}

#[tokio::test]
async fn test_dropping_all_clients_tears_down() {
    let (client, _shutdown, daemon) = spawn_service();

    let module = client.load_module(CALC).await.unwrap().unwrap();
    let _ = client.parse("1 + 2", None, module).await.unwrap();

    // Severing the channel is the cancellation story: the daemon drains
    // everything it allocated and stops.
    drop(client);
    timeout(Duration::from_secs(5), daemon)
        .await
        .expect("daemon should stop once the channel closes")
        .unwrap();
}
