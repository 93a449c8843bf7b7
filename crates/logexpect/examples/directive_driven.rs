//! Directive-driven engines and live tailing.
//!
//! A harness usually drives logexpect through pre-tokenized directives
//! rather than the programmatic API. This example registers a source,
//! arms an engine against records that do not exist yet, feeds the log
//! while the engine runs, and tears the registry down.
//!
//! Run with: `RUST_LOG=logexpect=debug cargo run --example directive_driven`

use std::sync::Arc;

use logexpect::{Registry, Result};
use logtap::{MemLog, Side, Tag, Transaction};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("logexpect Directive Example");
    println!("============================\n");

    let mut registry = Registry::new();
    let log = MemLog::new("v1");
    registry.register_source("v1", Arc::new(log.clone()));

    // The default cursor tails, so the engine can be armed before any
    // record exists.
    println!("1. Arming engine 'l1' against future records...");
    registry
        .apply(&[
            "l1",
            "-v",
            "v1",
            "-q",
            "ReqURL ~ /api",
            "expect 0 * ReqStart\nexpect 4 = RespStatus \"^200$\"",
            "-start",
        ])
        .await?;

    // The system under test produces its records afterwards.
    println!("2. Feeding the log while the engine runs...");
    log.push(
        Transaction::new(2002)
            .record(Tag::ReqStart, Side::Client, "127.0.0.1 40188")
            .record(Tag::ReqUrl, Side::Client, "/api/v1/items")
            .record(Tag::ReqHeader, Side::Client, "Host: example.test")
            .record(Tag::RespStatus, Side::Client, "200"),
    );

    println!("3. Collecting the verdict...");
    registry.apply(&["l1", "-wait"]).await?;
    println!("   Run succeeded\n");

    registry.teardown().await;
    println!("4. Registry torn down");
    Ok(())
}
