//! Basic expectation matching against an in-memory log.
//!
//! This example compiles a small expectation block, replays a canned
//! record stream through it, and shows what a match failure reports.
//!
//! Run with: `RUST_LOG=logexpect=debug cargo run --example basic_matching`

use std::sync::Arc;

use logexpect::{LogExpect, Result};
use logtap::{Direction, MemLog, Side, Tag, Transaction};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("logexpect Basic Matching Example");
    println!("=================================\n");

    // Example 1: a request transaction matched in order
    println!("1. Matching a request transaction...");

    let log = MemLog::new("v1");
    log.push(
        Transaction::new(1001)
            .record(Tag::ReqStart, Side::Client, "127.0.0.1 56842")
            .record(Tag::ReqMethod, Side::Client, "GET")
            .record(Tag::ReqUrl, Side::Client, "/api/v1/items")
            .record(Tag::RespStatus, Side::Client, "200")
            .record(Tag::ReqEnd, Side::Client, ""),
    );

    let mut engine = LogExpect::new("l1");
    engine.set_source(Arc::new(log.clone())).await?;
    engine.set_direction(Direction::FromStart).await?;
    engine
        .spec(
            "expect 0 * ReqStart\n\
             expect 2 = ReqURL \"^/api/\"\n\
             expect * = ReqEnd",
        )
        .await?;
    engine.run().await?;
    println!("   All expectations matched\n");

    // Example 2: what a failure looks like
    println!("2. A failing expectation...");

    engine.spec("expect 0 * RespStatus \"^5..\"").await?;
    match engine.run().await {
        Ok(()) => println!("   (unexpected success)"),
        Err(err) => println!("   Failed as expected: {err}"),
    }

    Ok(())
}
