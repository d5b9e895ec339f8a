//! Ferry demo runtime
//!
//! Boots the bridge against the in-process mock host and walks the core
//! paths end to end: global observation, closure export, deferred
//! completion.

use anyhow::Result;
use ferry_bridge::{global, AnyValue, Closure, Deferred};
use ferry_testhost::{HostValue, MockHost};
use std::cell::RefCell;
use std::rc::Rc;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let host = MockHost::install();
    tracing::info!("ferry bridge initialized against mock host");

    // Observe a host value through the facade
    host.set_global("greeting", HostValue::Str("hello from the host".into()));
    let greeting = global("greeting");
    tracing::info!(greeting = greeting.expect_string(), "read host global");

    // Export a guest closure and let the host call it
    let mut doubler = Closure::new(|args| {
        AnyValue::Number(args.first().map(|a| a.expect_number()).unwrap_or(0.0) * 2.0)
    });
    let result = doubler.thunk().call(&[AnyValue::Number(21.0)]);
    tracing::info!(result = result.expect_number(), "host invoked guest closure");

    // Deferred completion through the two-closure executor pattern
    let resolvers = Rc::new(RefCell::new(None));
    let slot = resolvers.clone();
    let mut deferred = Deferred::with_rejector(move |fulfill, _reject| {
        *slot.borrow_mut() = Some(fulfill);
    });
    let mut chained = deferred.then(|value| {
        tracing::info!(?value, "deferred fulfilled");
        value
    });
    chained.finally(|| tracing::info!("deferred settled"));

    let fulfill = resolvers.borrow().clone().expect("executor did not run");
    fulfill.expect_function().call(&[AnyValue::from("ok")]);

    println!(
        "{}",
        serde_json::to_string_pretty(&ferry_bridge::registry_stats())?
    );

    doubler.release();
    drop(chained);
    drop(deferred);
    tracing::info!(live_handles = host.live_handles(), "shutting down");
    Ok(())
}
