//! Minimal weft example — a three-stage chain run against an in-memory writer.
//!
//! One native wrap (timing), one legacy middleware lifted in with `bridge`,
//! and a terminal handler that reads a value from the chain's context.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::HeaderValue;
use weft::{
    bridge, BoxFuture, BoxedHandler, BoxedPlainHandler, Chain, Context, Handler, PlainHandler,
    Recorder, Request, ResponseWriter,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // One chain per route, built once at setup time.
    let cx = Context::background().with_value(RouteName("demo"));
    let chain = Chain::new(cx)
        .append(timed)
        .append(bridge(legacy_server_header));

    let handler = chain.end(Some(Arc::new(Hello))).expect("handler supplied");

    // The host framework would invoke this per request; here we do it by hand
    // against the in-memory recorder.
    let req = http::Request::builder()
        .uri("/hello")
        .body(Bytes::new())
        .expect("valid request");
    let mut rec = Recorder::new();
    handler.serve(&mut rec, &req).await;

    println!("status: {}", rec.status());
    for (name, value) in rec.headers() {
        println!("header: {name}: {}", value.to_str().unwrap_or("<opaque>"));
    }
    println!("body:   {}", String::from_utf8_lossy(rec.body()));
}

struct RouteName(&'static str);

// Terminal handler — reads the route name out of the chain's context.
struct Hello;

impl Handler for Hello {
    fn serve<'a>(
        &'a self,
        cx: Context,
        w: &'a mut dyn ResponseWriter,
        _req: &'a Request,
    ) -> BoxFuture<'a> {
        Box::pin(async move {
            let route = cx.value::<RouteName>().map_or("unknown", |r| r.0);
            w.write(format!("hello from {route}\n").as_bytes());
        })
    }
}

// Context-aware wrap — logs how long everything inside it took.
struct Timed(BoxedHandler);

fn timed(next: BoxedHandler) -> BoxedHandler {
    Arc::new(Timed(next))
}

impl Handler for Timed {
    fn serve<'a>(
        &'a self,
        cx: Context,
        w: &'a mut dyn ResponseWriter,
        req: &'a Request,
    ) -> BoxFuture<'a> {
        Box::pin(async move {
            let started = Instant::now();
            self.0.serve(cx, w, req).await;
            tracing::info!(elapsed = ?started.elapsed(), "request served");
        })
    }
}

// Legacy middleware — plain handler shape, no context anywhere in sight.
// `bridge` lets it sit in the chain anyway.
struct ServerHeader(BoxedPlainHandler);

fn legacy_server_header(next: BoxedPlainHandler) -> BoxedPlainHandler {
    Arc::new(ServerHeader(next))
}

impl PlainHandler for ServerHeader {
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move {
            w.headers_mut()
                .insert("server", HeaderValue::from_static("weft-demo"));
            self.0.serve(w, req).await;
        })
    }
}
