use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::HeaderValue;
use weft::{
    get_phfc, init_phfc, BoxFuture, BoxedHandler, Chain, Context, Handler, Recorder, Request,
    ResponseWriter,
};

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn request() -> Request {
    http::Request::builder().uri("/").body(Bytes::new()).unwrap()
}

// Terminal handler: records the call and writes a fixed body.
struct Terminal {
    log: Log,
    body: &'static str,
}

impl Handler for Terminal {
    fn serve<'a>(
        &'a self,
        _cx: Context,
        w: &'a mut dyn ResponseWriter,
        _req: &'a Request,
    ) -> BoxFuture<'a> {
        Box::pin(async move {
            self.log.lock().unwrap().push("handler".to_owned());
            w.write(self.body.as_bytes());
        })
    }
}

fn terminal(log: &Log, body: &'static str) -> Option<BoxedHandler> {
    Some(Arc::new(Terminal { log: Arc::clone(log), body }))
}

// Wrap whose produced handler records entry and exit around the next stage.
struct Recording {
    name: &'static str,
    log: Log,
    next: BoxedHandler,
}

impl Handler for Recording {
    fn serve<'a>(
        &'a self,
        cx: Context,
        w: &'a mut dyn ResponseWriter,
        req: &'a Request,
    ) -> BoxFuture<'a> {
        Box::pin(async move {
            self.log.lock().unwrap().push(format!("{}:enter", self.name));
            self.next.serve(cx, w, req).await;
            self.log.lock().unwrap().push(format!("{}:exit", self.name));
        })
    }
}

fn recording(
    name: &'static str,
    log: &Log,
) -> impl Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |next| {
        let wrapped: BoxedHandler = Arc::new(Recording { name, log: Arc::clone(&log), next });
        wrapped
    }
}

// Wrap whose produced handler sets one header before calling the next stage.
struct AddHeader {
    name: &'static str,
    value: &'static str,
    log: Log,
    next: BoxedHandler,
}

impl Handler for AddHeader {
    fn serve<'a>(
        &'a self,
        cx: Context,
        w: &'a mut dyn ResponseWriter,
        req: &'a Request,
    ) -> BoxFuture<'a> {
        Box::pin(async move {
            self.log.lock().unwrap().push(format!("set:{}", self.name));
            w.headers_mut().insert(self.name, HeaderValue::from_static(self.value));
            self.next.serve(cx, w, req).await;
        })
    }
}

fn add_header(
    name: &'static str,
    value: &'static str,
    log: &Log,
) -> impl Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |next| {
        let wrapped: BoxedHandler =
            Arc::new(AddHeader { name, value, log: Arc::clone(&log), next });
        wrapped
    }
}

#[tokio::test]
async fn first_appended_wrap_runs_outermost() {
    let log = new_log();
    let chain = Chain::new(Context::background())
        .append(recording("w0", &log))
        .append(recording("w1", &log))
        .append(recording("w2", &log));

    let handler = chain.end(terminal(&log, "ok")).expect("handler supplied");
    let mut rec = Recorder::new();
    handler.serve(&mut rec, &request()).await;

    assert_eq!(
        entries(&log),
        [
            "w0:enter", "w1:enter", "w2:enter", "handler", "w2:exit", "w1:exit", "w0:exit",
        ]
    );
}

#[tokio::test]
async fn append_leaves_earlier_chains_untouched() {
    let log = new_log();
    let base = Chain::new(Context::background()).append(recording("w0", &log));
    let extended = base.append(recording("wx", &log));

    let from_base = base.end(terminal(&log, "ok")).expect("handler supplied");
    let mut rec = Recorder::new();
    from_base.serve(&mut rec, &request()).await;

    assert_eq!(entries(&log), ["w0:enter", "handler", "w0:exit"]);

    log.lock().unwrap().clear();
    let from_extended = extended.end(terminal(&log, "ok")).expect("handler supplied");
    let mut rec = Recorder::new();
    from_extended.serve(&mut rec, &request()).await;

    assert_eq!(
        entries(&log),
        ["w0:enter", "wx:enter", "handler", "wx:exit", "w0:exit"]
    );
}

#[tokio::test]
async fn end_without_a_handler_is_none() {
    let log = new_log();
    let chain = Chain::new(Context::background())
        .append(recording("w0", &log))
        .append(recording("w1", &log));

    assert!(chain.end(None).is_none());
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn end_fn_without_a_handler_is_none() {
    let chain = Chain::new(Context::background());

    let absent: Option<
        for<'a> fn(Context, &'a mut dyn ResponseWriter, &'a Request) -> BoxFuture<'a>,
    > = None;
    assert!(chain.end_fn(absent).is_none());
}

#[tokio::test]
async fn headers_land_in_declaration_order_before_the_body() {
    let log = new_log();
    let chain = Chain::new(Context::background())
        .append(add_header("x-first", "1", &log))
        .append(add_header("x-second", "2", &log));

    let handler = chain.end(terminal(&log, "ok")).expect("handler supplied");
    let mut rec = Recorder::new();
    handler.serve(&mut rec, &request()).await;

    assert_eq!(entries(&log), ["set:x-first", "set:x-second", "handler"]);
    assert_eq!(rec.headers().get("x-first").unwrap(), "1");
    assert_eq!(rec.headers().get("x-second").unwrap(), "2");
    assert_eq!(rec.body(), b"ok");
}

#[tokio::test]
async fn one_finalized_handler_serves_concurrent_requests() {
    let log = new_log();
    let chain = Chain::new(Context::background()).append(recording("w0", &log));
    let handler = chain.end(terminal(&log, "ok")).expect("handler supplied");

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let handler = Arc::clone(&handler);
        tasks.push(tokio::spawn(async move {
            let mut rec = Recorder::new();
            handler.serve(&mut rec, &request()).await;
            rec.into_body()
        }));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap(), Bytes::from_static(b"ok"));
    }
}

// ── Post-handler context slot, through a real chain ───────────────────────────

struct Route(&'static str);

// Outer wrap: installs the slot on the way in, reads it on the way out.
struct SlotInstall {
    log: Log,
    next: BoxedHandler,
}

impl Handler for SlotInstall {
    fn serve<'a>(
        &'a self,
        cx: Context,
        w: &'a mut dyn ResponseWriter,
        req: &'a Request,
    ) -> BoxFuture<'a> {
        Box::pin(async move {
            let cx = init_phfc(&cx);
            self.next.serve(cx.clone(), w, req).await;

            let seen = get_phfc(&cx).expect("slot installed above").get();
            let route = seen.value::<Route>().map_or("<none>", |r| r.0);
            self.log.lock().unwrap().push(format!("post:{route}"));
        })
    }
}

// Inner handler: derives a child context and publishes it through the slot.
struct SlotPublish;

impl Handler for SlotPublish {
    fn serve<'a>(
        &'a self,
        cx: Context,
        w: &'a mut dyn ResponseWriter,
        _req: &'a Request,
    ) -> BoxFuture<'a> {
        Box::pin(async move {
            let derived = cx.with_value(Route("/login"));
            if let Some(cell) = get_phfc(&derived) {
                cell.set(derived.clone());
            }
            w.write(b"ok");
        })
    }
}

#[tokio::test]
async fn outer_wrap_observes_context_established_by_the_inner_handler() {
    let log = new_log();
    let slot_log = Arc::clone(&log);
    let chain = Chain::new(Context::background()).append(move |next| {
        let wrapped: BoxedHandler =
            Arc::new(SlotInstall { log: Arc::clone(&slot_log), next });
        wrapped
    });

    let handler = chain
        .end(Some(Arc::new(SlotPublish)))
        .expect("handler supplied");
    let mut rec = Recorder::new();
    handler.serve(&mut rec, &request()).await;

    assert_eq!(entries(&log), ["post:/login"]);
    assert_eq!(rec.body(), b"ok");
}
