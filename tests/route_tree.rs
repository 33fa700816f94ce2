//! Route tree integration tests: planting, resolution, surgery and the
//! load cache working against a real content directory.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::Method;

use arbor::handler::{handler_fn, CacheDirective, Context, HandlerRegistry};
use arbor::route::Target;
use arbor::server::Arbor;

use common::{test_config, TempTree};

fn arbor_for(tree: &TempTree, registry: HandlerRegistry) -> Arbor {
    Arbor::new(test_config(&tree.base), registry).unwrap()
}

#[tokio::test]
async fn index_serves_directory_requests() {
    let tree = TempTree::new();
    tree.write("www/index.html", "<h1>home</h1>");
    tree.write("www/about.html", "<p>about</p>");
    let arbor = arbor_for(&tree, HandlerRegistry::default());

    let root = arbor.resolve("www/", &Method::GET).await.unwrap();
    assert!(root.is_found());
    assert!(root.has_index);
    assert_eq!(root.raw_path, "www/index.html");

    let about = arbor.resolve("www/about", &Method::GET).await.unwrap();
    assert!(about.is_found());
    assert_eq!(about.raw_path, "www/about.html");
    // Markup pages are static content, never handlers.
    assert!(matches!(about.target, Some(Target::Static(_))));
}

#[tokio::test]
async fn literal_segment_beats_pattern() {
    let tree = TempTree::new();
    tree.write("www/shop/item.njs", "item");
    tree.write("www/shop/{id}.njs", "by id");
    let arbor = arbor_for(&tree, HandlerRegistry::default());

    let literal = arbor.resolve("www/shop/item", &Method::GET).await.unwrap();
    assert_eq!(literal.raw_path, "www/shop/item.njs");
    assert!(literal.params.is_empty());

    let pattern = arbor.resolve("www/shop/42", &Method::GET).await.unwrap();
    assert_eq!(pattern.raw_path, "www/shop/{id}.njs");
    assert_eq!(pattern.params["id"], "42");
}

#[tokio::test]
async fn pattern_file_replaces_same_key_pattern_directory() {
    let tree = TempTree::new();
    tree.write("www/p/{id}/index.html", "<p>dir</p>");
    let arbor = arbor_for(&tree, HandlerRegistry::default());

    tree.write("www/p/{id}.njs", "handler");
    arbor.replant("www/p/{id}.njs").await.unwrap();

    let hit = arbor.resolve("www/p/42", &Method::GET).await.unwrap();
    assert_eq!(hit.raw_path, "www/p/{id}.njs");
    assert!(matches!(hit.target, Some(Target::Handler(_))));
}

#[tokio::test]
async fn method_list_beats_catch_all() {
    let tree = TempTree::new();
    tree.write("www/api/GET.njs", "get");
    tree.write("www/api/ALL.njs", "all");
    let arbor = arbor_for(&tree, HandlerRegistry::default());

    let get = arbor.resolve("www/api", &Method::GET).await.unwrap();
    assert_eq!(get.raw_path, "www/api/GET.njs");

    let post = arbor.resolve("www/api", &Method::POST).await.unwrap();
    assert_eq!(post.raw_path, "www/api/ALL.njs");
}

#[tokio::test]
async fn unlisted_method_is_rejected_with_allowed_set() {
    let tree = TempTree::new();
    tree.write("www/api/GET,POST.njs", "rw");
    let arbor = arbor_for(&tree, HandlerRegistry::default());

    let del = arbor.resolve("www/api", &Method::DELETE).await.unwrap();
    assert!(!del.is_found());
    assert!(del.method_not_allowed);
    assert_eq!(del.allowed_methods, vec![Method::GET, Method::POST]);
}

#[tokio::test]
async fn dispatch_token_addressing_follows_the_table() {
    let tree = TempTree::new();
    tree.write("www/api/GET.njs", "get");
    let arbor = arbor_for(&tree, HandlerRegistry::default());

    let satisfied = arbor.resolve("www/api/GET", &Method::GET).await.unwrap();
    assert!(satisfied.is_found());

    let denied = arbor.resolve("www/api/GET", &Method::POST).await.unwrap();
    assert!(!denied.is_found());
    assert!(denied.forbidden);
    assert_eq!(denied.allowed_methods, vec![Method::GET]);
}

#[tokio::test]
async fn non_page_files_resolve_as_static() {
    let tree = TempTree::new();
    tree.write("www/logo.svg", "<svg/>");
    let arbor = arbor_for(&tree, HandlerRegistry::default());

    let logo = arbor.resolve("www/logo.svg", &Method::GET).await.unwrap();
    assert!(matches!(logo.target, Some(Target::Static(_))));
}

#[tokio::test]
async fn limb_then_replant_restores_resolution() {
    let tree = TempTree::new();
    tree.write("www/a/b.njs", "leaf");
    let arbor = arbor_for(&tree, HandlerRegistry::default());

    let before = arbor.resolve("www/a/b", &Method::GET).await.unwrap();
    assert_eq!(before.raw_path, "www/a/b.njs");

    arbor.limb("www/a/b.njs").await.unwrap();
    let gone = arbor.resolve("www/a/b", &Method::GET).await.unwrap();
    assert!(!gone.is_found());

    arbor.replant("www/a/b.njs").await.unwrap();
    let back = arbor.resolve("www/a/b", &Method::GET).await.unwrap();
    assert!(back.is_found());
    assert_eq!(back.raw_path, "www/a/b.njs");
    assert!(matches!(back.target, Some(Target::Handler(_))));
}

#[tokio::test]
async fn limbing_a_leaf_prunes_emptied_directories() {
    let tree = TempTree::new();
    tree.write("www/deep/er/leaf.njs", "leaf");
    tree.write("www/other.html", "kept");
    let arbor = arbor_for(&tree, HandlerRegistry::default());

    arbor.limb("www/deep/er/leaf.njs").await.unwrap();

    let deep = arbor.resolve("www/deep", &Method::GET).await.unwrap();
    assert!(!deep.is_found());
    let kept = arbor.resolve("www/other", &Method::GET).await.unwrap();
    assert!(kept.is_found());
}

#[tokio::test]
async fn cached_handler_runs_once_per_vary_key() {
    let tree = TempTree::new();
    tree.write("www/h.njs", "source");

    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    let mut registry = HandlerRegistry::default();
    registry.register(
        "www/h.njs",
        handler_fn(move |mut ctx, completion| {
            seen.fetch_add(1, Ordering::SeqCst);
            ctx.cache = CacheDirective::Vary(Arc::new(|c: &Context| {
                c.query.clone().unwrap_or_default()
            }));
            ctx.set_value("body");
            completion.done(ctx);
        }),
    );
    let arbor = arbor_for(&tree, registry);

    let mut caller = Context::for_method(Method::GET);
    caller.query = Some("q=1".into());

    let first = arbor.load("www/h", &caller).await.unwrap();
    assert_eq!(first.value, b"body");
    arbor.load("www/h", &caller).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // A different vary key misses the cache.
    caller.query = Some("q=2".into());
    arbor.load("www/h", &caller).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn limb_purges_cached_entries() {
    let tree = TempTree::new();
    tree.write("www/h.njs", "source");

    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    let mut registry = HandlerRegistry::default();
    registry.register(
        "www/h.njs",
        handler_fn(move |mut ctx, completion| {
            seen.fetch_add(1, Ordering::SeqCst);
            ctx.cache = CacheDirective::Unconditional;
            ctx.set_value("body");
            completion.done(ctx);
        }),
    );
    let arbor = arbor_for(&tree, registry);
    let caller = Context::for_method(Method::GET);

    arbor.load("www/h", &caller).await.unwrap();
    arbor.load("www/h", &caller).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    arbor.limb("www/h.njs").await.unwrap();
    arbor.replant("www/h.njs").await.unwrap();

    arbor.load("www/h", &caller).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn vanished_backing_file_is_reported_as_corruption() {
    let tree = TempTree::new();
    tree.write("www/page.html", "<p>here</p>");
    let arbor = arbor_for(&tree, HandlerRegistry::default());

    // Pull the file out from under the tree without tree surgery. The
    // resolver must flag the desync rather than pretend it is a 404.
    std::fs::remove_file(tree.path("www/page.html")).unwrap();

    let err = arbor.resolve("www/page", &Method::GET).await.unwrap_err();
    assert!(matches!(err, arbor::ArborError::IndexCorruption { .. }));
}

#[tokio::test]
async fn stalled_handler_times_out() {
    let tree = TempTree::new();
    tree.write("www/slow.njs", "source");

    let mut registry = HandlerRegistry::default();
    registry.register(
        "www/slow.njs",
        handler_fn(|_ctx, completion| {
            // Park the completion so it neither signals nor drops.
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                drop(completion);
            });
        }),
    );
    let mut config = test_config(&tree.base);
    config.cache.handler_timeout_secs = 1;
    let arbor = Arbor::new(config, registry).unwrap();

    let caller = Context::for_method(Method::GET);
    let err = arbor.load("www/slow", &caller).await.unwrap_err();
    assert!(matches!(
        err,
        arbor::ArborError::HandlerTimeout { secs: 1, .. }
    ));
}

#[tokio::test]
async fn handler_failure_surfaces_as_execution_error() {
    let tree = TempTree::new();
    tree.write("www/boom.njs", "source");

    let mut registry = HandlerRegistry::default();
    registry.register(
        "www/boom.njs",
        handler_fn(|_ctx, completion| completion.fail("database unreachable")),
    );
    let arbor = arbor_for(&tree, registry);

    let caller = Context::for_method(Method::GET);
    let err = arbor.load("www/boom", &caller).await.unwrap_err();
    assert!(matches!(
        err,
        arbor::ArborError::HandlerExecution { .. }
    ));
}
