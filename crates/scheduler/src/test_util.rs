use once_cell::sync::Lazy;

/// Set `TEST_LOG` to a filter directive, such as `debug` or `batchfit_scheduler=trace`, to see
/// packing events while running tests.
static TRACING: Lazy<()> = Lazy::new(|| {
    if let Ok(filter) = std::env::var("TEST_LOG") {
        configure_tracing(&filter);
    }
});

fn configure_tracing(filter: &str) {
    use tracing_subscriber::{layer::SubscriberExt, EnvFilter};
    let tree = tracing_tree::HierarchicalLayer::new(2)
        .with_targets(true)
        .with_bracketed_fields(true);

    let subscriber = tracing_subscriber::Registry::default()
        .with(EnvFilter::new(filter))
        .with(tree);

    tracing::subscriber::set_global_default(subscriber).unwrap();
}

pub fn setup_test_tracing() {
    Lazy::force(&TRACING);
}
