use std::collections::HashSet;
use std::sync::Arc;

use kinship::application::context::{CommunityContext, Deployment};
use kinship::application::hooks::Hooks;
use kinship::application::options::OptionService;
use kinship::cache::RequestCache;
use kinship::infra::memory::MemoryOptionStore;
use metrics_util::debugging::DebuggingRecorder;

#[tokio::test]
async fn option_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let store = Arc::new(MemoryOptionStore::new());
    let service = OptionService::new(
        store.clone(),
        store,
        Arc::new(RequestCache::new()),
        Hooks::shared(),
        CommunityContext::shared(Deployment::default()),
    );

    service.add_options().await;
    service.root_options().await;
    service.root_options().await;
    service.update_option("_bp_theme_package_id", "legacy").await;

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for metric in [
        "kinship_object_cache_lookup_total",
        "kinship_option_write_total",
    ] {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
