use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use kinship::application::context::{CommunityContext, Deployment};
use kinship::application::hooks::{DEFAULT_PRIORITY, Hooks};
use kinship::application::options::{
    ADD_OPTIONS_ACTION, DEFAULT_OPTIONS_FILTER, DELETE_OPTIONS_ACTION, OptionService,
    ROOT_OPTIONS_FILTER,
};
use kinship::application::repos::{NetworkOptionStore, RepoError, SiteOptionStore};
use kinship::cache::RequestCache;
use kinship::domain::options::{OptionKey, OptionTable, OptionValue};
use kinship::domain::sites::{NetworkId, SiteId};
use kinship::infra::memory::MemoryOptionStore;

/// Delegates to an in-memory store and counts reads.
#[derive(Default)]
struct CountingStore {
    inner: MemoryOptionStore,
    gets: AtomicUsize,
    batches: AtomicUsize,
}

impl CountingStore {
    fn wrap(inner: MemoryOptionStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            ..Default::default()
        })
    }

    fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SiteOptionStore for CountingStore {
    async fn add(&self, site: SiteId, name: &str, value: &OptionValue) -> Result<bool, RepoError> {
        SiteOptionStore::add(&self.inner, site, name, value).await
    }

    async fn get(&self, site: SiteId, name: &str) -> Result<Option<OptionValue>, RepoError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        SiteOptionStore::get(&self.inner, site, name).await
    }

    async fn update(
        &self,
        site: SiteId,
        name: &str,
        value: &OptionValue,
    ) -> Result<bool, RepoError> {
        SiteOptionStore::update(&self.inner, site, name, value).await
    }

    async fn delete(&self, site: SiteId, name: &str) -> Result<bool, RepoError> {
        SiteOptionStore::delete(&self.inner, site, name).await
    }

    async fn get_many(&self, site: SiteId, names: &[String]) -> Result<OptionTable, RepoError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        SiteOptionStore::get_many(&self.inner, site, names).await
    }
}

/// Every call fails.
struct BrokenStore;

#[async_trait]
impl SiteOptionStore for BrokenStore {
    async fn add(&self, _: SiteId, _: &str, _: &OptionValue) -> Result<bool, RepoError> {
        Err(RepoError::Timeout)
    }

    async fn get(&self, _: SiteId, _: &str) -> Result<Option<OptionValue>, RepoError> {
        Err(RepoError::from_persistence("connection refused"))
    }

    async fn update(&self, _: SiteId, _: &str, _: &OptionValue) -> Result<bool, RepoError> {
        Err(RepoError::Timeout)
    }

    async fn delete(&self, _: SiteId, _: &str) -> Result<bool, RepoError> {
        Err(RepoError::Timeout)
    }

    async fn get_many(&self, _: SiteId, _: &[String]) -> Result<OptionTable, RepoError> {
        Err(RepoError::from_persistence("connection refused"))
    }
}

struct Fixture {
    service: OptionService,
    hooks: Arc<Hooks>,
    context: Arc<CommunityContext>,
}

fn fixture(
    sites: Arc<dyn SiteOptionStore>,
    network: Arc<dyn NetworkOptionStore>,
    deployment: Deployment,
) -> Fixture {
    let hooks = Hooks::shared();
    let context = CommunityContext::shared(deployment);
    let service = OptionService::new(
        sites,
        network,
        Arc::new(RequestCache::new()),
        Arc::clone(&hooks),
        Arc::clone(&context),
    );
    Fixture {
        service,
        hooks,
        context,
    }
}

fn single_site(store: Arc<MemoryOptionStore>) -> Fixture {
    fixture(store.clone(), store, Deployment::default())
}

fn multisite(multiblog: bool) -> Deployment {
    Deployment::Multisite {
        root_site: SiteId(1),
        current_site: SiteId(5),
        network: NetworkId(1),
        multiblog,
    }
}

#[tokio::test]
async fn activation_installs_every_declared_default() {
    let Fixture { service, hooks, .. } = single_site(Arc::new(MemoryOptionStore::new()));

    service.add_options().await;

    for key in OptionKey::ALL {
        assert_eq!(
            service.get_option(key).await,
            key.default_value(),
            "{} should hold its default",
            key.as_str()
        );
    }
    assert_eq!(hooks.actions.count(ADD_OPTIONS_ACTION), 1);
}

#[tokio::test]
async fn activation_never_overwrites_existing_values() {
    let store = Arc::new(
        MemoryOptionStore::new()
            .with_site_option(SiteId::ROOT, "bp-disable-avatar-uploads", true)
            .with_site_option(SiteId::ROOT, "_bp_theme_package_id", "legacy"),
    );
    let Fixture { service, .. } = single_site(store.clone());

    service.add_options().await;
    service.add_options().await;

    let stored = store.site_snapshot(SiteId::ROOT);
    assert_eq!(
        stored.get("bp-disable-avatar-uploads"),
        Some(&OptionValue::Bool(true))
    );
    assert_eq!(
        stored.get("_bp_theme_package_id"),
        Some(&OptionValue::from("legacy"))
    );
    assert_eq!(stored.len(), OptionKey::ALL.len());
}

#[tokio::test]
async fn default_table_filter_extends_activation() {
    let store = Arc::new(MemoryOptionStore::new());
    let Fixture { service, hooks, .. } = single_site(store.clone());
    hooks
        .tables
        .add(DEFAULT_OPTIONS_FILTER, DEFAULT_PRIORITY, |mut table, _| {
            table.insert("bp-custom-flag".to_string(), OptionValue::Bool(true));
            table
        });

    service.add_options().await;

    assert_eq!(
        store.site_snapshot(SiteId::ROOT).get("bp-custom-flag"),
        Some(&OptionValue::Bool(true))
    );
}

#[tokio::test]
async fn deletion_removes_defaults_and_is_idempotent() {
    let store = Arc::new(MemoryOptionStore::new().with_site_option(
        SiteId::ROOT,
        "blogname",
        "Community",
    ));
    let Fixture { service, hooks, .. } = single_site(store.clone());

    service.add_options().await;
    service.delete_options().await;
    service.delete_options().await;

    let stored = store.site_snapshot(SiteId::ROOT);
    assert_eq!(stored.len(), 1);
    assert!(stored.contains_key("blogname"));
    assert_eq!(hooks.actions.count(DELETE_OPTIONS_ACTION), 2);
}

#[tokio::test]
async fn overrides_shadow_storage_for_exactly_one_key() {
    let store = CountingStore::wrap(
        MemoryOptionStore::new()
            .with_site_option(SiteId::ROOT, "bp-disable-account-deletion", false),
    );
    let Fixture {
        service, context, ..
    } = fixture(
        store.clone(),
        Arc::new(MemoryOptionStore::new()),
        Deployment::default(),
    );

    service.setup_option_filters();
    context.set_override(OptionKey::DisableAccountDeletion, OptionValue::Bool(true));

    assert!(service.disable_account_deletion(None).await);
    assert_eq!(store.gets(), 0);

    assert!(!service.disable_blogforum_comments(None).await);
    assert_eq!(store.gets(), 1);
}

#[tokio::test]
async fn overrides_are_ignored_until_filters_are_installed() {
    let store = Arc::new(MemoryOptionStore::new());
    let Fixture {
        service, context, ..
    } = single_site(store);
    context.set_override(OptionKey::ThemePackageId, OptionValue::from("nouveau"));

    assert_eq!(service.theme_package_id(None).await, "legacy");

    service.setup_option_filters();
    service.setup_option_filters();
    assert_eq!(service.theme_package_id(None).await, "nouveau");
}

#[tokio::test]
async fn empty_overrides_fall_through_to_storage() {
    let store = Arc::new(MemoryOptionStore::new().with_site_option(
        SiteId::ROOT,
        "bp-xprofile-base-group-name",
        "Profile",
    ));
    let Fixture {
        service, context, ..
    } = single_site(store);

    service.setup_option_filters();
    context.set_override(OptionKey::XprofileBaseGroupName, OptionValue::empty_text());

    assert_eq!(
        service.get_option(OptionKey::XprofileBaseGroupName).await,
        OptionValue::from("Profile")
    );
}

#[tokio::test]
async fn unknown_root_option_is_empty_text() {
    let Fixture { service, .. } = single_site(Arc::new(MemoryOptionStore::new()));

    assert_eq!(
        service.root_option("nonexistent-key").await,
        OptionValue::empty_text()
    );
    assert_eq!(
        service.root_option("avatar_default").await,
        OptionValue::from("mysteryman")
    );
}

#[tokio::test]
async fn group_avatar_uploads_follow_member_avatars_until_set() {
    let Fixture { service, .. } = single_site(Arc::new(MemoryOptionStore::new()));
    assert_eq!(
        service.disable_group_avatar_uploads(None).await,
        service.disable_avatar_uploads(None).await
    );
    assert!(service.disable_group_avatar_uploads(Some(true)).await);

    let store = Arc::new(MemoryOptionStore::new().with_site_option(
        SiteId::ROOT,
        "bp-disable-avatar-uploads",
        false,
    ));
    let Fixture { service, .. } = single_site(store.clone());
    assert!(!service.disable_group_avatar_uploads(None).await);
    assert!(service.disable_group_avatar_uploads(Some(true)).await);

    service
        .update_option(OptionKey::DisableGroupAvatarUploads, true)
        .await;
    assert!(service.disable_group_avatar_uploads(Some(false)).await);
}

#[tokio::test]
async fn activation_keeps_group_avatars_following_member_avatars() {
    let Fixture { service, .. } = single_site(Arc::new(MemoryOptionStore::new()));
    service.add_options().await;

    assert!(
        service
            .update_option(OptionKey::DisableAvatarUploads, true)
            .await
    );
    assert!(service.disable_group_avatar_uploads(None).await);

    assert!(
        service
            .update_option(OptionKey::DisableAvatarUploads, false)
            .await
    );
    assert!(!service.disable_group_avatar_uploads(None).await);

    service
        .update_option(OptionKey::DisableGroupAvatarUploads, true)
        .await;
    assert!(service.disable_group_avatar_uploads(None).await);
}

#[tokio::test]
async fn flag_filters_have_the_last_word() {
    let store = Arc::new(MemoryOptionStore::new());
    let Fixture { service, hooks, .. } = single_site(store);
    service.add_options().await;

    assert!(service.is_akismet_active(None).await);
    hooks
        .values
        .add("bp_is_akismet_active", DEFAULT_PRIORITY, |_, _| {
            OptionValue::Bool(false)
        });
    assert!(!service.is_akismet_active(None).await);

    hooks
        .values
        .add("bp_get_theme_package_id", DEFAULT_PRIORITY, |value, _| {
            OptionValue::Text(format!("{}-child", value.as_text()))
        });
    assert_eq!(service.theme_package_id(None).await, "nouveau-child");
}

#[tokio::test]
async fn feature_flags_snapshot_uses_fallback_defaults() {
    let Fixture { service, .. } = single_site(Arc::new(MemoryOptionStore::new()));
    let flags = service.feature_flags().await;

    assert!(!flags.disable_profile_sync);
    assert!(flags.hide_loggedout_adminbar);
    assert!(flags.disable_avatar_uploads);
    assert!(flags.disable_group_avatar_uploads);
    assert!(flags.restrict_group_creation);
    assert!(flags.akismet_active);
    assert!(flags.activity_heartbeat_active);
    assert_eq!(flags.theme_package_id, "legacy");
}

#[tokio::test]
async fn network_values_win_and_root_options_load_once() {
    let sites = CountingStore::wrap(
        MemoryOptionStore::new()
            .with_site_option(SiteId(1), "registration", "user")
            .with_site_option(SiteId(1), "bp-xprofile-base-group-name", "Profile"),
    );
    let network = Arc::new(
        MemoryOptionStore::new()
            .with_network_option(NetworkId(1), "registration", "all")
            .with_network_option(NetworkId(1), "fileupload_maxk", "4096"),
    );
    let Fixture { service, .. } = fixture(sites.clone(), network, multisite(false));

    let options = service.root_options().await;
    assert_eq!(options.get("registration"), Some(&OptionValue::from("all")));
    assert_eq!(
        options.get("fileupload_maxk"),
        Some(&OptionValue::from("4096"))
    );
    assert_eq!(
        options.get("bp-xprofile-base-group-name"),
        Some(&OptionValue::from("Profile"))
    );
    assert_eq!(options.get("avatar_default"), Some(&OptionValue::from("mysteryman")));

    service.root_option("registration").await;
    service.root_option("bp-xprofile-base-group-name").await;
    service.root_options().await;
    assert_eq!(sites.batches(), 1);
}

#[tokio::test]
async fn single_site_root_options_skip_network_keys() {
    let network = Arc::new(
        MemoryOptionStore::new().with_network_option(NetworkId(1), "fileupload_maxk", "4096"),
    );
    let Fixture { service, .. } = fixture(
        Arc::new(MemoryOptionStore::new()),
        network,
        Deployment::default(),
    );

    let options = service.root_options().await;
    assert!(!options.contains_key("fileupload_maxk"));
    assert_eq!(options.get("registration"), Some(&OptionValue::from("0")));
}

#[tokio::test]
async fn multiblog_reads_root_options_from_current_site() {
    let sites = Arc::new(
        MemoryOptionStore::new()
            .with_site_option(SiteId(1), "_bp_theme_package_id", "legacy")
            .with_site_option(SiteId(5), "_bp_theme_package_id", "nouveau"),
    );
    let Fixture { service, .. } = fixture(
        sites,
        Arc::new(MemoryOptionStore::new()),
        multisite(true),
    );

    assert_eq!(
        service.root_option("_bp_theme_package_id").await,
        OptionValue::from("nouveau")
    );
}

#[tokio::test]
async fn writes_to_root_keys_refresh_the_resolved_set() {
    let Fixture { service, .. } = single_site(Arc::new(MemoryOptionStore::new()));
    service.add_options().await;

    assert_eq!(
        service.root_option("_bp_theme_package_id").await,
        OptionValue::from("nouveau")
    );
    assert!(
        service
            .update_option(OptionKey::ThemePackageId, "legacy")
            .await
    );
    assert_eq!(
        service.root_option("_bp_theme_package_id").await,
        OptionValue::from("legacy")
    );
}

#[tokio::test]
async fn site_option_activation_needs_keys() {
    let store = Arc::new(MemoryOptionStore::new());
    let Fixture { service, .. } = single_site(store.clone());

    assert!(!service.activate_site_options(&OptionTable::new()).await);
    assert!(store.site_snapshot(SiteId::ROOT).is_empty());
}

#[tokio::test]
async fn site_option_activation_fills_only_empty_keys() {
    let store = Arc::new(MemoryOptionStore::new());
    let Fixture { service, .. } = single_site(store.clone());
    service.add_options().await;

    let keys = OptionTable::from([
        ("bp-custom-label".to_string(), OptionValue::from("Members")),
        ("bp-custom-enabled".to_string(), OptionValue::Bool(true)),
        ("_bp_theme_package_id".to_string(), OptionValue::from("legacy")),
    ]);
    assert!(service.activate_site_options(&keys).await);

    let stored = store.site_snapshot(SiteId::ROOT);
    assert_eq!(
        stored.get("bp-custom-label"),
        Some(&OptionValue::from("Members"))
    );
    assert_eq!(
        stored.get("bp-custom-enabled"),
        Some(&OptionValue::Bool(true))
    );
    assert_eq!(
        stored.get("_bp_theme_package_id"),
        Some(&OptionValue::from("nouveau"))
    );
    assert_eq!(
        service.root_option("bp-custom-label").await,
        OptionValue::from("Members")
    );
}

#[tokio::test]
async fn site_option_activation_reports_failed_writes() {
    let Fixture { service, .. } = fixture(
        Arc::new(BrokenStore),
        Arc::new(MemoryOptionStore::new()),
        Deployment::default(),
    );

    let keys = OptionTable::from([("bp-custom-label".to_string(), OptionValue::from("Members"))]);
    assert!(!service.activate_site_options(&keys).await);
    assert_eq!(
        service.root_option("bp-custom-label").await,
        OptionValue::from("Members")
    );
}

#[tokio::test]
async fn root_options_filter_sees_resolved_table() {
    let Fixture { service, hooks, .. } = single_site(Arc::new(MemoryOptionStore::new()));
    hooks
        .tables
        .add(ROOT_OPTIONS_FILTER, DEFAULT_PRIORITY, |mut table, _| {
            table.insert("bp-extra".to_string(), OptionValue::from("yes"));
            table
        });

    assert_eq!(
        service.root_option("bp-extra").await,
        OptionValue::from("yes")
    );
}

#[tokio::test]
async fn write_semantics_match_host_storage() {
    let Fixture { service, .. } = single_site(Arc::new(MemoryOptionStore::new()));

    assert!(service.add_option("bp-custom", "a").await);
    assert!(!service.add_option("bp-custom", "b").await);
    assert!(!service.update_option("bp-custom", "a").await);
    assert!(service.update_option("bp-custom", "c").await);
    assert!(service.delete_option("bp-custom").await);
    assert!(!service.delete_option("bp-custom").await);
}

#[tokio::test]
async fn storage_failures_resolve_to_defaults() {
    let Fixture { service, .. } = fixture(
        Arc::new(BrokenStore),
        Arc::new(MemoryOptionStore::new()),
        Deployment::default(),
    );

    assert!(service.hide_loggedout_adminbar(None).await);
    assert_eq!(
        service
            .get_option_or("bp-xprofile-base-group-name", "Base")
            .await,
        OptionValue::from("Base")
    );
    assert!(!service.update_option("bp-custom", true).await);
    assert!(!service.delete_option("bp-custom").await);

    service.add_options().await;
    let options = service.root_options().await;
    assert_eq!(
        options.get("_bp_theme_package_id"),
        Some(&OptionValue::from("nouveau"))
    );
}
