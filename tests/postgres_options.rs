use kinship::application::repos::{NetworkOptionStore, SiteOptionStore};
use kinship::domain::options::OptionValue;
use kinship::domain::sites::{NetworkId, SiteId};
use kinship::infra::db::PostgresRepositories;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn site_options_follow_host_write_semantics(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let site = SiteId(3);
    let name = "bp-disable-avatar-uploads";
    let on = OptionValue::Bool(true);
    let off = OptionValue::Bool(false);

    let added = SiteOptionStore::add(&repos, site, name, &on).await.expect("add");
    assert!(added);
    let added = SiteOptionStore::add(&repos, site, name, &off).await.expect("add again");
    assert!(!added);
    let stored = SiteOptionStore::get(&repos, site, name).await.expect("get");
    assert_eq!(stored, Some(on.clone()));

    let changed = SiteOptionStore::update(&repos, site, name, &on).await.expect("same value");
    assert!(!changed);
    let changed = SiteOptionStore::update(&repos, site, name, &off).await.expect("new value");
    assert!(changed);
    let inserted = SiteOptionStore::update(&repos, site, "bp-fresh", &OptionValue::from("x"))
        .await
        .expect("insert");
    assert!(inserted);

    assert!(SiteOptionStore::delete(&repos, site, name).await.expect("delete"));
    assert!(!SiteOptionStore::delete(&repos, site, name).await.expect("delete again"));
    let stored = SiteOptionStore::get(&repos, site, name).await.expect("get");
    assert_eq!(stored, None);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn batch_reads_are_scoped(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let list = OptionValue::List(vec!["groups".to_string(), "forums".to_string()]);

    SiteOptionStore::add(&repos, SiteId(1), "bp-deactivated-components", &list)
        .await
        .expect("seed site");
    SiteOptionStore::add(&repos, SiteId(2), "registration", &OptionValue::from("none"))
        .await
        .expect("seed other site");
    NetworkOptionStore::add(&repos, NetworkId(1), "registration", &OptionValue::from("all"))
        .await
        .expect("seed network");

    let names = vec![
        "bp-deactivated-components".to_string(),
        "registration".to_string(),
    ];
    let site = SiteOptionStore::get_many(&repos, SiteId(1), &names)
        .await
        .expect("site batch");
    assert_eq!(site.len(), 1);
    assert_eq!(site.get("bp-deactivated-components"), Some(&list));

    let network = NetworkOptionStore::get_many(&repos, NetworkId(1), &names)
        .await
        .expect("network batch");
    assert_eq!(network.get("registration"), Some(&OptionValue::from("all")));
}
