mod common;

use common::{rehydrated, synchronizer, TestSource};
use housing_filters::filters::FilterValue;
use housing_filters::models::{FilterField, FilterState, Selection};
use housing_filters::navigation::{Navigator, PushOptions};
use housing_filters::routing::build_url;
use housing_filters::sync::{FieldStatus, Phase, SyncMode, Target};
use std::sync::Arc;

#[tokio::test]
async fn rehydrates_city_and_area_with_titles() {
    let sync = rehydrated("/sale-housing/tehran/velenjak").await;
    let state = sync.state();

    assert_eq!(state.transaction_type, Selection::new("Sale", "sale"));
    assert_eq!(state.property_type, Selection::new("Housing", "housing"));
    assert_eq!(state.city, Selection::new("Tehran", "tehran"));
    assert_eq!(state.area, Selection::new("Velenjak", "velenjak"));
    assert!(state.category.is_empty());
    assert!(state.country.is_empty());
    assert_eq!(sync.status(FilterField::Area), FieldStatus::Selected);
    assert_eq!(sync.options(FilterField::Area).len(), 3);
    assert_eq!(sync.status(FilterField::Province), FieldStatus::Empty);
}

#[tokio::test]
async fn province_url_skips_country_lookup() {
    let mut sync = synchronizer(TestSource::default(), "/rent-housing-apartment/fars-province");
    assert!(sync.reconcile_from_url().await.unwrap());

    let state = sync.state();
    assert_eq!(state.transaction_type.slug, "rent");
    assert_eq!(state.property_type.slug, "housing");
    assert_eq!(state.category, Selection::new("Apartment", "apartment"));
    assert_eq!(state.province, Selection::new("Fars", "fars"));
    assert!(state.country.is_empty());
    assert!(state.city.is_empty());
    assert!(state.area.is_empty());

    assert!(sync.source().looked_up(FilterField::Province));
    assert!(!sync.source().looked_up(FilterField::Country));
    assert_eq!(sync.options(FilterField::City).len(), 2);
}

#[tokio::test]
async fn city_url_skips_province_and_country_lookup() {
    let sync = rehydrated("/sale-housing/shiraz").await;
    assert_eq!(sync.state().city.title, "Shiraz");
    assert!(!sync.source().looked_up(FilterField::Province));
    assert!(!sync.source().looked_up(FilterField::Country));
}

#[tokio::test]
async fn second_reconcile_is_a_no_op() {
    let mut sync = synchronizer(TestSource::default(), "/sale-housing-villa/tehran/niavaran?rooms=2,3");
    assert!(sync.reconcile_from_url().await.unwrap());
    let first = sync.state();
    let lookups = sync.source().lookups().len();

    assert!(!sync.reconcile_from_url().await.unwrap());
    assert!(Arc::ptr_eq(&first, &sync.state()));
    assert_eq!(sync.source().lookups().len(), lookups);
    assert_eq!(sync.navigator().history().len(), 1);
}

#[tokio::test]
async fn unknown_slug_is_treated_as_empty() {
    let mut sync = synchronizer(TestSource::default(), "/sale-housing/atlantis");
    sync.reconcile_from_url().await.unwrap();
    assert!(sync.state().city.is_empty());
    assert_eq!(sync.canonical_url(), "/sale-housing/iran-country");

    let before = sync.state();
    assert!(!sync.reconcile_from_url().await.unwrap());
    assert!(Arc::ptr_eq(&before, &sync.state()));
}

#[tokio::test]
async fn built_urls_rehydrate_to_the_same_slugs() {
    let states = [
        FilterState {
            transaction_type: Selection::new("Rent", "rent"),
            property_type: Selection::new("Housing", "housing"),
            category: Selection::new("Suite", "suite"),
            province: Selection::new("Fars", "fars"),
            ..Default::default()
        },
        FilterState {
            transaction_type: Selection::new("Sale", "sale"),
            property_type: Selection::new("Commercial", "commercial"),
            category: Selection::new("Office", "office"),
            city: Selection::new("Shiraz", "shiraz"),
            area: Selection::new("Eram", "eram"),
            ..Default::default()
        },
        FilterState {
            transaction_type: Selection::new("Sale", "sale"),
            property_type: Selection::new("Land", "land"),
            country: Selection::new("Iran", "iran"),
            ..Default::default()
        },
    ];

    for expected in states {
        let url = build_url(&expected, &Default::default());
        let sync = rehydrated(&url).await;
        assert_eq!(sync.state().slugs(), expected.slugs(), "round trip of {}", url);
        assert_eq!(*sync.state(), expected, "titles of {}", url);
    }
}

#[tokio::test]
async fn empty_location_rehydrates_as_default_country() {
    let url = build_url(&FilterState::default(), &Default::default());
    assert_eq!(url, "/sale-housing/iran-country");

    let sync = rehydrated(&url).await;
    let state = sync.state();
    assert_eq!(state.country, Selection::new("Iran", "iran"));
    assert!(state.province.is_empty());
    assert!(state.city.is_empty());
    assert_eq!(sync.canonical_url(), url);
}

#[tokio::test]
async fn area_in_url_needs_a_city() {
    let sync = rehydrated("/sale-housing/iran-country/velenjak").await;
    let state = sync.state();
    assert_eq!(state.country.slug, "iran");
    assert!(state.city.is_empty());
    assert!(state.area.is_empty());
    assert!(!sync.source().looked_up(FilterField::Area));
    assert_eq!(sync.canonical_url(), "/sale-housing/iran-country");

    let sync = rehydrated("/sale-housing/fars-province/eram").await;
    assert_eq!(sync.state().province.slug, "fars");
    assert!(sync.state().area.is_empty());
}

#[tokio::test]
async fn area_cannot_be_picked_without_a_city() {
    let mut sync = rehydrated("/sale-housing/iran-country").await;
    let before = sync.state();

    let tickets = sync.set_field(FilterField::Area, Selection::from_slug("velenjak"));
    assert!(tickets.is_empty());
    assert!(sync.state().area.is_empty());
    assert!(Arc::ptr_eq(&before, &sync.state()));
    assert_eq!(sync.navigator().history().len(), 1);

    sync.select(FilterField::City, Selection::from_slug("tehran")).await;
    sync.select(FilterField::City, Selection::empty()).await;
    sync.set_field(FilterField::Area, Selection::from_slug("velenjak"));
    assert!(sync.state().area.is_empty());
}

#[tokio::test]
async fn new_city_in_url_drops_stale_province() {
    let mut sync = rehydrated("/sale-housing/fars-province").await;
    sync.select(FilterField::City, Selection::from_slug("shiraz")).await;
    assert_eq!(sync.state().province.slug, "fars");
    assert_eq!(sync.navigator().current_url(), "/sale-housing/shiraz");

    let lookups = sync.source().lookups().len();
    sync.navigator_mut().push_url("/sale-housing/tehran", PushOptions::default());
    assert!(sync.reconcile_from_url().await.unwrap());

    let state = sync.state();
    assert_eq!(state.city, Selection::new("Tehran", "tehran"));
    assert!(state.province.is_empty());
    assert!(state.country.is_empty());
    assert_eq!(
        sync.source().lookups()[lookups..],
        [(FilterField::City, "tehran".to_string())]
    );
    assert!(sync.options(FilterField::City).is_empty());
    assert_eq!(sync.phase(Target::Cities), Phase::Idle);
    assert_eq!(sync.options(FilterField::Area).len(), 3);

    assert!(!sync.reconcile_from_url().await.unwrap());
}

#[tokio::test]
async fn new_country_resets_location_chain_and_pushes_url() {
    let mut sync = rehydrated("/sale-housing/tehran/velenjak").await;
    let mut changes = sync.store().subscribe();

    sync.select(FilterField::Country, Selection::new("Iran", "iran")).await;

    let state = sync.state();
    assert_eq!(state.country.slug, "iran");
    assert_eq!(state.province, Selection::empty());
    assert_eq!(state.city, Selection::empty());
    assert_eq!(state.area, Selection::empty());
    assert!(changes.has_changed().unwrap());

    assert_eq!(sync.navigator().current_url(), "/sale-housing/iran-country");
    assert!(!sync.navigator().last_scroll());
    assert_eq!(sync.options(FilterField::Province).len(), 3);
    assert_eq!(sync.phase(Target::Areas), Phase::Idle);
    assert!(sync.options(FilterField::Area).is_empty());
}

#[tokio::test]
async fn transaction_change_drops_category_missing_from_subgroup() {
    let mut sync = rehydrated("/sale-housing-villa/tehran").await;
    assert_eq!(sync.state().category.slug, "villa");

    let tickets = sync.set_field(FilterField::TransactionType, Selection::new("Rent", "rent"));
    assert!(tickets.is_empty());
    assert!(sync.state().category.is_empty());
    assert_eq!(sync.navigator().current_url(), "/rent-housing/tehran");
}

#[tokio::test]
async fn transaction_change_keeps_category_still_offered() {
    let mut sync = rehydrated("/sale-housing-apartment/tehran").await;
    sync.set_field(FilterField::TransactionType, Selection::new("Rent", "rent"));
    assert_eq!(sync.state().category.slug, "apartment");
}

#[tokio::test]
async fn property_type_change_revalidates_category_after_load() {
    let mut sync = rehydrated("/sale-housing-apartment/tehran").await;

    let tickets = sync.set_field(FilterField::PropertyType, Selection::new("Land", "land"));
    assert!(tickets.iter().any(|t| t.target == Target::Categories && t.param == "land"));
    assert_eq!(sync.status(FilterField::Category), FieldStatus::Loading);
    assert_eq!(sync.state().category.slug, "apartment");

    sync.load(tickets).await;
    assert!(sync.state().category.is_empty());
    assert_eq!(sync.navigator().current_url(), "/sale-land/tehran");
}

#[tokio::test]
async fn stale_options_response_is_discarded() {
    let mut sync = rehydrated("/sale-housing/iran-country").await;

    let mut first = sync.set_field(FilterField::Province, Selection::from_slug("fars"));
    let mut second = sync.set_field(FilterField::Province, Selection::from_slug("tehran"));
    let (first, second) = (first.remove(0), second.remove(0));
    assert_eq!(first.target, Target::Cities);

    let late = sync.fetch(&first).await;
    let fresh = sync.fetch(&second).await;

    assert!(sync.resolve(second, fresh));
    assert!(!sync.resolve(first, late));
    let cities: Vec<String> = sync.options(FilterField::City).into_iter().map(|c| c.slug).collect();
    assert_eq!(cities, vec!["tehran", "rey"]);
}

#[tokio::test]
async fn superseded_request_loses_even_if_it_resolves_last() {
    let mut sync = rehydrated("/sale-housing/iran-country").await;

    let first = sync.set_field(FilterField::Province, Selection::from_slug("fars")).remove(0);
    let late = sync.fetch(&first).await;
    let second = sync.set_field(FilterField::Province, Selection::from_slug("isfahan")).remove(0);

    assert!(!sync.resolve(first, late));
    assert_eq!(sync.status(FilterField::City), FieldStatus::Loading);
    let fresh = sync.fetch(&second).await;
    assert!(sync.resolve(second, fresh));
    assert_eq!(sync.options(FilterField::City)[0].slug, "isfahan");
}

#[tokio::test]
async fn failed_fetch_can_be_retried() {
    let mut sync = synchronizer(TestSource::failing_cities(1), "/sale-housing/fars-province");
    sync.reconcile_from_url().await.unwrap();

    assert!(matches!(sync.status(FilterField::City), FieldStatus::Failed(_)));
    assert!(sync.options(FilterField::City).is_empty());
    assert!(sync.retry(Target::Areas).is_none());

    let ticket = sync.retry(Target::Cities).expect("failed list should be retryable");
    sync.load(vec![ticket]).await;
    assert_eq!(sync.status(FilterField::City), FieldStatus::Loaded);
    assert_eq!(sync.options(FilterField::City).len(), 2);
}

#[tokio::test]
async fn value_not_among_loaded_options_is_cleared() {
    let mut sync = rehydrated("/sale-housing/iran-country").await;
    sync.set_field(FilterField::Province, Selection::from_slug("bavaria"));
    assert!(sync.state().province.is_empty());

    sync.set_field(FilterField::Province, Selection::from_slug("isfahan"));
    assert_eq!(sync.state().province, Selection::new("Isfahan", "isfahan"));
}

#[tokio::test]
async fn deferred_mode_waits_for_apply() {
    let mut sync = rehydrated("/sale-housing/iran-country").await;
    sync.set_mode(SyncMode::Deferred);

    sync.select(FilterField::Province, Selection::from_slug("fars")).await;
    sync.set_filter("rooms", FilterValue::multi(["2", "3"]));
    assert_eq!(sync.navigator().history().len(), 1);
    assert_eq!(sync.options(FilterField::City).len(), 2);

    let url = sync.apply();
    assert_eq!(url, "/sale-housing/fars-province?rooms=2,3");
    assert_eq!(sync.navigator().current_url(), url);
}

#[tokio::test]
async fn discard_restores_last_synced_state() {
    let mut sync = rehydrated("/sale-housing/fars-province").await;
    let synced = sync.state();
    sync.set_mode(SyncMode::Deferred);

    sync.select(FilterField::City, Selection::from_slug("shiraz")).await;
    sync.set_filter("elevator", FilterValue::scalar("yes"));
    assert_eq!(sync.state().city.slug, "shiraz");

    sync.discard();
    assert_eq!(*sync.state(), *synced);
    assert!(sync.selected_filters().is_empty());
    assert_eq!(sync.phase(Target::Areas), Phase::Idle);
    assert_eq!(sync.navigator().history().len(), 1);
}

#[tokio::test]
async fn leaving_deferred_mode_pushes_pending_edits() {
    let mut sync = rehydrated("/sale-housing/iran-country").await;
    sync.set_mode(SyncMode::Deferred);
    sync.select(FilterField::Province, Selection::from_slug("tehran")).await;
    sync.set_mode(SyncMode::Immediate);
    assert_eq!(sync.navigator().current_url(), "/sale-housing/tehran-province");
}

#[tokio::test]
async fn back_navigation_clears_more_specific_fields() {
    let mut sync = rehydrated("/sale-housing/iran-country").await;
    sync.select(FilterField::Province, Selection::from_slug("fars")).await;
    sync.select(FilterField::City, Selection::from_slug("shiraz")).await;
    sync.select(FilterField::Area, Selection::from_slug("eram")).await;
    assert_eq!(sync.navigator().current_url(), "/sale-housing/shiraz/eram");

    assert!(sync.navigator_mut().back());
    assert!(sync.navigator_mut().back());
    assert!(sync.reconcile_from_url().await.unwrap());

    let state = sync.state();
    assert_eq!(state.province.slug, "fars");
    assert_eq!(state.country.slug, "iran");
    assert!(state.city.is_empty());
    assert!(state.area.is_empty());
    assert_eq!(sync.phase(Target::Areas), Phase::Idle);
}

#[tokio::test]
async fn query_filters_are_typed_by_definitions() {
    let sync = rehydrated("/sale-housing/tehran?rooms=2,3&price=100,500").await;
    let filters = sync.selected_filters();
    assert_eq!(filters.get("rooms"), Some(&FilterValue::multi(["2", "3"])));
    assert_eq!(filters.get("price"), Some(&FilterValue::range(Some(100.0), Some(500.0))));
    assert_eq!(sync.canonical_url(), "/sale-housing/tehran?price=100,500&rooms=2,3");
    assert_eq!(sync.navigator().history().len(), 1);
}

#[tokio::test]
async fn property_type_change_prunes_undefined_filters() {
    let mut sync = rehydrated("/sale-housing/tehran?rooms=2&price=100,").await;
    sync.select(FilterField::PropertyType, Selection::new("Land", "land")).await;

    assert!(sync.selected_filters().get("rooms").is_none());
    assert_eq!(sync.selected_filters().get("price"), Some(&FilterValue::range(Some(100.0), None)));
    assert_eq!(sync.navigator().current_url(), "/sale-land/tehran?price=100,");
}

#[tokio::test]
async fn filter_edits_sync_query_string() {
    let mut sync = rehydrated("/sale-housing/tehran").await;
    assert!(sync.set_filter("rooms", FilterValue::multi(["2", "3"])));
    assert_eq!(sync.navigator().current_url(), "/sale-housing/tehran?rooms=2,3");

    assert!(!sync.set_filter("rooms", FilterValue::multi(["2", "3"])));
    assert!(sync.remove_filter("rooms"));
    assert_eq!(sync.navigator().current_url(), "/sale-housing/tehran");
    assert!(!sync.clear_filters());
}

#[tokio::test]
async fn reset_returns_to_default_url() {
    let mut sync = rehydrated("/rent-housing-suite/tehran/tajrish?rooms=1").await;
    let tickets = sync.reset();
    assert!(tickets.is_empty());
    assert_eq!(*sync.state(), FilterState::default());
    assert!(sync.selected_filters().is_empty());
    assert_eq!(sync.navigator().current_url(), "/sale-housing/iran-country");
    assert_eq!(sync.status(FilterField::Category), FieldStatus::Empty);
}

#[tokio::test]
async fn invalid_route_is_an_error() {
    let mut sync = synchronizer(TestSource::default(), "/a-b/c/d/e");
    assert!(sync.reconcile_from_url().await.is_err());
    assert_eq!(*sync.state(), FilterState::default());
}
