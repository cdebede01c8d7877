mod common;

use strata::{Direction, EngineConfig, Error, FilterOp, InMemoryDatastore, Key};
use strata_store::Datastore;
use strata_types::{Property, PropertyList};
use strata_schema::fixtures::{
    sample_parent, Attribute, Child, MultipleModel, Parent, Pet,
};

use common::{harness, harness_with, seed_parents};

// --- filters and ordering ---

#[tokio::test]
async fn greater_than_ten_ascending_returns_89() {
    let h = harness();
    seed_parents(&h.mapper, 100).await;
    let ctx = h.mapper.context();

    let found = ctx
        .query::<Parent>()
        .with_field("Num >", 10)
        .order_by("Num", Direction::Asc)
        .get()
        .await
        .unwrap();
    assert_eq!(found.len(), 89);
    let nums: Vec<i64> = found.iter().map(|p| p.num).collect();
    assert_eq!(nums, (11..100).collect::<Vec<_>>());
    // `get` performs full reads, nested entities included.
    assert_eq!(found[0].child.grandchild.grandchild_num, 110);
}

#[tokio::test]
async fn descending_order_with_offset_and_limit() {
    let h = harness();
    seed_parents(&h.mapper, 20).await;
    let found = h
        .mapper
        .context()
        .query::<Parent>()
        .order_by("Num", Direction::Desc)
        .offset_by(2)
        .limit(3)
        .get()
        .await
        .unwrap();
    let nums: Vec<i64> = found.iter().map(|p| p.num).collect();
    assert_eq!(nums, vec![17, 16, 15]);
}

#[tokio::test]
async fn count_honours_filters() {
    let h = harness();
    seed_parents(&h.mapper, 30).await;
    let ctx = h.mapper.context();
    let n = ctx
        .query::<Parent>()
        .filter("Num", FilterOp::Lt, 5)
        .count()
        .await
        .unwrap();
    assert_eq!(n, 5);
    let n = ctx.query::<Parent>().limit(7).count().await.unwrap();
    assert_eq!(n, 7);
}

#[tokio::test]
async fn repeated_field_and_filter() {
    let h = harness();
    let ctx = h.mapper.context();
    let mut both = sample_parent("both", 1);
    both.tags = vec!["Red".into(), "Blue".into()];
    ctx.create(&mut both).await.unwrap();
    let mut red = sample_parent("red", 2);
    red.tags = vec!["Red".into()];
    ctx.create(&mut red).await.unwrap();

    let found = ctx
        .query::<Parent>()
        .with_field("Tags =", "Red")
        .with_field("Tags =", "Blue")
        .get()
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "both");

    let green = ctx
        .query::<Parent>()
        .with_field("Tags =", "Green")
        .count()
        .await
        .unwrap();
    assert_eq!(green, 0);
}

#[tokio::test]
async fn plain_sub_values_are_filterable() {
    let h = harness();
    let ctx = h.mapper.context();
    seed_parents(&h.mapper, 3).await;
    let mut multiple = MultipleModel {
        attributes: vec![Attribute::new("color", "red"), Attribute::new("size", "xl")],
        ..Default::default()
    };
    ctx.create(&mut multiple).await.unwrap();

    let found = ctx
        .query::<Parent>()
        .with_field("Nomo.Name =", "parent-1-nomo")
        .get()
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].num, 1);

    let found = ctx
        .query::<MultipleModel>()
        .with_field("Attributes.Value =", "xl")
        .get()
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].attributes, multiple.attributes);
}

#[tokio::test]
async fn nested_kinds_are_queryable_on_their_own() {
    let h = harness();
    seed_parents(&h.mapper, 4).await;
    let children = h
        .mapper
        .context()
        .query::<Child>()
        .with_field("Name =", "parent-2-child")
        .get()
        .await
        .unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].grandchild.grandchild_num, 20);
}

#[tokio::test]
async fn capped_store_runs_are_resumed_by_get() {
    let h = harness_with(InMemoryDatastore::with_result_cap(3), EngineConfig::default());
    seed_parents(&h.mapper, 25).await;
    let ctx = h.mapper.context();

    assert_eq!(ctx.query::<Parent>().count().await.unwrap(), 25);
    let found = ctx
        .query::<Parent>()
        .order_by("Num", Direction::Asc)
        .get()
        .await
        .unwrap();
    let nums: Vec<i64> = found.iter().map(|p| p.num).collect();
    assert_eq!(nums, (0..25).collect::<Vec<_>>());

    let window = ctx
        .query::<Parent>()
        .order_by("Num", Direction::Asc)
        .offset_by(4)
        .limit(7)
        .keys()
        .await
        .unwrap();
    assert_eq!(window.len(), 7);
    let mut fourth = Parent::default();
    ctx.query::<Parent>()
        .order_by("Num", Direction::Asc)
        .offset_by(4)
        .first(&mut fourth)
        .await
        .unwrap();
    assert_eq!(fourth.model.key(), Some(&window[0]));
    assert_eq!(fourth.num, 4);
}

// --- with_modelable ---

#[tokio::test]
async fn with_modelable_matches_nested_and_reference_keys() {
    let h = harness();
    let ctx = h.mapper.context();
    let parents = seed_parents(&h.mapper, 3).await;

    let mut found = Parent::default();
    ctx.query::<Parent>()
        .with_modelable("Child", &parents[1].child)
        .first(&mut found)
        .await
        .unwrap();
    assert_eq!(found.name, "parent-1");

    let mut pet = Pet {
        name: "rex".into(),
        owner: parents[2].model.key().cloned(),
        ..Default::default()
    };
    ctx.create(&mut pet).await.unwrap();
    let pets = ctx
        .query::<Pet>()
        .with_modelable("Owner", &parents[2])
        .get()
        .await
        .unwrap();
    assert_eq!(pets.len(), 1);
    assert_eq!(pets[0].name, "rex");
}

#[tokio::test]
async fn with_modelable_requires_registered_keyed_target() {
    let h = harness();
    let ctx = h.mapper.context();

    let fresh = Child::default();
    let err = ctx
        .query::<Parent>()
        .with_modelable("Child", &fresh)
        .get()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotRegistered { kind: "Child" }));

    let mut registered = Child::default();
    h.mapper.registry().index(&mut registered).unwrap();
    let err = ctx
        .query::<Parent>()
        .with_modelable("Child", &registered)
        .count()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::KeyNotSet { kind: "Child" }));
}

#[tokio::test]
async fn with_modelable_checks_field() {
    let h = harness();
    let parents = seed_parents(&h.mapper, 1).await;
    let ctx = h.mapper.context();

    let err = ctx
        .query::<Parent>()
        .with_modelable("Missing", &parents[0].child)
        .count()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FieldNotFound { .. }));

    let err = ctx
        .query::<Parent>()
        .with_modelable("ReadonlyChild", &parents[0].child)
        .count()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidFilter { .. }));
}

// --- first ---

#[tokio::test]
async fn first_loads_one_or_reports_not_found() {
    let h = harness();
    seed_parents(&h.mapper, 5).await;
    let ctx = h.mapper.context();

    let mut top = Parent::default();
    ctx.query::<Parent>()
        .order_by("Num", Direction::Desc)
        .first(&mut top)
        .await
        .unwrap();
    assert_eq!(top.num, 4);
    assert!(top.model.is_registered());

    let err = ctx
        .query::<Parent>()
        .with_field("Num >", 100)
        .first(&mut top)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

// --- builder errors ---

#[tokio::test]
async fn unknown_field_is_reported_at_execution() {
    let h = harness();
    let err = h
        .mapper
        .context()
        .query::<Parent>()
        .with_field("Nope =", 1)
        .order_by("Num", Direction::Asc)
        .get()
        .await
        .unwrap_err();
    match err {
        Error::FieldNotFound { kind, field } => {
            assert_eq!(kind, "Parent");
            assert_eq!(field, "Nope");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn malformed_filters_are_rejected() {
    let h = harness();
    let ctx = h.mapper.context();
    for expr in ["Num", "Num =>", "Child =", "Nomo =", "Num.Sub ="] {
        let err = ctx
            .query::<Parent>()
            .with_field(expr, 1)
            .count()
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::InvalidFilter { .. }),
            "{expr}: unexpected {err}"
        );
    }
}

#[tokio::test]
async fn dangling_children_do_not_fail_parent_queries() {
    let h = harness();
    let parents = seed_parents(&h.mapper, 3).await;
    let ctx = h.mapper.context();
    ctx.delete(&[&parents[1].child]).await.unwrap();

    let all = ctx
        .query::<Parent>()
        .order_by("Num", Direction::Asc)
        .get()
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert!(all[1].child.name.is_empty());
    assert_eq!(all[1].child.model.key(), parents[1].child.model.key());
}

#[tokio::test]
async fn undecodable_record_discards_partial_results() {
    let h = harness();
    seed_parents(&h.mapper, 3).await;
    let bad = Key::new("Parent", 10_000);
    let record = PropertyList::from(vec![Property::new("Num", 1), Property::new("Name", 2)]);
    h.store.put(&bad, &record).await.unwrap();

    let err = h
        .mapper
        .context()
        .query::<Parent>()
        .order_by("Num", Direction::Asc)
        .get()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cast { kind: "Parent", .. }));
}

#[tokio::test]
async fn cancelled_context_aborts_query() {
    let h = harness();
    seed_parents(&h.mapper, 3).await;
    let ctx = h.mapper.context();
    ctx.cancel();
    let err = ctx.query::<Parent>().get().await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}
