//! End-to-end flow over the in-memory store: create a festival, build its
//! lineup through the service layer, then compose the poster scene.

use chrono::NaiveDate;

use marquee::{
    ContentBlock, CurrentUser, ExploreFeed, FestivalStore, MemoryStore, PosterStyle, Theme,
    compose_poster,
};

fn owner() -> CurrentUser {
    CurrentUser {
        id: "u1".into(),
        display_name: "Ana".into(),
        is_guest: false,
    }
}

#[test]
fn edited_festival_composes_expected_scene() {
    let svc = FestivalStore::new(MemoryStore::new());
    let user = owner();

    let id = svc.create(&user, "Neon Nights", 2).unwrap();
    svc.set_theme(&user, &id, Theme::Beach).unwrap();
    svc.add_stage(&user, &id, "Carpa Electrónica").unwrap();
    for name in ["Aurora Club", "Static Bloom", "Velvet Orbit"] {
        svc.add_artist(&user, &id, name).unwrap();
    }
    svc.assign_artist(&user, &id, "Aurora Club", 0, "Escenario Principal")
        .unwrap();
    svc.assign_artist(&user, &id, "Static Bloom", 0, "Carpa Electrónica")
        .unwrap();
    svc.assign_artist(&user, &id, "Velvet Orbit", 1, "Escenario Principal")
        .unwrap();

    let festival = svc.load(&id).unwrap();
    assert_eq!(festival.theme, Theme::Beach);
    assert_eq!(
        festival.stages,
        vec!["Escenario Principal".to_string(), "Carpa Electrónica".to_string()]
    );

    let reference = NaiveDate::from_ymd_opt(2026, 3, 6).unwrap();
    let scene = compose_poster(
        &festival,
        festival.theme,
        reference,
        &PosterStyle::default(),
    );

    assert_eq!(scene.theme, Theme::Beach);
    let days: Vec<_> = scene.day_blocks().collect();
    assert_eq!(days.len(), 2);
    // Assignment order drives rank: Aurora Club was placed first on day one.
    assert_eq!(days[0].headliner.as_deref(), Some("AURORA CLUB"));
    assert_eq!(days[0].tiers[0].names, vec!["Static Bloom"]);
    assert_eq!(days[1].headliner.as_deref(), Some("VELVET ORBIT"));

    let strip = scene.content.iter().find_map(|b| match b {
        ContentBlock::DateStrip { text, .. } => Some(text.clone()),
        _ => None,
    });
    assert_eq!(strip.as_deref(), Some("MAR 06  //  MAR 07"));
}

#[test]
fn unassigning_everyone_yields_the_empty_poster() {
    let svc = FestivalStore::new(MemoryStore::new());
    let user = owner();

    let id = svc.create(&user, "Quiet Fest", 1).unwrap();
    svc.add_artist(&user, &id, "Aurora Club").unwrap();
    svc.assign_artist(&user, &id, "Aurora Club", 0, "Escenario Principal")
        .unwrap();
    svc.unassign_artist(&user, &id, "Aurora Club").unwrap();

    let festival = svc.load(&id).unwrap();
    let scene = compose_poster(
        &festival,
        festival.theme,
        NaiveDate::from_ymd_opt(2026, 3, 6).unwrap(),
        &PosterStyle::default(),
    );
    assert!(scene.has_empty_notice());
    assert_eq!(scene.day_blocks().count(), 0);
}

#[test]
fn published_festival_shows_up_in_explore() {
    let svc = FestivalStore::new(MemoryStore::new());
    let user = owner();

    let id = svc.create(&user, "Neon Nights", 2).unwrap();
    assert!(svc.explore(ExploreFeed::Recent).unwrap().is_empty());

    svc.set_public(&user, &id, true).unwrap();
    let feed = svc.explore(ExploreFeed::Recent).unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].0, id);
    assert_eq!(feed[0].1.name, "Neon Nights");
}
