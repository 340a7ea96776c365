use chrono::NaiveDate;

use crate::{
    calendar::festival_dates,
    model::{Festival, Theme},
    scene::{ContentBlock, DayBlock, Footer, OverflowCaption, PosterScene, TierRow},
    style::PosterStyle,
};

/// Compose a festival snapshot into a poster scene.
///
/// Pure and total: every malformed input has already been normalized away by
/// [`Festival::from_doc`], the theme argument falls back on parse, and the
/// reference date is explicit, so identical inputs always produce identical
/// scenes.
#[tracing::instrument(skip(festival, style), fields(festival = %festival.slug))]
pub fn compose_poster(
    festival: &Festival,
    theme: Theme,
    reference_date: NaiveDate,
    style: &PosterStyle,
) -> PosterScene {
    let dates = festival_dates(reference_date, festival.days);

    let title = festival.name.to_uppercase();
    let mut content = vec![
        ContentBlock::Title {
            size_px: title_font_size(&festival.name, style),
            text: title,
            margin_bottom: 30.0,
        },
        ContentBlock::DateStrip {
            text: dates
                .iter()
                .map(|d| d.date.as_str())
                .collect::<Vec<_>>()
                .join("  //  "),
            size_px: style.date_strip_size,
            margin_bottom: 50.0,
        },
    ];

    if !festival.has_assigned_artists() {
        content.push(ContentBlock::EmptyNotice {
            text: style.empty_notice.clone(),
            size_px: style.empty_notice_size,
            margin_top: 100.0,
        });
    } else {
        for (day_index, date) in dates.iter().enumerate() {
            let names: Vec<&str> = festival
                .assigned_for_day(day_index)
                .map(|a| a.name.as_str())
                .collect();
            content.push(ContentBlock::Day(compose_day(
                &names,
                date.weekday.clone(),
                date.date.clone(),
                style,
            )));
        }
    }

    PosterScene {
        canvas: style.canvas,
        theme,
        content,
        footer: Footer {
            height: style.footer_height + style.footer_fade,
            tagline: style.footer_tagline.clone(),
            brand: style.footer_brand.clone(),
            brand_accent: style.footer_brand_accent.clone(),
        },
        style: style.clone(),
    }
}

fn compose_day(names: &[&str], day_label: String, date_label: String, style: &PosterStyle) -> DayBlock {
    let cap = style.day_render_cap();

    let mut tiers = Vec::new();
    let mut tier_start = 1; // index 0 is the headliner
    for (i, &(end, size_px)) in style.tiers.iter().enumerate() {
        if names.len() <= tier_start {
            break;
        }
        let end = end.min(names.len()).min(cap);
        if end > tier_start {
            tiers.push(TierRow {
                size_px,
                names: names[tier_start..end].iter().map(|n| n.to_string()).collect(),
                // The first and third tier sit closer to their neighbors.
                margin_top: if i == 1 { 15.0 } else { 10.0 },
            });
        }
        tier_start = end;
    }

    let overflow = names.len().saturating_sub(cap);

    DayBlock {
        day_label,
        date_label,
        headliner: names.first().map(|n| n.to_uppercase()),
        tiers,
        overflow: (overflow > 0).then(|| OverflowCaption {
            text: format!("...y {overflow} más"),
            hidden_count: overflow,
        }),
    }
}

/// Title font size policy. Sizes step down with character count, and a single
/// very long token clamps the result so it still fits after wrapping.
pub fn title_font_size(name: &str, style: &PosterStyle) -> f32 {
    let len = name.chars().count();
    let mut size = style.title_size_floor;
    for &(max_chars, size_px) in &style.title_sizes {
        if len <= max_chars {
            size = size_px;
            break;
        }
    }

    let longest_token = name
        .split_whitespace()
        .map(|t| t.chars().count())
        .max()
        .unwrap_or(0);
    if longest_token >= style.long_token_min_chars {
        size = size.min(style.long_token_size_cap);
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Artist, Slot};

    fn style() -> PosterStyle {
        PosterStyle::default()
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 6).unwrap()
    }

    fn festival_with(days: u32, artists: Vec<Artist>) -> Festival {
        Festival {
            name: "Neon Nights".into(),
            slug: "neon-nights".into(),
            days,
            stages: vec!["Main".into()],
            artists,
            theme: Theme::City,
            is_public: false,
            likes: 0,
            liked_by: vec![],
            owner_id: "owner".into(),
        }
    }

    fn assigned(name: &str, day_index: usize) -> Artist {
        Artist {
            name: name.into(),
            slot: Some(Slot {
                day_index,
                stage: "Main".into(),
            }),
        }
    }

    #[test]
    fn title_size_table_boundaries() {
        let s = style();
        assert_eq!(title_font_size("abcdefghijkl", &s), 125.0); // 12 chars
        assert_eq!(title_font_size("a".repeat(13).as_str(), &s), 115.0);
        assert_eq!(title_font_size("abcdef ghijk lmnop", &s), 115.0); // 18 chars
        assert_eq!(title_font_size("abcdefg hijkl mnopq", &s), 100.0); // 19 chars
        assert_eq!(title_font_size("abcdefg hijklmnop qrstuv", &s), 100.0); // 24 chars
        assert_eq!(title_font_size("abcdefg hijklmnop qrstuvw", &s), 85.0); // 25 chars
        assert_eq!(title_font_size("abcdefg hijklmnop qrs uvw xyz ab", &s), 85.0); // 32 chars
        assert_eq!(title_font_size("abcdefg hijklmnop qrs uvw xyz abc", &s), 70.0); // 33 chars
    }

    #[test]
    fn long_token_clamps_title_size() {
        let s = style();
        // 14-char single token would otherwise get 115.
        assert_eq!(title_font_size("abcdefghijklmn", &s), 80.0);
        // A long token inside a long title keeps the smaller table size.
        let name = format!("{} fest", "a".repeat(40));
        assert_eq!(title_font_size(&name, &s), 70.0);
    }

    #[test]
    fn empty_lineup_gets_placeholder_and_no_day_blocks() {
        let festival = festival_with(
            3,
            vec![Artist {
                name: "Unassigned".into(),
                slot: None,
            }],
        );
        let scene = compose_poster(&festival, Theme::City, reference(), &style());
        assert!(scene.has_empty_notice());
        assert_eq!(scene.day_blocks().count(), 0);
    }

    #[test]
    fn sixteen_artists_group_into_tiers_with_overflow() {
        let artists: Vec<Artist> = (0..16).map(|i| assigned(&format!("A{i}"), 0)).collect();
        let festival = festival_with(1, artists);
        let scene = compose_poster(&festival, Theme::City, reference(), &style());

        let day = scene.day_blocks().next().unwrap();
        assert_eq!(day.headliner.as_deref(), Some("A0"));
        assert_eq!(day.tiers.len(), 3);
        assert_eq!(day.tiers[0].names, vec!["A1", "A2", "A3"]);
        assert_eq!(day.tiers[0].size_px, 52.0);
        assert_eq!(day.tiers[1].names, vec!["A4", "A5", "A6", "A7", "A8"]);
        assert_eq!(day.tiers[1].size_px, 44.0);
        assert_eq!(day.tiers[2].names, vec!["A9", "A10", "A11", "A12", "A13"]);
        assert_eq!(day.tiers[2].size_px, 38.0);

        let overflow = day.overflow.as_ref().unwrap();
        assert_eq!(overflow.hidden_count, 2);
        assert_eq!(overflow.text, "...y 2 más");
    }

    #[test]
    fn partial_tiers_stop_at_artist_count() {
        let artists: Vec<Artist> = (0..6).map(|i| assigned(&format!("A{i}"), 0)).collect();
        let festival = festival_with(1, artists);
        let scene = compose_poster(&festival, Theme::City, reference(), &style());

        let day = scene.day_blocks().next().unwrap();
        assert_eq!(day.tiers.len(), 2);
        assert_eq!(day.tiers[0].names, vec!["A1", "A2", "A3"]);
        assert_eq!(day.tiers[1].names, vec!["A4", "A5"]);
        assert!(day.overflow.is_none());
    }

    #[test]
    fn one_block_per_day_preserving_insertion_order() {
        let festival = festival_with(
            2,
            vec![
                assigned("Closer", 1),
                assigned("Opener", 0),
                assigned("Second", 0),
            ],
        );
        let scene = compose_poster(&festival, Theme::Beach, reference(), &style());

        let days: Vec<_> = scene.day_blocks().collect();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].headliner.as_deref(), Some("OPENER"));
        assert_eq!(days[0].tiers[0].names, vec!["Second"]);
        assert_eq!(days[1].headliner.as_deref(), Some("CLOSER"));
        // Friday March 6 2026 plus one day.
        assert_eq!(days[0].day_label, "FRI");
        assert_eq!(days[1].day_label, "SAT");
        assert_eq!(days[1].date_label, "MAR 07");
    }

    #[test]
    fn compose_is_idempotent() {
        let artists: Vec<Artist> = (0..5).map(|i| assigned(&format!("A{i}"), 0)).collect();
        let festival = festival_with(2, artists);
        let a = compose_poster(&festival, Theme::Desert, reference(), &style());
        let b = compose_poster(&festival, Theme::Desert, reference(), &style());
        assert_eq!(a, b);
    }

    #[test]
    fn scene_roundtrips_through_json() {
        let festival = festival_with(1, vec![assigned("A0", 0)]);
        let scene = compose_poster(&festival, Theme::City, reference(), &style());
        let s = serde_json::to_string(&scene).unwrap();
        let de: PosterScene = serde_json::from_str(&s).unwrap();
        assert_eq!(de, scene);
    }
}
