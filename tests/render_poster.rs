use chrono::NaiveDate;

use marquee::{
    CpuRasterizer, Festival, FestivalDoc, PosterAssets, PosterStyle, Theme, compose_poster,
    render_poster_png,
};

fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn digest_u64(bytes: &[u8]) -> u64 {
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    for chunk in bytes.chunks(8) {
        let mut v = 0u64;
        for (i, &b) in chunk.iter().enumerate() {
            v |= (b as u64) << (i * 8);
        }
        state = mix64(state ^ v);
    }
    state
}

fn sample_festival() -> Festival {
    let doc: FestivalDoc = serde_json::from_value(serde_json::json!({
        "name": "Neon Nights",
        "days": 2,
        "stages": ["Escenario Principal"],
        "artistas": [
            { "nombre": "Aurora Club", "dia": "Día 1", "escenario": "Escenario Principal" },
            { "nombre": "Static Bloom", "dia": "Día 1", "escenario": "Escenario Principal" },
            { "nombre": "Velvet Orbit", "dia": "Día 1", "escenario": "Escenario Principal" },
            { "nombre": "Paper Tigers", "dia": "Día 2", "escenario": "Escenario Principal" }
        ],
        "fondoPoster": "city",
        "userId": "u1"
    }))
    .unwrap();
    Festival::from_doc(doc)
}

fn prepared_assets(style: &PosterStyle) -> Option<PosterAssets> {
    match PosterAssets::prepare("assets", style) {
        Ok(assets) => Some(assets),
        Err(err) => {
            eprintln!("skipping: {err}");
            None
        }
    }
}

fn reference() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 6).unwrap()
}

#[test]
fn poster_render_is_deterministic_and_nonempty() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let style = PosterStyle::default();
    let Some(assets) = prepared_assets(&style) else {
        return;
    };
    let festival = sample_festival();
    let scene = compose_poster(&festival, Theme::City, reference(), &style);

    let mut rasterizer = CpuRasterizer::new();
    let a = rasterizer.render(&scene, &assets).unwrap();
    let b = rasterizer.render(&scene, &assets).unwrap();

    assert_eq!(a.width, 1080);
    assert_eq!(a.height, 1920);
    assert!(a.premultiplied);
    assert_eq!(digest_u64(&a.data), digest_u64(&b.data));
    assert!(a.data.iter().any(|&x| x != 0));
}

#[test]
fn every_theme_renders() {
    let style = PosterStyle::default();
    let Some(assets) = prepared_assets(&style) else {
        return;
    };
    let festival = sample_festival();
    let mut rasterizer = CpuRasterizer::new();

    let mut digests = Vec::new();
    for theme in Theme::ALL {
        let scene = compose_poster(&festival, theme, reference(), &style);
        let frame = rasterizer.render(&scene, &assets).unwrap();
        digests.push(digest_u64(&frame.data));
    }
    // Distinct artwork per theme must produce distinct pixels.
    digests.sort_unstable();
    digests.dedup();
    assert_eq!(digests.len(), Theme::ALL.len());
}

#[test]
fn empty_lineup_renders_without_error() {
    let style = PosterStyle::default();
    let Some(assets) = prepared_assets(&style) else {
        return;
    };
    let festival = Festival::from_doc(FestivalDoc {
        name: Some("Festival Sin Nadie".into()),
        days: Some(3),
        ..FestivalDoc::default()
    });
    let scene = compose_poster(&festival, Theme::Desert, reference(), &style);
    assert!(scene.has_empty_notice());

    let mut rasterizer = CpuRasterizer::new();
    let frame = rasterizer.render(&scene, &assets).unwrap();
    assert!(frame.data.iter().any(|&x| x != 0));
}

#[test]
fn render_poster_png_produces_png_bytes() {
    let style = PosterStyle::default();
    let Some(assets) = prepared_assets(&style) else {
        return;
    };
    let festival = sample_festival();
    let png = render_poster_png(&festival, festival.theme, reference(), &style, &assets).unwrap();
    assert_eq!(&png[1..4], b"PNG");
}
