use chrono::{DateTime, Utc};

use crate::error::{MarqueeError, MarqueeResult};

/// Persisted festival document, field names as stored by the hosted backend.
///
/// Every field tolerates absence; [`Festival::from_doc`] applies the defaulting
/// rules once, at the load boundary, so the rest of the crate can assume a
/// fully-populated record.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct FestivalDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<String>>,
    #[serde(default, rename = "artistas", skip_serializing_if = "Option::is_none")]
    pub artists: Option<Vec<ArtistDoc>>,
    #[serde(default, rename = "fondoPoster", skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, rename = "isPublic")]
    pub is_public: bool,
    #[serde(default)]
    pub likes: i64,
    #[serde(default, rename = "likesBy")]
    pub liked_by: Vec<String>,
    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ArtistDoc {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(default, rename = "dia")]
    pub day: Option<String>,
    #[serde(default, rename = "escenario")]
    pub stage: Option<String>,
}

/// Fixed poster background art styles.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    City,
    Beach,
    Desert,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::City, Theme::Beach, Theme::Desert];

    /// Unknown values fall back to [`Theme::City`]; this never errors.
    pub fn parse(value: &str) -> Self {
        match value {
            "beach" => Theme::Beach,
            "desert" => Theme::Desert,
            _ => Theme::City,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::City => "city",
            Theme::Beach => "beach",
            Theme::Desert => "desert",
        }
    }
}

/// Normalized festival snapshot. Produced by [`Festival::from_doc`]; the
/// layout engine never sees the raw document shape.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Festival {
    pub name: String,
    pub slug: String,
    pub days: u32,
    pub stages: Vec<String>,
    pub artists: Vec<Artist>,
    pub theme: Theme,
    pub is_public: bool,
    pub likes: i64,
    pub liked_by: Vec<String>,
    pub owner_id: String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Artist {
    pub name: String,
    pub slot: Option<Slot>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Slot {
    /// 0-based day index, guaranteed to be within `[0, festival.days)`.
    pub day_index: usize,
    pub stage: String,
}

pub const DEFAULT_NAME: &str = "Mi Festival";
pub const DEFAULT_STAGE: &str = "Escenario Principal";
pub const MIN_DAYS: u32 = 1;
pub const MAX_DAYS: u32 = 30;

impl Festival {
    /// Normalize a raw document, applying all defaulting rules in one place:
    ///
    /// - empty/missing name becomes [`DEFAULT_NAME`];
    /// - missing or zero `days` becomes 1;
    /// - an artist whose `dia` does not parse, or whose day index falls outside
    ///   `[0, days)`, or whose `escenario` is missing, is kept but unassigned.
    pub fn from_doc(doc: FestivalDoc) -> Self {
        let name = doc
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_NAME.to_string());
        let slug = doc.slug.unwrap_or_else(|| slugify(&name));
        let days = doc.days.filter(|&d| d >= MIN_DAYS).unwrap_or(MIN_DAYS);

        let artists = doc
            .artists
            .unwrap_or_default()
            .into_iter()
            .map(|a| {
                let slot = match (a.day.as_deref().and_then(parse_day_label), a.stage) {
                    (Some(day_index), Some(stage)) if day_index < days as usize => {
                        Some(Slot { day_index, stage })
                    }
                    _ => None,
                };
                Artist { name: a.name, slot }
            })
            .collect();

        Self {
            name,
            slug,
            days,
            stages: doc.stages.unwrap_or_default(),
            artists,
            theme: doc.theme.as_deref().map(Theme::parse).unwrap_or_default(),
            is_public: doc.is_public,
            likes: doc.likes,
            liked_by: doc.liked_by,
            owner_id: doc.owner_id.unwrap_or_default(),
        }
    }

    /// Assigned artists for a 0-based day, in original insertion order.
    pub fn assigned_for_day(&self, day_index: usize) -> impl Iterator<Item = &Artist> {
        self.artists.iter().filter(move |a| {
            a.slot
                .as_ref()
                .is_some_and(|s| s.day_index == day_index)
        })
    }

    pub fn has_assigned_artists(&self) -> bool {
        self.artists.iter().any(|a| a.slot.is_some())
    }
}

/// Parse a `"Día {n}"` label into a 0-based day index.
pub fn parse_day_label(label: &str) -> Option<usize> {
    let n: usize = label.strip_prefix("Día ")?.trim().parse().ok()?;
    n.checked_sub(1)
}

/// Display label for a 0-based day index (`0` -> `"Día 1"`).
pub fn day_label(day_index: usize) -> String {
    format!("Día {}", day_index + 1)
}

/// URL slug in the form the original documents carry: lowercase, spaces to
/// dashes, everything outside `[a-z0-9_-]` stripped.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

pub fn validate_name(name: &str) -> MarqueeResult<()> {
    if name.trim().is_empty() {
        return Err(MarqueeError::validation("festival name must be non-empty"));
    }
    Ok(())
}

pub fn validate_days(days: u32) -> MarqueeResult<()> {
    if !(MIN_DAYS..=MAX_DAYS).contains(&days) {
        return Err(MarqueeError::validation(format!(
            "festival days must be within [{MIN_DAYS}, {MAX_DAYS}], got {days}"
        )));
    }
    Ok(())
}
