use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde_json::{Map, Value, json};

use crate::{
    auth::CurrentUser,
    error::{MarqueeError, MarqueeResult},
    model::{
        DEFAULT_STAGE, Festival, FestivalDoc, Theme, day_label, slugify, validate_days,
        validate_name,
    },
};

pub const FESTIVALS: &str = "festivals";

/// One stored document: opaque id plus JSON fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Equality filters plus a single order/limit, the query shape the hosted
/// backend supports.
#[derive(Clone, Debug, Default)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order_desc(mut self, field: &str) -> Self {
        self.order_by = Some((field.to_string(), SortOrder::Descending));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

/// Contract over the hosted document database. Eventually consistent;
/// `update` merges top-level fields into the existing document.
pub trait DocumentStore: Send + Sync {
    fn get(&self, collection: &str, id: &str) -> MarqueeResult<Option<Document>>;
    fn insert(&self, collection: &str, fields: Map<String, Value>) -> MarqueeResult<String>;
    fn update(&self, collection: &str, id: &str, patch: Map<String, Value>) -> MarqueeResult<()>;
    fn delete(&self, collection: &str, id: &str) -> MarqueeResult<()>;
    fn query(&self, collection: &str, query: &Query) -> MarqueeResult<Vec<Document>>;
}

/// In-memory document store used by tests and offline tooling.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, BTreeMap<String, Map<String, Value>>>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, id: &str) -> MarqueeResult<Option<Document>> {
        let collections = self.collections.lock().expect("store poisoned");
        Ok(collections.get(collection).and_then(|c| {
            c.get(id).map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            })
        }))
    }

    fn insert(&self, collection: &str, fields: Map<String, Value>) -> MarqueeResult<String> {
        let id = format!("doc-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let mut collections = self.collections.lock().expect("store poisoned");
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);
        Ok(id)
    }

    fn update(&self, collection: &str, id: &str, patch: Map<String, Value>) -> MarqueeResult<()> {
        let mut collections = self.collections.lock().expect("store poisoned");
        let doc = collections
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| MarqueeError::not_found(format!("{collection}/{id}")))?;
        for (k, v) in patch {
            doc.insert(k, v);
        }
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> MarqueeResult<()> {
        let mut collections = self.collections.lock().expect("store poisoned");
        collections
            .get_mut(collection)
            .and_then(|c| c.remove(id))
            .ok_or_else(|| MarqueeError::not_found(format!("{collection}/{id}")))?;
        Ok(())
    }

    fn query(&self, collection: &str, query: &Query) -> MarqueeResult<Vec<Document>> {
        let collections = self.collections.lock().expect("store poisoned");
        let mut out: Vec<Document> = collections
            .get(collection)
            .map(|c| {
                c.iter()
                    .filter(|(_, fields)| {
                        query
                            .filters
                            .iter()
                            .all(|(k, v)| fields.get(k) == Some(v))
                    })
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some((field, order)) = &query.order_by {
            out.sort_by(|a, b| {
                let cmp = cmp_values(a.fields.get(field), b.fields.get(field));
                match order {
                    SortOrder::Ascending => cmp,
                    SortOrder::Descending => cmp.reverse(),
                }
            });
        }
        if let Some(n) = query.limit {
            out.truncate(n);
        }
        Ok(out)
    }
}

fn cmp_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering as O;
    match (a, b) {
        (None, None) => O::Equal,
        (None, Some(_)) => O::Less,
        (Some(_), None) => O::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(O::Equal),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => O::Equal,
        },
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExploreFeed {
    /// Public festivals by like count.
    Top,
    /// Public festivals by creation time.
    Recent,
}

/// Festival operations over a [`DocumentStore`]: the service layer every page
/// of the original app goes through.
pub struct FestivalStore<S> {
    store: S,
}

impl<S: DocumentStore> FestivalStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn create(&self, user: &CurrentUser, name: &str, days: u32) -> MarqueeResult<String> {
        validate_name(name)?;
        validate_days(days)?;

        let name = name.trim();
        let fields = json_object(json!({
            "name": name,
            "slug": slugify(name),
            "days": days,
            "stages": [DEFAULT_STAGE],
            "artistas": [],
            "fondoPoster": Theme::City.as_str(),
            "isPublic": false,
            "likes": 0,
            "likesBy": [],
            "userId": user.storage_id(),
            "createdAt": Utc::now().to_rfc3339(),
        }))?;
        self.store.insert(FESTIVALS, fields)
    }

    pub fn load(&self, id: &str) -> MarqueeResult<Festival> {
        let doc = self
            .store
            .get(FESTIVALS, id)?
            .ok_or_else(|| MarqueeError::not_found(format!("{FESTIVALS}/{id}")))?;
        doc_to_festival(&doc)
    }

    pub fn rename(&self, user: &CurrentUser, id: &str, name: &str) -> MarqueeResult<()> {
        validate_name(name)?;
        self.owned(user, id)?;
        let name = name.trim();
        let patch = json_object(json!({ "name": name, "slug": slugify(name) }))?;
        self.store.update(FESTIVALS, id, patch)
    }

    pub fn set_days(&self, user: &CurrentUser, id: &str, days: u32) -> MarqueeResult<()> {
        validate_days(days)?;
        self.owned(user, id)?;
        self.store
            .update(FESTIVALS, id, json_object(json!({ "days": days }))?)
    }

    pub fn set_theme(&self, user: &CurrentUser, id: &str, theme: Theme) -> MarqueeResult<()> {
        self.owned(user, id)?;
        self.store.update(
            FESTIVALS,
            id,
            json_object(json!({ "fondoPoster": theme.as_str() }))?,
        )
    }

    pub fn set_public(&self, user: &CurrentUser, id: &str, public: bool) -> MarqueeResult<()> {
        let festival = self.owned(user, id)?;
        // Publishing also materializes the like counter for the explore feeds.
        let patch = json_object(json!({ "isPublic": public, "likes": festival.likes }))?;
        self.store.update(FESTIVALS, id, patch)
    }

    pub fn add_stage(&self, user: &CurrentUser, id: &str, stage: &str) -> MarqueeResult<()> {
        if stage.trim().is_empty() {
            return Err(MarqueeError::validation("stage name must be non-empty"));
        }
        let festival = self.owned(user, id)?;
        let mut stages = festival.stages;
        if !stages.iter().any(|s| s == stage) {
            stages.push(stage.to_string());
        }
        self.store
            .update(FESTIVALS, id, json_object(json!({ "stages": stages }))?)
    }

    /// Add an artist to the unassigned pool. Duplicate names are a no-op.
    pub fn add_artist(&self, user: &CurrentUser, id: &str, name: &str) -> MarqueeResult<()> {
        if name.trim().is_empty() {
            return Err(MarqueeError::validation("artist name must be non-empty"));
        }
        let festival = self.owned(user, id)?;
        if festival.artists.iter().any(|a| a.name == name) {
            return Ok(());
        }
        let mut artists = artists_wire(&festival);
        artists.push(json!({ "nombre": name, "dia": null, "escenario": null }));
        self.write_artists(id, artists)
    }

    /// Place an artist into a day/stage slot, replacing any previous slot.
    pub fn assign_artist(
        &self,
        user: &CurrentUser,
        id: &str,
        name: &str,
        day_index: usize,
        stage: &str,
    ) -> MarqueeResult<()> {
        let festival = self.owned(user, id)?;
        if day_index >= festival.days as usize {
            return Err(MarqueeError::validation(format!(
                "day index {day_index} outside festival days [0, {})",
                festival.days
            )));
        }

        let mut artists: Vec<Value> = artists_wire(&festival)
            .into_iter()
            .filter(|a| a.get("nombre").and_then(Value::as_str) != Some(name))
            .collect();
        artists.push(json!({
            "nombre": name,
            "dia": day_label(day_index),
            "escenario": stage,
        }));
        self.write_artists(id, artists)
    }

    pub fn unassign_artist(&self, user: &CurrentUser, id: &str, name: &str) -> MarqueeResult<()> {
        let festival = self.owned(user, id)?;
        let artists: Vec<Value> = artists_wire(&festival)
            .into_iter()
            .map(|mut a| {
                if a.get("nombre").and_then(Value::as_str) == Some(name) {
                    a = json!({ "nombre": name, "dia": null, "escenario": null });
                }
                a
            })
            .collect();
        self.write_artists(id, artists)
    }

    pub fn remove_artist(&self, user: &CurrentUser, id: &str, name: &str) -> MarqueeResult<()> {
        let festival = self.owned(user, id)?;
        let artists: Vec<Value> = artists_wire(&festival)
            .into_iter()
            .filter(|a| a.get("nombre").and_then(Value::as_str) != Some(name))
            .collect();
        self.write_artists(id, artists)
    }

    /// Like/unlike from any signed-in user; returns the new liked state.
    pub fn toggle_like(&self, user: &CurrentUser, id: &str) -> MarqueeResult<bool> {
        let festival = self.load(id)?;
        let uid = user.storage_id().to_string();
        let liked = festival.liked_by.iter().any(|u| *u == uid);

        let mut liked_by = festival.liked_by;
        let likes = if liked {
            liked_by.retain(|u| *u != uid);
            festival.likes - 1
        } else {
            liked_by.push(uid);
            festival.likes + 1
        };
        let patch = json_object(json!({ "likes": likes, "likesBy": liked_by }))?;
        self.store.update(FESTIVALS, id, patch)?;
        Ok(!liked)
    }

    pub fn delete(&self, user: &CurrentUser, id: &str) -> MarqueeResult<()> {
        self.owned(user, id)?;
        self.store.delete(FESTIVALS, id)
    }

    pub fn my_festivals(&self, user: &CurrentUser) -> MarqueeResult<Vec<(String, Festival)>> {
        let docs = self.store.query(
            FESTIVALS,
            &Query::new().filter("userId", user.storage_id()),
        )?;
        docs.iter()
            .map(|d| Ok((d.id.clone(), doc_to_festival(d)?)))
            .collect()
    }

    pub fn explore(&self, feed: ExploreFeed) -> MarqueeResult<Vec<(String, Festival)>> {
        let order_field = match feed {
            ExploreFeed::Top => "likes",
            ExploreFeed::Recent => "createdAt",
        };
        let docs = self.store.query(
            FESTIVALS,
            &Query::new()
                .filter("isPublic", true)
                .order_desc(order_field)
                .limit(20),
        )?;
        docs.iter()
            .map(|d| Ok((d.id.clone(), doc_to_festival(d)?)))
            .collect()
    }

    /// Festivals the user has liked, regardless of owner.
    pub fn favorites(&self, user: &CurrentUser) -> MarqueeResult<Vec<(String, Festival)>> {
        let uid = user.storage_id();
        let docs = self.store.query(FESTIVALS, &Query::new())?;
        Ok(docs
            .iter()
            .filter_map(|d| match doc_to_festival(d) {
                Ok(f) if f.liked_by.iter().any(|u| u == uid) => Some((d.id.clone(), f)),
                _ => None,
            })
            .collect())
    }

    fn owned(&self, user: &CurrentUser, id: &str) -> MarqueeResult<Festival> {
        let festival = self.load(id)?;
        if festival.owner_id != user.storage_id() {
            return Err(MarqueeError::forbidden(format!(
                "festival {id} is not owned by the current user"
            )));
        }
        Ok(festival)
    }

    fn write_artists(&self, id: &str, artists: Vec<Value>) -> MarqueeResult<()> {
        self.store
            .update(FESTIVALS, id, json_object(json!({ "artistas": artists }))?)
    }
}

fn doc_to_festival(doc: &Document) -> MarqueeResult<Festival> {
    let parsed: FestivalDoc = serde_json::from_value(Value::Object(doc.fields.clone()))
        .map_err(|e| MarqueeError::serde(format!("festival document {}: {e}", doc.id)))?;
    Ok(Festival::from_doc(parsed))
}

fn artists_wire(festival: &Festival) -> Vec<Value> {
    festival
        .artists
        .iter()
        .map(|a| match &a.slot {
            Some(slot) => json!({
                "nombre": a.name,
                "dia": day_label(slot.day_index),
                "escenario": slot.stage,
            }),
            None => json!({ "nombre": a.name, "dia": null, "escenario": null }),
        })
        .collect()
}

fn json_object(value: Value) -> MarqueeResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(MarqueeError::serde("expected a JSON object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> CurrentUser {
        CurrentUser {
            id: id.to_string(),
            display_name: id.to_string(),
            is_guest: false,
        }
    }

    fn service() -> FestivalStore<MemoryStore> {
        FestivalStore::new(MemoryStore::new())
    }

    #[test]
    fn create_validates_name_and_days() {
        let svc = service();
        let owner = user("u1");
        assert!(svc.create(&owner, "   ", 3).is_err());
        assert!(svc.create(&owner, "Fest", 0).is_err());
        assert!(svc.create(&owner, "Fest", 31).is_err());
        assert!(svc.create(&owner, "Fest", 30).is_ok());
    }

    #[test]
    fn create_then_load_roundtrip() {
        let svc = service();
        let id = svc.create(&user("u1"), "  Neon Nights ", 3).unwrap();
        let festival = svc.load(&id).unwrap();
        assert_eq!(festival.name, "Neon Nights");
        assert_eq!(festival.slug, "neon-nights");
        assert_eq!(festival.days, 3);
        assert_eq!(festival.stages, vec![DEFAULT_STAGE.to_string()]);
        assert_eq!(festival.theme, Theme::City);
        assert!(!festival.is_public);
    }

    #[test]
    fn guest_festivals_share_the_guest_bucket() {
        let svc = service();
        let id = svc.create(&CurrentUser::guest(), "Guest Fest", 1).unwrap();
        assert_eq!(svc.load(&id).unwrap().owner_id, "invitado");
    }

    #[test]
    fn assign_and_unassign_artist() {
        let svc = service();
        let owner = user("u1");
        let id = svc.create(&owner, "Fest", 2).unwrap();
        svc.add_artist(&owner, &id, "Aurora Club").unwrap();
        svc.assign_artist(&owner, &id, "Aurora Club", 1, DEFAULT_STAGE)
            .unwrap();

        let festival = svc.load(&id).unwrap();
        let slot = festival.artists[0].slot.as_ref().unwrap();
        assert_eq!(slot.day_index, 1);
        assert_eq!(slot.stage, DEFAULT_STAGE);

        svc.unassign_artist(&owner, &id, "Aurora Club").unwrap();
        assert!(svc.load(&id).unwrap().artists[0].slot.is_none());
    }

    #[test]
    fn assign_rejects_out_of_range_day() {
        let svc = service();
        let owner = user("u1");
        let id = svc.create(&owner, "Fest", 2).unwrap();
        svc.add_artist(&owner, &id, "A").unwrap();
        assert!(svc.assign_artist(&owner, &id, "A", 2, DEFAULT_STAGE).is_err());
    }

    #[test]
    fn non_owner_edits_are_forbidden() {
        let svc = service();
        let id = svc.create(&user("u1"), "Fest", 1).unwrap();
        let err = svc.rename(&user("u2"), &id, "Mine Now").unwrap_err();
        assert!(matches!(err, MarqueeError::Forbidden(_)));
        let err = svc.delete(&user("u2"), &id).unwrap_err();
        assert!(matches!(err, MarqueeError::Forbidden(_)));
    }

    #[test]
    fn like_toggles_count_and_membership() {
        let svc = service();
        let owner = user("u1");
        let fan = user("fan");
        let id = svc.create(&owner, "Fest", 1).unwrap();

        assert!(svc.toggle_like(&fan, &id).unwrap());
        let festival = svc.load(&id).unwrap();
        assert_eq!(festival.likes, 1);
        assert_eq!(festival.liked_by, vec!["fan".to_string()]);

        assert!(!svc.toggle_like(&fan, &id).unwrap());
        let festival = svc.load(&id).unwrap();
        assert_eq!(festival.likes, 0);
        assert!(festival.liked_by.is_empty());
    }

    #[test]
    fn explore_orders_public_festivals_by_likes() {
        let svc = service();
        let owner = user("u1");
        let quiet = svc.create(&owner, "Quiet", 1).unwrap();
        let popular = svc.create(&owner, "Popular", 1).unwrap();
        let _private = svc.create(&owner, "Private", 1).unwrap();
        svc.set_public(&owner, &quiet, true).unwrap();
        svc.set_public(&owner, &popular, true).unwrap();
        for i in 0..3 {
            svc.toggle_like(&user(&format!("fan{i}")), &popular).unwrap();
        }

        let feed = svc.explore(ExploreFeed::Top).unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].1.name, "Popular");
        assert_eq!(feed[1].1.name, "Quiet");
    }

    #[test]
    fn favorites_follow_liked_by_membership() {
        let svc = service();
        let owner = user("u1");
        let fan = user("fan");
        let a = svc.create(&owner, "A", 1).unwrap();
        let _b = svc.create(&owner, "B", 1).unwrap();
        svc.toggle_like(&fan, &a).unwrap();

        let favs = svc.favorites(&fan).unwrap();
        assert_eq!(favs.len(), 1);
        assert_eq!(favs[0].0, a);
    }

    #[test]
    fn memory_store_update_merges_and_missing_is_not_found() {
        let store = MemoryStore::new();
        let id = store
            .insert("c", json_object(json!({ "a": 1, "b": 2 })).unwrap())
            .unwrap();
        store
            .update("c", &id, json_object(json!({ "b": 3 })).unwrap())
            .unwrap();
        let doc = store.get("c", &id).unwrap().unwrap();
        assert_eq!(doc.fields.get("a"), Some(&json!(1)));
        assert_eq!(doc.fields.get("b"), Some(&json!(3)));

        let err = store
            .update("c", "missing", Map::new())
            .unwrap_err();
        assert!(matches!(err, MarqueeError::NotFound(_)));
    }

    #[test]
    fn query_filters_orders_and_limits() {
        let store = MemoryStore::new();
        for (name, flag, n) in [("x", true, 1), ("y", true, 5), ("z", false, 9)] {
            store
                .insert(
                    "c",
                    json_object(json!({ "name": name, "flag": flag, "n": n })).unwrap(),
                )
                .unwrap();
        }
        let docs = store
            .query(
                "c",
                &Query::new().filter("flag", true).order_desc("n").limit(1),
            )
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].fields.get("name"), Some(&json!("y")));
    }
}
