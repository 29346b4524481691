//! Playback actions against Spotify.
//!
//! Transport controls try the local backend first and fall back to the Web
//! API. Library and playlist actions always use the Web API.

use std::process::Command;

use chrono::{Local, NaiveDate};
use config::Settings;
use parking_lot::Mutex;
use serde_json::{Value, json};
use spotkeys_engine::{NotificationDispatcher, NotifyKind};
use tracing::debug;

use crate::{
    Error, Result,
    local::{LocalControl, LocalOp},
    web::{WebApi, ids_body, lookup, str_field},
};

/// Repeat modes in the order the toggle walks them backwards.
const REPEAT_STATES: [&str; 3] = ["track", "context", "off"];

/// Page size for playlist listings.
const PAGE_LIMIT: usize = 50;

/// The track currently loaded in the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Track id (no `spotify:track:` prefix).
    pub id: String,
    /// Title.
    pub name: String,
    /// Artist names in credit order.
    pub artists: Vec<String>,
    /// Album title.
    pub album: String,
}

impl Track {
    fn from_item(item: &Value, endpoint: &str) -> Result<Self> {
        let artists = item
            .get("artists")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(|x| x.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            id: str_field(item, "id", endpoint)?.to_string(),
            name: str_field(item, "name", endpoint)?.to_string(),
            artists,
            album: str_field(item, "/album/name", endpoint)?.to_string(),
        })
    }

    fn uri(&self) -> String {
        format!("spotify:track:{}", self.id)
    }
}

#[derive(Debug, Default)]
struct Cache {
    user_id: Option<String>,
    /// (playlist name, playlist id) for the current month.
    monthly: Option<(String, String)>,
}

/// Spotify player with every bindable action.
pub struct Spotify {
    local: LocalControl,
    web: WebApi,
    notifier: NotificationDispatcher,
    cache: Mutex<Cache>,
}

impl Spotify {
    /// Assemble a player from its parts.
    pub fn new(local: LocalControl, web: WebApi, notifier: NotificationDispatcher) -> Self {
        Self {
            local,
            web,
            notifier,
            cache: Mutex::new(Cache::default()),
        }
    }

    /// Production player configured by `settings`.
    pub fn from_settings(settings: &Settings, notifier: NotificationDispatcher) -> Result<Self> {
        let local = LocalControl::from_setting(settings.local_control);
        debug!(backend = %local, "local_control_selected");
        let web = WebApi::from_settings(settings, notifier.clone())?;
        Ok(Self::new(local, web, notifier))
    }

    fn local_or(&self, op: LocalOp, web: impl FnOnce() -> Result<()>) -> Result<()> {
        match self.local.run(op, &self.notifier) {
            Some(result) => result,
            None => web(),
        }
    }

    /// Skip to the next track.
    pub fn next(&self) -> Result<()> {
        self.local_or(LocalOp::Next, || {
            self.web.post("me/player/next", &[], None).map(drop)
        })
    }

    /// Go back to the previous track.
    pub fn previous(&self) -> Result<()> {
        self.local_or(LocalOp::Previous, || {
            self.web.post("me/player/previous", &[], None).map(drop)
        })
    }

    /// Seek to the start of the current track.
    pub fn restart(&self) -> Result<()> {
        self.web
            .put("me/player/seek", &[("position_ms", "0".to_string())], None)
            .map(drop)
    }

    /// Pause playback.
    pub fn pause(&self) -> Result<()> {
        self.local_or(LocalOp::Pause, || {
            self.web.put("me/player/pause", &[], None).map(drop)
        })
    }

    /// Resume playback on the active device.
    ///
    /// Uses playback transfer to the already active device with `play`
    /// set, which resumes reliably.
    pub fn play(&self) -> Result<()> {
        self.local_or(LocalOp::Play, || {
            let device = self.active_device_id()?;
            self.web
                .put(
                    "me/player",
                    &[],
                    Some(json!({ "device_ids": [device], "play": true })),
                )
                .map(drop)
        })
    }

    /// Toggle between playing and paused.
    pub fn toggle_play(&self) -> Result<()> {
        self.local_or(LocalOp::PlayPause, || {
            if self.is_playing()? {
                self.pause()
            } else {
                self.play()
            }
        })
    }

    /// Add the current track to the library. Already-saved tracks are left
    /// alone.
    pub fn save(&self) -> Result<()> {
        let track = self.current_track()?;
        if self.is_saved(&track.id)? {
            self.notifier.send_info(
                "Already saved",
                &format!("{} was already in library.", track.name),
            );
            return Ok(());
        }
        self.web.put("me/tracks", &[], Some(ids_body(&track.id)))?;
        self.notifier.send_notification(
            NotifyKind::Success,
            "Successfully saved",
            &format!("Added {} to library.", track.name),
        );
        Ok(())
    }

    /// Remove the current track from the library.
    pub fn unsave(&self) -> Result<()> {
        let track = self.current_track()?;
        self.web.delete("me/tracks", &[], Some(ids_body(&track.id)))?;
        self.notifier.send_notification(
            NotifyKind::Success,
            "Successfully unsaved",
            &format!("Removed {} from library.", track.name),
        );
        Ok(())
    }

    /// Save or unsave the current track, whichever changes its state.
    pub fn toggle_save(&self) -> Result<()> {
        let track = self.current_track()?;
        if self.is_saved(&track.id)? {
            self.unsave()
        } else {
            self.save()
        }
    }

    /// Flip shuffle.
    pub fn toggle_shuffle(&self) -> Result<()> {
        self.local_or(LocalOp::ToggleShuffle, || {
            let state = self.web.get("me/player", &[])?;
            let enabled = !state
                .get("shuffle_state")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            self.web
                .put("me/player/shuffle", &[("state", enabled.to_string())], None)?;
            let word = if enabled { "enabled" } else { "disabled" };
            self.notifier
                .send_info("Shuffle toggled", &format!("Shuffle now {word}"));
            Ok(())
        })
    }

    /// Step repeat through track, context and off.
    pub fn toggle_repeat(&self) -> Result<()> {
        self.local_or(LocalOp::ToggleRepeat, || {
            let state = self.web.get("me/player", &[])?;
            let current = str_field(&state, "repeat_state", "me/player")?;
            let next = next_repeat_state(current);
            self.web
                .put("me/player/repeat", &[("state", next.to_string())], None)?;
            self.notifier.send_info(
                "Repeat changed",
                &format!("Repeating is now set to: {next}"),
            );
            Ok(())
        })
    }

    /// Show what is playing.
    pub fn show_current_song(&self) -> Result<()> {
        let track = self.current_track()?;
        self.notifier.send_info(
            &track.name,
            &format!("{} - {}", track.artists.join(", "), track.album),
        );
        Ok(())
    }

    /// Move playback to the device named after this machine.
    pub fn play_on_current_device(&self) -> Result<()> {
        let name = device_name()?;
        let devices = self.devices()?;
        let id = devices
            .iter()
            .find(|d| d.get("name").and_then(Value::as_str) == Some(name.as_str()))
            .and_then(|d| d.get("id").and_then(Value::as_str))
            .map(str::to_string);
        let Some(id) = id else {
            self.notifier
                .send_error("Error", &format!("Device {name} not found"));
            return Err(Error::Notified);
        };
        self.web
            .put("me/player", &[], Some(json!({ "device_ids": [id] })))
            .map(drop)
    }

    /// Add the current track to this month's playlist, or remove it if it is
    /// already there. The playlist is created on first use each month.
    pub fn toggle_save_monthly_playlist(&self) -> Result<()> {
        let track = self.current_track()?;
        let playlist = self.monthly_playlist_id()?;
        let endpoint = format!("playlists/{playlist}/tracks");
        if self.playlist_contains(&playlist, &track.id)? {
            self.web.delete(
                &endpoint,
                &[],
                Some(json!({ "tracks": [{ "uri": track.uri() }] })),
            )?;
            self.notifier.send_notification(
                NotifyKind::Success,
                "Successfully removed",
                &format!("Removed {} from playlist.", track.name),
            );
        } else {
            self.web.post(&endpoint, &[("uris", track.uri())], None)?;
            self.notifier.send_notification(
                NotifyKind::Success,
                "Successfully added",
                &format!("Added {} to playlist.", track.name),
            );
        }
        Ok(())
    }

    // ---- queries ----

    /// The track currently loaded.
    pub fn current_track(&self) -> Result<Track> {
        let state = self.web.get("me/player", &[])?;
        let item = state.get("item").filter(|v| !v.is_null()).ok_or(Error::Missing {
            endpoint: "me/player".to_string(),
            field: "item",
        })?;
        Track::from_item(item, "me/player")
    }

    fn is_playing(&self) -> Result<bool> {
        let state = self.web.get("me/player", &[])?;
        Ok(state
            .get("is_playing")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    fn is_saved(&self, id: &str) -> Result<bool> {
        let body = self
            .web
            .get("me/tracks/contains", &[("ids", id.to_string())])?;
        body.get(0).and_then(Value::as_bool).ok_or(Error::Missing {
            endpoint: "me/tracks/contains".to_string(),
            field: "[0]",
        })
    }

    fn devices(&self) -> Result<Vec<Value>> {
        let body = self.web.get("me/player/devices", &[])?;
        Ok(body
            .get("devices")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    fn active_device_id(&self) -> Result<String> {
        let active = self
            .devices()?
            .into_iter()
            .find(|d| d.get("is_active").and_then(Value::as_bool) == Some(true))
            .and_then(|d| d.get("id").and_then(Value::as_str).map(str::to_string));
        match active {
            Some(id) => Ok(id),
            None => {
                self.notifier.send_error("Error", "No device found");
                Err(Error::Notified)
            }
        }
    }

    fn user_id(&self) -> Result<String> {
        if let Some(id) = self.cache.lock().user_id.clone() {
            return Ok(id);
        }
        let me = self.web.get("me", &[])?;
        let id = str_field(&me, "id", "me")?.to_string();
        self.cache.lock().user_id = Some(id.clone());
        Ok(id)
    }

    fn monthly_playlist_id(&self) -> Result<String> {
        let name = monthly_playlist_name(Local::now().date_naive());
        let cached = self.cache.lock().monthly.clone();
        if let Some((cached_name, id)) = cached {
            if cached_name == name {
                return Ok(id);
            }
        }
        let id = match self.find_playlist(&name)? {
            Some(id) => id,
            None => self.create_playlist(&name)?,
        };
        self.cache.lock().monthly = Some((name, id.clone()));
        Ok(id)
    }

    fn find_playlist(&self, name: &str) -> Result<Option<String>> {
        let mut offset = 0;
        loop {
            let page = self.web.get(
                "me/playlists",
                &[
                    ("limit", PAGE_LIMIT.to_string()),
                    ("offset", offset.to_string()),
                ],
            )?;
            let items = page_items(&page);
            let found = items
                .iter()
                .find(|p| {
                    p.get("name")
                        .and_then(Value::as_str)
                        .is_some_and(|n| n.eq_ignore_ascii_case(name))
                })
                .and_then(|p| p.get("id").and_then(Value::as_str));
            if let Some(id) = found {
                return Ok(Some(id.to_string()));
            }
            match next_offset(&page, offset) {
                Some(o) => offset = o,
                None => return Ok(None),
            }
        }
    }

    fn create_playlist(&self, name: &str) -> Result<String> {
        let user = self.user_id()?;
        let endpoint = format!("users/{user}/playlists");
        let body = self
            .web
            .post(&endpoint, &[], Some(json!({ "name": name })))?;
        debug!(name, "monthly_playlist_created");
        Ok(str_field(&body, "id", &endpoint)?.to_string())
    }

    fn playlist_contains(&self, playlist: &str, track_id: &str) -> Result<bool> {
        let endpoint = format!("playlists/{playlist}/tracks");
        let mut offset = 0;
        loop {
            let page = self
                .web
                .get(&endpoint, &[("offset", offset.to_string())])?;
            let present = page_items(&page)
                .iter()
                .any(|i| lookup(i, "/track/id").and_then(Value::as_str) == Some(track_id));
            if present {
                return Ok(true);
            }
            match next_offset(&page, offset) {
                Some(o) => offset = o,
                None => return Ok(false),
            }
        }
    }
}

/// The repeat state after `current`. Unknown states restart the cycle.
pub fn next_repeat_state(current: &str) -> &'static str {
    match REPEAT_STATES.iter().position(|s| *s == current) {
        Some(0) | None => REPEAT_STATES[REPEAT_STATES.len() - 1],
        Some(i) => REPEAT_STATES[i - 1],
    }
}

/// Name of the playlist collecting tracks saved during `date`'s month,
/// e.g. "March 2024".
pub fn monthly_playlist_name(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

fn page_items(page: &Value) -> &[Value] {
    page.get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Offset of the following page, if the response says there is one.
fn next_offset(page: &Value, offset: usize) -> Option<usize> {
    if page.get("next").is_none_or(Value::is_null) {
        return None;
    }
    let step = page
        .get("limit")
        .and_then(Value::as_u64)
        .map(|l| l as usize)
        .unwrap_or_else(|| page_items(page).len());
    (step > 0).then_some(offset + step)
}

/// This machine's host name, which the desktop client uses as device name.
fn device_name() -> Result<String> {
    let out = Command::new("hostname").output()?;
    if !out.status.success() {
        return Err(Error::Local(format!("hostname exited with {}", out.status)));
    }
    Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use spotkeys_engine::test_support::RecordingNotifier;

    use super::*;
    use crate::web::{
        Method,
        tests::{FakeHttp, fresh_tokens, web},
    };

    const PLAYER: &str = r#"{
        "is_playing": true,
        "shuffle_state": false,
        "repeat_state": "context",
        "item": {
            "id": "t1",
            "name": "Song",
            "artists": [{"name": "A"}, {"name": "B"}],
            "album": {"name": "Album"}
        }
    }"#;

    fn spotify() -> (Spotify, Arc<FakeHttp>, Arc<RecordingNotifier>) {
        let (api, http, notes) = web(fresh_tokens());
        let sp = Spotify::new(
            LocalControl::None,
            api,
            NotificationDispatcher::new(notes.clone()),
        );
        (sp, http, notes)
    }

    #[test]
    fn repeat_walks_backwards_through_states() {
        assert_eq!(next_repeat_state("track"), "off");
        assert_eq!(next_repeat_state("off"), "context");
        assert_eq!(next_repeat_state("context"), "track");
        assert_eq!(next_repeat_state("bogus"), "off");
    }

    #[test]
    fn playlist_name_is_month_and_year() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
        assert_eq!(monthly_playlist_name(d), "March 2024");
    }

    #[test]
    fn paging_follows_limit_until_next_is_null() {
        let page = json!({"items": [], "limit": 20, "next": "https://x"});
        assert_eq!(next_offset(&page, 40), Some(60));
        let last = json!({"items": [], "limit": 20, "next": null});
        assert_eq!(next_offset(&last, 40), None);
    }

    #[test]
    fn web_fallback_for_transport_controls() {
        let (sp, http, _) = spotify();
        http.push(204, "");
        http.push(204, "");
        http.push(204, "");
        sp.next().unwrap();
        sp.previous().unwrap();
        sp.restart().unwrap();
        assert_eq!(
            http.requests(),
            vec![
                (Method::Post, "https://api.test/v1/me/player/next".to_string()),
                (Method::Post, "https://api.test/v1/me/player/previous".to_string()),
                (Method::Put, "https://api.test/v1/me/player/seek".to_string()),
            ]
        );
        assert_eq!(
            http.seen.lock()[2].query,
            vec![("position_ms".to_string(), "0".to_string())]
        );
    }

    #[test]
    fn toggle_play_pauses_when_playing() {
        let (sp, http, _) = spotify();
        http.push(200, PLAYER);
        http.push(204, "");
        sp.toggle_play().unwrap();
        assert_eq!(
            http.requests()[1],
            (Method::Put, "https://api.test/v1/me/player/pause".to_string())
        );
    }

    #[test]
    fn play_transfers_to_active_device() {
        let (sp, http, _) = spotify();
        http.push(
            200,
            r#"{"devices": [{"id": "d0", "is_active": false}, {"id": "d1", "is_active": true}]}"#,
        );
        http.push(204, "");
        sp.play().unwrap();
        let seen = http.seen.lock();
        assert_eq!(
            seen[1].body,
            Some(crate::web::Body::Json(json!({"device_ids": ["d1"], "play": true})))
        );
    }

    #[test]
    fn play_without_active_device_notifies() {
        let (sp, http, notes) = spotify();
        http.push(200, r#"{"devices": []}"#);
        assert!(matches!(sp.play(), Err(Error::Notified)));
        assert_eq!(notes.bodies(), vec!["No device found".to_string()]);
    }

    #[test]
    fn save_skips_tracks_already_saved() {
        let (sp, http, notes) = spotify();
        http.push(200, PLAYER);
        http.push(200, "[true]");
        sp.save().unwrap();
        assert_eq!(http.requests().len(), 2);
        assert_eq!(notes.titles(), vec!["Already saved".to_string()]);
    }

    #[test]
    fn save_adds_unsaved_track() {
        let (sp, http, notes) = spotify();
        http.push(200, PLAYER);
        http.push(200, "[false]");
        http.push(200, "");
        sp.save().unwrap();
        assert_eq!(
            http.requests()[2],
            (Method::Put, "https://api.test/v1/me/tracks".to_string())
        );
        assert_eq!(notes.bodies(), vec!["Added Song to library.".to_string()]);
    }

    #[test]
    fn toggle_repeat_sets_next_state() {
        let (sp, http, notes) = spotify();
        http.push(200, PLAYER);
        http.push(204, "");
        sp.toggle_repeat().unwrap();
        assert_eq!(
            http.seen.lock()[1].query,
            vec![("state".to_string(), "track".to_string())]
        );
        assert_eq!(
            notes.bodies(),
            vec!["Repeating is now set to: track".to_string()]
        );
    }

    #[test]
    fn toggle_shuffle_inverts_state() {
        let (sp, http, notes) = spotify();
        http.push(200, PLAYER);
        http.push(204, "");
        sp.toggle_shuffle().unwrap();
        assert_eq!(
            http.seen.lock()[1].query,
            vec![("state".to_string(), "true".to_string())]
        );
        assert_eq!(notes.bodies(), vec!["Shuffle now enabled".to_string()]);
    }

    #[test]
    fn show_current_song_formats_artists_and_album() {
        let (sp, http, notes) = spotify();
        http.push(200, PLAYER);
        sp.show_current_song().unwrap();
        assert_eq!(
            notes.all(),
            vec![(NotifyKind::Info, "Song".to_string(), "A, B - Album".to_string())]
        );
    }

    #[test]
    fn missing_item_is_an_error() {
        let (sp, http, _) = spotify();
        http.push(200, r#"{"is_playing": false, "item": null}"#);
        assert!(matches!(
            sp.current_track(),
            Err(Error::Missing { field: "item", .. })
        ));
    }

    #[test]
    fn monthly_playlist_created_when_absent_then_track_added() {
        let (sp, http, notes) = spotify();
        let name = monthly_playlist_name(Local::now().date_naive());
        http.push(200, PLAYER);
        // Two pages of playlists, neither matching.
        http.push(
            200,
            r#"{"items": [{"id": "p0", "name": "Other"}], "limit": 1, "next": "more"}"#,
        );
        http.push(
            200,
            r#"{"items": [{"id": "p1", "name": "Old"}], "limit": 1, "next": null}"#,
        );
        http.push(200, r#"{"id": "u1"}"#);
        http.push(201, r#"{"id": "pm"}"#);
        http.push(200, r#"{"items": [], "next": null}"#);
        http.push(201, r#"{"snapshot_id": "s"}"#);
        sp.toggle_save_monthly_playlist().unwrap();

        let seen = http.seen.lock();
        assert_eq!(seen[2].query[1], ("offset".to_string(), "1".to_string()));
        assert_eq!(seen[4].url, "https://api.test/v1/users/u1/playlists");
        assert_eq!(seen[4].body, Some(crate::web::Body::Json(json!({ "name": name }))));
        assert_eq!(seen[6].url, "https://api.test/v1/playlists/pm/tracks");
        assert_eq!(
            seen[6].query,
            vec![("uris".to_string(), "spotify:track:t1".to_string())]
        );
        assert_eq!(notes.titles(), vec!["Successfully added".to_string()]);
    }

    #[test]
    fn monthly_playlist_removes_present_track_and_caches_id() {
        let (sp, http, notes) = spotify();
        let name = monthly_playlist_name(Local::now().date_naive());
        http.push(200, PLAYER);
        http.push(
            200,
            &json!({"items": [{"id": "pm", "name": name.to_lowercase()}], "next": null})
                .to_string(),
        );
        http.push(200, r#"{"items": [{"track": {"id": "t1"}}], "next": null}"#);
        http.push(200, r#"{"snapshot_id": "s"}"#);
        sp.toggle_save_monthly_playlist().unwrap();
        assert_eq!(notes.titles(), vec!["Successfully removed".to_string()]);
        assert_eq!(http.requests()[3].0, Method::Delete);

        // Second run reuses the cached playlist id.
        http.push(200, PLAYER);
        http.push(200, r#"{"items": [], "next": null}"#);
        http.push(201, r#"{"snapshot_id": "s"}"#);
        sp.toggle_save_monthly_playlist().unwrap();
        assert_eq!(http.requests().len(), 7);
    }
}
