use crate::domain::model::{MarkerGroup, RankedFilm, UserContext};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

const LEAFLET_VERSION: &str = "1.9.4";
const SAME_COUNTRY_LAYER: &str = "Film locations in the same country";
const OTHER_LAYER: &str = "Closest film locations";
const SAME_COUNTRY_COLOR: &str = "#5b396b";
const OTHER_COLOR: &str = "#72b026";

pub fn map_file_name(year: &str) -> String {
    format!("{}_movies_map.html", year)
}

#[derive(Debug, Serialize)]
struct MarkerData {
    lat: f64,
    lon: f64,
    popup: String,
    same_country: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupCounts {
    pub same_country: usize,
    pub other: usize,
}

/// 產生 Leaflet HTML 地圖
#[derive(Debug, Clone)]
pub struct MapRenderer {
    zoom: u8,
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self { zoom: 5 }
    }
}

impl MapRenderer {
    pub fn new(zoom: u8) -> Self {
        Self { zoom }
    }

    pub fn group_counts(user: &UserContext, films: &[RankedFilm]) -> GroupCounts {
        films
            .iter()
            .fold(GroupCounts::default(), |mut counts, ranked| {
                match MarkerGroup::classify(&ranked.film, user.country.as_deref()) {
                    MarkerGroup::SameCountry => counts.same_country += 1,
                    MarkerGroup::Other => counts.other += 1,
                }
                counts
            })
    }

    pub fn render(&self, user: &UserContext, films: &[RankedFilm]) -> Result<String> {
        self.render_at(user, films, Utc::now())
    }

    pub fn render_at(
        &self,
        user: &UserContext,
        films: &[RankedFilm],
        generated_at: DateTime<Utc>,
    ) -> Result<String> {
        let markers: Vec<MarkerData> = films
            .iter()
            .map(|ranked| MarkerData {
                lat: ranked.coordinates.lat,
                lon: ranked.coordinates.lon,
                popup: popup_html(ranked),
                same_country: MarkerGroup::classify(&ranked.film, user.country.as_deref())
                    == MarkerGroup::SameCountry,
            })
            .collect();

        // 避免標題裡的 "</script>" 提前結束 script 區塊
        let markers_json = serde_json::to_string(&markers)?.replace("</", "<\\/");

        let title = format!("Film locations of {}", escape_html(&user.year));
        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<meta name="generator" content="film-map {version}">
<meta name="generated-at" content="{generated_at}">
<title>{title}</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@{leaflet}/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@{leaflet}/dist/leaflet.js"></script>
<style>html, body, #map {{ width: 100%; height: 100%; margin: 0; padding: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
var map = L.map("map").setView([{lat}, {lon}], {zoom});
L.tileLayer("https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", {{
  maxZoom: 18,
  attribution: "&copy; OpenStreetMap contributors"
}}).addTo(map);
L.marker([{lat}, {lon}]).bindPopup("You're here!").addTo(map);
var markers = {markers};
var other = L.featureGroup();
var sameCountry = L.featureGroup();
markers.forEach(function (m) {{
  L.circleMarker([m.lat, m.lon], {{
    radius: 8,
    color: m.same_country ? "{same_color}" : "{other_color}",
    fillOpacity: 0.8
  }}).bindPopup(m.popup).addTo(m.same_country ? sameCountry : other);
}});
other.addTo(map);
sameCountry.addTo(map);
L.control.layers(null, {{
  "{other_layer}": other,
  "{same_layer}": sameCountry
}}).addTo(map);
</script>
</body>
</html>
"#,
            version = env!("CARGO_PKG_VERSION"),
            generated_at = generated_at.to_rfc3339(),
            title = title,
            leaflet = LEAFLET_VERSION,
            lat = user.location.lat,
            lon = user.location.lon,
            zoom = self.zoom,
            markers = markers_json,
            same_color = SAME_COUNTRY_COLOR,
            other_color = OTHER_COLOR,
            other_layer = OTHER_LAYER,
            same_layer = SAME_COUNTRY_LAYER,
        );

        Ok(html)
    }
}

fn popup_html(ranked: &RankedFilm) -> String {
    let mut popup = escape_html(&ranked.film.title);
    if let Some(episode) = &ranked.film.episode {
        popup.push_str("<br>");
        popup.push_str(&escape_html(episode));
    }
    popup.push_str(&format!(
        "<br>{}<br>{:.1} km",
        escape_html(&ranked.film.place),
        ranked.distance_km
    ));
    popup
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
