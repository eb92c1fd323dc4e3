use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, instrument, warn, Level};

use crate::error::{Error, Result};
use crate::render::escape_html;

pub const EVENT_IMAGE_FALLBACK: &str =
    "https://via.placeholder.com/320x180?text=Imagem+do+Evento";

/// Marker icon geometry: a 60px circle with a 10px pointer, anchored at the
/// pointer tip (bottom center).
pub const ICON_SIZE: u32 = 60;
pub const ICON_POINTER_HEIGHT: u32 = 10;

const SINGLE_MARKER_ZOOM: u8 = 12;
const BOUNDS_PADDING: u32 = 50;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MapEvent {
    pub id: u64,
    pub name: String,
    pub date: String,
    pub location: Coordinates,
    pub image: Option<String>,
    pub description: String,
    pub kind: String,
}

/// What the mapping provider needs to draw one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub position: Coordinates,
    pub title: String,
    pub icon: MarkerIcon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerIcon {
    pub width: u32,
    pub height: u32,
    pub anchor_x: u32,
    pub anchor_y: u32,
    /// Text drawn in the circle center; clusters carry their count here.
    pub label: Option<u32>,
}

impl MarkerIcon {
    pub fn event() -> Self {
        Self {
            width: ICON_SIZE,
            height: ICON_SIZE + ICON_POINTER_HEIGHT,
            anchor_x: ICON_SIZE / 2,
            anchor_y: ICON_SIZE + ICON_POINTER_HEIGHT,
            label: None,
        }
    }

    pub fn cluster(count: u32) -> Self {
        Self {
            label: Some(count),
            ..Self::event()
        }
    }
}

/// A group of nearby markers collapsed into one clustered marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub position: Coordinates,
    pub count: usize,
}

/// Viewport fitting all markers: a single marker gets a close fixed zoom,
/// several get their bounding box with padding.
#[derive(Debug, Clone, PartialEq)]
pub enum Viewport {
    Single { center: Coordinates, zoom: u8 },
    Bounds { south_west: Coordinates, north_east: Coordinates, padding: u32 },
}

/// The map overlay's event set and its derived marker data. The public
/// surface stays small so events can later come from an API instead of the
/// built-in list.
#[derive(Debug, Default)]
pub struct EventMap {
    events: Vec<MapEvent>,
}

impl EventMap {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(skip_all, fields(name = event.name), err(Debug, level = Level::DEBUG))]
    pub fn add_event(&mut self, event: MapEvent) -> Result<()> {
        if event.name.trim().is_empty() {
            return Err(Error::InvalidMapEvent(
                "name and location are required".to_string(),
            ));
        }
        info!("adding map event");
        self.events.push(event);
        Ok(())
    }

    pub fn remove_event(&mut self, id: u64) -> bool {
        let before = self.events.len();
        self.events.retain(|event| event.id != id);

        let removed = self.events.len() != before;
        if !removed {
            warn!(id, "no map event with this id");
        }
        removed
    }

    pub fn events(&self) -> &[MapEvent] {
        &self.events
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.events
            .iter()
            .map(|event| Marker {
                position: event.location,
                title: event.name.clone(),
                icon: MarkerIcon::event(),
            })
            .collect()
    }

    /// Grid clustering: markers within the same `cell_size` degree cell
    /// collapse into one cluster positioned at their centroid.
    pub fn clusters(&self, cell_size: f64) -> Vec<Cluster> {
        let mut cells: BTreeMap<(i64, i64), Vec<Coordinates>> = BTreeMap::new();

        for event in &self.events {
            let key = (
                (event.location.lat / cell_size).floor() as i64,
                (event.location.lng / cell_size).floor() as i64,
            );
            cells.entry(key).or_default().push(event.location);
        }

        cells
            .into_values()
            .map(|members| {
                let count = members.len();
                let lat = members.iter().map(|c| c.lat).sum::<f64>() / count as f64;
                let lng = members.iter().map(|c| c.lng).sum::<f64>() / count as f64;
                Cluster {
                    position: Coordinates { lat, lng },
                    count,
                }
            })
            .collect()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        let first = self.events.first()?;

        if self.events.len() == 1 {
            return Some(Viewport::Single {
                center: first.location,
                zoom: SINGLE_MARKER_ZOOM,
            });
        }

        let mut south = first.location.lat;
        let mut north = first.location.lat;
        let mut west = first.location.lng;
        let mut east = first.location.lng;

        for event in &self.events[1..] {
            south = south.min(event.location.lat);
            north = north.max(event.location.lat);
            west = west.min(event.location.lng);
            east = east.max(event.location.lng);
        }

        Some(Viewport::Bounds {
            south_west: Coordinates { lat: south, lng: west },
            north_east: Coordinates { lat: north, lng: east },
            padding: BOUNDS_PADDING,
        })
    }
}

/// Info-window markup for one event, with escaped fields and the placeholder
/// image when none is set.
pub fn info_window_html(event: &MapEvent) -> String {
    let name = escape_html(&event.name);
    let date = escape_html(&event.date);
    let kind = escape_html(&event.kind);
    let description = escape_html(&event.description);
    let image = escape_html(event.image.as_deref().unwrap_or(EVENT_IMAGE_FALLBACK));

    format!(
        r#"<div class="map-info-window">
  <div class="map-info-media">
    <img src="{image}" alt="{name}" />
    <div class="map-info-kind">{kind}</div>
  </div>
  <div class="map-info-body">
    <h3>{name}</h3>
    <p class="map-info-date">{date}</p>
    <p>{description}</p>
  </div>
</div>
"#
    )
}

/// Bounded wait for the external map library, replacing an unbounded poll.
#[derive(Debug, Clone, Copy)]
pub struct MapReadiness {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for MapReadiness {
    fn default() -> Self {
        Self {
            attempts: 50,
            delay: Duration::from_millis(100),
        }
    }
}

impl MapReadiness {
    /// Polls `probe` until it reports ready or the attempt budget runs out.
    pub async fn wait_until_ready(&self, probe: impl Fn() -> bool) -> Result<()> {
        for _ in 0..self.attempts {
            if probe() {
                return Ok(());
            }
            tokio::time::sleep(self.delay).await;
        }
        Err(Error::MapNotReady(self.attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn event(id: u64, name: &str, lat: f64, lng: f64) -> MapEvent {
        MapEvent {
            id,
            name: name.to_string(),
            date: "Setembro 2026".to_string(),
            location: Coordinates { lat, lng },
            image: None,
            description: "Encontro anual".to_string(),
            kind: "Encontros estáticos".to_string(),
        }
    }

    #[test]
    fn test_add_requires_name() {
        let mut map = EventMap::new();
        assert!(map.add_event(event(1, "  ", 38.8, -9.38)).is_err());
        assert!(map.add_event(event(1, "Festival", 38.8, -9.38)).is_ok());
        assert_eq!(map.events().len(), 1);
    }

    #[test]
    fn test_remove_event() {
        let mut map = EventMap::new();
        map.add_event(event(1, "A", 38.8, -9.38)).unwrap();
        map.add_event(event(2, "B", 38.78, -9.49)).unwrap();

        assert!(map.remove_event(1));
        assert!(!map.remove_event(1));
        assert_eq!(map.markers().len(), 1);
        assert_eq!(map.markers()[0].title, "B");
    }

    #[test]
    fn test_marker_icon_geometry() {
        let icon = MarkerIcon::event();
        assert_eq!((icon.width, icon.height), (60, 70));
        assert_eq!((icon.anchor_x, icon.anchor_y), (30, 70));

        assert_eq!(MarkerIcon::cluster(4).label, Some(4));
    }

    #[test]
    fn test_clusters_group_nearby_markers() {
        let mut map = EventMap::new();
        map.add_event(event(1, "Sintra A", 38.80, -9.38)).unwrap();
        map.add_event(event(2, "Sintra B", 38.81, -9.39)).unwrap();
        map.add_event(event(3, "Porto", 41.15, -8.61)).unwrap();

        let mut clusters = map.clusters(0.5);
        clusters.sort_by(|a, b| b.count.cmp(&a.count));

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].count, 2);
        assert!((clusters[0].position.lat - 38.805).abs() < 1e-9);
    }

    #[test]
    fn test_viewport_single_and_bounds() {
        let mut map = EventMap::new();
        assert_eq!(map.viewport(), None);

        map.add_event(event(1, "A", 38.8, -9.38)).unwrap();
        assert_eq!(
            map.viewport(),
            Some(Viewport::Single {
                center: Coordinates { lat: 38.8, lng: -9.38 },
                zoom: 12
            })
        );

        map.add_event(event(2, "B", 38.78, -9.49)).unwrap();
        let Some(Viewport::Bounds { south_west, north_east, padding }) = map.viewport() else {
            panic!("expected bounds");
        };
        assert_eq!(south_west, Coordinates { lat: 38.78, lng: -9.49 });
        assert_eq!(north_east, Coordinates { lat: 38.8, lng: -9.38 });
        assert_eq!(padding, 50);
    }

    #[test]
    fn test_info_window_escapes_and_falls_back() {
        let mut hostile = event(1, "<b>Festival</b>", 38.8, -9.38);
        hostile.image = None;

        let html = info_window_html(&hostile);
        assert!(html.contains("&lt;b&gt;Festival&lt;&#x2F;b&gt;"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("via.placeholder.com"));
    }

    #[tokio::test]
    async fn test_readiness_bounded() {
        let readiness = MapReadiness {
            attempts: 3,
            delay: Duration::from_millis(1),
        };

        assert!(readiness.wait_until_ready(|| true).await.is_ok());

        let result = readiness.wait_until_ready(|| false).await;
        assert!(matches!(result, Err(Error::MapNotReady(3))));
    }
}
