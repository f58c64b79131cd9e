//! Room extraction from floorplan SVG annotations.
//!
//! Rooms are `<g class="Space <type>">` groups whose first child element
//! carries the outline in a `points` attribute.

use std::fs;
use std::path::Path;

use roxmltree::{Document, Node};

use crate::error::{io_err, FloorplanError, Result};
use crate::raster::RoomPolygon;
use crate::scale::Scale;

const GROUP_TAG: &str = "g";
const ROOM_CLASS_PREFIX: &str = "Space ";

/// A room outline in the annotation's own coordinate space.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomShape {
    pub room_type: String,
    pub points: Vec<(f64, f64)>,
}

impl RoomShape {
    /// Map onto the label grid, truncating each scaled coordinate.
    pub fn to_grid(&self, scale: Scale) -> RoomPolygon {
        RoomPolygon::new(
            self.points
                .iter()
                .map(|&(x, y)| scale.to_cell(x, y))
                .collect(),
        )
    }
}

/// Room type of `node` if it is a room group.
fn room_type<'a>(node: &Node<'a, '_>) -> Option<&'a str> {
    if !node.is_element() || node.tag_name().name() != GROUP_TAG {
        return None;
    }
    node.attribute("class")?.strip_prefix(ROOM_CLASS_PREFIX)
}

/// Parse an SVG `points` list. Tokens without a comma are skipped; a
/// coordinate that is not a finite number is an error.
pub fn parse_points(points: &str, room_type: &str) -> Result<Vec<(f64, f64)>> {
    let bad = |token: &str| FloorplanError::BadCoordinate {
        room_type: room_type.to_owned(),
        token: token.to_owned(),
    };

    points
        .split_whitespace()
        .filter_map(|token| token.split_once(',').map(|pair| (token, pair)))
        .map(|(token, (x, y))| {
            let coord = |v: &str| {
                v.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| bad(token))
            };
            Ok((coord(x)?, coord(y)?))
        })
        .collect()
}

/// Every room group in document order.
pub fn extract_rooms(doc: &Document) -> Result<Vec<RoomShape>> {
    let mut rooms = Vec::new();

    for node in doc.descendants() {
        let Some(room_type) = room_type(&node) else {
            continue;
        };

        let child = node
            .children()
            .find(|c| c.is_element())
            .ok_or_else(|| FloorplanError::MissingChild {
                room_type: room_type.to_owned(),
            })?;

        let points = child
            .attribute("points")
            .ok_or_else(|| FloorplanError::MissingPoints {
                room_type: room_type.to_owned(),
                tag: child.tag_name().name().to_owned(),
            })?;

        rooms.push(RoomShape {
            room_type: room_type.to_owned(),
            points: parse_points(points, room_type)?,
        });
    }

    Ok(rooms)
}

/// Room types in document order, without reading any geometry.
pub fn room_types<'a>(doc: &'a Document) -> Vec<&'a str> {
    doc.descendants().filter_map(|node| room_type(&node)).collect()
}

pub fn parse_rooms(text: &str) -> Result<Vec<RoomShape>> {
    let doc = Document::parse(text)?;
    extract_rooms(&doc)
}

pub fn read_rooms<P: AsRef<Path>>(path: P) -> Result<Vec<RoomShape>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(io_err(path))?;
    parse_rooms(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100">
  <g id="Model" class="Model">
    <g class="Floor">
      <g id="a" class="Space Kitchen">
        <!-- outline -->
        <polygon points="0,0 100,0 100,50 0,50 " />
        <g class="Wall"><polygon points="1,1 2,2 3,3" /></g>
      </g>
      <g class="Space Bedroom Closet">
        <polygon points="4 100,50.5 150.25,50 150,100" />
      </g>
      <g class="SpaceKitchen"><polygon points="0,0 1,1 2,0" /></g>
      <g class="Wall External"><polygon points="0,0 1,1 2,0" /></g>
    </g>
  </g>
</svg>"#;

    #[test]
    fn rooms_are_extracted_in_document_order() {
        let rooms = parse_rooms(PLAN).unwrap();
        assert_eq!(rooms.len(), 2);

        assert_eq!(rooms[0].room_type, "Kitchen");
        assert_eq!(
            rooms[0].points,
            vec![(0.0, 0.0), (100.0, 0.0), (100.0, 50.0), (0.0, 50.0)]
        );

        // the bare count token "4" is ignored
        assert_eq!(rooms[1].room_type, "Bedroom Closet");
        assert_eq!(rooms[1].points, vec![(100.0, 50.5), (150.25, 50.0), (150.0, 100.0)]);
    }

    #[test]
    fn room_types_ignore_geometry() {
        let doc = Document::parse(PLAN).unwrap();
        assert_eq!(room_types(&doc), vec!["Kitchen", "Bedroom Closet"]);
    }

    #[test]
    fn scaled_vertices_are_truncated() {
        let rooms = parse_rooms(PLAN).unwrap();
        let poly = rooms[1].to_grid(Scale::new(0.5, 0.5));
        assert_eq!(poly.xs().collect::<Vec<_>>(), vec![50, 75, 75]);
        assert_eq!(poly.ys().collect::<Vec<_>>(), vec![25, 25, 50]);
    }

    #[test]
    fn missing_points_is_fatal() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><g class="Space Hall"><path d="M0 0"/></g></svg>"#;
        match parse_rooms(svg) {
            Err(FloorplanError::MissingPoints { room_type, tag }) => {
                assert_eq!(room_type, "Hall");
                assert_eq!(tag, "path");
            }
            other => panic!("expected MissingPoints, got {other:?}"),
        }
    }

    #[test]
    fn empty_room_group_is_fatal() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><g class="Space Hall"> </g></svg>"#;
        assert!(matches!(
            parse_rooms(svg),
            Err(FloorplanError::MissingChild { .. })
        ));
    }

    #[test]
    fn bad_numbers_and_bad_xml_are_fatal() {
        let svg = r#"<svg><g class="Space Hall"><polygon points="1,x 2,2"/></g></svg>"#;
        assert!(matches!(
            parse_rooms(svg),
            Err(FloorplanError::BadCoordinate { .. })
        ));
        assert!(matches!(parse_rooms("<svg><g>"), Err(FloorplanError::Xml(_))));

        for points in ["NaN,1 2,2 3,3", "0,0 10,0 5,inf", "0,0 -infinity,1 2,2"] {
            let svg = format!(r#"<svg><g class="Space Hall"><polygon points="{points}"/></g></svg>"#);
            assert!(
                matches!(parse_rooms(&svg), Err(FloorplanError::BadCoordinate { .. })),
                "{points} should be rejected"
            );
        }
    }
}
