//! Typed spatial features parsed from a scenario document.

use serde::{Deserialize, Serialize};
use wisim_common::Position;

/// Spatial feature category.
///
/// The set is closed: category strings outside it map to
/// [`Category::Unknown`] rather than failing, so a document authored for a
/// newer tool version still parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Room,
    Wall,
    Door,
    Seat,
    Table,
    Sniffer,
    AccessPoint,
    Terminal,
    Unknown,
}

impl Category {
    /// Parse a category string from the document. Matching is
    /// case-insensitive; anything unrecognized becomes `Unknown`.
    pub fn parse(s: &str) -> Category {
        match s.to_lowercase().as_str() {
            "room" => Category::Room,
            "wall" => Category::Wall,
            "door" => Category::Door,
            "seat" => Category::Seat,
            "table" => Category::Table,
            "sniffer" => Category::Sniffer,
            "accesspoint" | "access_point" | "ap" => Category::AccessPoint,
            "terminal" => Category::Terminal,
            _ => Category::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Room => "Room",
            Category::Wall => "Wall",
            Category::Door => "Door",
            Category::Seat => "Seat",
            Category::Table => "Table",
            Category::Sniffer => "Sniffer",
            Category::AccessPoint => "AccessPoint",
            Category::Terminal => "Terminal",
            Category::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature geometry.
///
/// Only the two shapes the environment builder consumes are modeled. Other
/// geometry types in the document are rejected per feature at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// A single position.
    Point(Position),
    /// One outer ring plus optional hole rings, each an ordered vertex list.
    Polygon { rings: Vec<Vec<Position>> },
}

impl Geometry {
    /// The position if this is a point geometry.
    pub fn as_point(&self) -> Option<Position> {
        match self {
            Geometry::Point(p) => Some(*p),
            Geometry::Polygon { .. } => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::Polygon { .. } => "Polygon",
        }
    }
}

/// One parsed feature record.
///
/// Immutable once parsed; ownership moves into the environment builder.
/// `geometry` is `None` when the document entry carried no geometry object,
/// which the builder treats as "use the default position" for node
/// categories. Duplicate ids across features are permitted; ids are labels,
/// nothing indexes by them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub experiment_id: String,
    pub category: Category,
    pub geometry: Option<Geometry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_known() {
        assert_eq!(Category::parse("Room"), Category::Room);
        assert_eq!(Category::parse("wall"), Category::Wall);
        assert_eq!(Category::parse("DOOR"), Category::Door);
        assert_eq!(Category::parse("AccessPoint"), Category::AccessPoint);
        assert_eq!(Category::parse("access_point"), Category::AccessPoint);
        assert_eq!(Category::parse("ap"), Category::AccessPoint);
        assert_eq!(Category::parse("terminal"), Category::Terminal);
    }

    #[test]
    fn test_category_parse_unknown_is_not_an_error() {
        assert_eq!(Category::parse("elevator"), Category::Unknown);
        assert_eq!(Category::parse(""), Category::Unknown);
        assert_eq!(Category::parse("Rooms"), Category::Unknown);
    }

    #[test]
    fn test_geometry_as_point() {
        let p = Geometry::Point(Position::new(1.0, 2.0));
        assert_eq!(p.as_point(), Some(Position::new(1.0, 2.0)));

        let poly = Geometry::Polygon {
            rings: vec![vec![Position::new(0.0, 0.0), Position::new(1.0, 0.0)]],
        };
        assert_eq!(poly.as_point(), None);
        assert_eq!(poly.type_name(), "Polygon");
    }
}
