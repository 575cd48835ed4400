//! Well-Known Text geometry
//!
//! Parses the six simple-feature types found in sketch tables and renders them
//! back to compact WKT (`POINT(10 20)`, `LINESTRING(0 0, 1 1)`). The serde
//! representation is a GeoJSON geometry object:
//!
//! ```text
//! {"type": "Point", "coordinates": [10.0, 20.0]}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{GeosketchError, GeosketchResult};

/// A coordinate tuple: x y, optionally followed by z and m.
pub type Position = Vec<f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    Polygon(Vec<Vec<Position>>),
    MultiPoint(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

/// Coarse geometry class used by the export filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) | Geometry::MultiPoint(_) => GeometryKind::Point,
            Geometry::LineString(_) | Geometry::MultiLineString(_) => GeometryKind::Line,
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) => GeometryKind::Polygon,
        }
    }

    /// GeoJSON type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }
}

/// Parse a WKT string.
pub fn parse(text: &str) -> GeosketchResult<Geometry> {
    let mut parser = Parser { src: text, pos: 0 };
    let geometry = parser.geometry()?;
    parser.skip_ws();
    if parser.pos != parser.src.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(geometry)
}

impl std::str::FromStr for Geometry {
    type Err = GeosketchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> GeosketchError {
        GeosketchError::Wkt {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest().chars().next()
    }

    fn expect(&mut self, c: char) -> GeosketchResult<()> {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    /// Consume `c` if it is next; report whether it was.
    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn word(&mut self) -> String {
        self.skip_ws();
        let len = self
            .rest()
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(self.rest().len());
        let word = self.rest()[..len].to_ascii_uppercase();
        self.pos += len;
        word
    }

    fn geometry(&mut self) -> GeosketchResult<Geometry> {
        let start = self.pos;
        let keyword = self.word();

        // Dimension markers ("POINT Z (1 2 3)") carry no extra meaning here
        let save = self.pos;
        if !matches!(self.word().as_str(), "Z" | "M" | "ZM") {
            self.pos = save;
        }

        let save = self.pos;
        if self.word() == "EMPTY" {
            self.pos = start;
            return Err(self.error("EMPTY geometries are not supported"));
        }
        self.pos = save;

        match keyword.as_str() {
            "POINT" => {
                self.expect('(')?;
                let p = self.position()?;
                self.expect(')')?;
                Ok(Geometry::Point(p))
            }
            "LINESTRING" => Ok(Geometry::LineString(self.positions()?)),
            "POLYGON" => Ok(Geometry::Polygon(self.rings()?)),
            "MULTIPOINT" => Ok(Geometry::MultiPoint(self.multi_point()?)),
            "MULTILINESTRING" => Ok(Geometry::MultiLineString(self.rings()?)),
            "MULTIPOLYGON" => {
                self.expect('(')?;
                let mut polygons = vec![self.rings()?];
                while self.eat(',') {
                    polygons.push(self.rings()?);
                }
                self.expect(')')?;
                Ok(Geometry::MultiPolygon(polygons))
            }
            "" => {
                self.pos = start;
                Err(self.error("expected a geometry keyword"))
            }
            other => {
                self.pos = start;
                Err(self.error(&format!("unsupported geometry type {other}")))
            }
        }
    }

    fn number(&mut self) -> GeosketchResult<f64> {
        self.skip_ws();
        let len = self
            .rest()
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
            .unwrap_or(self.rest().len());
        if len == 0 {
            return Err(self.error("expected a number"));
        }
        let value: f64 = self.rest()[..len]
            .parse()
            .map_err(|_| self.error("invalid number"))?;
        if !value.is_finite() {
            return Err(self.error("coordinate must be finite"));
        }
        self.pos += len;
        Ok(value)
    }

    fn starts_number(&mut self) -> bool {
        matches!(self.peek(), Some(c) if c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
    }

    fn position(&mut self) -> GeosketchResult<Position> {
        let mut position = vec![self.number()?];
        while self.starts_number() {
            if position.len() == 4 {
                return Err(self.error("too many ordinates"));
            }
            position.push(self.number()?);
        }
        if position.len() < 2 {
            return Err(self.error("a position needs at least two ordinates"));
        }
        Ok(position)
    }

    /// `(x y, x y, ...)`
    fn positions(&mut self) -> GeosketchResult<Vec<Position>> {
        self.expect('(')?;
        let mut positions = vec![self.position()?];
        while self.eat(',') {
            positions.push(self.position()?);
        }
        self.expect(')')?;
        Ok(positions)
    }

    /// `((x y, ...), (x y, ...))`
    fn rings(&mut self) -> GeosketchResult<Vec<Vec<Position>>> {
        self.expect('(')?;
        let mut rings = vec![self.positions()?];
        while self.eat(',') {
            rings.push(self.positions()?);
        }
        self.expect(')')?;
        Ok(rings)
    }

    /// Accepts both `(1 2, 3 4)` and `((1 2), (3 4))`.
    fn multi_point(&mut self) -> GeosketchResult<Vec<Position>> {
        self.expect('(')?;
        let mut points = Vec::new();
        loop {
            if self.eat('(') {
                points.push(self.position()?);
                self.expect(')')?;
            } else {
                points.push(self.position()?);
            }
            if !self.eat(',') {
                break;
            }
        }
        self.expect(')')?;
        Ok(points)
    }
}

struct Coords<'a>(&'a [Position]);

impl fmt::Display for Coords<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, position) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            for (j, ordinate) in position.iter().enumerate() {
                if j > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{ordinate}")?;
            }
        }
        Ok(())
    }
}

fn write_rings(f: &mut fmt::Formatter<'_>, rings: &[Vec<Position>]) -> fmt::Result {
    f.write_str("(")?;
    for (i, ring) in rings.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "({})", Coords(ring))?;
    }
    f.write_str(")")
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Geometry::Point(p) => write!(f, "POINT({})", Coords(std::slice::from_ref(p))),
            Geometry::LineString(line) => write!(f, "LINESTRING({})", Coords(line)),
            Geometry::Polygon(rings) => {
                f.write_str("POLYGON")?;
                write_rings(f, rings)
            }
            Geometry::MultiPoint(points) => {
                f.write_str("MULTIPOINT(")?;
                for (i, p) in points.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "({})", Coords(std::slice::from_ref(p)))?;
                }
                f.write_str(")")
            }
            Geometry::MultiLineString(lines) => {
                f.write_str("MULTILINESTRING")?;
                write_rings(f, lines)
            }
            Geometry::MultiPolygon(polygons) => {
                f.write_str("MULTIPOLYGON(")?;
                for (i, rings) in polygons.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_rings(f, rings)?;
                }
                f.write_str(")")
            }
        }
    }
}
