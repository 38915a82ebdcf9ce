//! Découpage de géométries sur l'emprise d'une grille
//!
//! Intersection booléenne (`geo::BooleanOps`) pour les surfaces,
//! Cohen-Sutherland pour les segments de lignes.

use geo::{
    Area, BooleanOps, BoundingRect, Coord, Geometry, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Polygon, Rect,
};

fn contains(rect: &Rect, p: &Coord) -> bool {
    p.x >= rect.min().x && p.x <= rect.max().x && p.y >= rect.min().y && p.y <= rect.max().y
}

/// Découpe une géométrie sur un rectangle
///
/// Retourne `None` si la géométrie est entièrement hors du rectangle.
/// Une ligne qui sort puis rentre devient une `MultiLineString`.
pub fn clip_to_rect(geom: &Geometry, rect: &Rect) -> Option<Geometry> {
    match geom {
        Geometry::Point(p) => contains(rect, &p.0).then(|| geom.clone()),
        Geometry::MultiPoint(mp) => {
            let kept: Vec<_> = mp.iter().filter(|p| contains(rect, &p.0)).copied().collect();
            (!kept.is_empty()).then(|| Geometry::MultiPoint(MultiPoint::new(kept)))
        }
        Geometry::Line(l) => clip_linestring(&LineString::new(vec![l.start, l.end]), rect),
        Geometry::LineString(ls) => clip_linestring(ls, rect),
        Geometry::MultiLineString(mls) => {
            let parts: Vec<LineString> = mls
                .iter()
                .flat_map(|ls| linestring_parts(ls, rect))
                .collect();
            (!parts.is_empty()).then(|| Geometry::MultiLineString(MultiLineString::new(parts)))
        }
        Geometry::Polygon(poly) => polygonal(clip_polygon(poly, rect)),
        Geometry::MultiPolygon(mp) => {
            let parts: Vec<Polygon> = mp.iter().flat_map(|p| clip_polygon(p, rect)).collect();
            (!parts.is_empty()).then(|| Geometry::MultiPolygon(MultiPolygon::new(parts)))
        }
        Geometry::Rect(r) => polygonal(clip_polygon(&r.to_polygon(), rect)),
        Geometry::Triangle(t) => polygonal(clip_polygon(&t.to_polygon(), rect)),
        Geometry::GeometryCollection(gc) => {
            let parts: Vec<Geometry> = gc.iter().filter_map(|g| clip_to_rect(g, rect)).collect();
            (!parts.is_empty()).then(|| Geometry::GeometryCollection(parts.into_iter().collect()))
        }
    }
}

fn clip_linestring(ls: &LineString, rect: &Rect) -> Option<Geometry> {
    let mut parts = linestring_parts(ls, rect);
    match parts.len() {
        0 => None,
        1 => parts.pop().map(Geometry::LineString),
        _ => Some(Geometry::MultiLineString(MultiLineString::new(parts))),
    }
}

/// Morceaux continus d'une ligne à l'intérieur du rectangle
fn linestring_parts(ls: &LineString, rect: &Rect) -> Vec<LineString> {
    let mut parts = Vec::new();
    let mut current: Vec<Coord> = Vec::new();

    for window in ls.0.windows(2) {
        match clip_segment(window[0], window[1], rect) {
            Some((c0, c1)) => {
                if current.last() != Some(&c0) {
                    if current.len() >= 2 {
                        parts.push(LineString::new(std::mem::take(&mut current)));
                    }
                    current.clear();
                    current.push(c0);
                }
                current.push(c1);
            }
            None => {
                if current.len() >= 2 {
                    parts.push(LineString::new(std::mem::take(&mut current)));
                }
                current.clear();
            }
        }
    }
    if current.len() >= 2 {
        parts.push(LineString::new(current));
    }
    parts
}

/// Parties surfaciques d'un polygone à l'intérieur du rectangle
///
/// Un polygone concave qui sort puis rentre donne plusieurs parties.
fn clip_polygon(poly: &Polygon, rect: &Rect) -> Vec<Polygon> {
    let Some(bbox) = poly.bounding_rect() else {
        return Vec::new();
    };
    if contains(rect, &bbox.min()) && contains(rect, &bbox.max()) {
        return vec![poly.clone()];
    }
    if bbox.max().x < rect.min().x
        || bbox.min().x > rect.max().x
        || bbox.max().y < rect.min().y
        || bbox.min().y > rect.max().y
    {
        return Vec::new();
    }

    poly.intersection(&rect.to_polygon())
        .into_iter()
        .filter(|part| part.unsigned_area() > 0.0)
        .collect()
}

fn polygonal(mut parts: Vec<Polygon>) -> Option<Geometry> {
    match parts.len() {
        0 => None,
        1 => parts.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(MultiPolygon::new(parts))),
    }
}

// Codes de région Cohen-Sutherland
const INSIDE: u8 = 0b0000;
const LEFT: u8 = 0b0001;
const RIGHT: u8 = 0b0010;
const BOTTOM: u8 = 0b0100;
const TOP: u8 = 0b1000;

fn outcode(p: Coord, rect: &Rect) -> u8 {
    let mut code = INSIDE;
    if p.x < rect.min().x {
        code |= LEFT;
    }
    if p.x > rect.max().x {
        code |= RIGHT;
    }
    if p.y < rect.min().y {
        code |= BOTTOM;
    }
    if p.y > rect.max().y {
        code |= TOP;
    }
    code
}

fn clip_segment(mut p0: Coord, mut p1: Coord, rect: &Rect) -> Option<(Coord, Coord)> {
    let mut code0 = outcode(p0, rect);
    let mut code1 = outcode(p1, rect);

    loop {
        if (code0 | code1) == 0 {
            return Some((p0, p1));
        }
        if (code0 & code1) != 0 {
            return None;
        }

        let code_out = if code0 != 0 { code0 } else { code1 };
        let dx = p1.x - p0.x;
        let dy = p1.y - p0.y;

        let new_point = if code_out & TOP != 0 {
            let t = (rect.max().y - p0.y) / dy;
            Coord { x: p0.x + t * dx, y: rect.max().y }
        } else if code_out & BOTTOM != 0 {
            let t = (rect.min().y - p0.y) / dy;
            Coord { x: p0.x + t * dx, y: rect.min().y }
        } else if code_out & RIGHT != 0 {
            let t = (rect.max().x - p0.x) / dx;
            Coord { x: rect.max().x, y: p0.y + t * dy }
        } else {
            let t = (rect.min().x - p0.x) / dx;
            Coord { x: rect.min().x, y: p0.y + t * dy }
        };

        if code_out == code0 {
            p0 = new_point;
            code0 = outcode(p0, rect);
        } else {
            p1 = new_point;
            code1 = outcode(p1, rect);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, line_string, polygon, Point};

    fn bounds() -> Rect {
        Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 10.0 })
    }

    #[test]
    fn test_point_inside_and_outside() {
        assert!(clip_to_rect(&Geometry::Point(Point::new(5.0, 5.0)), &bounds()).is_some());
        assert!(clip_to_rect(&Geometry::Point(Point::new(15.0, 5.0)), &bounds()).is_none());
    }

    #[test]
    fn test_polygon_partial() {
        let poly = Geometry::Polygon(polygon![
            (x: -5.0, y: -5.0),
            (x: 5.0, y: -5.0),
            (x: 5.0, y: 5.0),
            (x: -5.0, y: 5.0),
            (x: -5.0, y: -5.0),
        ]);
        let Some(Geometry::Polygon(clipped)) = clip_to_rect(&poly, &bounds()) else {
            panic!("expected a polygon");
        };
        assert!((clipped.unsigned_area() - 25.0).abs() < 1e-9);
        for c in clipped.exterior().coords() {
            assert!(contains(&bounds(), c));
        }
    }

    #[test]
    fn test_concave_polygon_splits_in_two() {
        // U dont la barre passe sous le rectangle: seuls les bras restent
        let rect = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 40.0, y: 40.0 });
        let u = Geometry::Polygon(polygon![
            (x: 2.0, y: -5.0),
            (x: 38.0, y: -5.0),
            (x: 38.0, y: 10.0),
            (x: 36.0, y: 10.0),
            (x: 36.0, y: -2.0),
            (x: 4.0, y: -2.0),
            (x: 4.0, y: 10.0),
            (x: 2.0, y: 10.0),
            (x: 2.0, y: -5.0),
        ]);
        let Some(Geometry::MultiPolygon(parts)) = clip_to_rect(&u, &rect) else {
            panic!("expected a multipolygon");
        };
        assert_eq!(parts.0.len(), 2);
        assert!((parts.unsigned_area() - 40.0).abs() < 1e-9);
        for part in &parts.0 {
            let bbox = part.bounding_rect().unwrap();
            assert!(bbox.max().x <= 4.0 + 1e-9 || bbox.min().x >= 36.0 - 1e-9);
        }
    }

    #[test]
    fn test_polygon_outside() {
        let poly = Geometry::Polygon(polygon![
            (x: 20.0, y: 20.0),
            (x: 30.0, y: 20.0),
            (x: 30.0, y: 30.0),
            (x: 20.0, y: 20.0),
        ]);
        assert!(clip_to_rect(&poly, &bounds()).is_none());
    }

    #[test]
    fn test_line_partial() {
        let line = Geometry::LineString(line_string![(x: -5.0, y: 5.0), (x: 15.0, y: 5.0)]);
        let Some(Geometry::LineString(clipped)) = clip_to_rect(&line, &bounds()) else {
            panic!("expected a linestring");
        };
        assert_eq!(clipped.0.len(), 2);
        assert!((clipped.0[0].x - 0.0).abs() < 1e-10);
        assert!((clipped.0[1].x - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_line_exits_and_reenters() {
        let line = Geometry::LineString(line_string![
            (x: 2.0, y: 5.0),
            (x: 2.0, y: 15.0),
            (x: 8.0, y: 15.0),
            (x: 8.0, y: 5.0),
        ]);
        let Some(Geometry::MultiLineString(parts)) = clip_to_rect(&line, &bounds()) else {
            panic!("expected a multilinestring");
        };
        assert_eq!(parts.0.len(), 2);
    }

    #[test]
    fn test_multipoint_filtered() {
        let mp = Geometry::MultiPoint(MultiPoint::from(vec![(1.0, 1.0), (20.0, 1.0)]));
        let Some(Geometry::MultiPoint(kept)) = clip_to_rect(&mp, &bounds()) else {
            panic!("expected a multipoint");
        };
        assert_eq!(kept.0.len(), 1);
    }
}
