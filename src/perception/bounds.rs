use crate::perception::types::Geometry;

/// Parses an Android `[x1,y1][x2,y2]` rectangle.
///
/// Returns `None` unless the string holds exactly four integers and the box
/// has positive width and height. Corners whose size or midpoint overflow
/// `i64` also yield `None`.
pub fn parse_bounds(raw: &str) -> Option<Geometry> {
    let coords: Vec<i64> = raw
        .replace("][", ",")
        .replace(['[', ']'], "")
        .split(',')
        .map(|p| p.trim().parse::<i64>())
        .collect::<Result<_, _>>()
        .ok()?;

    let &[x1, y1, x2, y2] = coords.as_slice() else {
        return None;
    };

    let (w, h) = (x2.checked_sub(x1)?, y2.checked_sub(y1)?);
    if w <= 0 || h <= 0 {
        return None;
    }

    Some(Geometry {
        center: (x1.checked_add(x2)?.div_euclid(2), y1.checked_add(y2)?.div_euclid(2)),
        size: (w, h),
    })
}
