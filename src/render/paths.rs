//! SVG path strings for branches, confidence bars and gridlines.

/// Path data of one branch: the stem from the parent and, for internal
/// nodes in rectangular/radial layouts, the bar joining its children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchPaths {
    pub stem: String,
    pub bar: String,
}

/// Horizontal stem of a rectangular branch.
///
/// The tip end is nudged down by 0.01px: a perfectly horizontal path cannot
/// carry a linear gradient.
pub fn rect_stem(x_base: f64, y_base: f64, x_tip: f64, y_tip: f64, stem_offset: f64) -> String {
    format!(
        "M {},{} L {},{}",
        x_base - stem_offset,
        y_base,
        x_tip,
        y_tip + 0.01
    )
}

/// Vertical bar spanning a node's children.
pub fn rect_bar(x_tip: f64, y_start: f64, y_end: f64) -> String {
    format!("M {x_tip},{y_start} L {x_tip},{y_end}")
}

/// Radial stem; the base is pulled back along the ray by `stem_offset`.
pub fn radial_stem(
    x_base: f64,
    y_base: f64,
    x_tip: f64,
    y_tip: f64,
    angle: f64,
    stem_offset: f64,
) -> String {
    format!(
        "M {} {} L {} {}",
        x_base - stem_offset * angle.sin(),
        y_base - stem_offset * angle.cos(),
        x_tip,
        y_tip
    )
}

/// Arc joining the children of a radial internal node.
pub fn radial_arc(start: [f64; 2], radii: [f64; 2], large_arc: bool, end: [f64; 2]) -> String {
    format!(
        "M {} {} A {} {} 0 {} 1 {},{}",
        start[0],
        start[1],
        radii[0],
        radii[1],
        u8::from(large_arc),
        end[0],
        end[1]
    )
}

/// Straight branch used by the unrooted and clock layouts.
pub fn straight(x_base: f64, y_base: f64, x_tip: f64, y_tip: f64) -> String {
    format!("M {x_base},{y_base} L {x_tip},{y_tip}")
}

/// Two-point line, used for confidence bars and regression lines.
pub fn line(from: [f64; 2], to: [f64; 2]) -> String {
    format!("M {},{} L {},{}", from[0], from[1], to[0], to[1])
}

/// Nearly full circle around `centre` passing through `(x, centre.1)`.
pub fn circle(centre: [f64; 2], x: f64, ry: f64) -> String {
    format!(
        "M {} {} A {} {} 0 1 0 {} {}",
        x,
        centre[1],
        x - centre[0],
        ry,
        x,
        centre[1] + 0.001
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_stem_offset_and_nudge() {
        assert_eq!(rect_stem(10.0, 20.0, 30.0, 20.0, 1.0), "M 9,20 L 30,20.01");
    }

    #[test]
    fn test_radial_arc_flags() {
        let small = radial_arc([0.0, 1.0], [5.0, 5.0], false, [2.0, 3.0]);
        let large = radial_arc([0.0, 1.0], [5.0, 5.0], true, [2.0, 3.0]);

        assert_eq!(small, "M 0 1 A 5 5 0 0 1 2,3");
        assert_eq!(large, "M 0 1 A 5 5 0 1 1 2,3");
    }

    #[test]
    fn test_radial_stem_along_ray() {
        let path = radial_stem(0.0, 0.0, 0.0, 10.0, 0.0, 2.0);
        assert_eq!(path, "M 0 -2 L 0 10");
    }
}
