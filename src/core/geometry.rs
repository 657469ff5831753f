use serde::{Deserialize, Serialize};

/// Axis-aligned box in page space, top-left origin (y grows downward).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Build a box from an `(x, y, width, height)` region.
    pub fn from_region(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Smallest box enclosing every box in `boxes`, `None` when empty.
    pub fn union_all<'a, I>(boxes: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a BBox>,
    {
        boxes
            .into_iter()
            .fold(None, |acc: Option<BBox>, bbox| match acc {
                Some(acc) => Some(acc.union(bbox)),
                None => Some(*bbox),
            })
    }

    pub fn padded(&self, padding: f32) -> Self {
        Self {
            x0: self.x0 - padding,
            y0: self.y0 - padding,
            x1: self.x1 + padding,
            y1: self.y1 + padding,
        }
    }

    /// Closed-interval overlap test; touching edges and zero-area boxes count.
    pub fn intersects(&self, other: &Self) -> bool {
        self.x0 <= other.x1 && other.x0 <= self.x1 && self.y0 <= other.y1 && other.y0 <= self.y1
    }

    pub fn contains(&self, other: &Self) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    pub fn encloses_all<'a, I>(&self, boxes: I) -> bool
    where
        I: IntoIterator<Item = &'a BBox>,
    {
        boxes.into_iter().all(|bbox| self.contains(bbox))
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn union_all_covers_every_box() {
        let boxes = [
            BBox::new(10.0, 20.0, 30.0, 25.0),
            BBox::new(5.0, 40.0, 12.0, 52.0),
            BBox::new(8.0, 8.0, 8.0, 8.0),
        ];
        let union = BBox::union_all(&boxes).expect("non-empty input");
        assert_eq!(union, BBox::new(5.0, 8.0, 30.0, 52.0));
        assert!(union.encloses_all(&boxes));
    }

    #[test]
    fn union_all_of_nothing_is_none() {
        assert_eq!(BBox::union_all(&[] as &[BBox]), None);
    }

    #[test]
    fn degenerate_boxes_intersect_when_touching() {
        let point = BBox::new(10.0, 10.0, 10.0, 10.0);
        let area = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(point.intersects(&area));
        assert_eq!(point.area(), 0.0);
        assert!(!point.intersects(&BBox::new(11.0, 11.0, 12.0, 12.0)));
    }

    #[test]
    fn padding_grows_every_side() {
        let bbox = BBox::new(10.0, 10.0, 20.0, 20.0).padded(1.5);
        assert_eq!(bbox, BBox::new(8.5, 8.5, 21.5, 21.5));
    }

    #[test]
    fn region_converts_width_and_height() {
        assert_eq!(
            BBox::from_region(10.0, 20.0, 5.0, 6.0),
            BBox::new(10.0, 20.0, 15.0, 26.0)
        );
    }
}
