use num::{Float, Num};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Point<T: Num> {
    pub x: T,
    pub y: T,
}

/// Axis-aligned box given by its top-left and bottom-right corners.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox<T: Num> {
    pub x1: T,
    pub y1: T,
    pub x2: T,
    pub y2: T,
}

impl<T: Float> BoundingBox<T> {
    /// Builds a box from its center and size, the layout YOLO heads emit.
    pub fn from_center(center: Point<T>, width: T, height: T) -> Self {
        let two = T::one() + T::one();
        Self {
            x1: center.x - width / two,
            y1: center.y - height / two,
            x2: center.x + width / two,
            y2: center.y + height / two,
        }
    }

    pub fn area(&self) -> T {
        (self.x2 - self.x1).max(T::zero()) * (self.y2 - self.y1).max(T::zero())
    }

    pub fn iou(&self, other: &BoundingBox<T>) -> T {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let intersection = (x2 - x1).max(T::zero()) * (y2 - y1).max(T::zero());
        let union = self.area() + other.area() - intersection;

        if union > T::zero() {
            intersection / union
        } else {
            T::zero()
        }
    }

    /// Half-open containment: `x1 <= x < x2`.
    pub fn contains(&self, point: Point<T>) -> bool {
        point.x >= self.x1 && point.x < self.x2 && point.y >= self.y1 && point.y < self.y2
    }
}
