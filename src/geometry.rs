//! Boxes, points and the scrolled window.

/// A point in client (viewport) coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box.
///
/// Element boxes are stored in page coordinates; [`Rect::to_client`] maps
/// them into the viewport the way `getBoundingClientRect` reports them.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Inclusive hit-test on all four edges.
    pub fn contains(&self, point: Point) -> bool {
        self.top() <= point.y
            && point.y <= self.bottom()
            && self.left() <= point.x
            && point.x <= self.right()
    }

    /// Shift a page-space box into client space for `viewport`.
    pub fn to_client(&self, viewport: &Viewport) -> Rect {
        Rect {
            x: self.x - viewport.scroll_x,
            y: self.y - viewport.scroll_y,
            width: self.width,
            height: self.height,
        }
    }
}

/// The browser window: its size and how far the page is scrolled.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            scroll_x: 0.0,
            scroll_y: 0.0,
            width,
            height,
        }
    }

    pub fn scrolled_to(mut self, scroll_y: f64) -> Self {
        self.scroll_y = scroll_y;
        self
    }
}
