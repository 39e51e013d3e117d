//! # Spectrum Curve Widget
//!
//! Strokes the display series as a polyline. The series is laid out in the
//! configured display geometry; the widget rescales it to its own bounds so
//! the baseline sits on the bottom edge and the last bin on the right edge.

use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{mouse, Color, Element, Point, Rectangle, Renderer, Theme};
use spectrum_core::{DisplayGeometry, DisplayPoint};

pub struct SpectrumCurve {
    points: Vec<DisplayPoint>,
    geometry: DisplayGeometry,
}

impl SpectrumCurve {
    pub fn new(points: Vec<DisplayPoint>, geometry: DisplayGeometry) -> Self {
        Self { points, geometry }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fill),
        )
        .into()
    }

    fn to_screen(&self, point: &DisplayPoint, bounds: &Rectangle) -> Point {
        let x = point.x / self.geometry.display_length * bounds.width;
        let y = point.y / self.geometry.baseline_y * bounds.height;
        Point::new(x, y.clamp(0.0, bounds.height))
    }
}

impl<Message> canvas::Program<Message> for SpectrumCurve {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        let usable = bounds.width.is_finite()
            && bounds.height.is_finite()
            && self.geometry.display_length > 0.0
            && self.geometry.baseline_y > 0.0;
        if !usable || self.points.len() < 2 {
            return vec![frame.into_geometry()];
        }

        let curve = Path::new(|builder| {
            let mut points = self
                .points
                .iter()
                .filter(|p| p.x.is_finite() && p.y.is_finite())
                .map(|p| self.to_screen(p, &bounds));
            if let Some(first) = points.next() {
                builder.move_to(first);
                for point in points {
                    builder.line_to(point);
                }
            }
        });

        frame.stroke(
            &curve,
            Stroke::default()
                .with_width(1.5)
                .with_color(Color::from_rgb8(0x34, 0x98, 0xDB)),
        );

        vec![frame.into_geometry()]
    }
}
