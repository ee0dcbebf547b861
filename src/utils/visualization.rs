//! Visualization utilities for parking_rrt
//!
//! Thin wrapper around gnuplot for drawing lots, trees and trajectories.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{Point2D, Pose2D};
use crate::path_planning::trajectory::{Segment, Trajectory};

/// Sampling distance along curved segments [m]
const CURVE_RESOLUTION: f64 = 0.1;

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00AA00";
    pub const BLUE: &str = "#0000FF";
    pub const GRAY: &str = "#808080";
    pub const ORANGE: &str = "#FFA500";

    // Semantic colors
    pub const OBSTACLE: &str = BLACK;
    pub const SPOT: &str = GREEN;
    pub const TREE: &str = GRAY;
    pub const PATH: &str = RED;
    pub const VEHICLE: &str = BLUE;
    pub const TARGET: &str = ORANGE;
}

/// Style for line rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    /// Empty captions stay out of the legend
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }

    fn uncaptioned(&self) -> Self {
        Self { caption: String::new(), ..self.clone() }
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            color: colors::PATH.to_string(),
            line_width: 2.0,
            caption: "Path".to_string(),
        }
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }
}

/// Main visualizer struct
pub struct Visualizer {
    figure: Figure,
    title: String,
    x_label: String,
    y_label: String,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
    aspect_ratio: Option<f64>,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            figure: Figure::new(),
            title: String::new(),
            x_label: "X [m]".to_string(),
            y_label: "Y [m]".to_string(),
            x_range: None,
            y_range: None,
            aspect_ratio: Some(1.0),
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn set_x_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.x_range = Some((min, max));
        self
    }

    pub fn set_y_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.y_range = Some((min, max));
        self
    }

    fn lines(&mut self, points: &[Point2D], style: &PathStyle) {
        let x: Vec<f64> = points.iter().map(|p| p.x).collect();
        let y: Vec<f64> = points.iter().map(|p| p.y).collect();
        let axes = self.figure.axes2d();
        if style.caption.is_empty() {
            axes.lines(&x, &y, &[Color(&style.color), LineWidth(style.line_width)]);
        } else {
            axes.lines(&x, &y, &[Caption(&style.caption), Color(&style.color), LineWidth(style.line_width)]);
        }
    }

    /// Plot a polyline, closing it back to the first point when `closed`
    pub fn plot_polyline(&mut self, points: &[Point2D], closed: bool, style: &PathStyle) -> &mut Self {
        let mut pts = points.to_vec();
        if closed {
            if let Some(first) = points.first() {
                pts.push(*first);
            }
        }
        self.lines(&pts, style);
        self
    }

    pub fn plot_segment(&mut self, segment: &Segment, style: &PathStyle) -> &mut Self {
        let pts = segment.sample(CURVE_RESOLUTION);
        self.lines(&pts, style);
        self
    }

    /// Plot many segments as one legend entry
    pub fn plot_segments<'a, I>(&mut self, segments: I, style: &PathStyle) -> &mut Self
    where
        I: IntoIterator<Item = &'a Segment>,
    {
        let rest = style.uncaptioned();
        for (i, seg) in segments.into_iter().enumerate() {
            self.plot_segment(seg, if i == 0 { style } else { &rest });
        }
        self
    }

    pub fn plot_trajectory(&mut self, trajectory: &Trajectory, style: &PathStyle) -> &mut Self {
        self.plot_segments(trajectory.segments(), style)
    }

    pub fn plot_points(&mut self, points: &[Point2D], style: &PointStyle) -> &mut Self {
        let x: Vec<f64> = points.iter().map(|p| p.x).collect();
        let y: Vec<f64> = points.iter().map(|p| p.y).collect();

        self.figure.axes2d().points(
            &x,
            &y,
            &[
                Caption(&style.caption),
                Color(&style.color),
                PointSymbol(style.symbol),
                PointSize(style.size),
            ],
        );
        self
    }

    /// Plot a pose as a point with a heading tick of length `size`
    pub fn plot_pose(&mut self, pose: &Pose2D, size: f64, style: &PointStyle) -> &mut Self {
        self.plot_points(&[pose.position], style);
        let tip = pose.position + pose.heading * size;
        self.lines(&[pose.position, tip], &PathStyle::new(&style.color, "").with_line_width(2.0));
        self
    }

    pub fn save_png(&mut self, path: &str, width: u32, height: u32) -> Result<(), String> {
        self.apply_settings();
        self.figure.save_to_png(path, width, height).map_err(|e| e.to_string())
    }

    pub fn show(&mut self) -> Result<(), String> {
        self.apply_settings();
        self.figure.show().map_err(|e| e.to_string()).map(|_| ())
    }

    fn apply_settings(&mut self) {
        let axes = self.figure.axes2d();

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);

        if let Some((min, max)) = self.x_range {
            axes.set_x_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some((min, max)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}
