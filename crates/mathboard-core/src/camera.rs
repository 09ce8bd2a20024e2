//! Camera module: the screen/canvas coordinate transform, pan and anchored zoom.

use crate::config::{BoardConfig, INITIAL_OFFSET, MAX_SCALE, MIN_SCALE, ZOOM_BASE};
use crate::input::{WheelDeltaMode, WheelEvent};
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Wheel deltas above this magnitude are treated as coarse (mouse wheel) input.
const COARSE_DELTA_THRESHOLD: f64 = 50.0;
/// Upper bound of a normalized zoom delta.
const MAX_NORMALIZED_DELTA: f64 = 10.0;

/// What a wheel event did to the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelAction {
    /// The view was panned by the given screen delta.
    Pan(Vec2),
    /// The scale changed to the given value.
    Zoom(f64),
    /// The event is left to the host.
    Ignored,
}

/// Camera holds the view transform of the canvas.
///
/// Screen position of a canvas point is
/// `initial_offset + offset + canvas * scale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// User pan translation in screen units.
    pub offset: Vec2,
    /// Constant pan bias.
    pub initial_offset: Vec2,
    /// Current zoom scale, always within `[min_scale, max_scale]`.
    scale: f64,
    /// Minimum allowed zoom scale.
    pub min_scale: f64,
    /// Maximum allowed zoom scale.
    pub max_scale: f64,
    /// Base of the zoom curve.
    pub zoom_base: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            initial_offset: INITIAL_OFFSET,
            scale: 1.0,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            zoom_base: ZOOM_BASE,
        }
    }
}

impl Camera {
    /// Create a camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a camera using the bounds from a board configuration.
    pub fn with_config(config: &BoardConfig) -> Self {
        Self {
            offset: Vec2::ZERO,
            initial_offset: config.initial_offset,
            scale: 1.0_f64.clamp(config.min_scale, config.max_scale),
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            zoom_base: config.zoom_base,
        }
    }

    /// Current zoom scale.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Set the scale directly, clamped to the allowed range.
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = self.clamp_scale(scale);
    }

    /// Clamp a requested scale to the allowed range.
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        if scale.is_nan() {
            return self.scale;
        }
        scale.clamp(self.min_scale, self.max_scale)
    }

    /// Total translation applied before scaling.
    fn translation(&self) -> Vec2 {
        self.initial_offset + self.offset
    }

    /// Affine transform from canvas to screen space.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.translation()) * Affine::scale(self.scale)
    }

    /// Convert a screen point to canvas coordinates.
    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        let t = self.translation();
        Point::new((screen.x - t.x) / self.scale, (screen.y - t.y) / self.scale)
    }

    /// Convert a canvas point to screen coordinates.
    pub fn canvas_to_screen(&self, canvas: Point) -> Point {
        let t = self.translation();
        Point::new(canvas.x * self.scale + t.x, canvas.y * self.scale + t.y)
    }

    /// Convert a canvas-space rectangle to screen space.
    pub fn canvas_rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_points(
            self.canvas_to_screen(Point::new(rect.x0, rect.y0)),
            self.canvas_to_screen(Point::new(rect.x1, rect.y1)),
        )
    }

    /// Convert a screen-space delta to a canvas-space delta.
    pub fn screen_delta_to_canvas(&self, delta: Vec2) -> Vec2 {
        delta / self.scale
    }

    /// Pan by a screen delta.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Change the scale while keeping the canvas point under `screen_point` fixed.
    ///
    /// The canvas point is captured before the scale changes and the offset is
    /// solved from it afterwards.
    pub fn zoom_to(&mut self, screen_point: Point, new_scale: f64) {
        let logical = self.screen_to_canvas(screen_point);
        self.scale = self.clamp_scale(new_scale);
        self.offset = Vec2::new(
            screen_point.x - (self.initial_offset.x + logical.x * self.scale),
            screen_point.y - (self.initial_offset.y + logical.y * self.scale),
        );
    }

    /// Multiply the scale by `factor` around `screen_point`.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        self.zoom_to(screen_point, self.scale * factor);
    }

    /// Map a raw wheel delta to a bounded zoom delta.
    ///
    /// Line-mode and large deltas are compressed into `[-10, 10]`.
    pub fn normalize_wheel_delta(delta_y: f64, mode: WheelDeltaMode) -> f64 {
        if mode == WheelDeltaMode::Line || delta_y.abs() > COARSE_DELTA_THRESHOLD {
            delta_y.signum() * (delta_y.abs() / 10.0).min(MAX_NORMALIZED_DELTA)
        } else {
            delta_y
        }
    }

    /// Zoom factor for a normalized wheel delta.
    pub fn zoom_factor(&self, normalized_delta: f64) -> f64 {
        self.zoom_base.powf(-normalized_delta / 3.0)
    }

    /// Whether a wheel event is a zoom gesture.
    pub fn is_zoom_gesture(event: &WheelEvent) -> bool {
        event.modifiers.command() || event.mode != WheelDeltaMode::Pixel
    }

    /// Whether a wheel event is trackpad panning.
    pub fn is_trackpad_pan(event: &WheelEvent) -> bool {
        event.mode == WheelDeltaMode::Pixel
            && (event.delta.x.abs() > 0.0 || event.delta.y.abs() < COARSE_DELTA_THRESHOLD)
    }

    /// Apply a wheel event: anchored zoom, trackpad pan, or nothing.
    pub fn handle_wheel(&mut self, event: &WheelEvent) -> WheelAction {
        if Self::is_zoom_gesture(event) {
            let delta = Self::normalize_wheel_delta(event.delta.y, event.mode);
            let factor = self.zoom_factor(delta);
            self.zoom_at(event.position, factor);
            WheelAction::Zoom(self.scale)
        } else if Self::is_trackpad_pan(event) {
            self.offset -= event.delta;
            WheelAction::Pan(-event.delta)
        } else {
            WheelAction::Ignored
        }
    }

    /// Zoom in by one step around the viewport centre.
    pub fn zoom_in(&mut self, viewport: Size) {
        let target = self.scale * self.zoom_base;
        self.set_zoom_level(target, viewport);
    }

    /// Zoom out by one step around the viewport centre.
    pub fn zoom_out(&mut self, viewport: Size) {
        let target = self.scale / self.zoom_base;
        self.set_zoom_level(target, viewport);
    }

    /// Reset to 100% around the viewport centre.
    pub fn reset_zoom(&mut self, viewport: Size) {
        self.set_zoom_level(1.0, viewport);
    }

    /// Set an absolute zoom level, anchored at the viewport centre.
    pub fn set_zoom_level(&mut self, scale: f64, viewport: Size) {
        let center = Point::new(viewport.width / 2.0, viewport.height / 2.0);
        self.zoom_to(center, scale);
    }

    /// Zoom level as a rounded percentage for UI readouts.
    pub fn zoom_percent(&self) -> u32 {
        (self.scale * 100.0).round() as u32
    }

    /// Whether the zoom is close enough to 100% to hide zoom controls.
    pub fn is_default_zoom(&self) -> bool {
        (self.scale - 1.0).abs() < 0.01
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;

    const SCALES: [f64; 5] = [MIN_SCALE, 0.5, 1.0, 2.25, MAX_SCALE];
    const OFFSETS: [(f64, f64); 3] = [(0.0, 0.0), (137.5, -42.0), (-9000.0, 12000.0)];

    fn approx(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6
    }

    fn wheel(position: Point, delta: Vec2, mode: WheelDeltaMode, ctrl: bool) -> WheelEvent {
        WheelEvent {
            position,
            delta,
            mode,
            modifiers: Modifiers { ctrl, ..Modifiers::default() },
        }
    }

    #[test]
    fn test_default_camera() {
        let camera = Camera::new();
        assert_eq!(camera.offset, Vec2::ZERO);
        assert_eq!(camera.initial_offset, INITIAL_OFFSET);
        assert!((camera.scale() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_screen_to_canvas_applies_initial_offset() {
        let camera = Camera::new();
        let canvas = camera.screen_to_canvas(Point::new(100.0, 200.0));
        assert!(approx(canvas, Point::new(10100.0, 10200.0)));
    }

    #[test]
    fn test_roundtrip_conversion() {
        let points = [Point::new(0.0, 0.0), Point::new(123.0, 456.0), Point::new(-77.5, 1e4)];
        for &scale in &SCALES {
            for &(ox, oy) in &OFFSETS {
                let mut camera = Camera::new();
                camera.set_scale(scale);
                camera.offset = Vec2::new(ox, oy);
                for &p in &points {
                    assert!(approx(camera.screen_to_canvas(camera.canvas_to_screen(p)), p));
                    assert!(approx(camera.canvas_to_screen(camera.screen_to_canvas(p)), p));
                }
            }
        }
    }

    #[test]
    fn test_transform_matches_canvas_to_screen() {
        let mut camera = Camera::new();
        camera.set_scale(1.7);
        camera.offset = Vec2::new(30.0, -20.0);
        let p = Point::new(5.0, 9.0);
        assert!(approx(camera.transform() * p, camera.canvas_to_screen(p)));
    }

    #[test]
    fn test_anchored_zoom_keeps_point_fixed() {
        let anchors = [Point::new(0.0, 0.0), Point::new(640.0, 360.0), Point::new(1919.0, 3.0)];
        for &start in &SCALES {
            for &target in &SCALES {
                for &(ox, oy) in &OFFSETS {
                    for &anchor in &anchors {
                        let mut camera = Camera::new();
                        camera.set_scale(start);
                        camera.offset = Vec2::new(ox, oy);
                        let before = camera.screen_to_canvas(anchor);
                        camera.zoom_to(anchor, target);
                        let after = camera.screen_to_canvas(anchor);
                        assert!(approx(before, after), "{start} -> {target} at {anchor:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_zoom_clamp() {
        let mut camera = Camera::new();
        camera.zoom_at(Point::ZERO, 0.001);
        assert!((camera.scale() - MIN_SCALE).abs() < f64::EPSILON);

        camera.zoom_at(Point::ZERO, 1000.0);
        assert!((camera.scale() - MAX_SCALE).abs() < f64::EPSILON);

        for delta in [-1e9, -500.0, -3.0, 0.0, 3.0, 500.0, 1e9] {
            for mode in [WheelDeltaMode::Pixel, WheelDeltaMode::Line, WheelDeltaMode::Page] {
                for _ in 0..50 {
                    camera.handle_wheel(&wheel(Point::new(10.0, 10.0), Vec2::new(0.0, delta), mode, true));
                    assert!(camera.scale() >= MIN_SCALE && camera.scale() <= MAX_SCALE);
                }
            }
        }
    }

    #[test]
    fn test_normalize_wheel_delta() {
        assert_eq!(Camera::normalize_wheel_delta(3.0, WheelDeltaMode::Pixel), 3.0);
        assert_eq!(Camera::normalize_wheel_delta(-40.0, WheelDeltaMode::Pixel), -40.0);
        assert_eq!(Camera::normalize_wheel_delta(120.0, WheelDeltaMode::Pixel), 10.0);
        assert_eq!(Camera::normalize_wheel_delta(-60.0, WheelDeltaMode::Pixel), -6.0);
        assert_eq!(Camera::normalize_wheel_delta(3.0, WheelDeltaMode::Line), 0.3);
        assert_eq!(Camera::normalize_wheel_delta(-1e6, WheelDeltaMode::Line), -10.0);
    }

    #[test]
    fn test_ctrl_wheel_zooms_in_on_negative_delta() {
        let mut camera = Camera::new();
        let action = camera.handle_wheel(&wheel(Point::new(50.0, 50.0), Vec2::new(0.0, -3.0), WheelDeltaMode::Pixel, true));
        let expected = ZOOM_BASE.powf(1.0);
        assert!(matches!(action, WheelAction::Zoom(s) if (s - expected).abs() < 1e-12));
    }

    #[test]
    fn test_line_mode_wheel_zooms_without_modifier() {
        let mut camera = Camera::new();
        let action = camera.handle_wheel(&wheel(Point::ZERO, Vec2::new(0.0, 3.0), WheelDeltaMode::Line, false));
        assert!(matches!(action, WheelAction::Zoom(_)));
        assert!(camera.scale() < 1.0);
    }

    #[test]
    fn test_trackpad_pan() {
        let mut camera = Camera::new();
        let action = camera.handle_wheel(&wheel(Point::ZERO, Vec2::new(4.0, 12.0), WheelDeltaMode::Pixel, false));
        assert_eq!(action, WheelAction::Pan(Vec2::new(-4.0, -12.0)));
        assert_eq!(camera.offset, Vec2::new(-4.0, -12.0));
        assert!((camera.scale() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_large_vertical_pixel_wheel_is_ignored() {
        let mut camera = Camera::new();
        let action = camera.handle_wheel(&wheel(Point::ZERO, Vec2::new(0.0, 120.0), WheelDeltaMode::Pixel, false));
        assert_eq!(action, WheelAction::Ignored);
        assert_eq!(camera.offset, Vec2::ZERO);
    }

    #[test]
    fn test_zoom_controls() {
        let viewport = Size::new(800.0, 600.0);
        let mut camera = Camera::new();
        let center = Point::new(400.0, 300.0);
        let before = camera.screen_to_canvas(center);

        camera.zoom_in(viewport);
        assert!((camera.scale() - ZOOM_BASE).abs() < 1e-12);
        assert!(approx(camera.screen_to_canvas(center), before));
        assert!(!camera.is_default_zoom());
        assert_eq!(camera.zoom_percent(), 108);

        camera.zoom_out(viewport);
        assert!(camera.is_default_zoom());

        camera.set_zoom_level(2.0, viewport);
        camera.reset_zoom(viewport);
        assert!((camera.scale() - 1.0).abs() < f64::EPSILON);
        assert!(approx(camera.screen_to_canvas(center), before));
    }

    #[test]
    fn test_canvas_rect_to_screen() {
        let mut camera = Camera::new();
        camera.initial_offset = Vec2::ZERO;
        camera.set_scale(2.0);
        let rect = camera.canvas_rect_to_screen(Rect::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(rect, Rect::new(2.0, 4.0, 6.0, 8.0));
    }
}
