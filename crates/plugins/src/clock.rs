//! Analog clock plugin

use crate::raster::{parse_color, quantize, rgb888, Canvas};
use chrono::{Local, Timelike, Utc};
use chrono_tz::Tz;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{
    Circle, Line, PrimitiveStyle, PrimitiveStyleBuilder, StrokeAlignment,
};
use inkplay_core::{setting_str, Frame, Plugin, PluginMetadata, RenderError, RenderTarget, Settings};
use std::f64::consts::PI;

/// Analog clock face for the current time
///
/// Settings:
/// - `timezone`: `"Local"` (default) or an IANA name such as `"Europe/Berlin"`
/// - `face_color`, `hand_color`: colours, default white and black
pub struct ClockPlugin {
    metadata: PluginMetadata,
}

impl ClockPlugin {
    pub fn new() -> Self {
        Self {
            metadata: PluginMetadata::new("clock", "Clock", "Analog clock face"),
        }
    }
}

impl Default for ClockPlugin {
    fn default() -> Self {
        Self::new()
    }
}

/// Current (hour, minute) in the configured timezone
fn current_time(timezone: &str) -> Result<(u32, u32), RenderError> {
    if timezone.eq_ignore_ascii_case("local") {
        let now = Local::now();
        return Ok((now.hour(), now.minute()));
    }
    let tz = timezone
        .parse::<Tz>()
        .map_err(|_| RenderError::invalid_settings(format!("unknown timezone '{}'", timezone)))?;
    let now = Utc::now().with_timezone(&tz);
    Ok((now.hour(), now.minute()))
}

/// Draw a clock face showing `hour:minute` centred on `target`
pub fn draw_clock<D>(
    target: &mut D,
    hour: u32,
    minute: u32,
    face: Rgb888,
    hand: Rgb888,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888> + OriginDimensions,
{
    let size = target.size();
    let center = Point::new((size.width / 2) as i32, (size.height / 2) as i32);
    let radius = (size.width.min(size.height) / 2).saturating_sub(2).max(1);
    let stroke = (radius / 40).max(1);

    Circle::with_center(center, radius * 2)
        .into_styled(
            PrimitiveStyleBuilder::new()
                .fill_color(face)
                .stroke_color(hand)
                .stroke_width(stroke * 2)
                .stroke_alignment(StrokeAlignment::Inside)
                .build(),
        )
        .draw(target)?;

    let tick_outer = f64::from(radius.saturating_sub(stroke * 3));
    for tick in 0..12u32 {
        let angle = f64::from(tick) * PI / 6.0;
        let inner = if tick % 3 == 0 { tick_outer * 0.82 } else { tick_outer * 0.9 };
        Line::new(polar(center, inner, angle), polar(center, tick_outer, angle))
            .into_styled(PrimitiveStyle::with_stroke(hand, stroke))
            .draw(target)?;
    }

    let minute_angle = f64::from(minute) * PI / 30.0;
    let hour_angle = (f64::from(hour % 12) + f64::from(minute) / 60.0) * PI / 6.0;
    Line::new(center, polar(center, f64::from(radius) * 0.5, hour_angle))
        .into_styled(PrimitiveStyle::with_stroke(hand, stroke * 3))
        .draw(target)?;
    Line::new(center, polar(center, f64::from(radius) * 0.75, minute_angle))
        .into_styled(PrimitiveStyle::with_stroke(hand, stroke * 2))
        .draw(target)?;
    Circle::with_center(center, stroke * 6)
        .into_styled(PrimitiveStyle::with_fill(hand))
        .draw(target)
}

/// Point at `r` from `center`, `angle` radians clockwise from 12 o'clock
fn polar(center: Point, r: f64, angle: f64) -> Point {
    Point::new(
        center.x + (r * angle.sin()).round() as i32,
        center.y - (r * angle.cos()).round() as i32,
    )
}

impl Plugin for ClockPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn render(&self, settings: &Settings, target: &RenderTarget) -> Result<Frame, RenderError> {
        let (hour, minute) = current_time(setting_str(settings, "timezone")?.unwrap_or("Local"))?;
        let face = parse_color(setting_str(settings, "face_color")?.unwrap_or("white"))?;
        let hand = parse_color(setting_str(settings, "hand_color")?.unwrap_or("black"))?;

        let mut frame = Frame::filled(target.width, target.height, face);
        if let Err(never) =
            draw_clock(&mut Canvas::new(&mut frame), hour, minute, rgb888(face), rgb888(hand))
        {
            match never {}
        }
        log::trace!("Rendered clock at {:02}:{:02}", hour, minute);
        Ok(quantize(frame, target.color_mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkplay_core::{ColorMode, RenderErrorKind, Rgb};
    use serde_json::json;

    #[test]
    fn test_renders_target_size() {
        let target = RenderTarget {
            width: 120,
            height: 80,
            color_mode: ColorMode::Monochrome,
        };
        let mut settings = Settings::new();
        settings.insert("timezone".to_string(), json!("UTC"));
        let frame = ClockPlugin::new().render(&settings, &target).unwrap();
        assert_eq!(frame.dimensions(), (120, 80));
    }

    #[test]
    fn test_three_oclock_hand_points_right() {
        let mut frame = Frame::filled(101, 101, Rgb::WHITE);
        draw_clock(&mut Canvas::new(&mut frame), 3, 0, Rgb888::WHITE, Rgb888::BLACK).unwrap();
        // hour hand runs from the centre towards 3 o'clock
        assert_eq!(frame.pixel(70, 50), Some(Rgb::BLACK));
        // nothing drawn halfway towards 9 o'clock
        assert_eq!(frame.pixel(25, 50), Some(Rgb::WHITE));
    }

    #[test]
    fn test_unknown_timezone_is_invalid_settings() {
        let target = RenderTarget {
            width: 10,
            height: 10,
            color_mode: ColorMode::FullColor,
        };
        let mut settings = Settings::new();
        settings.insert("timezone".to_string(), json!("Mars/Olympus_Mons"));
        let err = ClockPlugin::new().render(&settings, &target).unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::InvalidSettings);
    }
}
